//! `haulpay-core` — domain foundation for the payment routing core.
//!
//! This crate contains **pure domain** primitives (no IO, no provider SDK
//! specifics): identifiers, the error model, the provider catalog, and the
//! unified invoice request/response shapes every processor adapter consumes.

pub mod catalog;
pub mod error;
pub mod id;
pub mod invoice;
pub mod provider;
pub mod version;

pub use catalog::{FeatureKind, ProviderDescriptor, SupportedFeature, catalog};
pub use error::{DomainError, DomainResult};
pub use id::{RequestId, TenantId};
pub use invoice::{
    Customer, CustomField, InvoiceReceipt, InvoiceStatus, LineItem, UnifiedInvoiceRequest,
};
pub use provider::{Environment, ProviderKind};
pub use version::ExpectedVersion;
