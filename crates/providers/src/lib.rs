//! `haulpay-providers` — payment-processor adapters.
//!
//! One adapter per processor, all behind the [`ProviderAdapter`] contract:
//! a unified invoice request goes in, a normalized receipt (or a failure
//! value) comes out. Adapters own everything provider-specific: line-item
//! schemas, money units, sandbox/production hosts, and multi-step
//! create-then-send flows.

pub mod adapter;
pub mod billcom;
pub mod quickbooks;
pub mod square;
pub mod stripe;

pub use adapter::{AdapterError, AdapterRegistry, ProviderAdapter, http_client};
pub use billcom::BillcomAdapter;
pub use quickbooks::QuickbooksAdapter;
pub use square::SquareAdapter;
pub use stripe::StripeAdapter;
