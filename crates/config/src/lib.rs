//! `haulpay-config` — per-tenant payment-provider configuration.
//!
//! Holds the credential sum type, the tenant configuration model and its
//! invariants, the [`ConfigStore`] abstraction, and the configuration
//! mutation service (the only writer of the store).

pub mod credentials;
pub mod service;
pub mod store;
pub mod tenant_config;

pub use credentials::ProviderCredentials;
pub use service::{ConfigError, ConfigService};
pub use store::{ConfigStore, ConfigStoreError};
pub use tenant_config::{Preferences, PreferencesPatch, ProviderSettings, TenantPaymentConfig};
