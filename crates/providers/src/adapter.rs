//! Provider adapter contract and registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use haulpay_config::ProviderSettings;
use haulpay_core::{InvoiceReceipt, ProviderKind, UnifiedInvoiceRequest};

/// Failure of a provider call, as a value.
///
/// Adapters never panic across this boundary; the router folds these into
/// its fallback decision without per-provider special cases.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Credentials missing, blank, or of the wrong variant. Caught before
    /// any network traffic.
    #[error("provider configuration error: {0}")]
    Config(String),

    /// The provider API answered with an error. The raw provider message
    /// (and code, where one exists) is preserved for diagnostics.
    #[error("provider api error: {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    /// Transport-level failure (connect, TLS, read).
    #[error("provider http error: {0}")]
    Http(String),

    /// The call exceeded its time budget.
    #[error("provider call timed out")]
    Timeout,

    /// The provider answered 2xx with a body we could not understand.
    #[error("malformed provider response: {0}")]
    Decode(String),
}

impl AdapterError {
    /// Provider error code, when the failure carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AdapterError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

/// Uniform contract every processor integration implements.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Create an invoice, including the publish/send step where the
    /// processor separates the two. Success means the invoice is visible
    /// to the customer on the provider side.
    async fn create_invoice(
        &self,
        request: &UnifiedInvoiceRequest,
        settings: &ProviderSettings,
    ) -> Result<InvoiceReceipt, AdapterError>;

    /// Lightweight credentials check. Must not create an invoice or any
    /// other billable object.
    async fn test_connection(&self, settings: &ProviderSettings) -> Result<(), AdapterError>;
}

/// Adapter lookup; the injection seam between the router and the processor
/// clients. Tests swap in mocks here.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderKind, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry wired with the four live HTTP adapters sharing one client.
    pub fn live(timeout: Duration) -> Result<Self, AdapterError> {
        let client = http_client(timeout)?;
        let mut registry = Self::new();
        registry.insert(Arc::new(crate::square::SquareAdapter::new(client.clone())));
        registry.insert(Arc::new(crate::billcom::BillcomAdapter::new(client.clone())));
        registry.insert(Arc::new(crate::quickbooks::QuickbooksAdapter::new(
            client.clone(),
        )));
        registry.insert(Arc::new(crate::stripe::StripeAdapter::new(client)));
        Ok(registry)
    }

    pub fn insert(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&kind).cloned()
    }
}

/// Outbound HTTP client shared by the live adapters.
///
/// rustls + a hard per-request timeout; the router layers its own deadline
/// budget on top.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, AdapterError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .build()
        .map_err(|e| AdapterError::Http(e.to_string()))
}

/// Render a minor-unit amount as the decimal string some processors expect.
pub(crate) fn minor_to_decimal(minor: u64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}

/// Minor-unit amount as a float, for processors whose JSON schema wants a
/// decimal number. Only used at the provider boundary.
pub(crate) fn minor_to_f64(minor: u64) -> f64 {
    minor as f64 / 100.0
}

/// Decimal-dollar float back to minor units (provider-confirmed totals).
pub(crate) fn f64_to_minor(amount: f64) -> u64 {
    (amount * 100.0).round() as u64
}
