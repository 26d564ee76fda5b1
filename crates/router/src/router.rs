//! Payment router: resolves the provider for a request, invokes its
//! adapter, and applies the tenant's fallback policy.
//!
//! Fallback is an explicit bounded loop (at most one extra attempt), so
//! the "one fallback hop" guarantee is structural, not a side effect of
//! provider counts. Both the configuration store and the adapter set are
//! injected, so the router carries no global state.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, timeout};
use tracing::{info, warn};

use haulpay_config::{ConfigStore, ConfigStoreError, ProviderSettings, TenantPaymentConfig};
use haulpay_core::{
    InvoiceReceipt, ProviderKind, RequestId, TenantId, UnifiedInvoiceRequest,
};
use haulpay_providers::{AdapterError, AdapterRegistry};

/// Primary attempt plus at most one fallback hop.
const MAX_ATTEMPTS: u32 = 2;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Successful routing outcome. `provider` is the processor that actually
/// produced the invoice; it differs from the requested one after fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedInvoice {
    pub request_id: RequestId,
    pub tenant_id: TenantId,
    pub provider: ProviderKind,
    pub receipt: InvoiceReceipt,
}

#[derive(Debug, Error)]
pub enum RouterError {
    /// Request failed validation; nothing was sent to any provider.
    #[error("invalid invoice request: {0}")]
    InvalidRequest(String),

    #[error("no payment configuration for tenant {0}")]
    ConfigNotFound(TenantId),

    /// Requested provider absent or disabled for this tenant.
    #[error("provider {0} is not configured for this tenant")]
    ProviderNotConfigured(ProviderKind),

    #[error("no adapter registered for provider {0}")]
    AdapterMissing(ProviderKind),

    /// The provider call failed; the raw provider message (and code, when
    /// one exists) is preserved for diagnostics.
    #[error("{provider} invoice call failed: {message}")]
    ProviderCallFailed {
        provider: ProviderKind,
        message: String,
        code: Option<String>,
    },

    /// The caller's deadline ran out before a call (or fallback) could run.
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error(transparent)]
    Store(#[from] ConfigStoreError),
}

pub struct PaymentRouter {
    store: Arc<dyn ConfigStore>,
    adapters: AdapterRegistry,
    call_timeout: Duration,
}

impl PaymentRouter {
    pub fn new(store: Arc<dyn ConfigStore>, adapters: AdapterRegistry) -> Self {
        Self {
            store,
            adapters,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Route an invoice request.
    ///
    /// `deadline` is the caller's overall budget. Each attempt runs under
    /// `min(call_timeout, remaining budget)`; a fallback is only attempted
    /// while budget remains, otherwise the timeout surfaces as
    /// [`RouterError::DeadlineExceeded`].
    pub async fn create_invoice(
        &self,
        request: &UnifiedInvoiceRequest,
        deadline: Option<Instant>,
    ) -> Result<RoutedInvoice, RouterError> {
        request
            .validate()
            .map_err(|e| RouterError::InvalidRequest(e.to_string()))?;

        let config = self
            .store
            .get(&request.tenant_id)
            .await?
            .ok_or_else(|| RouterError::ConfigNotFound(request.tenant_id.clone()))?;

        let request_id = RequestId::new();
        // Explicit override beats the tenant default; fallback is only ever
        // a reaction to failure, never a first choice.
        let mut provider = request
            .provider
            .unwrap_or(config.preferences.default_provider);

        let mut attempt = 1;
        loop {
            let settings = usable_settings(&config, provider)?;
            match self.attempt(request, provider, &settings, deadline).await {
                Ok(receipt) => {
                    info!(
                        request_id = %request_id,
                        tenant_id = %request.tenant_id,
                        provider = %provider,
                        attempt,
                        amount = receipt.amount,
                        "invoice created"
                    );
                    return Ok(RoutedInvoice {
                        request_id,
                        tenant_id: request.tenant_id.clone(),
                        provider,
                        receipt,
                    });
                }
                Err(RouterError::DeadlineExceeded) => return Err(RouterError::DeadlineExceeded),
                Err(failure) => {
                    warn!(
                        request_id = %request_id,
                        tenant_id = %request.tenant_id,
                        provider = %provider,
                        attempt,
                        error = %failure,
                        "invoice attempt failed"
                    );
                    if attempt >= MAX_ATTEMPTS {
                        return Err(failure);
                    }
                    let Some(fallback) = fallback_for(&config, provider) else {
                        return Err(failure);
                    };
                    if out_of_budget(deadline) {
                        return Err(RouterError::DeadlineExceeded);
                    }
                    info!(
                        request_id = %request_id,
                        tenant_id = %request.tenant_id,
                        from = %provider,
                        to = %fallback,
                        "switching to fallback provider"
                    );
                    provider = fallback;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        request: &UnifiedInvoiceRequest,
        provider: ProviderKind,
        settings: &ProviderSettings,
        deadline: Option<Instant>,
    ) -> Result<InvoiceReceipt, RouterError> {
        let adapter = self
            .adapters
            .get(provider)
            .ok_or(RouterError::AdapterMissing(provider))?;
        let budget = match remaining_budget(deadline, self.call_timeout) {
            Some(budget) => budget,
            None => return Err(RouterError::DeadlineExceeded),
        };
        match timeout(budget, adapter.create_invoice(request, settings)).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(err)) => Err(call_failed(provider, err)),
            Err(_elapsed) => Err(call_failed(provider, AdapterError::Timeout)),
        }
    }
}

/// Per-attempt budget: the configured call timeout, clipped to whatever is
/// left of the caller's deadline. `None` means the deadline already passed.
fn remaining_budget(deadline: Option<Instant>, call_timeout: Duration) -> Option<Duration> {
    match deadline {
        None => Some(call_timeout),
        Some(deadline) => {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            if remaining.is_zero() {
                return None;
            }
            Some(call_timeout.min(remaining))
        }
    }
}

fn out_of_budget(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

fn usable_settings(
    config: &TenantPaymentConfig,
    provider: ProviderKind,
) -> Result<ProviderSettings, RouterError> {
    config
        .provider(provider)
        .filter(|settings| settings.enabled)
        .cloned()
        .ok_or(RouterError::ProviderNotConfigured(provider))
}

fn fallback_for(config: &TenantPaymentConfig, attempted: ProviderKind) -> Option<ProviderKind> {
    if !config.preferences.auto_switch_on_failure {
        return None;
    }
    match config.preferences.fallback_provider {
        Some(fallback) if fallback != attempted => Some(fallback),
        _ => None,
    }
}

fn call_failed(provider: ProviderKind, err: AdapterError) -> RouterError {
    let code = err.code().map(str::to_string);
    RouterError::ProviderCallFailed {
        provider,
        message: err.to_string(),
        code,
    }
}
