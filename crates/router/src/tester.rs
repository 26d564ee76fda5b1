//! Connection testing without billable side effects.
//!
//! The tester is strictly read-only: it loads the tenant config, runs the
//! adapter's lightweight check under the same timeout policy as the
//! router, and reports the outcome. Recording that outcome on the
//! `connected` flag is the configuration mutation API's job, composed at
//! the HTTP layer.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::info;

use haulpay_config::{ConfigStore, ConfigStoreError};
use haulpay_core::{ProviderKind, TenantId};
use haulpay_providers::AdapterRegistry;

use crate::router::DEFAULT_CALL_TIMEOUT;

#[derive(Debug, Error)]
pub enum TestError {
    #[error("no payment configuration for tenant {0}")]
    ConfigNotFound(TenantId),

    #[error("provider {0} is not configured for this tenant")]
    ProviderNotConfigured(ProviderKind),

    #[error("no adapter registered for provider {0}")]
    AdapterMissing(ProviderKind),

    #[error("{provider} connection test failed: {message}")]
    Failed {
        provider: ProviderKind,
        message: String,
        code: Option<String>,
    },

    #[error(transparent)]
    Store(#[from] ConfigStoreError),
}

pub struct ConnectionTester {
    store: Arc<dyn ConfigStore>,
    adapters: AdapterRegistry,
    call_timeout: Duration,
}

impl ConnectionTester {
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

    /// Verify a provider's credentials are live.
    ///
    /// Works for providers that are not (yet) enabled or connected; testing
    /// stored credentials is harmless and this is exactly how `connected`
    /// gets populated after an enable.
    pub async fn test(
        &self,
        tenant_id: &TenantId,
        provider: ProviderKind,
    ) -> Result<(), TestError> {
        let config = self
            .store
            .get(tenant_id)
            .await?
            .ok_or_else(|| TestError::ConfigNotFound(tenant_id.clone()))?;
        let settings = config
            .provider(provider)
            .cloned()
            .ok_or(TestError::ProviderNotConfigured(provider))?;
        let adapter = self
            .adapters
            .get(provider)
            .ok_or(TestError::AdapterMissing(provider))?;

        let outcome = timeout(self.call_timeout, adapter.test_connection(&settings)).await;
        match outcome {
            Ok(Ok(())) => {
                info!(tenant_id = %tenant_id, provider = %provider, "connection test passed");
                Ok(())
            }
            Ok(Err(err)) => Err(TestError::Failed {
                provider,
                code: err.code().map(str::to_string),
                message: err.to_string(),
            }),
            Err(_elapsed) => Err(TestError::Failed {
                provider,
                message: "connection test timed out".to_string(),
                code: None,
            }),
        }
    }
}
