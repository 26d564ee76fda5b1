//! Configuration mutation API.
//!
//! The single writer of the configuration store. Every operation is
//! load → mutate → validate → compare-and-swap; concurrent mutations for
//! the same tenant lose the race and surface a conflict instead of
//! interleaving. Readers (router, connection tester) go straight to the
//! store and never write.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use haulpay_core::{DomainError, Environment, ExpectedVersion, ProviderKind, TenantId};

use crate::credentials::ProviderCredentials;
use crate::store::{ConfigStore, ConfigStoreError};
use crate::tenant_config::{PreferencesPatch, TenantPaymentConfig};

/// Configuration mutation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no payment configuration for tenant {0}")]
    NotFound(TenantId),

    #[error("provider {0} is not configured for this tenant")]
    ProviderNotConfigured(ProviderKind),

    /// Removing the last active provider would leave the tenant unroutable
    /// while the provider is still load-bearing.
    #[error("cannot remove the last active payment provider")]
    CannotRemoveLastProvider,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] ConfigStoreError),
}

#[derive(Clone)]
pub struct ConfigService {
    store: Arc<dyn ConfigStore>,
}

impl ConfigService {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, tenant_id: &TenantId) -> Result<TenantPaymentConfig, ConfigError> {
        self.store
            .get(tenant_id)
            .await?
            .ok_or_else(|| ConfigError::NotFound(tenant_id.clone()))
    }

    pub async fn active_providers(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ProviderKind>, ConfigError> {
        Ok(self.get(tenant_id).await?.active_providers())
    }

    /// Write a provider's credentials with `enabled=true, connected=false`.
    ///
    /// A tenant with no configuration yet gets one bootstrapped around this
    /// provider. The caller is expected to follow with a connection test,
    /// recorded via [`record_connection_status`](Self::record_connection_status).
    pub async fn enable_provider(
        &self,
        tenant_id: &TenantId,
        environment: Environment,
        credentials: ProviderCredentials,
    ) -> Result<TenantPaymentConfig, ConfigError> {
        let config = match self.store.get(tenant_id).await? {
            Some(mut config) => {
                config.enable_provider(environment, credentials)?;
                config
            }
            None => {
                credentials.validate().map_err(ConfigError::Domain)?;
                TenantPaymentConfig::bootstrap(tenant_id.clone(), environment, credentials)
            }
        };
        self.persist(config).await
    }

    /// Disable a provider. May leave the tenant with zero active providers
    /// (an explicit degraded state); primary is reassigned when needed.
    pub async fn disable_provider(
        &self,
        tenant_id: &TenantId,
        provider: ProviderKind,
    ) -> Result<TenantPaymentConfig, ConfigError> {
        let mut config = self.get(tenant_id).await?;
        if config.provider(provider).is_none() {
            return Err(ConfigError::ProviderNotConfigured(provider));
        }
        config.disable_provider(provider)?;
        self.persist(config).await
    }

    /// Remove a provider's configuration outright. Unlike disable, removal
    /// of the last active provider is rejected.
    pub async fn remove_provider(
        &self,
        tenant_id: &TenantId,
        provider: ProviderKind,
    ) -> Result<TenantPaymentConfig, ConfigError> {
        let mut config = self.get(tenant_id).await?;
        if config.provider(provider).is_none() {
            return Err(ConfigError::ProviderNotConfigured(provider));
        }
        if config.is_last_active(provider) {
            return Err(ConfigError::CannotRemoveLastProvider);
        }
        config.remove_provider(provider)?;
        self.persist(config).await
    }

    pub async fn set_primary_provider(
        &self,
        tenant_id: &TenantId,
        provider: ProviderKind,
    ) -> Result<TenantPaymentConfig, ConfigError> {
        let mut config = self.get(tenant_id).await?;
        if config.provider(provider).is_none() {
            return Err(ConfigError::ProviderNotConfigured(provider));
        }
        config.set_primary(provider)?;
        self.persist(config).await
    }

    pub async fn update_preferences(
        &self,
        tenant_id: &TenantId,
        patch: PreferencesPatch,
    ) -> Result<TenantPaymentConfig, ConfigError> {
        let mut config = self.get(tenant_id).await?;
        config.merge_preferences(patch)?;
        self.persist(config).await
    }

    /// Record a connection-test outcome on the `connected` flag.
    ///
    /// This is the mutation half of the test-connection flow; the
    /// connection tester itself never writes.
    pub async fn record_connection_status(
        &self,
        tenant_id: &TenantId,
        provider: ProviderKind,
        connected: bool,
    ) -> Result<TenantPaymentConfig, ConfigError> {
        let mut config = self.get(tenant_id).await?;
        if config.provider(provider).is_none() {
            return Err(ConfigError::ProviderNotConfigured(provider));
        }
        config.set_connected(provider, connected)?;
        self.persist(config).await
    }

    async fn persist(
        &self,
        config: TenantPaymentConfig,
    ) -> Result<TenantPaymentConfig, ConfigError> {
        config.validate()?;
        let expected = ExpectedVersion::Exact(config.version);
        let stored = self.store.put(config, expected).await?;
        info!(
            tenant_id = %stored.tenant_id,
            version = stored.version,
            primary = %stored.primary_provider,
            "tenant payment config updated"
        );
        Ok(stored)
    }
}
