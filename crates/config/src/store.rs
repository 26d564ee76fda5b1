//! Tenant configuration store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use haulpay_core::{ExpectedVersion, TenantId};

use crate::tenant_config::TenantPaymentConfig;

/// Config store operation error (infrastructure-level, as opposed to the
/// domain failures in [`DomainError`](haulpay_core::DomainError)).
#[derive(Debug, Error)]
pub enum ConfigStoreError {
    /// Compare-and-swap failed: another writer got there first.
    #[error("config version conflict: {0}")]
    Conflict(String),

    #[error("config serialization failed: {0}")]
    Serialization(String),

    #[error("config store backend error: {0}")]
    Backend(String),
}

/// Tenant-keyed configuration store.
///
/// Writes are atomic per tenant: `put` either persists the whole document
/// at the next version or fails, so a concurrent reader can never observe
/// a torn config (e.g. a primary pointing at a provider that was just
/// disabled). Implementations make no assumptions about the backing store
/// beyond that.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<TenantPaymentConfig>, ConfigStoreError>;

    /// Persist `config`, checking `expected_version` against the stored
    /// record (0 for a record that does not exist yet). On success the
    /// returned config carries its newly assigned version.
    async fn put(
        &self,
        config: TenantPaymentConfig,
        expected_version: ExpectedVersion,
    ) -> Result<TenantPaymentConfig, ConfigStoreError>;
}

#[async_trait]
impl<S> ConfigStore for Arc<S>
where
    S: ConfigStore + ?Sized,
{
    async fn get(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<TenantPaymentConfig>, ConfigStoreError> {
        (**self).get(tenant_id).await
    }

    async fn put(
        &self,
        config: TenantPaymentConfig,
        expected_version: ExpectedVersion,
    ) -> Result<TenantPaymentConfig, ConfigStoreError> {
        (**self).put(config, expected_version).await
    }
}
