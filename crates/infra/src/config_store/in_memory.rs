//! In-memory configuration store.
//!
//! Intended for tests/dev. CAS semantics match the Postgres store: a put
//! checks the stored version, then replaces the whole document at
//! `version + 1` under the write lock, so readers never observe a torn
//! config.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use haulpay_config::{ConfigStore, ConfigStoreError, TenantPaymentConfig};
use haulpay_core::{ExpectedVersion, TenantId};

#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
    configs: RwLock<HashMap<TenantId, TenantPaymentConfig>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn get(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<TenantPaymentConfig>, ConfigStoreError> {
        let configs = self
            .configs
            .read()
            .map_err(|_| ConfigStoreError::Backend("lock poisoned".to_string()))?;
        Ok(configs.get(tenant_id).cloned())
    }

    async fn put(
        &self,
        mut config: TenantPaymentConfig,
        expected_version: ExpectedVersion,
    ) -> Result<TenantPaymentConfig, ConfigStoreError> {
        let mut configs = self
            .configs
            .write()
            .map_err(|_| ConfigStoreError::Backend("lock poisoned".to_string()))?;

        let current = configs
            .get(&config.tenant_id)
            .map(|stored| stored.version)
            .unwrap_or(0);
        if !expected_version.matches(current) {
            return Err(ConfigStoreError::Conflict(format!(
                "expected {expected_version:?}, found {current}"
            )));
        }

        config.version = current + 1;
        configs.insert(config.tenant_id.clone(), config.clone());
        Ok(config)
    }
}
