//! Postgres-backed configuration store.
//!
//! One row per tenant: the config document as JSONB plus a `version`
//! column used for compare-and-swap writes. The version in the column is
//! authoritative; the copy inside the JSONB document is kept in lockstep
//! for convenience.
//!
//! ## Concurrency
//!
//! `put` with `Exact(v)` issues `UPDATE ... WHERE tenant_id = $1 AND
//! version = $2`; zero affected rows means another writer committed first
//! and the call fails with `Conflict`. First writes (`Exact(0)`) use
//! `INSERT ... ON CONFLICT DO NOTHING` for the same reason. The primary
//! key on `tenant_id` keeps writes atomic per tenant.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::instrument;

use haulpay_config::{ConfigStore, ConfigStoreError, TenantPaymentConfig};
use haulpay_core::{ExpectedVersion, TenantId};

#[derive(Debug, Clone)]
pub struct PostgresConfigStore {
    pool: PgPool,
}

impl PostgresConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table if it does not exist yet (dev/bootstrap
    /// convenience; production deployments run migrations).
    pub async fn ensure_schema(&self) -> Result<(), ConfigStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tenant_payment_configs (
                tenant_id  TEXT PRIMARY KEY,
                version    BIGINT NOT NULL,
                config     JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for PostgresConfigStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id), err)]
    async fn get(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<TenantPaymentConfig>, ConfigStoreError> {
        let row = sqlx::query(
            "SELECT config, version FROM tenant_payment_configs WHERE tenant_id = $1",
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let document: serde_json::Value = row.get("config");
        let version: i64 = row.get("version");
        let mut config: TenantPaymentConfig = serde_json::from_value(document)
            .map_err(|e| ConfigStoreError::Serialization(e.to_string()))?;
        config.version = version as u64;
        Ok(Some(config))
    }

    #[instrument(skip(self, config), fields(tenant_id = %config.tenant_id), err)]
    async fn put(
        &self,
        mut config: TenantPaymentConfig,
        expected_version: ExpectedVersion,
    ) -> Result<TenantPaymentConfig, ConfigStoreError> {
        match expected_version {
            ExpectedVersion::Exact(0) => {
                config.version = 1;
                let document = to_document(&config)?;
                let result = sqlx::query(
                    r#"
                    INSERT INTO tenant_payment_configs (tenant_id, version, config)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (tenant_id) DO NOTHING
                    "#,
                )
                .bind(config.tenant_id.as_str())
                .bind(config.version as i64)
                .bind(&document)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
                if result.rows_affected() == 0 {
                    return Err(ConfigStoreError::Conflict(format!(
                        "config for tenant {} already exists",
                        config.tenant_id
                    )));
                }
                Ok(config)
            }
            ExpectedVersion::Exact(expected) => {
                config.version = expected + 1;
                let document = to_document(&config)?;
                let result = sqlx::query(
                    r#"
                    UPDATE tenant_payment_configs
                    SET version = $3, config = $4, updated_at = now()
                    WHERE tenant_id = $1 AND version = $2
                    "#,
                )
                .bind(config.tenant_id.as_str())
                .bind(expected as i64)
                .bind(config.version as i64)
                .bind(&document)
                .execute(&self.pool)
                .await
                .map_err(backend)?;
                if result.rows_affected() == 0 {
                    return Err(ConfigStoreError::Conflict(format!(
                        "expected version {expected} for tenant {}",
                        config.tenant_id
                    )));
                }
                Ok(config)
            }
            ExpectedVersion::Any => {
                let document = to_document(&config)?;
                let row = sqlx::query(
                    r#"
                    INSERT INTO tenant_payment_configs (tenant_id, version, config)
                    VALUES ($1, 1, $2)
                    ON CONFLICT (tenant_id) DO UPDATE
                    SET version = tenant_payment_configs.version + 1,
                        config = EXCLUDED.config,
                        updated_at = now()
                    RETURNING version
                    "#,
                )
                .bind(config.tenant_id.as_str())
                .bind(&document)
                .fetch_one(&self.pool)
                .await
                .map_err(backend)?;
                let version: i64 = row.get("version");
                config.version = version as u64;
                Ok(config)
            }
        }
    }
}

fn to_document(config: &TenantPaymentConfig) -> Result<serde_json::Value, ConfigStoreError> {
    serde_json::to_value(config).map_err(|e| ConfigStoreError::Serialization(e.to_string()))
}

fn backend(err: sqlx::Error) -> ConfigStoreError {
    ConfigStoreError::Backend(err.to_string())
}
