//! Infrastructure wiring: config store selection and the shared service
//! objects handed to handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use haulpay_config::{ConfigService, ConfigStore};
use haulpay_infra::{InMemoryConfigStore, PostgresConfigStore};
use haulpay_providers::AdapterRegistry;
use haulpay_router::{ConnectionTester, DEFAULT_CALL_TIMEOUT, PaymentRouter};

/// Shared application services. Router and tester only read the config
/// store; every write goes through the config service.
pub struct AppServices {
    pub router: PaymentRouter,
    pub tester: ConnectionTester,
    pub config: ConfigService,
}

/// Production wiring driven by environment variables:
/// `USE_PERSISTENT_STORES` + `DATABASE_URL` select Postgres over the
/// in-memory store; `PROVIDER_TIMEOUT_SECS` bounds outbound calls.
pub async fn build_services() -> AppServices {
    let call_timeout = provider_call_timeout();
    let adapters =
        AdapterRegistry::live(call_timeout).expect("failed to build provider http client");

    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    let store: Arc<dyn ConfigStore> = if use_persistent {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");
        let pool = PgPool::connect(&database_url)
            .await
            .expect("failed to connect to Postgres");
        let store = PostgresConfigStore::new(pool);
        store
            .ensure_schema()
            .await
            .expect("failed to ensure config schema");
        Arc::new(store)
    } else {
        Arc::new(InMemoryConfigStore::new())
    };

    build_services_with(store, adapters, call_timeout)
}

/// Explicit wiring; the injection seam used by tests (in-memory store,
/// mock adapters).
pub fn build_services_with(
    store: Arc<dyn ConfigStore>,
    adapters: AdapterRegistry,
    call_timeout: Duration,
) -> AppServices {
    AppServices {
        router: PaymentRouter::new(store.clone(), adapters.clone())
            .with_call_timeout(call_timeout),
        tester: ConnectionTester::new(store.clone(), adapters).with_call_timeout(call_timeout),
        config: ConfigService::new(store),
    }
}

fn provider_call_timeout() -> Duration {
    std::env::var("PROVIDER_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_CALL_TIMEOUT)
}
