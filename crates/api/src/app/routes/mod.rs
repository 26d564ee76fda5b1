use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub mod catalog;
pub mod common;
pub mod config;
pub mod invoices;
pub mod system;

/// Full routing tree.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/providers", get(catalog::list_providers))
        .nest("/tenants/:tenant_id", tenant_router())
}

/// Tenant-scoped endpoints (tenant id from the path).
fn tenant_router() -> Router {
    Router::new()
        .route("/config", get(config::get_config))
        .route("/active-providers", get(config::active_providers))
        .route("/invoices", post(invoices::create_invoice))
        .route(
            "/providers/:provider",
            post(config::enable_provider).delete(config::remove_provider),
        )
        .route("/providers/:provider/test", post(config::test_connection))
        .route("/providers/:provider/disable", post(config::disable_provider))
        .route("/primary-provider", put(config::set_primary_provider))
        .route("/preferences", patch(config::update_preferences))
}
