use axum::http::StatusCode;

use haulpay_core::{ProviderKind, TenantId};

use crate::app::errors;

pub fn parse_tenant_id(raw: &str) -> Result<TenantId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid tenant id")
    })
}

pub fn parse_provider(raw: &str) -> Result<ProviderKind, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(
            StatusCode::NOT_FOUND,
            "unknown_provider",
            format!("unknown payment provider: {raw}"),
        )
    })
}
