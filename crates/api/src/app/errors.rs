use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use haulpay_config::{ConfigError, ConfigStoreError};
use haulpay_core::DomainError;
use haulpay_router::{RouterError, TestError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn router_error_to_response(err: RouterError) -> axum::response::Response {
    match err {
        RouterError::InvalidRequest(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_request", msg)
        }
        RouterError::ConfigNotFound(tenant_id) => json_error(
            StatusCode::NOT_FOUND,
            "config_not_found",
            format!("no payment configuration for tenant {tenant_id}"),
        ),
        RouterError::ProviderNotConfigured(provider) => json_error(
            StatusCode::NOT_FOUND,
            "provider_not_configured",
            format!("provider {provider} is not configured for this tenant"),
        ),
        RouterError::AdapterMissing(provider) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "adapter_missing",
            format!("no adapter registered for provider {provider}"),
        ),
        RouterError::ProviderCallFailed {
            provider,
            message,
            code,
        } => (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({
                "success": false,
                "error": "provider_call_failed",
                "provider": provider,
                "message": message,
                "error_code": code,
            })),
        )
            .into_response(),
        RouterError::DeadlineExceeded => json_error(
            StatusCode::GATEWAY_TIMEOUT,
            "deadline_exceeded",
            "request deadline exceeded",
        ),
        RouterError::Store(e) => store_error_to_response(e),
    }
}

pub fn config_error_to_response(err: ConfigError) -> axum::response::Response {
    match err {
        ConfigError::NotFound(tenant_id) => json_error(
            StatusCode::NOT_FOUND,
            "config_not_found",
            format!("no payment configuration for tenant {tenant_id}"),
        ),
        ConfigError::ProviderNotConfigured(provider) => json_error(
            StatusCode::NOT_FOUND,
            "provider_not_configured",
            format!("provider {provider} is not configured for this tenant"),
        ),
        ConfigError::CannotRemoveLastProvider => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "cannot_remove_last_provider",
            "cannot remove the last active payment provider",
        ),
        ConfigError::Domain(e) => domain_error_to_response(e),
        ConfigError::Store(e) => store_error_to_response(e),
    }
}

pub fn test_error_to_response(err: TestError) -> axum::response::Response {
    match err {
        TestError::ConfigNotFound(tenant_id) => json_error(
            StatusCode::NOT_FOUND,
            "config_not_found",
            format!("no payment configuration for tenant {tenant_id}"),
        ),
        TestError::ProviderNotConfigured(provider) => json_error(
            StatusCode::NOT_FOUND,
            "provider_not_configured",
            format!("provider {provider} is not configured for this tenant"),
        ),
        TestError::AdapterMissing(provider) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "adapter_missing",
            format!("no adapter registered for provider {provider}"),
        ),
        TestError::Failed {
            provider,
            message,
            code,
        } => (
            StatusCode::BAD_GATEWAY,
            axum::Json(json!({
                "success": false,
                "error": "connection_test_failed",
                "provider": provider,
                "message": message,
                "error_code": code,
            })),
        )
            .into_response(),
        TestError::Store(e) => store_error_to_response(e),
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

fn store_error_to_response(err: ConfigStoreError) -> axum::response::Response {
    match err {
        ConfigStoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        ConfigStoreError::Serialization(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", msg)
        }
        ConfigStoreError::Backend(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}
