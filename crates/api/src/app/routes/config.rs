use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use haulpay_config::{PreferencesPatch, ProviderCredentials};
use haulpay_core::Environment;

use crate::app::routes::common::{parse_provider, parse_tenant_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn get_config(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.config.get(&tenant_id).await {
        // credentials are redacted before they cross this boundary
        Ok(config) => (StatusCode::OK, Json(dto::config_response(&config))).into_response(),
        Err(e) => errors::config_error_to_response(e),
    }
}

pub async fn active_providers(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<String>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.config.active_providers(&tenant_id).await {
        Ok(providers) => (
            StatusCode::OK,
            Json(serde_json::json!({"success": true, "active_providers": providers})),
        )
            .into_response(),
        Err(e) => errors::config_error_to_response(e),
    }
}

pub async fn enable_provider(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant_id, provider)): Path<(String, String)>,
    Json(body): Json<dto::EnableProviderRequest>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let provider = match parse_provider(&provider) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let environment: Environment = match body.environment.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_environment",
                "environment must be sandbox or production",
            );
        }
    };

    // The credential variant is keyed by the provider in the path; the
    // body carries only that provider's fields.
    let mut credential_doc = body.credentials;
    if !credential_doc.is_object() {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_credentials",
            "credentials must be an object",
        );
    }
    credential_doc["provider"] = serde_json::json!(provider);
    let credentials: ProviderCredentials = match serde_json::from_value(credential_doc) {
        Ok(v) => v,
        Err(e) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_credentials",
                format!("credentials do not match provider {provider}: {e}"),
            );
        }
    };

    match services
        .config
        .enable_provider(&tenant_id, environment, credentials)
        .await
    {
        Ok(config) => (StatusCode::OK, Json(dto::config_response(&config))).into_response(),
        Err(e) => errors::config_error_to_response(e),
    }
}

pub async fn disable_provider(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant_id, provider)): Path<(String, String)>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let provider = match parse_provider(&provider) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.config.disable_provider(&tenant_id, provider).await {
        Ok(config) => (StatusCode::OK, Json(dto::config_response(&config))).into_response(),
        Err(e) => errors::config_error_to_response(e),
    }
}

pub async fn remove_provider(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant_id, provider)): Path<(String, String)>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let provider = match parse_provider(&provider) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.config.remove_provider(&tenant_id, provider).await {
        Ok(config) => (StatusCode::OK, Json(dto::config_response(&config))).into_response(),
        Err(e) => errors::config_error_to_response(e),
    }
}

pub async fn set_primary_provider(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<String>,
    Json(body): Json<dto::SetPrimaryProviderRequest>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let provider = match parse_provider(&body.provider) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .config
        .set_primary_provider(&tenant_id, provider)
        .await
    {
        Ok(config) => (StatusCode::OK, Json(dto::config_response(&config))).into_response(),
        Err(e) => errors::config_error_to_response(e),
    }
}

pub async fn update_preferences(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<String>,
    Json(body): Json<dto::UpdatePreferencesRequest>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let mut patch = PreferencesPatch {
        auto_switch_on_failure: body.auto_switch_on_failure,
        ..Default::default()
    };
    if let Some(raw) = &body.default_provider {
        match parse_provider(raw) {
            Ok(v) => patch.default_provider = Some(v),
            Err(resp) => return resp,
        }
    }
    if let Some(raw) = &body.fallback_provider {
        match parse_provider(raw) {
            Ok(v) => patch.fallback_provider = Some(v),
            Err(resp) => return resp,
        }
    }
    match services.config.update_preferences(&tenant_id, patch).await {
        Ok(config) => (StatusCode::OK, Json(dto::config_response(&config))).into_response(),
        Err(e) => errors::config_error_to_response(e),
    }
}

/// Run the adapter's lightweight connectivity check and record the outcome
/// on the `connected` flag. The check itself is read-only; the flag update
/// goes through the configuration mutation API.
pub async fn test_connection(
    Extension(services): Extension<Arc<AppServices>>,
    Path((tenant_id, provider)): Path<(String, String)>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let provider = match parse_provider(&provider) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.tester.test(&tenant_id, provider).await {
        Ok(()) => {
            if let Err(e) = services
                .config
                .record_connection_status(&tenant_id, provider, true)
                .await
            {
                return errors::config_error_to_response(e);
            }
            (
                StatusCode::OK,
                Json(serde_json::json!({"success": true, "provider": provider, "connected": true})),
            )
                .into_response()
        }
        Err(err @ haulpay_router::TestError::Failed { .. }) => {
            // a failed test demotes the provider until it passes again
            if let Err(e) = services
                .config
                .record_connection_status(&tenant_id, provider, false)
                .await
            {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    provider = %provider,
                    error = %e,
                    "failed to record connection status"
                );
            }
            errors::test_error_to_response(err)
        }
        Err(err) => errors::test_error_to_response(err),
    }
}
