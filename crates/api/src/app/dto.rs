use std::collections::BTreeMap;

use serde::Deserialize;

use haulpay_config::TenantPaymentConfig;
use haulpay_core::{ProviderDescriptor, catalog};
use haulpay_router::RoutedInvoice;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub external_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub quantity: u32,
    /// Minor units (cents).
    pub rate: u64,
    /// Minor units (cents); must equal `quantity * rate`.
    pub amount: u64,
    #[serde(default)]
    pub taxable: bool,
}

#[derive(Debug, Deserialize)]
pub struct CustomFieldRequest {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    /// Explicit provider override; omitted means the tenant default.
    pub provider: Option<String>,
    pub customer: CustomerRequest,
    pub line_items: Vec<LineItemRequest>,
    pub due_date: Option<String>, // RFC3339
    pub currency: Option<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldRequest>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct EnableProviderRequest {
    pub environment: String,
    /// Provider-specific credential fields; the provider tag comes from
    /// the URL path, not the body.
    pub credentials: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SetPrimaryProviderRequest {
    pub provider: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub default_provider: Option<String>,
    pub fallback_provider: Option<String>,
    pub auto_switch_on_failure: Option<bool>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn catalog_to_json() -> serde_json::Value {
    let providers: Vec<serde_json::Value> = catalog().iter().map(descriptor_to_json).collect();
    serde_json::json!({ "providers": providers })
}

fn descriptor_to_json(descriptor: &ProviderDescriptor) -> serde_json::Value {
    serde_json::json!({
        "name": descriptor.name,
        "display_name": descriptor.display_name,
        "supported_features": descriptor.supported_features,
    })
}

/// Tenant config with credentials redacted: per provider, only
/// `{enabled, connected, environment}` crosses the HTTP boundary.
pub fn config_to_json(config: &TenantPaymentConfig) -> serde_json::Value {
    let providers: serde_json::Map<String, serde_json::Value> = config
        .providers
        .iter()
        .map(|(kind, settings)| {
            (
                kind.as_str().to_string(),
                serde_json::json!({
                    "enabled": settings.enabled,
                    "connected": settings.connected,
                    "environment": settings.environment,
                }),
            )
        })
        .collect();

    serde_json::json!({
        "tenant_id": config.tenant_id,
        "primary_provider": config.primary_provider,
        "providers": providers,
        "preferences": {
            "default_provider": config.preferences.default_provider,
            "fallback_provider": config.preferences.fallback_provider,
            "auto_switch_on_failure": config.preferences.auto_switch_on_failure,
        },
        "version": config.version,
    })
}

pub fn config_response(config: &TenantPaymentConfig) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "config": config_to_json(config),
    })
}

pub fn routed_invoice_to_json(routed: &RoutedInvoice) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "request_id": routed.request_id,
        "tenant_id": routed.tenant_id,
        "provider": routed.provider,
        "invoice_id": routed.receipt.invoice_id,
        "invoice_number": routed.receipt.invoice_number,
        "public_url": routed.receipt.public_url,
        "status": routed.receipt.status,
        "amount": routed.receipt.amount,
        "currency": routed.receipt.currency,
    })
}
