use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use haulpay_core::{Customer, CustomField, LineItem, UnifiedInvoiceRequest};

use crate::app::routes::common::{parse_provider, parse_tenant_id};
use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Create an invoice through the tenant's configured provider (or the
/// explicitly requested one), with the router applying fallback policy.
pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Path(tenant_id): Path<String>,
    Json(body): Json<dto::CreateInvoiceRequest>,
) -> axum::response::Response {
    let tenant_id = match parse_tenant_id(&tenant_id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let provider = match &body.provider {
        Some(raw) => match parse_provider(raw) {
            Ok(v) => Some(v),
            Err(resp) => return resp,
        },
        None => None,
    };

    let due_date = match &body.due_date {
        Some(raw) => match chrono::DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_due_date",
                    "due_date must be RFC3339",
                );
            }
        },
        None => None,
    };

    let request = UnifiedInvoiceRequest {
        tenant_id,
        provider,
        customer: Customer {
            name: body.customer.name,
            email: body.customer.email,
            phone: body.customer.phone,
            company: body.customer.company,
            external_ref: body.customer.external_ref,
        },
        line_items: body
            .line_items
            .into_iter()
            .map(|line| LineItem {
                name: line.name,
                description: line.description,
                quantity: line.quantity,
                rate: line.rate,
                amount: line.amount,
                taxable: line.taxable,
            })
            .collect(),
        due_date,
        currency: body.currency.unwrap_or_else(|| "USD".to_string()),
        custom_fields: body
            .custom_fields
            .into_iter()
            .map(|field| CustomField {
                label: field.label,
                value: field.value,
            })
            .collect(),
        metadata: body.metadata,
    };

    match services.router.create_invoice(&request, None).await {
        Ok(routed) => (
            StatusCode::CREATED,
            Json(dto::routed_invoice_to_json(&routed)),
        )
            .into_response(),
        Err(e) => errors::router_error_to_response(e),
    }
}
