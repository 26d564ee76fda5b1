//! Square invoice adapter.
//!
//! Square invoices hang off an order: create the order, create a draft
//! invoice referencing it, then publish. Publishing is what makes the
//! invoice visible and sendable, so all three steps happen before success
//! is reported. Amounts are already in Square's unit (cents).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use haulpay_config::{ProviderCredentials, ProviderSettings};
use haulpay_core::{
    Environment, InvoiceReceipt, InvoiceStatus, ProviderKind, UnifiedInvoiceRequest,
};

use crate::adapter::{AdapterError, ProviderAdapter};

const SQUARE_VERSION: &str = "2024-06-04";

pub struct SquareAdapter {
    http: Client,
}

impl SquareAdapter {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    fn base_url(environment: Environment) -> &'static str {
        match environment {
            Environment::Production => "https://connect.squareup.com",
            Environment::Sandbox => "https://connect.squareupsandbox.com",
        }
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        access_token: &str,
        body: &Value,
    ) -> Result<T, AdapterError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .header("Square-Version", SQUARE_VERSION)
            .json(body)
            .send()
            .await?;
        read_response(response).await
    }

    async fn ensure_customer(
        &self,
        base: &str,
        access_token: &str,
        request: &UnifiedInvoiceRequest,
    ) -> Result<String, AdapterError> {
        if let Some(customer_id) = &request.customer.external_ref {
            return Ok(customer_id.clone());
        }
        let body = json!({
            "idempotency_key": Uuid::now_v7().to_string(),
            "given_name": request.customer.name,
            "company_name": request.customer.company,
            "email_address": request.customer.email,
            "phone_number": request.customer.phone,
        });
        let created: CustomerEnvelope = self
            .post_json(format!("{base}/v2/customers"), access_token, &body)
            .await?;
        Ok(created.customer.id)
    }
}

#[async_trait]
impl ProviderAdapter for SquareAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Square
    }

    async fn create_invoice(
        &self,
        request: &UnifiedInvoiceRequest,
        settings: &ProviderSettings,
    ) -> Result<InvoiceReceipt, AdapterError> {
        settings
            .credentials
            .validate()
            .map_err(|e| AdapterError::Config(e.to_string()))?;
        let ProviderCredentials::Square {
            access_token,
            location_id,
            ..
        } = &settings.credentials
        else {
            return Err(AdapterError::Config(
                "square adapter invoked with non-square credentials".to_string(),
            ));
        };
        let base = Self::base_url(settings.environment);

        let customer_id = self.ensure_customer(base, access_token, request).await?;

        let order: OrderEnvelope = self
            .post_json(
                format!("{base}/v2/orders"),
                access_token,
                &order_body(request, location_id),
            )
            .await?;

        let draft: InvoiceEnvelope = self
            .post_json(
                format!("{base}/v2/invoices"),
                access_token,
                &invoice_body(request, location_id, &order.order.id, &customer_id),
            )
            .await?;

        let publish_body = json!({
            "version": draft.invoice.version.unwrap_or(0),
            "idempotency_key": Uuid::now_v7().to_string(),
        });
        let published: InvoiceEnvelope = self
            .post_json(
                format!("{base}/v2/invoices/{}/publish", draft.invoice.id),
                access_token,
                &publish_body,
            )
            .await?;

        let invoice = published.invoice;
        tracing::debug!(
            invoice_id = %invoice.id,
            tenant_id = %request.tenant_id,
            "square invoice published"
        );
        Ok(InvoiceReceipt {
            invoice_id: invoice.id,
            invoice_number: invoice.invoice_number,
            public_url: invoice.public_url,
            status: map_status(invoice.status.as_deref()),
            amount: request
                .total()
                .map_err(|e| AdapterError::Config(e.to_string()))?,
            currency: request.currency.clone(),
        })
    }

    async fn test_connection(&self, settings: &ProviderSettings) -> Result<(), AdapterError> {
        settings
            .credentials
            .validate()
            .map_err(|e| AdapterError::Config(e.to_string()))?;
        let ProviderCredentials::Square { access_token, .. } = &settings.credentials else {
            return Err(AdapterError::Config(
                "square adapter invoked with non-square credentials".to_string(),
            ));
        };
        let base = Self::base_url(settings.environment);
        let response = self
            .http
            .get(format!("{base}/v2/locations"))
            .bearer_auth(access_token)
            .header("Square-Version", SQUARE_VERSION)
            .send()
            .await?;
        read_response::<Value>(response).await.map(|_| ())
    }
}

fn order_body(request: &UnifiedInvoiceRequest, location_id: &str) -> Value {
    let line_items: Vec<Value> = request
        .line_items
        .iter()
        .map(|line| {
            json!({
                "name": line.name,
                "note": line.description,
                // Square carries order quantities as strings.
                "quantity": line.quantity.to_string(),
                "base_price_money": {
                    "amount": line.rate,
                    "currency": request.currency,
                },
            })
        })
        .collect();

    json!({
        "idempotency_key": Uuid::now_v7().to_string(),
        "order": {
            "location_id": location_id,
            "line_items": line_items,
        },
    })
}

fn invoice_body(
    request: &UnifiedInvoiceRequest,
    location_id: &str,
    order_id: &str,
    customer_id: &str,
) -> Value {
    let mut payment_request = json!({ "request_type": "BALANCE" });
    if let Some(due) = request.due_date {
        payment_request["due_date"] = json!(due.format("%Y-%m-%d").to_string());
    }

    let mut invoice = json!({
        "location_id": location_id,
        "order_id": order_id,
        "primary_recipient": { "customer_id": customer_id },
        "delivery_method": "EMAIL",
        "payment_requests": [payment_request],
        "accepted_payment_methods": { "card": true, "bank_account": true },
    });
    if let Some(title) = request.metadata.get("title") {
        invoice["title"] = json!(title);
    }

    json!({
        "idempotency_key": Uuid::now_v7().to_string(),
        "invoice": invoice,
    })
}

fn map_status(raw: Option<&str>) -> InvoiceStatus {
    match raw.unwrap_or_default() {
        "DRAFT" => InvoiceStatus::Draft,
        "UNPAID" | "SCHEDULED" | "PARTIALLY_PAID" => InvoiceStatus::Open,
        "PAID" => InvoiceStatus::Paid,
        "CANCELED" | "FAILED" | "REFUNDED" => InvoiceStatus::Canceled,
        _ => InvoiceStatus::Unknown,
    }
}

async fn read_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AdapterError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| AdapterError::Decode(e.to_string()))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &body))
    }
}

fn parse_error(status: u16, body: &str) -> AdapterError {
    let parsed: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let first = parsed.errors.into_iter().next();
    AdapterError::Api {
        message: first
            .as_ref()
            .and_then(|e| e.detail.clone())
            .unwrap_or_else(|| format!("square request failed with status {status}")),
        code: first.and_then(|e| e.code),
        status: Some(status),
    }
}

#[derive(Debug, Deserialize)]
struct OrderEnvelope {
    order: OrderPayload,
}

#[derive(Debug, Deserialize)]
struct OrderPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CustomerEnvelope {
    customer: CustomerPayload,
}

#[derive(Debug, Deserialize)]
struct CustomerPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct InvoiceEnvelope {
    invoice: InvoicePayload,
}

#[derive(Debug, Deserialize)]
struct InvoicePayload {
    id: String,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    invoice_number: Option<String>,
    #[serde(default)]
    public_url: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use haulpay_core::{Customer, LineItem, TenantId};

    fn test_request() -> UnifiedInvoiceRequest {
        UnifiedInvoiceRequest {
            tenant_id: TenantId::new("acme-logistics").unwrap(),
            provider: Some(ProviderKind::Square),
            customer: Customer {
                name: "Acme Shippers".to_string(),
                email: "billing@acme.example".to_string(),
                phone: None,
                company: None,
                external_ref: Some("CUST-9".to_string()),
            },
            line_items: vec![LineItem {
                name: "Linehaul CHI-DAL".to_string(),
                description: Some("Dry van, 980mi".to_string()),
                quantity: 2,
                rate: 125_000,
                amount: 250_000,
                taxable: false,
            }],
            due_date: None,
            currency: "USD".to_string(),
            custom_fields: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn settings(credentials: ProviderCredentials) -> ProviderSettings {
        ProviderSettings {
            enabled: true,
            connected: true,
            environment: Environment::Sandbox,
            credentials,
        }
    }

    #[test]
    fn order_body_uses_string_quantities_and_cent_amounts() {
        let body = order_body(&test_request(), "loc-1");
        let line = &body["order"]["line_items"][0];
        assert_eq!(line["quantity"], "2");
        assert_eq!(line["base_price_money"]["amount"], 125_000);
        assert_eq!(line["base_price_money"]["currency"], "USD");
        assert_eq!(body["order"]["location_id"], "loc-1");
    }

    #[test]
    fn invoice_body_carries_due_date_when_present() {
        let mut request = test_request();
        request.due_date = Some("2026-09-01T00:00:00Z".parse().unwrap());
        let body = invoice_body(&request, "loc-1", "order-1", "cust-1");
        assert_eq!(
            body["invoice"]["payment_requests"][0]["due_date"],
            "2026-09-01"
        );
        assert_eq!(
            body["invoice"]["primary_recipient"]["customer_id"],
            "cust-1"
        );
    }

    #[test]
    fn statuses_normalize() {
        assert_eq!(map_status(Some("UNPAID")), InvoiceStatus::Open);
        assert_eq!(map_status(Some("PAID")), InvoiceStatus::Paid);
        assert_eq!(map_status(Some("CANCELED")), InvoiceStatus::Canceled);
        assert_eq!(map_status(Some("SOMETHING_NEW")), InvoiceStatus::Unknown);
        assert_eq!(map_status(None), InvoiceStatus::Unknown);
    }

    #[test]
    fn provider_error_body_is_surfaced() {
        let body = r#"{"errors":[{"category":"INVALID_REQUEST_ERROR","code":"NOT_FOUND","detail":"Location not found."}]}"#;
        match parse_error(404, body) {
            AdapterError::Api {
                message,
                code,
                status,
            } => {
                assert_eq!(message, "Location not found.");
                assert_eq!(code.as_deref(), Some("NOT_FOUND"));
                assert_eq!(status, Some(404));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_credentials_fail_before_any_network_call() {
        let adapter = SquareAdapter::new(
            crate::adapter::http_client(Duration::from_secs(5)).unwrap(),
        );
        let bad = settings(ProviderCredentials::Square {
            application_id: "app".to_string(),
            access_token: String::new(),
            location_id: "loc".to_string(),
        });
        let err = adapter.create_invoice(&test_request(), &bad).await.unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }

    #[tokio::test]
    async fn wrong_credential_variant_is_a_config_error() {
        let adapter = SquareAdapter::new(
            crate::adapter::http_client(Duration::from_secs(5)).unwrap(),
        );
        let wrong = settings(ProviderCredentials::Stripe {
            secret_key: "sk_test_x".to_string(),
            publishable_key: None,
        });
        let err = adapter.test_connection(&wrong).await.unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }
}
