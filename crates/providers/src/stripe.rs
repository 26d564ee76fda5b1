//! Stripe invoice adapter.
//!
//! Stripe's invoice API is form-encoded and multi-step: invoice items are
//! attached to a customer, the invoice is created around the pending items,
//! then finalized (finalization assigns the number and hosted URL). Test vs
//! live mode is selected by the secret key, not by a separate host, so both
//! environments talk to the same base URL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use haulpay_config::{ProviderCredentials, ProviderSettings};
use haulpay_core::{InvoiceReceipt, InvoiceStatus, LineItem, ProviderKind, UnifiedInvoiceRequest};

use crate::adapter::{AdapterError, ProviderAdapter};

const BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_DAYS_UNTIL_DUE: i64 = 30;

pub struct StripeAdapter {
    http: Client,
}

impl StripeAdapter {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        secret_key: &str,
        params: &[(String, String)],
    ) -> Result<T, AdapterError> {
        let response = self
            .http
            .post(format!("{BASE_URL}{path}"))
            .bearer_auth(secret_key)
            .form(params)
            .send()
            .await?;
        read_response(response).await
    }

    async fn ensure_customer(
        &self,
        secret_key: &str,
        request: &UnifiedInvoiceRequest,
    ) -> Result<String, AdapterError> {
        if let Some(customer_id) = &request.customer.external_ref {
            return Ok(customer_id.clone());
        }
        let mut params = vec![
            ("name".to_string(), request.customer.name.clone()),
            ("email".to_string(), request.customer.email.clone()),
        ];
        if let Some(phone) = &request.customer.phone {
            params.push(("phone".to_string(), phone.clone()));
        }
        let created: IdPayload = self.post_form("/v1/customers", secret_key, &params).await?;
        Ok(created.id)
    }
}

#[async_trait]
impl ProviderAdapter for StripeAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Stripe
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
        let ProviderCredentials::Stripe { secret_key, .. } = &settings.credentials else {
            return Err(AdapterError::Config(
                "stripe adapter invoked with non-stripe credentials".to_string(),
            ));
        };

        let customer_id = self.ensure_customer(secret_key, request).await?;

        for line in &request.line_items {
            let params = invoice_item_params(line, &customer_id, &request.currency);
            let _: IdPayload = self
                .post_form("/v1/invoiceitems", secret_key, &params)
                .await?;
        }

        let created: IdPayload = self
            .post_form(
                "/v1/invoices",
                secret_key,
                &invoice_params(request, &customer_id, Utc::now()),
            )
            .await?;

        let finalized: FinalizedInvoice = self
            .post_form(
                &format!("/v1/invoices/{}/finalize", created.id),
                secret_key,
                &[],
            )
            .await?;

        tracing::debug!(
            invoice_id = %finalized.id,
            tenant_id = %request.tenant_id,
            "stripe invoice finalized"
        );
        Ok(InvoiceReceipt {
            invoice_id: finalized.id,
            invoice_number: finalized.number,
            public_url: finalized.hosted_invoice_url,
            status: map_status(finalized.status.as_deref()),
            amount: finalized.amount_due.unwrap_or_else(|| {
                request.total().unwrap_or_default()
            }),
            currency: finalized
                .currency
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| request.currency.clone()),
        })
    }

    async fn test_connection(&self, settings: &ProviderSettings) -> Result<(), AdapterError> {
        settings
            .credentials
            .validate()
            .map_err(|e| AdapterError::Config(e.to_string()))?;
        let ProviderCredentials::Stripe { secret_key, .. } = &settings.credentials else {
            return Err(AdapterError::Config(
                "stripe adapter invoked with non-stripe credentials".to_string(),
            ));
        };
        let response = self
            .http
            .get(format!("{BASE_URL}/v1/account"))
            .bearer_auth(secret_key)
            .send()
            .await?;
        read_response::<serde_json::Value>(response).await.map(|_| ())
    }
}

fn invoice_item_params(
    line: &LineItem,
    customer_id: &str,
    currency: &str,
) -> Vec<(String, String)> {
    let description = match &line.description {
        Some(detail) => format!("{} ({detail})", line.name),
        None => line.name.clone(),
    };
    vec![
        ("customer".to_string(), customer_id.to_string()),
        ("currency".to_string(), currency.to_lowercase()),
        ("quantity".to_string(), line.quantity.to_string()),
        ("unit_amount".to_string(), line.rate.to_string()),
        ("description".to_string(), description),
    ]
}

fn invoice_params(
    request: &UnifiedInvoiceRequest,
    customer_id: &str,
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("customer".to_string(), customer_id.to_string()),
        ("collection_method".to_string(), "send_invoice".to_string()),
        (
            "days_until_due".to_string(),
            days_until_due(request.due_date, now).to_string(),
        ),
        (
            "pending_invoice_items_behavior".to_string(),
            "include".to_string(),
        ),
        ("currency".to_string(), request.currency.to_lowercase()),
    ];
    for (key, value) in &request.metadata {
        params.push((format!("metadata[{key}]"), value.clone()));
    }
    for (idx, field) in request.custom_fields.iter().enumerate() {
        params.push((format!("custom_fields[{idx}][name]"), field.label.clone()));
        params.push((format!("custom_fields[{idx}][value]"), field.value.clone()));
    }
    params
}

fn days_until_due(due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match due_date {
        Some(due) => (due - now).num_days().max(1),
        None => DEFAULT_DAYS_UNTIL_DUE,
    }
}

fn map_status(raw: Option<&str>) -> InvoiceStatus {
    match raw.unwrap_or_default() {
        "draft" => InvoiceStatus::Draft,
        "open" => InvoiceStatus::Open,
        "paid" => InvoiceStatus::Paid,
        "void" | "uncollectible" => InvoiceStatus::Canceled,
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
    AdapterError::Api {
        message: parsed
            .error
            .message
            .unwrap_or_else(|| format!("stripe request failed with status {status}")),
        code: parsed.error.code,
        status: Some(status),
    }
}

#[derive(Debug, Deserialize)]
struct IdPayload {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FinalizedInvoice {
    id: String,
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    hosted_invoice_url: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    amount_due: Option<u64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorPayload,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    use haulpay_core::{Customer, CustomField, Environment, TenantId};

    fn test_request() -> UnifiedInvoiceRequest {
        UnifiedInvoiceRequest {
            tenant_id: TenantId::new("acme-logistics").unwrap(),
            provider: Some(ProviderKind::Stripe),
            customer: Customer {
                name: "Acme Shippers".to_string(),
                email: "billing@acme.example".to_string(),
                phone: None,
                company: None,
                external_ref: None,
            },
            line_items: vec![LineItem {
                name: "Fuel surcharge".to_string(),
                description: None,
                quantity: 1,
                rate: 12_500,
                amount: 12_500,
                taxable: false,
            }],
            due_date: None,
            currency: "USD".to_string(),
            custom_fields: vec![CustomField {
                label: "Load #".to_string(),
                value: "L-20411".to_string(),
            }],
            metadata: BTreeMap::from([("load_id".to_string(), "L-20411".to_string())]),
        }
    }

    #[test]
    fn invoice_item_params_keep_cent_units() {
        let request = test_request();
        let params = invoice_item_params(&request.line_items[0], "cus_123", "USD");
        assert!(params.contains(&("unit_amount".to_string(), "12500".to_string())));
        assert!(params.contains(&("quantity".to_string(), "1".to_string())));
        assert!(params.contains(&("currency".to_string(), "usd".to_string())));
    }

    #[test]
    fn invoice_params_carry_metadata_and_custom_fields() {
        let request = test_request();
        let now = "2026-08-01T00:00:00Z".parse().unwrap();
        let params = invoice_params(&request, "cus_123", now);
        assert!(params.contains(&("collection_method".to_string(), "send_invoice".to_string())));
        assert!(params.contains(&("metadata[load_id]".to_string(), "L-20411".to_string())));
        assert!(params.contains(&("custom_fields[0][name]".to_string(), "Load #".to_string())));
        assert!(params.contains(&("days_until_due".to_string(), "30".to_string())));
    }

    #[test]
    fn days_until_due_clamps_past_dates_to_one() {
        let now: DateTime<Utc> = "2026-08-01T00:00:00Z".parse().unwrap();
        assert_eq!(days_until_due(None, now), DEFAULT_DAYS_UNTIL_DUE);
        let past = "2026-07-01T00:00:00Z".parse().unwrap();
        assert_eq!(days_until_due(Some(past), now), 1);
        let future = "2026-08-15T00:00:00Z".parse().unwrap();
        assert_eq!(days_until_due(Some(future), now), 14);
    }

    #[test]
    fn statuses_normalize() {
        assert_eq!(map_status(Some("open")), InvoiceStatus::Open);
        assert_eq!(map_status(Some("void")), InvoiceStatus::Canceled);
        assert_eq!(map_status(Some("weird")), InvoiceStatus::Unknown);
    }

    #[test]
    fn provider_error_body_is_surfaced() {
        let body = r#"{"error":{"message":"No such customer: cus_x","code":"resource_missing","type":"invalid_request_error"}}"#;
        match parse_error(404, body) {
            AdapterError::Api { message, code, .. } => {
                assert_eq!(message, "No such customer: cus_x");
                assert_eq!(code.as_deref(), Some("resource_missing"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_secret_key_fails_before_any_network_call() {
        let adapter = StripeAdapter::new(
            crate::adapter::http_client(Duration::from_secs(5)).unwrap(),
        );
        let settings = ProviderSettings {
            enabled: true,
            connected: true,
            environment: Environment::Sandbox,
            credentials: ProviderCredentials::Stripe {
                secret_key: "  ".to_string(),
                publishable_key: None,
            },
        };
        let err = adapter
            .create_invoice(&test_request(), &settings)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Config(_)));
    }
}
