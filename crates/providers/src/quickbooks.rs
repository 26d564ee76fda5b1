//! QuickBooks Online invoice adapter.
//!
//! QBO wants decimal-dollar amounts and a `CustomerRef` that must exist
//! before the invoice does, so the adapter resolves (or creates) the
//! customer first, creates the invoice, then emails it via the `send`
//! endpoint. Sandbox and production are separate hosts selected from the
//! configured environment.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use haulpay_config::{ProviderCredentials, ProviderSettings};
use haulpay_core::{
    Environment, InvoiceReceipt, InvoiceStatus, ProviderKind, UnifiedInvoiceRequest,
};

use crate::adapter::{AdapterError, ProviderAdapter, f64_to_minor, minor_to_f64};

const MINOR_VERSION: &str = "65";

pub struct QuickbooksAdapter {
    http: Client,
}

impl QuickbooksAdapter {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    fn base_url(environment: Environment) -> &'static str {
        match environment {
            Environment::Production => "https://quickbooks.api.intuit.com",
            Environment::Sandbox => "https://sandbox-quickbooks.api.intuit.com",
        }
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        access_token: &str,
        body: Option<&Value>,
    ) -> Result<T, AdapterError> {
        let mut builder = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(&[("minorversion", MINOR_VERSION)]);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        read_response(builder.send().await?).await
    }

    async fn ensure_customer(
        &self,
        base: &str,
        realm_id: &str,
        access_token: &str,
        request: &UnifiedInvoiceRequest,
    ) -> Result<String, AdapterError> {
        if let Some(customer_id) = &request.customer.external_ref {
            return Ok(customer_id.clone());
        }
        let body = json!({
            "DisplayName": request.customer.name,
            "CompanyName": request.customer.company,
            "PrimaryEmailAddr": { "Address": request.customer.email },
        });
        let created: CustomerEnvelope = self
            .post_json(
                format!("{base}/v3/company/{realm_id}/customer"),
                access_token,
                Some(&body),
            )
            .await?;
        Ok(created.customer.id)
    }
}

#[async_trait]
impl ProviderAdapter for QuickbooksAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Quickbooks
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
        let ProviderCredentials::Quickbooks {
            realm_id,
            access_token,
            ..
        } = &settings.credentials
        else {
            return Err(AdapterError::Config(
                "quickbooks adapter invoked with non-quickbooks credentials".to_string(),
            ));
        };
        let base = Self::base_url(settings.environment);

        let customer_id = self
            .ensure_customer(base, realm_id, access_token, request)
            .await?;

        let created: InvoiceEnvelope = self
            .post_json(
                format!("{base}/v3/company/{realm_id}/invoice"),
                access_token,
                Some(&invoice_body(request, &customer_id)),
            )
            .await?;
        let invoice = created.invoice;

        // Emailing is a separate call; the invoice is not customer-visible
        // until it succeeds.
        let sent: InvoiceEnvelope = self
            .post_json(
                format!(
                    "{base}/v3/company/{realm_id}/invoice/{}/send?sendTo={}",
                    invoice.id, request.customer.email
                ),
                access_token,
                None,
            )
            .await?;

        tracing::debug!(
            invoice_id = %sent.invoice.id,
            tenant_id = %request.tenant_id,
            "quickbooks invoice sent"
        );
        Ok(InvoiceReceipt {
            invoice_id: sent.invoice.id,
            invoice_number: sent.invoice.doc_number.or(invoice.doc_number),
            public_url: sent.invoice.invoice_link.or(invoice.invoice_link),
            status: InvoiceStatus::Open,
            amount: sent
                .invoice
                .total_amt
                .map(f64_to_minor)
                .unwrap_or_else(|| request.total().unwrap_or_default()),
            currency: request.currency.clone(),
        })
    }

    async fn test_connection(&self, settings: &ProviderSettings) -> Result<(), AdapterError> {
        settings
            .credentials
            .validate()
            .map_err(|e| AdapterError::Config(e.to_string()))?;
        let ProviderCredentials::Quickbooks {
            realm_id,
            access_token,
            ..
        } = &settings.credentials
        else {
            return Err(AdapterError::Config(
                "quickbooks adapter invoked with non-quickbooks credentials".to_string(),
            ));
        };
        let base = Self::base_url(settings.environment);
        let response = self
            .http
            .get(format!(
                "{base}/v3/company/{realm_id}/companyinfo/{realm_id}"
            ))
            .bearer_auth(access_token)
            .header("Accept", "application/json")
            .query(&[("minorversion", MINOR_VERSION)])
            .send()
            .await?;
        read_response::<Value>(response).await.map(|_| ())
    }
}

fn invoice_body(request: &UnifiedInvoiceRequest, customer_id: &str) -> Value {
    let lines: Vec<Value> = request
        .line_items
        .iter()
        .map(|line| {
            json!({
                "DetailType": "SalesItemLineDetail",
                // QBO speaks decimal dollars, not cents.
                "Amount": minor_to_f64(line.amount),
                "Description": match &line.description {
                    Some(detail) => format!("{} ({detail})", line.name),
                    None => line.name.clone(),
                },
                "SalesItemLineDetail": {
                    "Qty": line.quantity,
                    "UnitPrice": minor_to_f64(line.rate),
                },
            })
        })
        .collect();

    let mut body = json!({
        "CustomerRef": { "value": customer_id },
        "BillEmail": { "Address": request.customer.email },
        "Line": lines,
    });
    if let Some(due) = request.due_date {
        body["DueDate"] = json!(due.format("%Y-%m-%d").to_string());
    }
    if let Some(memo) = request.metadata.get("memo") {
        body["CustomerMemo"] = json!({ "value": memo });
    }
    body
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
    let parsed: FaultEnvelope = serde_json::from_str(body).unwrap_or_default();
    let first = parsed.fault.errors.into_iter().next();
    AdapterError::Api {
        message: first
            .as_ref()
            .and_then(|e| e.detail.clone().or_else(|| e.message.clone()))
            .unwrap_or_else(|| format!("quickbooks request failed with status {status}")),
        code: first.and_then(|e| e.code),
        status: Some(status),
    }
}

#[derive(Debug, Deserialize)]
struct CustomerEnvelope {
    #[serde(rename = "Customer")]
    customer: CustomerPayload,
}

#[derive(Debug, Deserialize)]
struct CustomerPayload {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct InvoiceEnvelope {
    #[serde(rename = "Invoice")]
    invoice: InvoicePayload,
}

#[derive(Debug, Deserialize)]
struct InvoicePayload {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "DocNumber", default)]
    doc_number: Option<String>,
    #[serde(rename = "InvoiceLink", default)]
    invoice_link: Option<String>,
    #[serde(rename = "TotalAmt", default)]
    total_amt: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct FaultEnvelope {
    #[serde(rename = "Fault", default)]
    fault: FaultPayload,
}

#[derive(Debug, Default, Deserialize)]
struct FaultPayload {
    #[serde(rename = "Error", default)]
    errors: Vec<FaultError>,
}

#[derive(Debug, Deserialize)]
struct FaultError {
    #[serde(rename = "Message", default)]
    message: Option<String>,
    #[serde(rename = "Detail", default)]
    detail: Option<String>,
    #[serde(rename = "code", default)]
    code: Option<String>,
}
