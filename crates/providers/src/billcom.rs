//! Bill.com invoice adapter.
//!
//! Every call rides on a short-lived session obtained from `Login.json`;
//! the session id and developer key are repeated on each request. Amounts
//! are decimal-dollar strings, and a created invoice is not visible to the
//! customer until `SendInvoice.json`. The API wraps every payload in a
//! `response_status`/`response_data` envelope, including errors.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use reqwest::Client;
use serde_json::{Value, json};
use uuid::Uuid;

use haulpay_config::{ProviderCredentials, ProviderSettings};
use haulpay_core::{
    Environment, InvoiceReceipt, InvoiceStatus, ProviderKind, UnifiedInvoiceRequest,
};

use crate::adapter::{AdapterError, ProviderAdapter, minor_to_decimal};

const DEFAULT_TERMS_DAYS: u64 = 30;

pub struct BillcomAdapter {
    http: Client,
}

struct Session {
    dev_key: String,
    session_id: String,
}

impl BillcomAdapter {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    fn base_url(environment: Environment) -> &'static str {
        match environment {
            Environment::Production => "https://api.bill.com/api/v2",
            Environment::Sandbox => "https://api-sandbox.bill.com/api/v2",
        }
    }

    async fn call(
        &self,
        url: String,
        form: &[(String, String)],
    ) -> Result<Value, AdapterError> {
        let response = self.http.post(url).form(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Api {
                message: format!("bill.com request failed with status {}", status.as_u16()),
                code: None,
                status: Some(status.as_u16()),
            });
        }
        let envelope: Value = response
            .json()
            .await
            .map_err(|e| AdapterError::Decode(e.to_string()))?;
        parse_envelope(envelope)
    }

    async fn login(
        &self,
        base: &str,
        settings: &ProviderSettings,
    ) -> Result<Session, AdapterError> {
        settings
            .credentials
            .validate()
            .map_err(|e| AdapterError::Config(e.to_string()))?;
        let ProviderCredentials::Billcom {
            username,
            password,
            org_id,
            dev_key,
        } = &settings.credentials
        else {
            return Err(AdapterError::Config(
                "bill.com adapter invoked with non-bill.com credentials".to_string(),
            ));
        };
        let form = vec![
            ("userName".to_string(), username.clone()),
            ("password".to_string(), password.clone()),
            ("orgId".to_string(), org_id.clone()),
            ("devKey".to_string(), dev_key.clone()),
        ];
        let data = self.call(format!("{base}/Login.json"), &form).await?;
        let session_id = data["sessionId"]
            .as_str()
            .ok_or_else(|| AdapterError::Decode("login response missing sessionId".to_string()))?
            .to_string();
        Ok(Session {
            dev_key: dev_key.clone(),
            session_id,
        })
    }

    async fn crud_create(
        &self,
        base: &str,
        session: &Session,
        entity_path: &str,
        obj: Value,
    ) -> Result<Value, AdapterError> {
        let form = vec![
            ("devKey".to_string(), session.dev_key.clone()),
            ("sessionId".to_string(), session.session_id.clone()),
            ("data".to_string(), json!({ "obj": obj }).to_string()),
        ];
        self.call(format!("{base}/Crud/Create/{entity_path}.json"), &form)
            .await
    }

    async fn ensure_customer(
        &self,
        base: &str,
        session: &Session,
        request: &UnifiedInvoiceRequest,
    ) -> Result<String, AdapterError> {
        if let Some(customer_id) = &request.customer.external_ref {
            return Ok(customer_id.clone());
        }
        let obj = json!({
            "entity": "Customer",
            "name": request.customer.name,
            "email": request.customer.email,
            "companyName": request.customer.company,
            "phone": request.customer.phone,
        });
        let data = self.crud_create(base, session, "Customer", obj).await?;
        data["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AdapterError::Decode("customer response missing id".to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for BillcomAdapter {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Billcom
    }

    async fn create_invoice(
        &self,
        request: &UnifiedInvoiceRequest,
        settings: &ProviderSettings,
    ) -> Result<InvoiceReceipt, AdapterError> {
        let base = Self::base_url(settings.environment);
        let session = self.login(base, settings).await?;

        let customer_id = self.ensure_customer(base, &session, request).await?;
        let invoice_number = request
            .metadata
            .get("invoice_number")
            .cloned()
            .unwrap_or_else(generated_invoice_number);
        let today = Utc::now().date_naive();

        let data = self
            .crud_create(
                base,
                &session,
                "Invoice",
                invoice_obj(request, &customer_id, &invoice_number, today),
            )
            .await?;
        let invoice_id = data["id"]
            .as_str()
            .ok_or_else(|| AdapterError::Decode("invoice response missing id".to_string()))?
            .to_string();

        let send_form = vec![
            ("devKey".to_string(), session.dev_key.clone()),
            ("sessionId".to_string(), session.session_id.clone()),
            ("invoiceId".to_string(), invoice_id.clone()),
        ];
        self.call(format!("{base}/SendInvoice.json"), &send_form)
            .await?;
        tracing::debug!(
            invoice_id = %invoice_id,
            tenant_id = %request.tenant_id,
            "bill.com invoice sent"
        );

        Ok(InvoiceReceipt {
            invoice_id,
            invoice_number: Some(
                data["invoiceNumber"]
                    .as_str()
                    .unwrap_or(&invoice_number)
                    .to_string(),
            ),
            // Bill.com exposes no customer-facing URL on the API response.
            public_url: None,
            status: InvoiceStatus::Open,
            amount: request
                .total()
                .map_err(|e| AdapterError::Config(e.to_string()))?,
            currency: request.currency.clone(),
        })
    }

    async fn test_connection(&self, settings: &ProviderSettings) -> Result<(), AdapterError> {
        let base = Self::base_url(settings.environment);
        self.login(base, settings).await.map(|_| ())
    }
}

fn generated_invoice_number() -> String {
    let id = Uuid::now_v7().simple().to_string();
    format!("INV-{}", &id[..8].to_uppercase())
}

fn invoice_obj(
    request: &UnifiedInvoiceRequest,
    customer_id: &str,
    invoice_number: &str,
    today: NaiveDate,
) -> Value {
    let due = request
        .due_date
        .map(|d| d.date_naive())
        .unwrap_or_else(|| today + Days::new(DEFAULT_TERMS_DAYS));
    let line_items: Vec<Value> = request
        .line_items
        .iter()
        .map(|line| {
            json!({
                "entity": "InvoiceLineItem",
                "quantity": line.quantity,
                "price": minor_to_decimal(line.rate),
                "description": match &line.description {
                    Some(detail) => format!("{} ({detail})", line.name),
                    None => line.name.clone(),
                },
                "taxable": line.taxable,
            })
        })
        .collect();

    json!({
        "entity": "Invoice",
        "customerId": customer_id,
        "invoiceNumber": invoice_number,
        "invoiceDate": today.format("%Y-%m-%d").to_string(),
        "dueDate": due.format("%Y-%m-%d").to_string(),
        "invoiceLineItems": line_items,
    })
}

fn parse_envelope(envelope: Value) -> Result<Value, AdapterError> {
    let response_status = envelope["response_status"].as_i64().unwrap_or(1);
    if response_status != 0 {
        let data = &envelope["response_data"];
        return Err(AdapterError::Api {
            message: data["error_message"]
                .as_str()
                .unwrap_or("bill.com call failed")
                .to_string(),
            code: data["error_code"].as_str().map(str::to_string),
            status: None,
        });
    }
    let mut envelope = envelope;
    Ok(envelope["response_data"].take())
}
