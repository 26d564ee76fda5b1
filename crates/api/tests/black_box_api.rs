//! Black-box tests against the real router stack: in-memory config store,
//! mock provider adapters, ephemeral-port server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;

use haulpay_api::app::services::build_services_with;
use haulpay_config::ProviderSettings;
use haulpay_core::{InvoiceReceipt, InvoiceStatus, ProviderKind, UnifiedInvoiceRequest};
use haulpay_infra::InMemoryConfigStore;
use haulpay_providers::{AdapterError, AdapterRegistry, ProviderAdapter};

struct MockAdapter {
    kind: ProviderKind,
    fail_invoices: AtomicBool,
    fail_tests: AtomicBool,
    invoice_calls: AtomicUsize,
}

impl MockAdapter {
    fn new(kind: ProviderKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fail_invoices: AtomicBool::new(false),
            fail_tests: AtomicBool::new(false),
            invoice_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn create_invoice(
        &self,
        request: &UnifiedInvoiceRequest,
        _settings: &ProviderSettings,
    ) -> Result<InvoiceReceipt, AdapterError> {
        self.invoice_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_invoices.load(Ordering::SeqCst) {
            return Err(AdapterError::Api {
                message: "processor rejected the invoice".to_string(),
                code: Some("E_REJECTED".to_string()),
                status: Some(500),
            });
        }
        Ok(InvoiceReceipt {
            invoice_id: format!("{}-inv-42", self.kind),
            invoice_number: Some("1042".to_string()),
            public_url: Some(format!("https://pay.example/{}/1042", self.kind)),
            status: InvoiceStatus::Open,
            amount: request.total().unwrap(),
            currency: request.currency.clone(),
        })
    }

    async fn test_connection(&self, _settings: &ProviderSettings) -> Result<(), AdapterError> {
        if self.fail_tests.load(Ordering::SeqCst) {
            return Err(AdapterError::Api {
                message: "invalid credentials".to_string(),
                code: Some("401".to_string()),
                status: Some(401),
            });
        }
        Ok(())
    }
}

struct TestServer {
    base_url: String,
    square: Arc<MockAdapter>,
    billcom: Arc<MockAdapter>,
    stripe: Arc<MockAdapter>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let square = MockAdapter::new(ProviderKind::Square);
        let billcom = MockAdapter::new(ProviderKind::Billcom);
        let stripe = MockAdapter::new(ProviderKind::Stripe);

        let mut registry = AdapterRegistry::new();
        registry.insert(square.clone());
        registry.insert(billcom.clone());
        registry.insert(stripe.clone());

        let services = Arc::new(build_services_with(
            Arc::new(InMemoryConfigStore::new()),
            registry,
            Duration::from_secs(5),
        ));
        let app = haulpay_api::app::build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            square,
            billcom,
            stripe,
            handle,
        }
    }

    async fn enable_and_connect(
        &self,
        client: &reqwest::Client,
        provider: &str,
        credentials: serde_json::Value,
    ) {
        let res = client
            .post(format!(
                "{}/tenants/acme-logistics/providers/{provider}",
                self.base_url
            ))
            .json(&json!({"environment": "sandbox", "credentials": credentials}))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = client
            .post(format!(
                "{}/tenants/acme-logistics/providers/{provider}/test",
                self.base_url
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn square_credentials() -> serde_json::Value {
    json!({"application_id": "sq-app", "access_token": "sq-token", "location_id": "sq-loc"})
}

fn billcom_credentials() -> serde_json::Value {
    json!({"username": "ops@acme.example", "password": "hunter2", "org_id": "org-1", "dev_key": "dev-1"})
}

fn invoice_body() -> serde_json::Value {
    json!({
        "customer": {"name": "Acme Shippers", "email": "billing@acme.example"},
        "line_items": [
            {"name": "Linehaul CHI-DAL", "quantity": 1, "rate": 250000, "amount": 250000}
        ]
    })
}

#[tokio::test]
async fn health_and_catalog_are_public() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/providers", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let providers = body["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 4);
    assert_eq!(providers[0]["name"], "square");
    assert_eq!(providers[1]["display_name"], "Bill.com");
}

#[tokio::test]
async fn unknown_tenant_is_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/tenants/nowhere-freight/config", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "config_not_found");
}

#[tokio::test]
async fn enable_redacts_credentials_and_connects_after_test() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!(
            "{}/tenants/acme-logistics/providers/stripe",
            srv.base_url
        ))
        .json(&json!({"environment": "sandbox", "credentials": {"secret_key": "sk_test_abc"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let raw = res.text().await.unwrap();
    assert!(
        !raw.contains("sk_test_abc"),
        "credentials must not cross the HTTP boundary: {raw}"
    );
    let body: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(body["config"]["providers"]["stripe"]["enabled"], true);
    assert_eq!(body["config"]["providers"]["stripe"]["connected"], false);

    // not active until a connection test passes
    let res = client
        .get(format!(
            "{}/tenants/acme-logistics/active-providers",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["active_providers"], json!([]));

    let res = client
        .post(format!(
            "{}/tenants/acme-logistics/providers/stripe/test",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!(
            "{}/tenants/acme-logistics/active-providers",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["active_providers"], json!(["stripe"]));
}

#[tokio::test]
async fn failed_connection_test_demotes_the_provider() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.enable_and_connect(&client, "stripe", json!({"secret_key": "sk_test_abc"}))
        .await;

    srv.stripe.fail_tests.store(true, Ordering::SeqCst);
    let res = client
        .post(format!(
            "{}/tenants/acme-logistics/providers/stripe/test",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "connection_test_failed");

    let res = client
        .get(format!("{}/tenants/acme-logistics/config", srv.base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["config"]["providers"]["stripe"]["connected"], false);
}

#[tokio::test]
async fn invoice_happy_path() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.enable_and_connect(&client, "stripe", json!({"secret_key": "sk_test_abc"}))
        .await;

    let res = client
        .post(format!("{}/tenants/acme-logistics/invoices", srv.base_url))
        .json(&invoice_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["provider"], "stripe");
    assert_eq!(body["amount"], 250_000);
    assert_eq!(body["status"], "open");
}

#[tokio::test]
async fn empty_line_items_fail_validation_without_an_adapter_call() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.enable_and_connect(&client, "stripe", json!({"secret_key": "sk_test_abc"}))
        .await;

    let res = client
        .post(format!("{}/tenants/acme-logistics/invoices", srv.base_url))
        .json(&json!({
            "customer": {"name": "Acme Shippers", "email": "billing@acme.example"},
            "line_items": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_request");
    assert_eq!(srv.stripe.invoice_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_primary_fails_over_to_the_configured_fallback() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.enable_and_connect(&client, "square", square_credentials())
        .await;
    srv.enable_and_connect(&client, "billcom", billcom_credentials())
        .await;

    let res = client
        .put(format!(
            "{}/tenants/acme-logistics/primary-provider",
            srv.base_url
        ))
        .json(&json!({"provider": "square"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .patch(format!(
            "{}/tenants/acme-logistics/preferences",
            srv.base_url
        ))
        .json(&json!({"fallback_provider": "billcom", "auto_switch_on_failure": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    srv.square.fail_invoices.store(true, Ordering::SeqCst);

    let res = client
        .post(format!("{}/tenants/acme-logistics/invoices", srv.base_url))
        .json(&invoice_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["provider"], "billcom");
    assert_eq!(body["amount"], 250_000);
    assert_eq!(srv.square.invoice_calls.load(Ordering::SeqCst), 1);
    assert_eq!(srv.billcom.invoice_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn provider_failure_without_fallback_preserves_the_error() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.enable_and_connect(&client, "stripe", json!({"secret_key": "sk_test_abc"}))
        .await;

    srv.stripe.fail_invoices.store(true, Ordering::SeqCst);
    let res = client
        .post(format!("{}/tenants/acme-logistics/invoices", srv.base_url))
        .json(&invoice_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "provider_call_failed");
    assert_eq!(body["provider"], "stripe");
    assert_eq!(body["error_code"], "E_REJECTED");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("processor rejected the invoice")
    );
}

#[tokio::test]
async fn disabling_the_primary_reassigns_and_removal_guards_the_last_active() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    srv.enable_and_connect(&client, "square", square_credentials())
        .await;
    srv.enable_and_connect(&client, "billcom", billcom_credentials())
        .await;

    let res = client
        .post(format!(
            "{}/tenants/acme-logistics/providers/square/disable",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["config"]["primary_provider"], "billcom");
    assert_eq!(
        body["config"]["preferences"]["default_provider"],
        "billcom"
    );

    // billcom is now the last active provider; deleting it is rejected
    let res = client
        .delete(format!(
            "{}/tenants/acme-logistics/providers/billcom",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "cannot_remove_last_provider");

    // the disabled square entry can still be removed outright
    let res = client
        .delete(format!(
            "{}/tenants/acme-logistics/providers/square",
            srv.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["config"]["providers"]["square"].is_null());
}

#[tokio::test]
async fn unknown_provider_in_path_is_404() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!(
            "{}/tenants/acme-logistics/providers/paypal",
            srv.base_url
        ))
        .json(&json!({"environment": "sandbox", "credentials": {}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unknown_provider");
}
