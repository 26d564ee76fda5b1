//! Unified invoice request/response shapes.
//!
//! Every processor consumes and produces these; adapters translate to each
//! provider's native schema. All monetary fields are carried in minor units
//! (cents); adapters own the conversion where a processor wants decimals.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::TenantId;
use crate::provider::ProviderKind;

/// Customer identity carried on an invoice request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Provider-side customer reference, when the caller already holds one.
    /// Processors that require a pre-existing customer object use this
    /// instead of creating a new customer per invoice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: u32,
    /// Unit rate in minor units.
    pub rate: u64,
    /// Line total in minor units; must equal `quantity * rate`.
    pub amount: u64,
    #[serde(default)]
    pub taxable: bool,
}

/// Free-form field forwarded to processors that support custom fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub label: String,
    pub value: String,
}

/// Provider-agnostic invoice creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedInvoiceRequest {
    pub tenant_id: TenantId,
    /// Explicit processor override; `None` means "use the tenant default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderKind>,
    pub customer: Customer,
    pub line_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomField>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl UnifiedInvoiceRequest {
    /// Validate the request before it is allowed anywhere near a processor.
    ///
    /// Line-item integrity is enforced: `amount` must equal
    /// `quantity * rate`. A mismatch indicates caller corruption and is
    /// rejected rather than forwarded.
    pub fn validate(&self) -> DomainResult<()> {
        if self.customer.name.trim().is_empty() {
            return Err(DomainError::validation("customer name is required"));
        }
        if self.customer.email.trim().is_empty() || !self.customer.email.contains('@') {
            return Err(DomainError::validation(
                "customer email is required and must be an address",
            ));
        }
        if self.line_items.is_empty() {
            return Err(DomainError::validation(
                "invoice must have at least one line item",
            ));
        }
        for (idx, line) in self.line_items.iter().enumerate() {
            let line_no = idx + 1;
            if line.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "line {line_no}: name is required"
                )));
            }
            if line.quantity == 0 {
                return Err(DomainError::validation(format!(
                    "line {line_no}: quantity must be positive"
                )));
            }
            if line.rate == 0 {
                return Err(DomainError::validation(format!(
                    "line {line_no}: rate must be positive"
                )));
            }
            let expected = u64::from(line.quantity)
                .checked_mul(line.rate)
                .ok_or_else(|| {
                    DomainError::invariant(format!("line {line_no}: amount overflow"))
                })?;
            if line.amount != expected {
                return Err(DomainError::validation(format!(
                    "line {line_no}: amount {} does not equal quantity * rate ({expected})",
                    line.amount
                )));
            }
        }
        self.total()?;
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::validation(
                "currency must be a three-letter ISO 4217 code",
            ));
        }
        Ok(())
    }

    /// Invoice total in minor units.
    pub fn total(&self) -> DomainResult<u64> {
        let mut total: u64 = 0;
        for line in &self.line_items {
            total = total
                .checked_add(line.amount)
                .ok_or_else(|| DomainError::invariant("invoice total overflow"))?;
        }
        Ok(total)
    }
}

/// Normalized invoice lifecycle status across processors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Open,
    Paid,
    Canceled,
    Unknown,
}

/// Normalized result of a successful invoice creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceReceipt {
    /// Provider-assigned invoice id.
    pub invoice_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    pub status: InvoiceStatus,
    /// Invoice total in minor units, as confirmed by the processor.
    pub amount: u64,
    pub currency: String,
}
