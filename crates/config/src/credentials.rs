//! Provider credential bundles.
//!
//! Modeled as a sum type keyed by provider, each variant carrying exactly
//! the fields that processor's adapter requires; a missing field is caught
//! at the configuration boundary instead of mid-call inside an adapter.

use serde::{Deserialize, Serialize};

use haulpay_core::{DomainError, DomainResult, ProviderKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderCredentials {
    Square {
        application_id: String,
        access_token: String,
        location_id: String,
    },
    Billcom {
        username: String,
        password: String,
        org_id: String,
        dev_key: String,
    },
    Quickbooks {
        client_id: String,
        client_secret: String,
        realm_id: String,
        access_token: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        refresh_token: Option<String>,
    },
    Stripe {
        secret_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        publishable_key: Option<String>,
    },
}

impl ProviderCredentials {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderCredentials::Square { .. } => ProviderKind::Square,
            ProviderCredentials::Billcom { .. } => ProviderKind::Billcom,
            ProviderCredentials::Quickbooks { .. } => ProviderKind::Quickbooks,
            ProviderCredentials::Stripe { .. } => ProviderKind::Stripe,
        }
    }

    /// Fail fast on blank required fields.
    ///
    /// Runs on every configuration write, so an adapter can assume the
    /// required fields of its variant are present and non-blank.
    pub fn validate(&self) -> DomainResult<()> {
        match self {
            ProviderCredentials::Square {
                application_id,
                access_token,
                location_id,
            } => {
                require("square.application_id", application_id)?;
                require("square.access_token", access_token)?;
                require("square.location_id", location_id)
            }
            ProviderCredentials::Billcom {
                username,
                password,
                org_id,
                dev_key,
            } => {
                require("billcom.username", username)?;
                require("billcom.password", password)?;
                require("billcom.org_id", org_id)?;
                require("billcom.dev_key", dev_key)
            }
            ProviderCredentials::Quickbooks {
                client_id,
                client_secret,
                realm_id,
                access_token,
                refresh_token: _,
            } => {
                require("quickbooks.client_id", client_id)?;
                require("quickbooks.client_secret", client_secret)?;
                require("quickbooks.realm_id", realm_id)?;
                require("quickbooks.access_token", access_token)
            }
            ProviderCredentials::Stripe {
                secret_key,
                publishable_key: _,
            } => require("stripe.secret_key", secret_key),
        }
    }
}

fn require(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!(
            "missing required credential field: {field}"
        )));
    }
    Ok(())
}
