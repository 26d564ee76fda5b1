//! Supported payment processors.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A supported payment processor.
///
/// Declaration order is catalog order; `Ord` derives from it, so ordered
/// collections keyed by `ProviderKind` iterate in catalog order.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Square,
    Billcom,
    Quickbooks,
    Stripe,
}

impl ProviderKind {
    /// Catalog order. Also the deterministic ordering used when picking a
    /// replacement primary provider.
    pub const CATALOG: [ProviderKind; 4] = [
        ProviderKind::Square,
        ProviderKind::Billcom,
        ProviderKind::Quickbooks,
        ProviderKind::Stripe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Square => "square",
            ProviderKind::Billcom => "billcom",
            ProviderKind::Quickbooks => "quickbooks",
            ProviderKind::Stripe => "stripe",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Square => "Square",
            ProviderKind::Billcom => "Bill.com",
            ProviderKind::Quickbooks => "QuickBooks",
            ProviderKind::Stripe => "Stripe",
        }
    }
}

impl core::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "square" => Ok(ProviderKind::Square),
            "billcom" | "bill.com" => Ok(ProviderKind::Billcom),
            "quickbooks" => Ok(ProviderKind::Quickbooks),
            "stripe" => Ok(ProviderKind::Stripe),
            other => Err(DomainError::validation(format!(
                "unknown payment provider: {other}"
            ))),
        }
    }
}

/// Which provider environment a tenant's credentials target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

impl core::fmt::Display for Environment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(Environment::Sandbox),
            "production" => Ok(Environment::Production),
            other => Err(DomainError::validation(format!(
                "environment must be sandbox or production, got {other}"
            ))),
        }
    }
}
