//! Static catalog of supported processors and their feature coverage.
//!
//! Loaded once per process, never mutated. Tenant configuration references
//! catalog entries by [`ProviderKind`].

use serde::Serialize;

use crate::provider::ProviderKind;

/// Feature areas a processor integration may cover.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Invoicing,
    Payments,
    Subscriptions,
    Customers,
    Reporting,
}

/// One feature entry in a catalog descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct SupportedFeature {
    #[serde(rename = "type")]
    pub feature: FeatureKind,
    pub available: bool,
}

/// Catalog entry for a supported processor. Static, not tenant-specific.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub name: ProviderKind,
    pub display_name: &'static str,
    pub supported_features: &'static [SupportedFeature],
}

const fn feature(feature: FeatureKind, available: bool) -> SupportedFeature {
    SupportedFeature { feature, available }
}

static SQUARE_FEATURES: [SupportedFeature; 5] = [
    feature(FeatureKind::Invoicing, true),
    feature(FeatureKind::Payments, true),
    feature(FeatureKind::Subscriptions, false),
    feature(FeatureKind::Customers, true),
    feature(FeatureKind::Reporting, true),
];

static BILLCOM_FEATURES: [SupportedFeature; 5] = [
    feature(FeatureKind::Invoicing, true),
    feature(FeatureKind::Payments, true),
    feature(FeatureKind::Subscriptions, false),
    feature(FeatureKind::Customers, true),
    feature(FeatureKind::Reporting, false),
];

static QUICKBOOKS_FEATURES: [SupportedFeature; 5] = [
    feature(FeatureKind::Invoicing, true),
    feature(FeatureKind::Payments, true),
    feature(FeatureKind::Subscriptions, false),
    feature(FeatureKind::Customers, true),
    feature(FeatureKind::Reporting, true),
];

static STRIPE_FEATURES: [SupportedFeature; 5] = [
    feature(FeatureKind::Invoicing, true),
    feature(FeatureKind::Payments, true),
    feature(FeatureKind::Subscriptions, true),
    feature(FeatureKind::Customers, true),
    feature(FeatureKind::Reporting, true),
];

static CATALOG: [ProviderDescriptor; 4] = [
    ProviderDescriptor {
        name: ProviderKind::Square,
        display_name: "Square",
        supported_features: &SQUARE_FEATURES,
    },
    ProviderDescriptor {
        name: ProviderKind::Billcom,
        display_name: "Bill.com",
        supported_features: &BILLCOM_FEATURES,
    },
    ProviderDescriptor {
        name: ProviderKind::Quickbooks,
        display_name: "QuickBooks",
        supported_features: &QUICKBOOKS_FEATURES,
    },
    ProviderDescriptor {
        name: ProviderKind::Stripe,
        display_name: "Stripe",
        supported_features: &STRIPE_FEATURES,
    },
];

/// The full provider catalog, in catalog order.
pub fn catalog() -> &'static [ProviderDescriptor] {
    &CATALOG
}
