//! Per-tenant payment configuration and its invariants.
//!
//! All mutations live here as pure state transitions; the
//! [`ConfigService`](crate::service::ConfigService) wraps them with
//! load/persist and optimistic concurrency. After every transition the
//! config re-establishes its invariants (primary never dangles while a
//! routable provider exists, fallback never collides with primary).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use haulpay_core::{DomainError, DomainResult, Environment, ProviderKind, TenantId};

use crate::credentials::ProviderCredentials;

/// Credential bundle plus per-provider switches for one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub enabled: bool,
    /// Set true only after a successful connection test.
    pub connected: bool,
    pub environment: Environment,
    pub credentials: ProviderCredentials,
}

/// Routing preferences for a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub default_provider: ProviderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_provider: Option<ProviderKind>,
    #[serde(default)]
    pub auto_switch_on_failure: bool,
}

/// Per-field preferences update (merge semantics; `None` leaves a field
/// untouched).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PreferencesPatch {
    pub default_provider: Option<ProviderKind>,
    pub fallback_provider: Option<ProviderKind>,
    pub auto_switch_on_failure: Option<bool>,
}

/// One tenant's complete payment-provider configuration.
///
/// Never physically deleted; disabling every provider is the terminal
/// degraded state, not deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantPaymentConfig {
    pub tenant_id: TenantId,
    pub primary_provider: ProviderKind,
    /// Keyed by provider; iteration order is catalog order because
    /// `ProviderKind`'s `Ord` is catalog order.
    pub providers: BTreeMap<ProviderKind, ProviderSettings>,
    pub preferences: Preferences,
    /// Store version for compare-and-swap writes. 0 = never persisted.
    #[serde(default)]
    pub version: u64,
}

impl TenantPaymentConfig {
    /// Bootstrap a config around its first enabled provider.
    pub fn bootstrap(
        tenant_id: TenantId,
        environment: Environment,
        credentials: ProviderCredentials,
    ) -> Self {
        let kind = credentials.kind();
        let mut providers = BTreeMap::new();
        providers.insert(
            kind,
            ProviderSettings {
                enabled: true,
                connected: false,
                environment,
                credentials,
            },
        );
        Self {
            tenant_id,
            primary_provider: kind,
            providers,
            preferences: Preferences {
                default_provider: kind,
                fallback_provider: None,
                auto_switch_on_failure: false,
            },
            version: 0,
        }
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&ProviderSettings> {
        self.providers.get(&kind)
    }

    /// A provider the router may actually send an invoice through.
    pub fn is_usable(&self, kind: ProviderKind) -> bool {
        self.provider(kind)
            .map(|s| s.enabled && s.connected)
            .unwrap_or(false)
    }

    /// Providers that are enabled and connected, in catalog order.
    pub fn active_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::CATALOG
            .into_iter()
            .filter(|kind| self.is_usable(*kind))
            .collect()
    }

    /// Providers that are enabled (connected or not), in catalog order.
    pub fn enabled_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::CATALOG
            .into_iter()
            .filter(|kind| self.provider(*kind).map(|s| s.enabled).unwrap_or(false))
            .collect()
    }

    /// Whether `kind` is the only provider currently enabled and connected.
    pub fn is_last_active(&self, kind: ProviderKind) -> bool {
        self.active_providers() == [kind]
    }

    /// Register (or replace) a provider's credentials.
    ///
    /// The provider starts `enabled` but not `connected`; a connection test
    /// flips `connected` via [`set_connected`](Self::set_connected).
    pub fn enable_provider(
        &mut self,
        environment: Environment,
        credentials: ProviderCredentials,
    ) -> DomainResult<()> {
        credentials.validate()?;
        let kind = credentials.kind();
        self.providers.insert(
            kind,
            ProviderSettings {
                enabled: true,
                connected: false,
                environment,
                credentials,
            },
        );
        self.normalize();
        Ok(())
    }

    pub fn disable_provider(&mut self, kind: ProviderKind) -> DomainResult<()> {
        let settings = self
            .providers
            .get_mut(&kind)
            .ok_or_else(DomainError::not_found)?;
        settings.enabled = false;
        settings.connected = false;
        self.normalize();
        Ok(())
    }

    /// Drop a provider's configuration entirely.
    ///
    /// The "is this the last active provider" guard belongs to the mutation
    /// service; this transition assumes it already passed.
    pub fn remove_provider(&mut self, kind: ProviderKind) -> DomainResult<()> {
        if self.providers.remove(&kind).is_none() {
            return Err(DomainError::not_found());
        }
        if self.preferences.fallback_provider == Some(kind) {
            self.preferences.fallback_provider = None;
            self.preferences.auto_switch_on_failure = false;
        }
        self.normalize();
        Ok(())
    }

    /// Point primary (and the default preference, which travels in
    /// lockstep) at `kind`.
    pub fn set_primary(&mut self, kind: ProviderKind) -> DomainResult<()> {
        if !self.is_usable(kind) {
            return Err(DomainError::invariant(format!(
                "{kind} is not enabled and connected"
            )));
        }
        self.primary_provider = kind;
        self.preferences.default_provider = kind;
        self.reconcile_fallback();
        Ok(())
    }

    /// Record a connection-test outcome.
    pub fn set_connected(&mut self, kind: ProviderKind, connected: bool) -> DomainResult<()> {
        let settings = self
            .providers
            .get_mut(&kind)
            .ok_or_else(DomainError::not_found)?;
        if connected && !settings.enabled {
            return Err(DomainError::invariant(
                "cannot mark a disabled provider connected",
            ));
        }
        settings.connected = connected;
        self.normalize();
        Ok(())
    }

    /// Merge a preferences patch, then re-validate consistency.
    pub fn merge_preferences(&mut self, patch: PreferencesPatch) -> DomainResult<()> {
        if let Some(kind) = patch.default_provider {
            if !self.providers.contains_key(&kind) {
                return Err(DomainError::validation(format!(
                    "{kind} is not configured for this tenant"
                )));
            }
            self.preferences.default_provider = kind;
        }
        if let Some(kind) = patch.fallback_provider {
            if !self.providers.contains_key(&kind) {
                return Err(DomainError::validation(format!(
                    "{kind} is not configured for this tenant"
                )));
            }
            self.preferences.fallback_provider = Some(kind);
        }
        if let Some(auto) = patch.auto_switch_on_failure {
            self.preferences.auto_switch_on_failure = auto;
        }
        self.validate_preferences()
    }

    /// Full structural validation; runs before every persist.
    pub fn validate(&self) -> DomainResult<()> {
        for (kind, settings) in &self.providers {
            let creds_kind = settings.credentials.kind();
            if creds_kind != *kind {
                return Err(DomainError::invariant(format!(
                    "credentials stored under {kind} belong to {creds_kind}"
                )));
            }
            settings.credentials.validate()?;
            if settings.connected && !settings.enabled {
                return Err(DomainError::invariant(format!(
                    "{kind} is connected but not enabled"
                )));
            }
        }
        if !self.pointer_is_routable(self.primary_provider) {
            return Err(DomainError::invariant(
                "primary provider is not enabled and connected",
            ));
        }
        if !self.pointer_is_routable(self.preferences.default_provider) {
            return Err(DomainError::invariant(
                "default provider is not enabled and connected",
            ));
        }
        self.validate_preferences()
    }

    /// Primary/default invariant: the pointer must be usable, unless the
    /// tenant has no usable provider at all; then an enabled one is
    /// acceptable, and with nothing enabled any configured pointer is
    /// (degraded state).
    fn pointer_is_routable(&self, kind: ProviderKind) -> bool {
        if self.is_usable(kind) {
            return true;
        }
        let enabled = self.enabled_providers();
        if self.active_providers().is_empty() && enabled.contains(&kind) {
            return true;
        }
        enabled.is_empty()
    }

    fn validate_preferences(&self) -> DomainResult<()> {
        if self.preferences.auto_switch_on_failure {
            match self.preferences.fallback_provider {
                None => {
                    return Err(DomainError::invariant(
                        "auto_switch_on_failure requires a fallback provider",
                    ));
                }
                Some(fallback) if fallback == self.primary_provider => {
                    return Err(DomainError::invariant(
                        "fallback provider must differ from the primary provider",
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Re-establish the primary/fallback invariants after a transition.
    fn normalize(&mut self) {
        if !self.pointer_is_routable(self.primary_provider)
            || !self.pointer_is_routable(self.preferences.default_provider)
        {
            self.reassign_primary();
        }
        self.reconcile_fallback();
    }

    /// Pick a replacement primary: first active provider in catalog order,
    /// falling back to the first merely-enabled one. With nothing enabled
    /// the old pointer is kept (degraded state).
    fn reassign_primary(&mut self) {
        let replacement = self
            .active_providers()
            .first()
            .copied()
            .or_else(|| self.enabled_providers().first().copied());
        if let Some(kind) = replacement {
            self.primary_provider = kind;
            self.preferences.default_provider = kind;
        }
    }

    /// A fallback colliding with primary, or pointing at a provider that is
    /// no longer configured, is cleared along with auto-switch.
    fn reconcile_fallback(&mut self) {
        match self.preferences.fallback_provider {
            Some(fallback)
                if fallback == self.primary_provider
                    || !self.providers.contains_key(&fallback) =>
            {
                self.preferences.fallback_provider = None;
                self.preferences.auto_switch_on_failure = false;
            }
            None => self.preferences.auto_switch_on_failure = false,
            Some(_) => {}
        }
    }
}
