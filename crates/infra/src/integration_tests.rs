//! Service-level tests: the configuration mutation API driving the
//! in-memory store end to end.

use std::sync::Arc;

use haulpay_config::{
    ConfigError, ConfigService, ConfigStore, ConfigStoreError, PreferencesPatch,
    ProviderCredentials,
};
use haulpay_core::{Environment, ExpectedVersion, ProviderKind, TenantId};

use crate::config_store::InMemoryConfigStore;

fn tenant() -> TenantId {
    TenantId::new("acme-logistics").unwrap()
}

fn creds_for(kind: ProviderKind) -> ProviderCredentials {
    match kind {
        ProviderKind::Square => ProviderCredentials::Square {
            application_id: "sq-app".to_string(),
            access_token: "sq-token".to_string(),
            location_id: "sq-loc".to_string(),
        },
        ProviderKind::Billcom => ProviderCredentials::Billcom {
            username: "ops@acme.example".to_string(),
            password: "hunter2".to_string(),
            org_id: "org-1".to_string(),
            dev_key: "dev-1".to_string(),
        },
        ProviderKind::Quickbooks => ProviderCredentials::Quickbooks {
            client_id: "qb-client".to_string(),
            client_secret: "qb-secret".to_string(),
            realm_id: "realm-9".to_string(),
            access_token: "qb-token".to_string(),
            refresh_token: None,
        },
        ProviderKind::Stripe => ProviderCredentials::Stripe {
            secret_key: "sk_test_abc".to_string(),
            publishable_key: None,
        },
    }
}

fn service() -> (ConfigService, Arc<InMemoryConfigStore>) {
    let store = Arc::new(InMemoryConfigStore::new());
    (ConfigService::new(store.clone()), store)
}

async fn enable_and_connect(service: &ConfigService, kind: ProviderKind) {
    service
        .enable_provider(&tenant(), Environment::Sandbox, creds_for(kind))
        .await
        .unwrap();
    service
        .record_connection_status(&tenant(), kind, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn enable_bootstraps_the_tenant_config() {
    let (service, _store) = service();
    let config = service
        .enable_provider(
            &tenant(),
            Environment::Sandbox,
            creds_for(ProviderKind::Square),
        )
        .await
        .unwrap();

    assert_eq!(config.primary_provider, ProviderKind::Square);
    assert_eq!(config.version, 1);
    let settings = config.provider(ProviderKind::Square).unwrap();
    assert!(settings.enabled);
    assert!(!settings.connected);
}

#[tokio::test]
async fn enable_then_successful_test_makes_the_provider_active() {
    let (service, _store) = service();
    service
        .enable_provider(
            &tenant(),
            Environment::Sandbox,
            creds_for(ProviderKind::Stripe),
        )
        .await
        .unwrap();
    assert!(service.active_providers(&tenant()).await.unwrap().is_empty());

    service
        .record_connection_status(&tenant(), ProviderKind::Stripe, true)
        .await
        .unwrap();
    assert_eq!(
        service.active_providers(&tenant()).await.unwrap(),
        vec![ProviderKind::Stripe]
    );
}

#[tokio::test]
async fn disabling_the_primary_reassigns_it_in_one_write() {
    let (service, store) = service();
    enable_and_connect(&service, ProviderKind::Square).await;
    enable_and_connect(&service, ProviderKind::Billcom).await;
    service
        .set_primary_provider(&tenant(), ProviderKind::Square)
        .await
        .unwrap();

    let updated = service
        .disable_provider(&tenant(), ProviderKind::Square)
        .await
        .unwrap();
    assert_eq!(updated.primary_provider, ProviderKind::Billcom);
    assert_eq!(updated.preferences.default_provider, ProviderKind::Billcom);

    // the stored record is the same document the mutation returned;
    // a concurrent reader sees either the old config or this one
    let stored = store.get(&tenant()).await.unwrap().unwrap();
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn disable_may_leave_zero_active_providers() {
    let (service, _store) = service();
    enable_and_connect(&service, ProviderKind::Square).await;

    let updated = service
        .disable_provider(&tenant(), ProviderKind::Square)
        .await
        .unwrap();
    assert!(updated.active_providers().is_empty());
    assert!(updated.validate().is_ok());
}

#[tokio::test]
async fn removing_the_last_active_provider_is_rejected() {
    let (service, _store) = service();
    enable_and_connect(&service, ProviderKind::Square).await;

    let err = service
        .remove_provider(&tenant(), ProviderKind::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::CannotRemoveLastProvider));

    // still present and active
    assert_eq!(
        service.active_providers(&tenant()).await.unwrap(),
        vec![ProviderKind::Square]
    );
}

#[tokio::test]
async fn removing_a_non_last_provider_reassigns_primary() {
    let (service, _store) = service();
    enable_and_connect(&service, ProviderKind::Square).await;
    enable_and_connect(&service, ProviderKind::Stripe).await;
    service
        .set_primary_provider(&tenant(), ProviderKind::Square)
        .await
        .unwrap();

    let updated = service
        .remove_provider(&tenant(), ProviderKind::Square)
        .await
        .unwrap();
    assert!(updated.provider(ProviderKind::Square).is_none());
    assert_eq!(updated.primary_provider, ProviderKind::Stripe);
}

#[tokio::test]
async fn set_primary_rejects_a_provider_that_never_connected() {
    let (service, _store) = service();
    enable_and_connect(&service, ProviderKind::Square).await;
    service
        .enable_provider(
            &tenant(),
            Environment::Sandbox,
            creds_for(ProviderKind::Billcom),
        )
        .await
        .unwrap();

    let err = service
        .set_primary_provider(&tenant(), ProviderKind::Billcom)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::Domain(_)));
}

#[tokio::test]
async fn preferences_merge_revalidates_the_fallback_invariant() {
    let (service, _store) = service();
    enable_and_connect(&service, ProviderKind::Square).await;
    enable_and_connect(&service, ProviderKind::Billcom).await;

    // fallback == primary is rejected
    let err = service
        .update_preferences(
            &tenant(),
            PreferencesPatch {
                fallback_provider: Some(ProviderKind::Square),
                auto_switch_on_failure: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::Domain(_)));

    let updated = service
        .update_preferences(
            &tenant(),
            PreferencesPatch {
                fallback_provider: Some(ProviderKind::Billcom),
                auto_switch_on_failure: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        updated.preferences.fallback_provider,
        Some(ProviderKind::Billcom)
    );
    assert!(updated.preferences.auto_switch_on_failure);
}

#[tokio::test]
async fn mutations_on_unknown_tenants_or_providers_are_not_found() {
    let (service, _store) = service();

    let err = service
        .disable_provider(&tenant(), ProviderKind::Square)
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));

    enable_and_connect(&service, ProviderKind::Square).await;
    let err = service
        .disable_provider(&tenant(), ProviderKind::Quickbooks)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ProviderNotConfigured(ProviderKind::Quickbooks)
    ));
}

#[tokio::test]
async fn a_lost_write_race_surfaces_as_a_conflict() {
    let (service, store) = service();
    enable_and_connect(&service, ProviderKind::Square).await;

    // another writer commits against the same version the snapshot carries
    let snapshot = store.get(&tenant()).await.unwrap().unwrap();
    store
        .put(snapshot.clone(), ExpectedVersion::Exact(snapshot.version))
        .await
        .unwrap();

    let err = store
        .put(snapshot.clone(), ExpectedVersion::Exact(snapshot.version))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigStoreError::Conflict(_)));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Enable(ProviderKind),
        Disable(ProviderKind),
        Remove(ProviderKind),
        SetPrimary(ProviderKind),
        Record(ProviderKind, bool),
    }

    fn kind_strategy() -> impl Strategy<Value = ProviderKind> {
        prop::sample::select(ProviderKind::CATALOG.to_vec())
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            kind_strategy().prop_map(Op::Enable),
            kind_strategy().prop_map(Op::Disable),
            kind_strategy().prop_map(Op::Remove),
            kind_strategy().prop_map(Op::SetPrimary),
            (kind_strategy(), any::<bool>()).prop_map(|(k, c)| Op::Record(k, c)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]
        #[test]
        fn primary_stays_routable_through_any_mutation_sequence(
            ops in prop::collection::vec(op_strategy(), 1..16)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let (service, store) = service();
                for op in ops {
                    // rejected mutations must leave the stored config valid
                    let _ = match op {
                        Op::Enable(kind) => {
                            service
                                .enable_provider(&tenant(), Environment::Sandbox, creds_for(kind))
                                .await
                        }
                        Op::Disable(kind) => service.disable_provider(&tenant(), kind).await,
                        Op::Remove(kind) => service.remove_provider(&tenant(), kind).await,
                        Op::SetPrimary(kind) => {
                            service.set_primary_provider(&tenant(), kind).await
                        }
                        Op::Record(kind, connected) => {
                            service
                                .record_connection_status(&tenant(), kind, connected)
                                .await
                        }
                    };

                    if let Some(config) = store.get(&tenant()).await.unwrap() {
                        let enabled = config.enabled_providers();
                        if !enabled.is_empty() {
                            prop_assert!(
                                enabled.contains(&config.primary_provider),
                                "primary {} dangles; enabled: {enabled:?}",
                                config.primary_provider
                            );
                        }
                        prop_assert!(config.validate().is_ok());
                    }
                }
                Ok(())
            })?;
        }
    }
}
