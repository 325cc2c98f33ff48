//! Publisher-assertion protocol: bidirectional confirmation, status
//! reporting, withdrawal, and related-business discovery.

mod support;

use registrar::db::search::BusinessSearch;
use registrar::models::{
    BusinessEntity, CompletionStatus, FindQualifiers, KeyedReference, PublisherAssertion,
};
use registrar::Error;
use support::*;

#[tokio::test]
async fn an_assertion_completes_only_when_both_sides_confirm() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let subsidiary = seed_business(state, BOB, business_named("Acme Anvils")).await?;
            let claim = relationship(&acme.business_key, &subsidiary.business_key);

            state.assertions.add_assertions(ALICE, vec![claim.clone()]).await?;

            // One-sided: visible to Alice's status report as to-incomplete,
            // not yet a relationship.
            let items = state.assertions.get_assertion_status_items(ALICE, None).await?;
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].status, CompletionStatus::ToKeyIncomplete);
            let related = state
                .assertions
                .find_related_businesses(&acme.business_key, None, &FindQualifiers::default())
                .await?;
            assert!(related.is_empty());

            state.assertions.add_assertions(BOB, vec![claim]).await?;

            let items = state.assertions.get_assertion_status_items(ALICE, None).await?;
            assert_eq!(items[0].status, CompletionStatus::Complete);
            let related = state
                .assertions
                .find_related_businesses(&acme.business_key, None, &FindQualifiers::default())
                .await?;
            assert_eq!(related, vec![subsidiary.business_key.clone()]);

            // The relationship is symmetric.
            let related = state
                .assertions
                .find_related_businesses(&subsidiary.business_key, None, &FindQualifiers::default())
                .await?;
            assert_eq!(related, vec![acme.business_key]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn related_businesses_include_partners_without_names() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let unnamed = seed_business(state, BOB, BusinessEntity::default()).await?;
            let claim = relationship(&acme.business_key, &unnamed.business_key);

            state.assertions.add_assertions(ALICE, vec![claim.clone()]).await?;
            state.assertions.add_assertions(BOB, vec![claim]).await?;

            // The ordering pass must order a nameless business, not drop it.
            let related = state
                .assertions
                .find_related_businesses(&acme.business_key, None, &FindQualifiers::default())
                .await?;
            assert_eq!(related, vec![unnamed.business_key.clone()]);

            let found = state
                .inquiry
                .find_business(&BusinessSearch::default(), &FindQualifiers::default(), None)
                .await?;
            assert!(found.keys.contains(&unnamed.business_key));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn a_publisher_owning_both_sides_completes_in_one_call() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let parent = seed_business(state, ALICE, business_named("Acme")).await?;
            let child = seed_business(state, ALICE, business_named("Acme Labs")).await?;

            state
                .assertions
                .add_assertions(
                    ALICE,
                    vec![relationship(&parent.business_key, &child.business_key)],
                )
                .await?;

            let items = state.assertions.get_assertion_status_items(ALICE, None).await?;
            assert_eq!(items[0].status, CompletionStatus::Complete);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn withdrawing_a_side_reverts_and_full_withdrawal_purges() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let partner = seed_business(state, BOB, business_named("Globex")).await?;
            let claim = relationship(&acme.business_key, &partner.business_key);

            state.assertions.add_assertions(ALICE, vec![claim.clone()]).await?;
            state.assertions.add_assertions(BOB, vec![claim.clone()]).await?;

            state.assertions.delete_assertions(BOB, vec![claim.clone()]).await?;
            let items = state.assertions.get_assertion_status_items(ALICE, None).await?;
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].status, CompletionStatus::ToKeyIncomplete);

            // The last withdrawal leaves both flags lowered; the row is purged.
            state.assertions.delete_assertions(ALICE, vec![claim]).await?;
            let items = state.assertions.get_assertion_status_items(ALICE, None).await?;
            assert!(items.is_empty());
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn assertions_from_strangers_and_malformed_assertions_are_rejected() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let partner = seed_business(state, BOB, business_named("Globex")).await?;
            let claim = relationship(&acme.business_key, &partner.business_key);

            // A publisher owning neither side cannot assert.
            let result = state
                .assertions
                .add_assertions("publisher-mallory", vec![claim.clone()])
                .await;
            assert!(matches!(result, Err(Error::UserMismatch { .. })));

            // A keyed reference without its tModel key is malformed.
            let bare = PublisherAssertion::new(
                &acme.business_key,
                &partner.business_key,
                KeyedReference::new("parent-child", "parent"),
            );
            let result = state.assertions.add_assertions(ALICE, vec![bare]).await;
            assert!(matches!(result, Err(Error::MalformedAssertion { .. })));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn status_report_filters_by_completion_and_get_returns_own_claims() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let labs = seed_business(state, ALICE, business_named("Acme Labs")).await?;
            let partner = seed_business(state, BOB, business_named("Globex")).await?;

            let internal = relationship(&acme.business_key, &labs.business_key);
            let pending = relationship(&acme.business_key, &partner.business_key);
            state
                .assertions
                .add_assertions(ALICE, vec![internal.clone(), pending.clone()])
                .await?;

            let complete = state
                .assertions
                .get_assertion_status_items(ALICE, Some(CompletionStatus::Complete))
                .await?;
            assert_eq!(complete.len(), 1);
            assert_eq!(complete[0].assertion, internal);

            let incomplete = state
                .assertions
                .get_assertion_status_items(ALICE, Some(CompletionStatus::ToKeyIncomplete))
                .await?;
            assert_eq!(incomplete.len(), 1);
            assert_eq!(incomplete[0].assertion, pending);

            // Bob has raised no flag yet, so his own-assertion list is empty
            // even though one touches his business.
            assert!(state.assertions.get_assertions(BOB).await?.is_empty());
            assert_eq!(state.assertions.get_assertions(ALICE).await?.len(), 2);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn set_replaces_the_callers_assertion_set() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let labs = seed_business(state, ALICE, business_named("Acme Labs")).await?;
            let anvils = seed_business(state, ALICE, business_named("Acme Anvils")).await?;

            state
                .assertions
                .add_assertions(ALICE, vec![relationship(&acme.business_key, &labs.business_key)])
                .await?;

            state
                .assertions
                .set_assertions(
                    ALICE,
                    vec![relationship(&acme.business_key, &anvils.business_key)],
                )
                .await?;

            let assertions = state.assertions.get_assertions(ALICE).await?;
            assert_eq!(assertions.len(), 1);
            assert_eq!(assertions[0].to_key, anvils.business_key);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn related_business_filter_matches_the_relationship_type() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let labs = seed_business(state, ALICE, business_named("Acme Labs")).await?;
            let peer = seed_business(state, ALICE, business_named("Globex")).await?;

            state
                .assertions
                .add_assertions(
                    ALICE,
                    vec![
                        relationship(&acme.business_key, &labs.business_key),
                        PublisherAssertion::new(
                            &acme.business_key,
                            &peer.business_key,
                            KeyedReference::new("peer-peer", "peer")
                                .with_tmodel("uuid:807a2c6a-ee22-470d-adc7-e0424a337c03"),
                        ),
                    ],
                )
                .await?;

            let filter = KeyedReference::new("parent-child", "parent");
            let related = state
                .assertions
                .find_related_businesses(
                    &acme.business_key,
                    Some(&filter),
                    &FindQualifiers::default(),
                )
                .await?;
            assert_eq!(related, vec![labs.business_key]);

            let result = state
                .assertions
                .find_related_businesses("no-such-key", None, &FindQualifiers::default())
                .await;
            assert!(matches!(result, Err(Error::InvalidKey { .. })));
            Ok(())
        })
    })
    .await
}
