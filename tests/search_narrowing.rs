//! Find operations: predicate narrowing, name matching modes, canonical
//! ordering, scoping, and row-limit truncation.

mod support;

use registrar::db::search::{BindingSearch, BusinessSearch, ServiceSearch, TModelSearch};
use registrar::models::{
    DiscoveryUrl, FindQualifiers, KeyedReference, TModelInstanceInfo,
    EXACT_NAME_MATCH, SORT_BY_NAME_DESC,
};
use support::*;

#[tokio::test]
async fn prefix_match_finds_both_acme_businesses_exact_match_one() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let acme = seed_business(state, ALICE, business_named("Acme")).await?;
            let acme_corp = seed_business(state, ALICE, business_named("Acme Corp")).await?;
            seed_business(state, ALICE, business_named("Globex")).await?;

            let criteria = BusinessSearch {
                names: vec!["Acme".to_string()],
                ..Default::default()
            };

            let found = state
                .inquiry
                .find_business(&criteria, &FindQualifiers::default(), None)
                .await?;
            assert_eq!(found.keys, vec![acme.business_key.clone(), acme_corp.business_key]);

            let exact = FindQualifiers::parse(&[EXACT_NAME_MATCH])?;
            let found = state.inquiry.find_business(&criteria, &exact, None).await?;
            assert_eq!(found.keys, vec![acme.business_key]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn predicates_intersect_to_narrow_the_candidate_set() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let mut anvils = business_named("Acme Anvils");
            anvils.categories = vec![KeyedReference::new("naics", "33299")];
            let anvils = seed_business(state, ALICE, anvils).await?;

            let mut rockets = business_named("Acme Rockets");
            rockets.categories = vec![KeyedReference::new("naics", "33641")];
            seed_business(state, ALICE, rockets).await?;

            let mut other = business_named("Globex Anvils");
            other.categories = vec![KeyedReference::new("naics", "33299")];
            seed_business(state, ALICE, other).await?;

            // Category alone matches two, name alone matches two; together, one.
            let criteria = BusinessSearch {
                names: vec!["Acme".to_string()],
                category_bag: vec![KeyedReference::new("naics", "33299")],
                ..Default::default()
            };
            let found = state
                .inquiry
                .find_business(&criteria, &FindQualifiers::default(), None)
                .await?;
            assert_eq!(found.keys, vec![anvils.business_key]);

            // A predicate that matches nothing empties the result regardless
            // of the other criteria.
            let criteria = BusinessSearch {
                names: vec!["Acme".to_string()],
                category_bag: vec![KeyedReference::new("naics", "00000")],
                ..Default::default()
            };
            let found = state
                .inquiry
                .find_business(&criteria, &FindQualifiers::default(), None)
                .await?;
            assert!(found.keys.is_empty());
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn discovery_url_and_identifier_predicates_match() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let mut acme = business_named("Acme");
            acme.discovery_urls = vec![DiscoveryUrl {
                use_type: "homepage".to_string(),
                url: "http://acme.example".to_string(),
            }];
            acme.identifiers = vec![KeyedReference::new("duns", "12-345-6789")];
            let acme = seed_business(state, ALICE, acme).await?;
            seed_business(state, ALICE, business_named("Globex")).await?;

            let found = state
                .inquiry
                .find_business(
                    &BusinessSearch {
                        discovery_urls: vec![DiscoveryUrl {
                            use_type: "homepage".to_string(),
                            url: "http://acme.example".to_string(),
                        }],
                        ..Default::default()
                    },
                    &FindQualifiers::default(),
                    None,
                )
                .await?;
            assert_eq!(found.keys, vec![acme.business_key.clone()]);

            let found = state
                .inquiry
                .find_business(
                    &BusinessSearch {
                        identifier_bag: vec![KeyedReference::new("duns", "12-345-6789")],
                        ..Default::default()
                    },
                    &FindQualifiers::default(),
                    None,
                )
                .await?;
            assert_eq!(found.keys, vec![acme.business_key]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn sort_qualifiers_control_result_order() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let alpha = seed_business(state, ALICE, business_named("Alpha")).await?;
            let beta = seed_business(state, ALICE, business_named("Beta")).await?;

            let criteria = BusinessSearch::default();
            let found = state
                .inquiry
                .find_business(&criteria, &FindQualifiers::default(), None)
                .await?;
            assert_eq!(
                found.keys,
                vec![alpha.business_key.clone(), beta.business_key.clone()]
            );

            let descending = FindQualifiers::parse(&[SORT_BY_NAME_DESC])?;
            let found = state.inquiry.find_business(&criteria, &descending, None).await?;
            assert_eq!(found.keys, vec![beta.business_key, alpha.business_key]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn service_find_respects_the_business_scope() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let mut acme = business_named("Acme");
            acme.services = vec![service_for("", "Catalog")];
            let acme = seed_business(state, ALICE, acme).await?;

            let mut globex = business_named("Globex");
            globex.services = vec![service_for("", "Catalog")];
            let globex = seed_business(state, ALICE, globex).await?;

            let criteria = ServiceSearch {
                business_key: Some(acme.business_key.clone()),
                names: vec!["Catalog".to_string()],
                ..Default::default()
            };
            let found = state
                .inquiry
                .find_service(&criteria, &FindQualifiers::default(), None)
                .await?;
            assert_eq!(found.keys, vec![acme.services[0].service_key.clone()]);

            // Unscoped, both services match.
            let criteria = ServiceSearch {
                names: vec!["Catalog".to_string()],
                ..Default::default()
            };
            let found = state
                .inquiry
                .find_service(&criteria, &FindQualifiers::default(), None)
                .await?;
            assert_eq!(found.keys.len(), 2);
            assert!(found.keys.contains(&globex.services[0].service_key));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn binding_find_narrows_by_technical_fingerprint() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let mut business = business_named("Acme");
            let mut service = service_for("", "Catalog");
            let mut soap = binding_for("", "http://acme.example/soap");
            soap.instance_infos = vec![TModelInstanceInfo {
                tmodel_key: "uuid:soap".to_string(),
                ..Default::default()
            }];
            let mut http = binding_for("", "http://acme.example/http");
            http.instance_infos = vec![TModelInstanceInfo {
                tmodel_key: "uuid:http".to_string(),
                ..Default::default()
            }];
            service.bindings = vec![soap, http];
            business.services = vec![service];
            let saved = seed_business(state, ALICE, business).await?;
            let service_key = saved.services[0].service_key.clone();
            let soap_key = saved.services[0].bindings[0].binding_key.clone();

            let found = state
                .inquiry
                .find_binding(
                    &BindingSearch {
                        service_key: service_key.clone(),
                        tmodel_bag: vec!["uuid:soap".to_string()],
                    },
                    &FindQualifiers::default(),
                    None,
                )
                .await?;
            assert_eq!(found.keys, vec![soap_key]);

            // No fingerprint filter returns every binding of the service.
            let found = state
                .inquiry
                .find_binding(
                    &BindingSearch {
                        service_key,
                        tmodel_bag: vec![],
                    },
                    &FindQualifiers::default(),
                    None,
                )
                .await?;
            assert_eq!(found.keys.len(), 2);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn tmodel_find_matches_identifier_and_category_bags() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let mut tmodel = tmodel_named("acme:catalog-protocol");
            tmodel.categories = vec![KeyedReference::new("uddi-org:types", "specification")];
            let saved = state
                .publish
                .save_tmodel(ALICE, ALICE, vec![tmodel])
                .await?
                .remove(0);
            state
                .publish
                .save_tmodel(ALICE, ALICE, vec![tmodel_named("acme:other")])
                .await?;

            let found = state
                .inquiry
                .find_tmodel(
                    &TModelSearch {
                        name: Some("acme:".to_string()),
                        category_bag: vec![KeyedReference::new("uddi-org:types", "specification")],
                        ..Default::default()
                    },
                    &FindQualifiers::default(),
                    None,
                )
                .await?;
            assert_eq!(found.keys, vec![saved.tmodel_key]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn max_rows_truncates_and_flags_the_result() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let alpha = seed_business(state, ALICE, business_named("Alpha")).await?;
            seed_business(state, ALICE, business_named("Beta")).await?;

            let found = state
                .inquiry
                .find_business(
                    &BusinessSearch::default(),
                    &FindQualifiers::default(),
                    Some(1),
                )
                .await?;
            assert_eq!(found.keys, vec![alpha.business_key]);
            assert!(found.truncated);
            Ok(())
        })
    })
    .await
}
