//! End-to-end dispatch: operations travel as tagged envelopes and resolve
//! against the registry.

mod support;

use registrar::api::{dispatch, Publisher, Request, Response};
use registrar::Error;
use support::*;

fn alice() -> Publisher {
    Publisher {
        publisher_id: ALICE.to_string(),
        authorized_name: "Alice".to_string(),
    }
}

#[tokio::test]
async fn save_then_find_through_the_envelope() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let response = dispatch(
                state,
                &alice(),
                Request::SaveBusiness {
                    businesses: vec![business_named("Acme")],
                },
            )
            .await?;
            let Response::SavedBusinesses { businesses } = response else {
                anyhow::bail!("unexpected response variant");
            };
            let key = businesses[0].business_key.clone();

            let request: Request = serde_json::from_str(
                r#"{"operation": "findBusiness", "names": ["Acme"]}"#,
            )?;
            let response = dispatch(state, &alice(), request).await?;
            let Response::BusinessList(list) = response else {
                anyhow::bail!("unexpected response variant");
            };
            assert_eq!(list.keys, vec![key]);
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn invalid_qualifiers_and_statuses_fail_before_touching_the_store() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let result = dispatch(
                state,
                &alice(),
                Request::FindBusiness {
                    criteria: Default::default(),
                    find_qualifiers: vec!["caseSensitiveMatch".to_string()],
                    max_rows: None,
                },
            )
            .await;
            assert!(matches!(result, Err(Error::UnsupportedQualifiers(_))));

            let result = dispatch(
                state,
                &alice(),
                Request::GetAssertionStatusReport {
                    completion_status: Some("status:bogus".to_string()),
                },
            )
            .await;
            assert!(matches!(result, Err(Error::UnsupportedQualifiers(_))));
            Ok(())
        })
    })
    .await
}

#[tokio::test]
async fn delete_operations_acknowledge_with_success() -> anyhow::Result<()> {
    with_registry(|state| {
        Box::pin(async move {
            let saved = seed_business(state, ALICE, business_named("Acme")).await?;
            let response = dispatch(
                state,
                &alice(),
                Request::DeleteBusiness {
                    business_keys: vec![saved.business_key],
                },
            )
            .await?;
            assert!(matches!(response, Response::Success));
            Ok(())
        })
    })
    .await
}
