//! Shared harness for registry integration tests.
//!
//! Tests run against a real PostgreSQL database named by `TEST_DATABASE_URL`
//! (or `REGISTRAR__DATABASE__TEST_DATABASE_URL`). When neither is set, every
//! test skips with a note instead of failing, so the unit suite stays green
//! on machines without a database. Tests share one database, so the harness
//! serializes them and truncates all tables before each run.

#![allow(dead_code)]

use futures::future::BoxFuture;
use sqlx::PgPool;
use tokio::sync::Mutex;

use registrar::config::{Config, DatabaseConfig, LoggingConfig, RegistryConfig};
use registrar::models::{
    BindingTarget, BindingTemplate, BusinessEntity, BusinessService, KeyedReference, Name,
    PublisherAssertion, TModel,
};
use registrar::state::RegistryState;

pub const ALICE: &str = "publisher-alice";
pub const BOB: &str = "publisher-bob";

static DB_LOCK: Mutex<()> = Mutex::const_new(());

pub async fn with_registry<F>(test: F) -> anyhow::Result<()>
where
    F: for<'a> FnOnce(&'a RegistryState) -> BoxFuture<'a, anyhow::Result<()>>,
{
    let Some(url) = test_database_url() else {
        eprintln!("skipping: set TEST_DATABASE_URL to run registry integration tests");
        return Ok(());
    };

    let _guard = DB_LOCK.lock().await;
    let state = RegistryState::new_with_options(test_config(url), true).await?;
    reset(&state.pool).await?;
    test(&state).await
}

fn test_database_url() -> Option<String> {
    std::env::var("REGISTRAR__DATABASE__TEST_DATABASE_URL")
        .or_else(|_| std::env::var("TEST_DATABASE_URL"))
        .ok()
        .filter(|url| !url.is_empty())
}

fn test_config(url: String) -> Config {
    Config {
        database: DatabaseConfig {
            url,
            test_database_url: None,
            pool_min_size: 1,
            pool_max_size: 5,
            pool_timeout_seconds: 30,
            statement_timeout_seconds: 30,
            lock_timeout_seconds: 5,
        },
        registry: RegistryConfig {
            operator: "registrar-test".to_string(),
            max_rows_limit: 100,
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            json: false,
        },
    }
}

async fn reset(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        "TRUNCATE TABLE \
         address_line, address, phone, email, contact_descr, contact, \
         instance_descr, tmodel_instance_info, binding_descr, binding_template, \
         service_category, service_descr, service_name, business_service, \
         discovery_url, business_category, business_identifier, business_descr, \
         business_name, business_entity, \
         tmodel_category, tmodel_identifier, tmodel_overview_descr, tmodel_descr, \
         tmodel, publisher_assertion",
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub fn business_named(name: &str) -> BusinessEntity {
    BusinessEntity {
        names: vec![Name::new(name)],
        ..Default::default()
    }
}

pub fn service_for(business_key: &str, name: &str) -> BusinessService {
    BusinessService {
        business_key: business_key.to_string(),
        names: vec![Name::new(name)],
        ..Default::default()
    }
}

pub fn binding_for(service_key: &str, url: &str) -> BindingTemplate {
    BindingTemplate {
        service_key: service_key.to_string(),
        target: BindingTarget::AccessPoint {
            url_type: "http".to_string(),
            url: url.to_string(),
        },
        ..Default::default()
    }
}

pub fn tmodel_named(name: &str) -> TModel {
    TModel {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn relationship(from_key: &str, to_key: &str) -> PublisherAssertion {
    PublisherAssertion::new(
        from_key,
        to_key,
        KeyedReference::new("parent-child", "parent")
            .with_tmodel("uuid:807a2c6a-ee22-470d-adc7-e0424a337c03"),
    )
}

/// Save one business for `publisher` and return it with generated keys.
pub async fn seed_business(
    state: &RegistryState,
    publisher: &str,
    business: BusinessEntity,
) -> anyhow::Result<BusinessEntity> {
    let mut saved = state
        .publish
        .save_business(publisher, publisher, vec![business])
        .await?;
    Ok(saved.remove(0))
}
