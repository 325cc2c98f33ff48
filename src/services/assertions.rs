//! Publisher-assertion protocol
//!
//! An assertion names a relationship between two businesses and becomes
//! visible (complete) only when the publishers of both sides have asserted
//! it. Each side's agreement is a check flag on the shared row; a publisher
//! can only ever raise or lower the flags for the sides they own. A row whose
//! flags are both lowered is dead and is purged.

use sqlx::{PgConnection, PgPool, Row};
use tracing::info;

use crate::db::search::SearchEngine;
use crate::db::uow::{self, UnitOfWork};
use crate::models::{
    AssertionStatusItem, CompletionStatus, FindQualifiers, KeyedReference, PublisherAssertion,
};
use crate::{Error, Result};

#[derive(Clone)]
pub struct AssertionService {
    pool: PgPool,
    engine: SearchEngine,
}

impl AssertionService {
    pub fn new(pool: PgPool) -> Self {
        let engine = SearchEngine::new(pool.clone());
        Self { pool, engine }
    }

    /// Record the caller's side(s) of each assertion. Inserts the shared row
    /// on first sight; on later sights merges the caller's check flags into
    /// it, never lowering a flag the other side has raised.
    pub async fn add_assertions(
        &self,
        publisher_id: &str,
        assertions: Vec<PublisherAssertion>,
    ) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for assertion in &assertions {
                let conn = unit.connection(uow::PRIMARY)?;
                Self::add_one(conn, publisher_id, assertion).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = assertions.len(), "Added assertions");
                Ok(())
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    async fn add_one(
        conn: &mut PgConnection,
        publisher_id: &str,
        assertion: &PublisherAssertion,
    ) -> Result<()> {
        assertion.validate()?;
        let (owns_from, owns_to) = Self::sides_owned(conn, publisher_id, assertion).await?;
        if !owns_from && !owns_to {
            return Err(Error::UserMismatch {
                kind: "publisherAssertion",
                key: assertion_key(assertion),
                publisher: publisher_id.to_string(),
            });
        }

        sqlx::query(
            "INSERT INTO publisher_assertion \
             (from_key, to_key, tmodel_key, key_name, key_value, from_check, to_check) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (from_key, to_key, tmodel_key, key_name, key_value) DO UPDATE SET \
             from_check = publisher_assertion.from_check OR EXCLUDED.from_check, \
             to_check = publisher_assertion.to_check OR EXCLUDED.to_check",
        )
        .bind(&assertion.from_key)
        .bind(&assertion.to_key)
        .bind(assertion.keyed_reference.tmodel_key.as_deref().unwrap_or(""))
        .bind(&assertion.keyed_reference.key_name)
        .bind(&assertion.keyed_reference.key_value)
        .bind(owns_from)
        .bind(owns_to)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Withdraw the caller's side(s) of each assertion, then purge rows with
    /// neither side still asserted.
    pub async fn delete_assertions(
        &self,
        publisher_id: &str,
        assertions: Vec<PublisherAssertion>,
    ) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for assertion in &assertions {
                let conn = unit.connection(uow::PRIMARY)?;
                Self::delete_one(conn, publisher_id, assertion).await?;
            }
            let conn = unit.connection(uow::PRIMARY)?;
            Self::purge_dead(conn).await
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = assertions.len(), "Deleted assertions");
                Ok(())
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    async fn delete_one(
        conn: &mut PgConnection,
        publisher_id: &str,
        assertion: &PublisherAssertion,
    ) -> Result<()> {
        assertion.validate()?;
        let (owns_from, owns_to) = Self::sides_owned(conn, publisher_id, assertion).await?;
        if !owns_from && !owns_to {
            return Err(Error::UserMismatch {
                kind: "publisherAssertion",
                key: assertion_key(assertion),
                publisher: publisher_id.to_string(),
            });
        }

        let result = sqlx::query(
            "UPDATE publisher_assertion SET \
             from_check = from_check AND NOT $6, \
             to_check = to_check AND NOT $7 \
             WHERE from_key = $1 AND to_key = $2 AND tmodel_key = $3 \
               AND key_name = $4 AND key_value = $5",
        )
        .bind(&assertion.from_key)
        .bind(&assertion.to_key)
        .bind(assertion.keyed_reference.tmodel_key.as_deref().unwrap_or(""))
        .bind(&assertion.keyed_reference.key_name)
        .bind(&assertion.keyed_reference.key_value)
        .bind(owns_from)
        .bind(owns_to)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::InvalidKey {
                kind: "publisherAssertion",
                key: assertion_key(assertion),
            });
        }
        Ok(())
    }

    /// Replace the caller's entire assertion set: withdraw every flag the
    /// caller has raised anywhere, purge dead rows, then add the new set.
    pub async fn set_assertions(
        &self,
        publisher_id: &str,
        assertions: Vec<PublisherAssertion>,
    ) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            let conn = unit.connection(uow::PRIMARY)?;
            let owned = Self::owned_business_keys(conn, publisher_id).await?;

            sqlx::query("UPDATE publisher_assertion SET from_check = FALSE WHERE from_key = ANY($1)")
                .bind(&owned)
                .execute(&mut *conn)
                .await
                .map_err(Error::Database)?;
            sqlx::query("UPDATE publisher_assertion SET to_check = FALSE WHERE to_key = ANY($1)")
                .bind(&owned)
                .execute(&mut *conn)
                .await
                .map_err(Error::Database)?;
            Self::purge_dead(conn).await?;

            for assertion in &assertions {
                let conn = unit.connection(uow::PRIMARY)?;
                Self::add_one(conn, publisher_id, assertion).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = assertions.len(), "Set assertions");
                Ok(())
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    /// The assertions the caller currently has a raised flag on.
    pub async fn get_assertions(&self, publisher_id: &str) -> Result<Vec<PublisherAssertion>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let owned = Self::owned_business_keys(&mut conn, publisher_id).await?;

        let rows = sqlx::query(
            "SELECT from_key, to_key, tmodel_key, key_name, key_value \
             FROM publisher_assertion \
             WHERE (from_key = ANY($1) AND from_check) OR (to_key = ANY($1) AND to_check) \
             ORDER BY from_key, to_key",
        )
        .bind(&owned)
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(assertion_from_row).collect())
    }

    /// Every assertion touching one of the caller's businesses, classified by
    /// completion, optionally filtered to one status.
    pub async fn get_assertion_status_items(
        &self,
        publisher_id: &str,
        filter: Option<CompletionStatus>,
    ) -> Result<Vec<AssertionStatusItem>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let owned = Self::owned_business_keys(&mut conn, publisher_id).await?;

        let rows = sqlx::query(
            "SELECT from_key, to_key, tmodel_key, key_name, key_value, from_check, to_check \
             FROM publisher_assertion \
             WHERE from_key = ANY($1) OR to_key = ANY($1) \
             ORDER BY from_key, to_key",
        )
        .bind(&owned)
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::Database)?;

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            let status = CompletionStatus::classify(row.get("from_check"), row.get("to_check"));
            if filter.is_some_and(|wanted| wanted != status) {
                continue;
            }
            items.push(AssertionStatusItem {
                assertion: assertion_from_row(row),
                status,
            });
        }
        Ok(items)
    }

    /// Businesses related to `business_key` through complete assertions,
    /// optionally filtered by the relationship's keyed reference, ordered
    /// with the business name/date ordering pass.
    pub async fn find_related_businesses(
        &self,
        business_key: &str,
        keyed_reference: Option<&KeyedReference>,
        qualifiers: &FindQualifiers,
    ) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;

        if crate::db::aggregates::business_publisher(&mut conn, business_key)
            .await?
            .is_none()
        {
            return Err(Error::InvalidKey {
                kind: "businessEntity",
                key: business_key.to_string(),
            });
        }

        let rows = sqlx::query(
            "SELECT from_key, to_key, tmodel_key, key_name, key_value \
             FROM publisher_assertion \
             WHERE (from_key = $1 OR to_key = $1) AND from_check AND to_check",
        )
        .bind(business_key)
        .fetch_all(&mut *conn)
        .await
        .map_err(Error::Database)?;
        drop(conn);

        let mut related = Vec::new();
        for row in &rows {
            let assertion = assertion_from_row(row);
            if let Some(wanted) = keyed_reference {
                if !reference_matches(wanted, &assertion.keyed_reference) {
                    continue;
                }
            }
            let other = if assertion.from_key == business_key {
                assertion.to_key
            } else {
                assertion.from_key
            };
            if !related.contains(&other) {
                related.push(other);
            }
        }

        self.engine.order_business_keys(related, qualifiers).await
    }

    /// Which sides of the assertion the publisher owns.
    async fn sides_owned(
        conn: &mut PgConnection,
        publisher_id: &str,
        assertion: &PublisherAssertion,
    ) -> Result<(bool, bool)> {
        use crate::services::ownership::OwnershipService;
        let owns_from =
            OwnershipService::check_business(conn, publisher_id, &assertion.from_key).await?;
        let owns_to =
            OwnershipService::check_business(conn, publisher_id, &assertion.to_key).await?;
        Ok((owns_from, owns_to))
    }

    async fn owned_business_keys(
        conn: &mut PgConnection,
        publisher_id: &str,
    ) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT business_key FROM business_entity WHERE publisher_id = $1")
            .bind(publisher_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Database)
    }

    async fn purge_dead(conn: &mut PgConnection) -> Result<()> {
        sqlx::query("DELETE FROM publisher_assertion WHERE NOT from_check AND NOT to_check")
            .execute(&mut *conn)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}

fn assertion_key(assertion: &PublisherAssertion) -> String {
    format!("{}:{}", assertion.from_key, assertion.to_key)
}

fn assertion_from_row(row: &sqlx::postgres::PgRow) -> PublisherAssertion {
    let tmodel_key: String = row.get("tmodel_key");
    PublisherAssertion {
        from_key: row.get("from_key"),
        to_key: row.get("to_key"),
        keyed_reference: KeyedReference {
            tmodel_key: if tmodel_key.is_empty() {
                None
            } else {
                Some(tmodel_key)
            },
            key_name: row.get("key_name"),
            key_value: row.get("key_value"),
        },
    }
}

/// Two keyed references name the same relationship when name and value match;
/// the scheme key participates only when the filter supplies one.
fn reference_matches(wanted: &KeyedReference, actual: &KeyedReference) -> bool {
    if wanted.key_name != actual.key_name || wanted.key_value != actual.key_value {
        return false;
    }
    match wanted.tmodel_key.as_deref() {
        Some(scheme) if !scheme.is_empty() => actual.tmodel_key.as_deref() == Some(scheme),
        _ => true,
    }
}
