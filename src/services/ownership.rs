//! Publisher ownership checks
//!
//! A business or tModel is owned by the publisher recorded in its
//! `publisher_id` at creation. Services and bindings have no publisher of
//! their own; ownership is resolved by walking up to the enclosing business.
//! Every check answers `false` for an empty or unknown key, never an error:
//! callers decide whether a missing entity is an invalid-key condition or an
//! authorization failure.

use sqlx::{PgConnection, PgPool};

use crate::db::aggregates;
use crate::{Error, Result};

#[derive(Clone)]
pub struct OwnershipService {
    pool: PgPool,
}

impl OwnershipService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn owns_business(&self, publisher_id: &str, business_key: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        Self::check_business(&mut conn, publisher_id, business_key).await
    }

    pub async fn owns_service(&self, publisher_id: &str, service_key: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        Self::check_service(&mut conn, publisher_id, service_key).await
    }

    pub async fn owns_binding(&self, publisher_id: &str, binding_key: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        Self::check_binding(&mut conn, publisher_id, binding_key).await
    }

    pub async fn owns_tmodel(&self, publisher_id: &str, tmodel_key: &str) -> Result<bool> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        Self::check_tmodel(&mut conn, publisher_id, tmodel_key).await
    }

    pub async fn check_business(
        conn: &mut PgConnection,
        publisher_id: &str,
        business_key: &str,
    ) -> Result<bool> {
        if publisher_id.is_empty() || business_key.is_empty() {
            return Ok(false);
        }
        Ok(aggregates::business_publisher(conn, business_key)
            .await?
            .is_some_and(|owner| owner == publisher_id))
    }

    pub async fn check_service(
        conn: &mut PgConnection,
        publisher_id: &str,
        service_key: &str,
    ) -> Result<bool> {
        if publisher_id.is_empty() || service_key.is_empty() {
            return Ok(false);
        }
        match aggregates::service_business_key(conn, service_key).await? {
            Some(business_key) => Self::check_business(conn, publisher_id, &business_key).await,
            None => Ok(false),
        }
    }

    pub async fn check_binding(
        conn: &mut PgConnection,
        publisher_id: &str,
        binding_key: &str,
    ) -> Result<bool> {
        if publisher_id.is_empty() || binding_key.is_empty() {
            return Ok(false);
        }
        match aggregates::binding_service_key(conn, binding_key).await? {
            Some(service_key) => Self::check_service(conn, publisher_id, &service_key).await,
            None => Ok(false),
        }
    }

    pub async fn check_tmodel(
        conn: &mut PgConnection,
        publisher_id: &str,
        tmodel_key: &str,
    ) -> Result<bool> {
        if publisher_id.is_empty() || tmodel_key.is_empty() {
            return Ok(false);
        }
        Ok(aggregates::tmodel_publisher(conn, tmodel_key)
            .await?
            .is_some_and(|owner| owner == publisher_id))
    }
}
