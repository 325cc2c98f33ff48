//! Multi-predicate search engine
//!
//! A find operation resolves its criteria one predicate at a time, each
//! narrowing the running candidate key set, and always finishes with the
//! name/date ordering pass. That pass is the only one imposing the canonical
//! result order, so it runs even when no name filter was supplied.
//! A concrete-empty candidate set short-circuits every remaining predicate.

mod candidates;
mod predicates;

pub use candidates::CandidateSet;

use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

use crate::models::{DiscoveryUrl, FindQualifiers, KeyedReference};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessSearch {
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub discovery_urls: Vec<DiscoveryUrl>,
    #[serde(default)]
    pub identifier_bag: Vec<KeyedReference>,
    #[serde(default)]
    pub category_bag: Vec<KeyedReference>,
    #[serde(default)]
    pub tmodel_bag: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceSearch {
    /// Optional owning-business scope; restricts every predicate query.
    #[serde(default)]
    pub business_key: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub category_bag: Vec<KeyedReference>,
    #[serde(default)]
    pub tmodel_bag: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TModelSearch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category_bag: Vec<KeyedReference>,
    #[serde(default)]
    pub identifier_bag: Vec<KeyedReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSearch {
    pub service_key: String,
    #[serde(default)]
    pub tmodel_bag: Vec<String>,
}

#[derive(Clone)]
pub struct SearchEngine {
    pool: PgPool,
}

impl SearchEngine {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_business(
        &self,
        criteria: &BusinessSearch,
        qualifiers: &FindQualifiers,
    ) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut candidates = CandidateSet::Unconstrained;

        if !criteria.tmodel_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::business_tmodel_query(&criteria.tmodel_bag, &candidates),
                candidates,
            )
            .await?;
        }
        if !criteria.discovery_urls.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::business_discovery_url_query(&criteria.discovery_urls, &candidates),
                candidates,
            )
            .await?;
        }
        if !criteria.identifier_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::business_identifier_query(&criteria.identifier_bag, &candidates),
                candidates,
            )
            .await?;
        }
        if !criteria.category_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::business_category_query(&criteria.category_bag, &candidates),
                candidates,
            )
            .await?;
        }

        if candidates.is_exhausted() {
            return Ok(Vec::new());
        }
        predicates::business_name_order_query(&criteria.names, qualifiers, &candidates)
            .fetch_keys(&mut conn)
            .await
    }

    pub async fn find_service(
        &self,
        criteria: &ServiceSearch,
        qualifiers: &FindQualifiers,
    ) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let scope = criteria.business_key.as_deref();
        let mut candidates = CandidateSet::Unconstrained;

        if !criteria.tmodel_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::service_tmodel_query(&criteria.tmodel_bag, scope, &candidates),
                candidates,
            )
            .await?;
        }
        if !criteria.category_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::service_category_query(&criteria.category_bag, scope, &candidates),
                candidates,
            )
            .await?;
        }

        if candidates.is_exhausted() {
            return Ok(Vec::new());
        }
        predicates::service_name_order_query(&criteria.names, scope, qualifiers, &candidates)
            .fetch_keys(&mut conn)
            .await
    }

    pub async fn find_tmodel(
        &self,
        criteria: &TModelSearch,
        qualifiers: &FindQualifiers,
    ) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut candidates = CandidateSet::Unconstrained;

        if !criteria.identifier_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::tmodel_identifier_query(&criteria.identifier_bag, &candidates),
                candidates,
            )
            .await?;
        }
        if !criteria.category_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::tmodel_category_query(&criteria.category_bag, &candidates),
                candidates,
            )
            .await?;
        }

        if candidates.is_exhausted() {
            return Ok(Vec::new());
        }
        predicates::tmodel_name_order_query(criteria.name.as_deref(), qualifiers, &candidates)
            .fetch_keys(&mut conn)
            .await
    }

    pub async fn find_binding(
        &self,
        criteria: &BindingSearch,
        qualifiers: &FindQualifiers,
    ) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut candidates = CandidateSet::Unconstrained;

        if !criteria.tmodel_bag.is_empty() {
            candidates = Self::resolve(
                &mut conn,
                predicates::binding_tmodel_query(
                    &criteria.tmodel_bag,
                    &criteria.service_key,
                    &candidates,
                ),
                candidates,
            )
            .await?;
        }

        if candidates.is_exhausted() {
            return Ok(Vec::new());
        }
        predicates::binding_order_query(&criteria.service_key, qualifiers, &candidates)
            .fetch_keys(&mut conn)
            .await
    }

    /// Order an externally produced key set (e.g. related-business keys) with
    /// the business name/date ordering pass, applying no name filter.
    pub async fn order_business_keys(
        &self,
        keys: Vec<String>,
        qualifiers: &FindQualifiers,
    ) -> Result<Vec<String>> {
        if keys.is_empty() {
            return Ok(keys);
        }
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        predicates::business_name_order_query(&[], qualifiers, &CandidateSet::Keys(keys))
            .fetch_keys(&mut conn)
            .await
    }

    /// Run one predicate unless the candidate set is already exhausted.
    async fn resolve(
        conn: &mut PgConnection,
        query: predicates::KeyQuery,
        candidates: CandidateSet,
    ) -> Result<CandidateSet> {
        if candidates.is_exhausted() {
            return Ok(candidates);
        }
        Ok(CandidateSet::Keys(query.fetch_keys(conn).await?))
    }
}
