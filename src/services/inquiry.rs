//! Inquiry orchestrator
//!
//! Find operations delegate to the search engine and clamp the caller's
//! `max_rows` to the configured ceiling; get operations hydrate full
//! aggregates by key. Absent keys on get are skipped rather than errors, so a
//! detail request over a stale key list degrades to the survivors.

use sqlx::PgPool;
use tracing::debug;

use crate::db::aggregates;
use crate::db::search::{
    BindingSearch, BusinessSearch, SearchEngine, ServiceSearch, TModelSearch,
};
use crate::models::{BindingTemplate, BusinessEntity, BusinessService, FindQualifiers, TModel};
use crate::{Error, Result};

/// A page of matching keys. `truncated` is set when the row ceiling cut the
/// result short.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct KeyList {
    pub keys: Vec<String>,
    pub truncated: bool,
}

#[derive(Clone)]
pub struct InquiryService {
    pool: PgPool,
    engine: SearchEngine,
    max_rows_limit: usize,
}

impl InquiryService {
    pub fn new(pool: PgPool, max_rows_limit: usize) -> Self {
        let engine = SearchEngine::new(pool.clone());
        Self {
            pool,
            engine,
            max_rows_limit,
        }
    }

    pub async fn find_business(
        &self,
        criteria: &BusinessSearch,
        qualifiers: &FindQualifiers,
        max_rows: Option<usize>,
    ) -> Result<KeyList> {
        let keys = self.engine.find_business(criteria, qualifiers).await?;
        debug!(matches = keys.len(), "find_business resolved");
        Ok(self.clamp(keys, max_rows))
    }

    pub async fn find_service(
        &self,
        criteria: &ServiceSearch,
        qualifiers: &FindQualifiers,
        max_rows: Option<usize>,
    ) -> Result<KeyList> {
        let keys = self.engine.find_service(criteria, qualifiers).await?;
        debug!(matches = keys.len(), "find_service resolved");
        Ok(self.clamp(keys, max_rows))
    }

    pub async fn find_tmodel(
        &self,
        criteria: &TModelSearch,
        qualifiers: &FindQualifiers,
        max_rows: Option<usize>,
    ) -> Result<KeyList> {
        let keys = self.engine.find_tmodel(criteria, qualifiers).await?;
        debug!(matches = keys.len(), "find_tmodel resolved");
        Ok(self.clamp(keys, max_rows))
    }

    pub async fn find_binding(
        &self,
        criteria: &BindingSearch,
        qualifiers: &FindQualifiers,
        max_rows: Option<usize>,
    ) -> Result<KeyList> {
        let keys = self.engine.find_binding(criteria, qualifiers).await?;
        debug!(matches = keys.len(), "find_binding resolved");
        Ok(self.clamp(keys, max_rows))
    }

    pub async fn get_business_detail(&self, keys: &[String]) -> Result<Vec<BusinessEntity>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut businesses = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(business) = aggregates::fetch_business(&mut conn, key).await? {
                businesses.push(business);
            }
        }
        Ok(businesses)
    }

    pub async fn get_service_detail(&self, keys: &[String]) -> Result<Vec<BusinessService>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut services = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(service) = aggregates::fetch_service(&mut conn, key).await? {
                services.push(service);
            }
        }
        Ok(services)
    }

    pub async fn get_binding_detail(&self, keys: &[String]) -> Result<Vec<BindingTemplate>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut bindings = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(binding) = aggregates::fetch_binding(&mut conn, key).await? {
                bindings.push(binding);
            }
        }
        Ok(bindings)
    }

    /// Logically deleted tModels are still retrievable here; deletion only
    /// hides them from find results.
    pub async fn get_tmodel_detail(&self, keys: &[String]) -> Result<Vec<TModel>> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        let mut tmodels = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(tmodel) = aggregates::fetch_tmodel(&mut conn, key).await? {
                tmodels.push(tmodel);
            }
        }
        Ok(tmodels)
    }

    pub(crate) fn clamp(&self, mut keys: Vec<String>, max_rows: Option<usize>) -> KeyList {
        let ceiling = max_rows
            .map(|m| m.min(self.max_rows_limit))
            .unwrap_or(self.max_rows_limit);
        let truncated = keys.len() > ceiling;
        keys.truncate(ceiling);
        KeyList { keys, truncated }
    }
}
