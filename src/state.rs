//! Shared application state
//!
//! Wires the pool, configuration, and the four services together. One
//! `RegistryState` is built at startup and cloned wherever a handler needs it.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::db::{create_db_pool, run_migrations};
use crate::services::{AssertionService, InquiryService, OwnershipService, PublishService};
use crate::Result;

#[derive(Clone)]
pub struct RegistryState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub inquiry: InquiryService,
    pub publish: PublishService,
    pub assertions: AssertionService,
    pub ownership: OwnershipService,
}

impl RegistryState {
    /// Build state, run migrations.
    pub async fn new(config: Config) -> Result<Self> {
        Self::new_with_options(config, true).await
    }

    pub async fn new_with_options(config: Config, migrate: bool) -> Result<Self> {
        let pool = create_db_pool(&config).await?;
        if migrate {
            run_migrations(&pool).await?;
        }
        Ok(Self::from_pool(config, pool))
    }

    /// Assemble services over an existing pool. Used by tests that manage
    /// their own database lifecycle.
    pub fn from_pool(config: Config, pool: PgPool) -> Self {
        let inquiry = InquiryService::new(pool.clone(), config.registry.max_rows_limit);
        let publish = PublishService::new(pool.clone(), config.registry.operator.clone());
        let assertions = AssertionService::new(pool.clone());
        let ownership = OwnershipService::new(pool.clone());
        Self {
            config: Arc::new(config),
            pool,
            inquiry,
            publish,
            assertions,
            ownership,
        }
    }
}
