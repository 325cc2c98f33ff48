//! Publishing orchestrator
//!
//! Save and delete operations for the four entity kinds. Every batch runs
//! inside one unit of work: a failure anywhere rolls back the whole batch.
//! Saves are replace-all: an existing aggregate is torn down and rewritten
//! from the submitted graph, with `publisher_id` preserved from the stored
//! row. An empty key requests key generation; a non-empty key must reference
//! an existing row the caller owns.

use tracing::info;
use uuid::Uuid;

use crate::db::aggregates;
use crate::db::uow::{self, UnitOfWork};
use crate::models::{BindingTemplate, BusinessEntity, BusinessService, TModel};
use crate::services::ownership::OwnershipService;
use crate::{Error, Result};
use sqlx::{PgConnection, PgPool};

#[derive(Clone)]
pub struct PublishService {
    pool: PgPool,
    operator: String,
}

impl PublishService {
    pub fn new(pool: PgPool, operator: impl Into<String>) -> Self {
        Self {
            pool,
            operator: operator.into(),
        }
    }

    pub async fn save_business(
        &self,
        publisher_id: &str,
        authorized_name: &str,
        businesses: Vec<BusinessEntity>,
    ) -> Result<Vec<BusinessEntity>> {
        let mut saved = Vec::with_capacity(businesses.len());
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for business in businesses {
                let conn = unit.connection(uow::PRIMARY)?;
                saved.push(
                    self.save_one_business(conn, publisher_id, authorized_name, business)
                        .await?,
                );
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = saved.len(), "Saved businesses");
                Ok(saved)
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    async fn save_one_business(
        &self,
        conn: &mut PgConnection,
        publisher_id: &str,
        authorized_name: &str,
        mut business: BusinessEntity,
    ) -> Result<BusinessEntity> {
        if business.business_key.is_empty() {
            business.business_key = new_key();
            business.publisher_id = publisher_id.to_string();
        } else {
            let owner = aggregates::business_publisher(conn, &business.business_key)
                .await?
                .ok_or_else(|| Error::InvalidKey {
                    kind: "businessEntity",
                    key: business.business_key.clone(),
                })?;
            if owner != publisher_id {
                return Err(Error::UserMismatch {
                    kind: "businessEntity",
                    key: business.business_key.clone(),
                    publisher: publisher_id.to_string(),
                });
            }
            business.publisher_id = owner;
            aggregates::delete_business_graph(conn, &business.business_key).await?;
        }

        business.authorized_name = authorized_name.to_string();
        business.operator = self.operator.clone();
        business.last_update = Some(chrono::Utc::now());
        for service in &mut business.services {
            prepare_service(service, &business.business_key, business.last_update);
        }

        aggregates::insert_business_graph(conn, &business).await?;
        Ok(business)
    }

    pub async fn save_service(
        &self,
        publisher_id: &str,
        services: Vec<BusinessService>,
    ) -> Result<Vec<BusinessService>> {
        let mut saved = Vec::with_capacity(services.len());
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for service in services {
                let conn = unit.connection(uow::PRIMARY)?;
                saved.push(self.save_one_service(conn, publisher_id, service).await?);
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = saved.len(), "Saved services");
                Ok(saved)
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    async fn save_one_service(
        &self,
        conn: &mut PgConnection,
        publisher_id: &str,
        mut service: BusinessService,
    ) -> Result<BusinessService> {
        if service.business_key.is_empty() {
            return Err(Error::InvalidKey {
                kind: "businessEntity",
                key: service.business_key.clone(),
            });
        }
        if !OwnershipService::check_business(conn, publisher_id, &service.business_key).await? {
            if aggregates::business_publisher(conn, &service.business_key)
                .await?
                .is_none()
            {
                return Err(Error::InvalidKey {
                    kind: "businessEntity",
                    key: service.business_key.clone(),
                });
            }
            return Err(Error::UserMismatch {
                kind: "businessEntity",
                key: service.business_key.clone(),
                publisher: publisher_id.to_string(),
            });
        }

        if !service.service_key.is_empty() {
            match aggregates::service_business_key(conn, &service.service_key).await? {
                Some(owning_business) if owning_business == service.business_key => {
                    aggregates::delete_service_graph(conn, &service.service_key).await?;
                }
                Some(_) | None => {
                    return Err(Error::InvalidKey {
                        kind: "businessService",
                        key: service.service_key.clone(),
                    });
                }
            }
        }

        let business_key = service.business_key.clone();
        prepare_service(&mut service, &business_key, Some(chrono::Utc::now()));
        aggregates::insert_service_graph(conn, &service).await?;
        Ok(service)
    }

    pub async fn save_binding(
        &self,
        publisher_id: &str,
        bindings: Vec<BindingTemplate>,
    ) -> Result<Vec<BindingTemplate>> {
        let mut saved = Vec::with_capacity(bindings.len());
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for binding in bindings {
                let conn = unit.connection(uow::PRIMARY)?;
                saved.push(self.save_one_binding(conn, publisher_id, binding).await?);
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = saved.len(), "Saved bindings");
                Ok(saved)
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    async fn save_one_binding(
        &self,
        conn: &mut PgConnection,
        publisher_id: &str,
        mut binding: BindingTemplate,
    ) -> Result<BindingTemplate> {
        if binding.service_key.is_empty() {
            return Err(Error::InvalidKey {
                kind: "businessService",
                key: binding.service_key.clone(),
            });
        }
        if !OwnershipService::check_service(conn, publisher_id, &binding.service_key).await? {
            if aggregates::service_business_key(conn, &binding.service_key)
                .await?
                .is_none()
            {
                return Err(Error::InvalidKey {
                    kind: "businessService",
                    key: binding.service_key.clone(),
                });
            }
            return Err(Error::UserMismatch {
                kind: "businessService",
                key: binding.service_key.clone(),
                publisher: publisher_id.to_string(),
            });
        }

        if !binding.binding_key.is_empty() {
            match aggregates::binding_service_key(conn, &binding.binding_key).await? {
                Some(owning_service) if owning_service == binding.service_key => {
                    aggregates::delete_binding_graph(conn, &binding.binding_key).await?;
                }
                Some(_) | None => {
                    return Err(Error::InvalidKey {
                        kind: "bindingTemplate",
                        key: binding.binding_key.clone(),
                    });
                }
            }
        }

        let service_key = binding.service_key.clone();
        prepare_binding(&mut binding, &service_key, Some(chrono::Utc::now()));
        aggregates::insert_binding_graph(conn, &binding).await?;
        Ok(binding)
    }

    pub async fn save_tmodel(
        &self,
        publisher_id: &str,
        authorized_name: &str,
        tmodels: Vec<TModel>,
    ) -> Result<Vec<TModel>> {
        let mut saved = Vec::with_capacity(tmodels.len());
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for tmodel in tmodels {
                let conn = unit.connection(uow::PRIMARY)?;
                saved.push(
                    self.save_one_tmodel(conn, publisher_id, authorized_name, tmodel)
                        .await?,
                );
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = saved.len(), "Saved tModels");
                Ok(saved)
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    async fn save_one_tmodel(
        &self,
        conn: &mut PgConnection,
        publisher_id: &str,
        authorized_name: &str,
        mut tmodel: TModel,
    ) -> Result<TModel> {
        tmodel.authorized_name = authorized_name.to_string();
        tmodel.operator = self.operator.clone();
        tmodel.last_update = Some(chrono::Utc::now());

        if tmodel.tmodel_key.is_empty() {
            tmodel.tmodel_key = new_key();
            tmodel.publisher_id = publisher_id.to_string();
            aggregates::insert_tmodel(conn, &tmodel).await?;
            return Ok(tmodel);
        }

        let owner = aggregates::tmodel_publisher(conn, &tmodel.tmodel_key)
            .await?
            .ok_or_else(|| Error::InvalidKey {
                kind: "tModel",
                key: tmodel.tmodel_key.clone(),
            })?;
        if owner != publisher_id {
            return Err(Error::UserMismatch {
                kind: "tModel",
                key: tmodel.tmodel_key.clone(),
                publisher: publisher_id.to_string(),
            });
        }
        tmodel.publisher_id = owner;
        // Re-saving also revives a logically deleted tModel.
        aggregates::update_tmodel(conn, &tmodel).await?;
        Ok(tmodel)
    }

    pub async fn delete_business(&self, publisher_id: &str, keys: Vec<String>) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for key in &keys {
                let conn = unit.connection(uow::PRIMARY)?;
                Self::require_business_owned(conn, publisher_id, key).await?;
                // Assertions naming the business on either side die with it.
                sqlx::query("DELETE FROM publisher_assertion WHERE from_key = $1 OR to_key = $1")
                    .bind(key)
                    .execute(&mut *conn)
                    .await
                    .map_err(Error::Database)?;
                aggregates::delete_business_graph(conn, key).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = keys.len(), "Deleted businesses");
                Ok(())
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    pub async fn delete_service(&self, publisher_id: &str, keys: Vec<String>) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for key in &keys {
                let conn = unit.connection(uow::PRIMARY)?;
                if aggregates::service_business_key(conn, key).await?.is_none() {
                    return Err(Error::InvalidKey {
                        kind: "businessService",
                        key: key.clone(),
                    });
                }
                if !OwnershipService::check_service(conn, publisher_id, key).await? {
                    return Err(Error::UserMismatch {
                        kind: "businessService",
                        key: key.clone(),
                        publisher: publisher_id.to_string(),
                    });
                }
                aggregates::delete_service_graph(conn, key).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = keys.len(), "Deleted services");
                Ok(())
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    pub async fn delete_binding(&self, publisher_id: &str, keys: Vec<String>) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for key in &keys {
                let conn = unit.connection(uow::PRIMARY)?;
                if aggregates::binding_service_key(conn, key).await?.is_none() {
                    return Err(Error::InvalidKey {
                        kind: "bindingTemplate",
                        key: key.clone(),
                    });
                }
                if !OwnershipService::check_binding(conn, publisher_id, key).await? {
                    return Err(Error::UserMismatch {
                        kind: "bindingTemplate",
                        key: key.clone(),
                        publisher: publisher_id.to_string(),
                    });
                }
                aggregates::delete_binding_graph(conn, key).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = keys.len(), "Deleted bindings");
                Ok(())
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    /// Logical deletion: the tModel row survives (other entities may still
    /// reference its key) but disappears from find results.
    pub async fn delete_tmodel(&self, publisher_id: &str, keys: Vec<String>) -> Result<()> {
        let mut unit = UnitOfWork::new();
        unit.begin(uow::PRIMARY, &self.pool).await?;

        let result = async {
            for key in &keys {
                let conn = unit.connection(uow::PRIMARY)?;
                let owner = aggregates::tmodel_publisher(conn, key).await?.ok_or_else(|| {
                    Error::InvalidKey {
                        kind: "tModel",
                        key: key.clone(),
                    }
                })?;
                if owner != publisher_id {
                    return Err(Error::UserMismatch {
                        kind: "tModel",
                        key: key.clone(),
                        publisher: publisher_id.to_string(),
                    });
                }
                aggregates::mark_tmodel_deleted(conn, key).await?;
            }
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                unit.commit().await?;
                info!(publisher = %publisher_id, count = keys.len(), "Hid tModels");
                Ok(())
            }
            Err(e) => {
                unit.rollback().await;
                Err(e)
            }
        }
    }

    async fn require_business_owned(
        conn: &mut PgConnection,
        publisher_id: &str,
        business_key: &str,
    ) -> Result<()> {
        let owner = aggregates::business_publisher(conn, business_key)
            .await?
            .ok_or_else(|| Error::InvalidKey {
                kind: "businessEntity",
                key: business_key.to_string(),
            })?;
        if owner != publisher_id {
            return Err(Error::UserMismatch {
                kind: "businessEntity",
                key: business_key.to_string(),
                publisher: publisher_id.to_string(),
            });
        }
        Ok(())
    }
}

fn new_key() -> String {
    Uuid::new_v4().to_string()
}

/// Assign generated keys through a service subtree and pin every child to its
/// parent key.
fn prepare_service(
    service: &mut BusinessService,
    business_key: &str,
    last_update: Option<chrono::DateTime<chrono::Utc>>,
) {
    if service.service_key.is_empty() {
        service.service_key = new_key();
    }
    service.business_key = business_key.to_string();
    service.last_update = last_update;
    for binding in &mut service.bindings {
        prepare_binding(binding, &service.service_key, last_update);
    }
}

fn prepare_binding(
    binding: &mut BindingTemplate,
    service_key: &str,
    last_update: Option<chrono::DateTime<chrono::Utc>>,
) {
    if binding.binding_key.is_empty() {
        binding.binding_key = new_key();
    }
    binding.service_key = service_key.to_string();
    binding.last_update = last_update;
}
