//! Aggregate graph persistence
//!
//! Walks an entity's nested structure to insert, fetch, or delete the whole
//! aggregate on one connection. Insert expects keys to be assigned already
//! (the publish service owns key-generation policy); nested helper entities
//! (contacts, addresses, instance infos) get their keys here because they are
//! not addressable from outside the aggregate. Delete removes children before
//! parents in foreign-key order. Fetch returns `None` for an absent parent
//! row and empty collections for absent children.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::db::attributes::{
    ADDRESS_LINES, BINDING_DESCRIPTIONS, BUSINESS_CATEGORIES, BUSINESS_DESCRIPTIONS,
    BUSINESS_IDENTIFIERS, BUSINESS_NAMES, CONTACT_DESCRIPTIONS, CONTACT_EMAILS, CONTACT_PHONES,
    DISCOVERY_URLS, INSTANCE_DESCRIPTIONS, SERVICE_CATEGORIES, SERVICE_DESCRIPTIONS,
    SERVICE_NAMES, TMODEL_CATEGORIES, TMODEL_DESCRIPTIONS, TMODEL_IDENTIFIERS,
    TMODEL_OVERVIEW_DESCRIPTIONS,
};
use crate::models::{
    Address, BindingTarget, BindingTemplate, BusinessEntity, BusinessService, Contact,
    OverviewDoc, TModel, TModelInstanceInfo,
};
use crate::{Error, Result};

fn new_key() -> String {
    Uuid::new_v4().to_string()
}

// --- row existence / ownership lookups ---

pub async fn business_publisher(
    conn: &mut PgConnection,
    business_key: &str,
) -> Result<Option<String>> {
    let row = sqlx::query("SELECT publisher_id FROM business_entity WHERE business_key = $1")
        .bind(business_key)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(row.map(|r| r.get("publisher_id")))
}

pub async fn service_business_key(
    conn: &mut PgConnection,
    service_key: &str,
) -> Result<Option<String>> {
    let row = sqlx::query("SELECT business_key FROM business_service WHERE service_key = $1")
        .bind(service_key)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(row.map(|r| r.get("business_key")))
}

pub async fn binding_service_key(
    conn: &mut PgConnection,
    binding_key: &str,
) -> Result<Option<String>> {
    let row = sqlx::query("SELECT service_key FROM binding_template WHERE binding_key = $1")
        .bind(binding_key)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(row.map(|r| r.get("service_key")))
}

pub async fn tmodel_publisher(
    conn: &mut PgConnection,
    tmodel_key: &str,
) -> Result<Option<String>> {
    let row = sqlx::query("SELECT publisher_id FROM tmodel WHERE tmodel_key = $1")
        .bind(tmodel_key)
        .fetch_optional(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(row.map(|r| r.get("publisher_id")))
}

// --- save ---

/// Insert a fully keyed business aggregate: parent row first, then each
/// attribute collection, then the owned service aggregates.
pub async fn insert_business_graph(
    conn: &mut PgConnection,
    business: &BusinessEntity,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO business_entity \
         (business_key, authorized_name, publisher_id, operator, last_update) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&business.business_key)
    .bind(&business.authorized_name)
    .bind(&business.publisher_id)
    .bind(&business.operator)
    .bind(business.last_update.unwrap_or_else(Utc::now))
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let key = business.business_key.as_str();
    BUSINESS_NAMES.insert_all(conn, key, &business.names).await?;
    BUSINESS_DESCRIPTIONS
        .insert_all(conn, key, &business.descriptions)
        .await?;
    BUSINESS_IDENTIFIERS
        .insert_all(conn, key, &business.identifiers)
        .await?;
    BUSINESS_CATEGORIES
        .insert_all(conn, key, &business.categories)
        .await?;
    DISCOVERY_URLS
        .insert_all(conn, key, &business.discovery_urls)
        .await?;

    for (seq, contact) in business.contacts.iter().enumerate() {
        insert_contact(conn, key, seq as i32, contact).await?;
    }

    for service in &business.services {
        insert_service_graph(conn, service).await?;
    }

    Ok(())
}

async fn insert_contact(
    conn: &mut PgConnection,
    business_key: &str,
    seq: i32,
    contact: &Contact,
) -> Result<()> {
    let contact_key = new_key();
    sqlx::query(
        "INSERT INTO contact (contact_key, business_key, seq, use_type, person_name) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(&contact_key)
    .bind(business_key)
    .bind(seq)
    .bind(&contact.use_type)
    .bind(&contact.person_name)
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    CONTACT_DESCRIPTIONS
        .insert_all(conn, &contact_key, &contact.descriptions)
        .await?;
    CONTACT_PHONES
        .insert_all(conn, &contact_key, &contact.phones)
        .await?;
    CONTACT_EMAILS
        .insert_all(conn, &contact_key, &contact.emails)
        .await?;

    for (address_seq, address) in contact.addresses.iter().enumerate() {
        insert_address(conn, &contact_key, address_seq as i32, address).await?;
    }

    Ok(())
}

async fn insert_address(
    conn: &mut PgConnection,
    contact_key: &str,
    seq: i32,
    address: &Address,
) -> Result<()> {
    let address_key = new_key();
    sqlx::query(
        "INSERT INTO address (address_key, contact_key, seq, use_type, sort_code, tmodel_key) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&address_key)
    .bind(contact_key)
    .bind(seq)
    .bind(&address.use_type)
    .bind(&address.sort_code)
    .bind(&address.tmodel_key)
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    ADDRESS_LINES
        .insert_all(conn, &address_key, &address.lines)
        .await
        .map(|_| ())
}

pub async fn insert_service_graph(
    conn: &mut PgConnection,
    service: &BusinessService,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO business_service (service_key, business_key, last_update) \
         VALUES ($1, $2, $3)",
    )
    .bind(&service.service_key)
    .bind(&service.business_key)
    .bind(service.last_update.unwrap_or_else(Utc::now))
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let key = service.service_key.as_str();
    SERVICE_NAMES.insert_all(conn, key, &service.names).await?;
    SERVICE_DESCRIPTIONS
        .insert_all(conn, key, &service.descriptions)
        .await?;
    SERVICE_CATEGORIES
        .insert_all(conn, key, &service.categories)
        .await?;

    for binding in &service.bindings {
        insert_binding_graph(conn, binding).await?;
    }

    Ok(())
}

pub async fn insert_binding_graph(
    conn: &mut PgConnection,
    binding: &BindingTemplate,
) -> Result<()> {
    let (access_point_type, access_point_url, hosting_redirector) = match &binding.target {
        BindingTarget::AccessPoint { url_type, url } => {
            (Some(url_type.as_str()), Some(url.as_str()), None)
        }
        BindingTarget::HostingRedirector { binding_key } => {
            (None, None, Some(binding_key.as_str()))
        }
    };

    sqlx::query(
        "INSERT INTO binding_template \
         (binding_key, service_key, access_point_type, access_point_url, \
          hosting_redirector, last_update) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&binding.binding_key)
    .bind(&binding.service_key)
    .bind(access_point_type)
    .bind(access_point_url)
    .bind(hosting_redirector)
    .bind(binding.last_update.unwrap_or_else(Utc::now))
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    BINDING_DESCRIPTIONS
        .insert_all(conn, &binding.binding_key, &binding.descriptions)
        .await?;

    for (seq, instance) in binding.instance_infos.iter().enumerate() {
        let instance_key = new_key();
        sqlx::query(
            "INSERT INTO tmodel_instance_info \
             (instance_key, binding_key, seq, tmodel_key, overview_url, instance_parms) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&instance_key)
        .bind(&binding.binding_key)
        .bind(seq as i32)
        .bind(&instance.tmodel_key)
        .bind(&instance.overview_url)
        .bind(&instance.instance_parms)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;

        INSTANCE_DESCRIPTIONS
            .insert_all(conn, &instance_key, &instance.descriptions)
            .await?;
    }

    Ok(())
}

pub async fn insert_tmodel(conn: &mut PgConnection, tmodel: &TModel) -> Result<()> {
    let overview_url = tmodel
        .overview_doc
        .as_ref()
        .and_then(|doc| doc.url.clone());

    sqlx::query(
        "INSERT INTO tmodel \
         (tmodel_key, publisher_id, authorized_name, operator, name, overview_url, \
          deleted, last_update) \
         VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)",
    )
    .bind(&tmodel.tmodel_key)
    .bind(&tmodel.publisher_id)
    .bind(&tmodel.authorized_name)
    .bind(&tmodel.operator)
    .bind(&tmodel.name)
    .bind(overview_url)
    .bind(tmodel.last_update.unwrap_or_else(Utc::now))
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let key = tmodel.tmodel_key.as_str();
    TMODEL_DESCRIPTIONS
        .insert_all(conn, key, &tmodel.descriptions)
        .await?;
    if let Some(doc) = &tmodel.overview_doc {
        TMODEL_OVERVIEW_DESCRIPTIONS
            .insert_all(conn, key, &doc.descriptions)
            .await?;
    }
    TMODEL_IDENTIFIERS
        .insert_all(conn, key, &tmodel.identifiers)
        .await?;
    TMODEL_CATEGORIES
        .insert_all(conn, key, &tmodel.categories)
        .await?;

    Ok(())
}

// --- fetch ---

pub async fn fetch_business(
    conn: &mut PgConnection,
    business_key: &str,
) -> Result<Option<BusinessEntity>> {
    let row = sqlx::query(
        "SELECT business_key, authorized_name, publisher_id, operator, last_update \
         FROM business_entity WHERE business_key = $1",
    )
    .bind(business_key)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut business = BusinessEntity {
        business_key: row.get("business_key"),
        authorized_name: row.get("authorized_name"),
        publisher_id: row.get("publisher_id"),
        operator: row.get("operator"),
        last_update: Some(row.get::<DateTime<Utc>, _>("last_update")),
        ..Default::default()
    };

    business.names = BUSINESS_NAMES.fetch_all(conn, business_key).await?;
    business.descriptions = BUSINESS_DESCRIPTIONS.fetch_all(conn, business_key).await?;
    business.identifiers = BUSINESS_IDENTIFIERS.fetch_all(conn, business_key).await?;
    business.categories = BUSINESS_CATEGORIES.fetch_all(conn, business_key).await?;
    business.discovery_urls = DISCOVERY_URLS.fetch_all(conn, business_key).await?;
    business.contacts = fetch_contacts(conn, business_key).await?;

    let service_keys: Vec<String> = sqlx::query_scalar(
        "SELECT service_key FROM business_service WHERE business_key = $1 ORDER BY service_key",
    )
    .bind(business_key)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Database)?;

    for service_key in service_keys {
        if let Some(service) = fetch_service(conn, &service_key).await? {
            business.services.push(service);
        }
    }

    Ok(Some(business))
}

async fn fetch_contacts(conn: &mut PgConnection, business_key: &str) -> Result<Vec<Contact>> {
    let rows = sqlx::query(
        "SELECT contact_key, use_type, person_name FROM contact \
         WHERE business_key = $1 ORDER BY seq",
    )
    .bind(business_key)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let mut contacts = Vec::with_capacity(rows.len());
    for row in rows {
        let contact_key: String = row.get("contact_key");
        let mut contact = Contact {
            use_type: row.get("use_type"),
            person_name: row.get("person_name"),
            ..Default::default()
        };
        contact.descriptions = CONTACT_DESCRIPTIONS.fetch_all(conn, &contact_key).await?;
        contact.phones = CONTACT_PHONES.fetch_all(conn, &contact_key).await?;
        contact.emails = CONTACT_EMAILS.fetch_all(conn, &contact_key).await?;
        contact.addresses = fetch_addresses(conn, &contact_key).await?;
        contacts.push(contact);
    }
    Ok(contacts)
}

async fn fetch_addresses(conn: &mut PgConnection, contact_key: &str) -> Result<Vec<Address>> {
    let rows = sqlx::query(
        "SELECT address_key, use_type, sort_code, tmodel_key FROM address \
         WHERE contact_key = $1 ORDER BY seq",
    )
    .bind(contact_key)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let mut addresses = Vec::with_capacity(rows.len());
    for row in rows {
        let address_key: String = row.get("address_key");
        addresses.push(Address {
            use_type: row.get("use_type"),
            sort_code: row.get("sort_code"),
            tmodel_key: row.get("tmodel_key"),
            lines: ADDRESS_LINES.fetch_all(conn, &address_key).await?,
        });
    }
    Ok(addresses)
}

pub async fn fetch_service(
    conn: &mut PgConnection,
    service_key: &str,
) -> Result<Option<BusinessService>> {
    let row = sqlx::query(
        "SELECT service_key, business_key, last_update FROM business_service \
         WHERE service_key = $1",
    )
    .bind(service_key)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut service = BusinessService {
        service_key: row.get("service_key"),
        business_key: row.get("business_key"),
        last_update: Some(row.get::<DateTime<Utc>, _>("last_update")),
        ..Default::default()
    };

    service.names = SERVICE_NAMES.fetch_all(conn, service_key).await?;
    service.descriptions = SERVICE_DESCRIPTIONS.fetch_all(conn, service_key).await?;
    service.categories = SERVICE_CATEGORIES.fetch_all(conn, service_key).await?;

    let binding_keys: Vec<String> = sqlx::query_scalar(
        "SELECT binding_key FROM binding_template WHERE service_key = $1 ORDER BY binding_key",
    )
    .bind(service_key)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Database)?;

    for binding_key in binding_keys {
        if let Some(binding) = fetch_binding(conn, &binding_key).await? {
            service.bindings.push(binding);
        }
    }

    Ok(Some(service))
}

pub async fn fetch_binding(
    conn: &mut PgConnection,
    binding_key: &str,
) -> Result<Option<BindingTemplate>> {
    let row = sqlx::query(
        "SELECT binding_key, service_key, access_point_type, access_point_url, \
                hosting_redirector, last_update \
         FROM binding_template WHERE binding_key = $1",
    )
    .bind(binding_key)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let target = match row.get::<Option<String>, _>("hosting_redirector") {
        Some(redirect) => BindingTarget::HostingRedirector {
            binding_key: redirect,
        },
        None => BindingTarget::AccessPoint {
            url_type: row
                .get::<Option<String>, _>("access_point_type")
                .unwrap_or_default(),
            url: row
                .get::<Option<String>, _>("access_point_url")
                .unwrap_or_default(),
        },
    };

    let mut binding = BindingTemplate {
        binding_key: row.get("binding_key"),
        service_key: row.get("service_key"),
        target,
        last_update: Some(row.get::<DateTime<Utc>, _>("last_update")),
        ..Default::default()
    };

    binding.descriptions = BINDING_DESCRIPTIONS.fetch_all(conn, binding_key).await?;

    let instance_rows = sqlx::query(
        "SELECT instance_key, tmodel_key, overview_url, instance_parms \
         FROM tmodel_instance_info WHERE binding_key = $1 ORDER BY seq",
    )
    .bind(binding_key)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Database)?;

    for instance_row in instance_rows {
        let instance_key: String = instance_row.get("instance_key");
        binding.instance_infos.push(TModelInstanceInfo {
            tmodel_key: instance_row.get("tmodel_key"),
            overview_url: instance_row.get("overview_url"),
            instance_parms: instance_row.get("instance_parms"),
            descriptions: INSTANCE_DESCRIPTIONS.fetch_all(conn, &instance_key).await?,
        });
    }

    Ok(Some(binding))
}

/// Fetch a tModel regardless of its logical-deletion flag; deletion only
/// hides a tModel from find results.
pub async fn fetch_tmodel(conn: &mut PgConnection, tmodel_key: &str) -> Result<Option<TModel>> {
    let row = sqlx::query(
        "SELECT tmodel_key, publisher_id, authorized_name, operator, name, overview_url, \
                last_update \
         FROM tmodel WHERE tmodel_key = $1",
    )
    .bind(tmodel_key)
    .fetch_optional(&mut *conn)
    .await
    .map_err(Error::Database)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut tmodel = TModel {
        tmodel_key: row.get("tmodel_key"),
        publisher_id: row.get("publisher_id"),
        authorized_name: row.get("authorized_name"),
        operator: row.get("operator"),
        name: row.get("name"),
        last_update: Some(row.get::<DateTime<Utc>, _>("last_update")),
        ..Default::default()
    };

    let overview_url: Option<String> = row.get("overview_url");
    let overview_descriptions = TMODEL_OVERVIEW_DESCRIPTIONS.fetch_all(conn, tmodel_key).await?;
    if overview_url.is_some() || !overview_descriptions.is_empty() {
        tmodel.overview_doc = Some(OverviewDoc {
            url: overview_url,
            descriptions: overview_descriptions,
        });
    }

    tmodel.descriptions = TMODEL_DESCRIPTIONS.fetch_all(conn, tmodel_key).await?;
    tmodel.identifiers = TMODEL_IDENTIFIERS.fetch_all(conn, tmodel_key).await?;
    tmodel.categories = TMODEL_CATEGORIES.fetch_all(conn, tmodel_key).await?;

    Ok(Some(tmodel))
}

// --- delete ---

/// Delete a business and everything beneath it, children of children first.
pub async fn delete_business_graph(conn: &mut PgConnection, business_key: &str) -> Result<()> {
    let service_keys: Vec<String> =
        sqlx::query_scalar("SELECT service_key FROM business_service WHERE business_key = $1")
            .bind(business_key)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Database)?;
    for service_key in &service_keys {
        delete_service_graph(conn, service_key).await?;
    }

    let contact_keys: Vec<String> =
        sqlx::query_scalar("SELECT contact_key FROM contact WHERE business_key = $1")
            .bind(business_key)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Database)?;
    for contact_key in &contact_keys {
        delete_contact(conn, contact_key).await?;
    }

    BUSINESS_NAMES.delete_all(conn, business_key).await?;
    BUSINESS_DESCRIPTIONS.delete_all(conn, business_key).await?;
    BUSINESS_IDENTIFIERS.delete_all(conn, business_key).await?;
    BUSINESS_CATEGORIES.delete_all(conn, business_key).await?;
    DISCOVERY_URLS.delete_all(conn, business_key).await?;

    sqlx::query("DELETE FROM business_entity WHERE business_key = $1")
        .bind(business_key)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

async fn delete_contact(conn: &mut PgConnection, contact_key: &str) -> Result<()> {
    let address_keys: Vec<String> =
        sqlx::query_scalar("SELECT address_key FROM address WHERE contact_key = $1")
            .bind(contact_key)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Database)?;
    for address_key in &address_keys {
        ADDRESS_LINES.delete_all(conn, address_key).await?;
    }
    sqlx::query("DELETE FROM address WHERE contact_key = $1")
        .bind(contact_key)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;

    CONTACT_DESCRIPTIONS.delete_all(conn, contact_key).await?;
    CONTACT_PHONES.delete_all(conn, contact_key).await?;
    CONTACT_EMAILS.delete_all(conn, contact_key).await?;

    sqlx::query("DELETE FROM contact WHERE contact_key = $1")
        .bind(contact_key)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

pub async fn delete_service_graph(conn: &mut PgConnection, service_key: &str) -> Result<()> {
    let binding_keys: Vec<String> =
        sqlx::query_scalar("SELECT binding_key FROM binding_template WHERE service_key = $1")
            .bind(service_key)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Database)?;
    for binding_key in &binding_keys {
        delete_binding_graph(conn, binding_key).await?;
    }

    SERVICE_NAMES.delete_all(conn, service_key).await?;
    SERVICE_DESCRIPTIONS.delete_all(conn, service_key).await?;
    SERVICE_CATEGORIES.delete_all(conn, service_key).await?;

    sqlx::query("DELETE FROM business_service WHERE service_key = $1")
        .bind(service_key)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

pub async fn delete_binding_graph(conn: &mut PgConnection, binding_key: &str) -> Result<()> {
    sqlx::query(
        "DELETE FROM instance_descr WHERE instance_key IN \
         (SELECT instance_key FROM tmodel_instance_info WHERE binding_key = $1)",
    )
    .bind(binding_key)
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    sqlx::query("DELETE FROM tmodel_instance_info WHERE binding_key = $1")
        .bind(binding_key)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;

    BINDING_DESCRIPTIONS.delete_all(conn, binding_key).await?;

    sqlx::query("DELETE FROM binding_template WHERE binding_key = $1")
        .bind(binding_key)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

/// Remove a tModel's attribute collections ahead of a replace-all re-save.
/// The entity row itself is updated in place to preserve `publisher_id`.
pub async fn delete_tmodel_attributes(conn: &mut PgConnection, tmodel_key: &str) -> Result<()> {
    TMODEL_DESCRIPTIONS.delete_all(conn, tmodel_key).await?;
    TMODEL_OVERVIEW_DESCRIPTIONS.delete_all(conn, tmodel_key).await?;
    TMODEL_IDENTIFIERS.delete_all(conn, tmodel_key).await?;
    TMODEL_CATEGORIES.delete_all(conn, tmodel_key).await?;
    Ok(())
}

/// Logical deletion: hide the tModel from find results without removing the
/// row, since other entities may still reference it.
pub async fn mark_tmodel_deleted(conn: &mut PgConnection, tmodel_key: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE tmodel SET deleted = TRUE WHERE tmodel_key = $1")
        .bind(tmodel_key)
        .execute(&mut *conn)
        .await
        .map_err(Error::Database)?;
    Ok(result.rows_affected() > 0)
}

/// Replace an existing tModel row in place, reviving it if it was logically
/// deleted. Publisher identity is supplied by the caller (immutable).
pub async fn update_tmodel(conn: &mut PgConnection, tmodel: &TModel) -> Result<()> {
    let overview_url = tmodel
        .overview_doc
        .as_ref()
        .and_then(|doc| doc.url.clone());

    sqlx::query(
        "UPDATE tmodel \
         SET authorized_name = $2, operator = $3, name = $4, overview_url = $5, \
             deleted = FALSE, last_update = $6 \
         WHERE tmodel_key = $1",
    )
    .bind(&tmodel.tmodel_key)
    .bind(&tmodel.authorized_name)
    .bind(&tmodel.operator)
    .bind(&tmodel.name)
    .bind(overview_url)
    .bind(tmodel.last_update.unwrap_or_else(Utc::now))
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;

    delete_tmodel_attributes(conn, &tmodel.tmodel_key).await?;

    let key = tmodel.tmodel_key.as_str();
    TMODEL_DESCRIPTIONS
        .insert_all(conn, key, &tmodel.descriptions)
        .await?;
    if let Some(doc) = &tmodel.overview_doc {
        TMODEL_OVERVIEW_DESCRIPTIONS
            .insert_all(conn, key, &doc.descriptions)
            .await?;
    }
    TMODEL_IDENTIFIERS
        .insert_all(conn, key, &tmodel.identifiers)
        .await?;
    TMODEL_CATEGORIES
        .insert_all(conn, key, &tmodel.categories)
        .await?;

    Ok(())
}
