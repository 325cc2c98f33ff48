//! Generic repeated-attribute tables
//!
//! The registry schema fans each repeated attribute (names, descriptions,
//! keyed references, URLs, phones, ...) out into its own table keyed by a
//! single owning-entity column plus a `seq` ordering column. Rather than one
//! hand-written accessor per table, [`AttributeTable`] implements the
//! save/fetch/delete triad once; each attribute kind is a configured constant.
//!
//! Table and column names are compile-time constants; caller data only ever
//! travels through bind parameters.

use std::marker::PhantomData;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, Postgres, Row};

use crate::models::{AddressLine, Description, DiscoveryUrl, Email, KeyedReference, Name, Phone};
use crate::{Error, Result};

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// One row of a repeated-attribute collection. Payload columns are bound and
/// read positionally, in the order declared on the [`AttributeTable`].
pub trait AttributeRow: Send + Sync + Sized + Unpin {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q>;
    fn from_row(row: &PgRow) -> Self;
}

/// A repeated-attribute table: `(owner_column, seq, columns...)`.
pub struct AttributeTable<R> {
    table: &'static str,
    owner_column: &'static str,
    columns: &'static [&'static str],
    _marker: PhantomData<fn() -> R>,
}

impl<R: AttributeRow> AttributeTable<R> {
    pub const fn new(
        table: &'static str,
        owner_column: &'static str,
        columns: &'static [&'static str],
    ) -> Self {
        Self {
            table,
            owner_column,
            columns,
            _marker: PhantomData,
        }
    }

    fn insert_sql(&self) -> String {
        let placeholders: Vec<String> = (0..self.columns.len() + 2)
            .map(|i| format!("${}", i + 1))
            .collect();
        format!(
            "INSERT INTO {} ({}, seq, {}) VALUES ({})",
            self.table,
            self.owner_column,
            self.columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY seq",
            self.columns.join(", "),
            self.table,
            self.owner_column
        )
    }

    /// Insert the collection in order; `seq` is the row's position.
    pub async fn insert_all(
        &self,
        conn: &mut PgConnection,
        owner: &str,
        rows: &[R],
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let sql = self.insert_sql();
        for (seq, row) in rows.iter().enumerate() {
            let query = sqlx::query(&sql).bind(owner).bind(seq as i32);
            row.bind(query)
                .execute(&mut *conn)
                .await
                .map_err(Error::Database)?;
        }
        Ok(())
    }

    /// Fetch the collection ordered by `seq`. An absent owner yields an empty
    /// collection, never an error.
    pub async fn fetch_all(&self, conn: &mut PgConnection, owner: &str) -> Result<Vec<R>> {
        let sql = self.select_sql();
        let rows = sqlx::query(&sql)
            .bind(owner)
            .fetch_all(&mut *conn)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(R::from_row).collect())
    }

    pub async fn delete_all(&self, conn: &mut PgConnection, owner: &str) -> Result<u64> {
        let sql = format!("DELETE FROM {} WHERE {} = $1", self.table, self.owner_column);
        let result = sqlx::query(&sql)
            .bind(owner)
            .execute(&mut *conn)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

impl AttributeRow for Name {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.lang_code.clone()).bind(self.value.clone())
    }

    fn from_row(row: &PgRow) -> Self {
        Name {
            lang_code: row.get(0),
            value: row.get(1),
        }
    }
}

impl AttributeRow for Description {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.lang_code.clone()).bind(self.value.clone())
    }

    fn from_row(row: &PgRow) -> Self {
        Description {
            lang_code: row.get(0),
            value: row.get(1),
        }
    }
}

impl AttributeRow for KeyedReference {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.tmodel_key.clone())
            .bind(self.key_name.clone())
            .bind(self.key_value.clone())
    }

    fn from_row(row: &PgRow) -> Self {
        KeyedReference {
            tmodel_key: row.get(0),
            key_name: row.get(1),
            key_value: row.get(2),
        }
    }
}

impl AttributeRow for DiscoveryUrl {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.use_type.clone()).bind(self.url.clone())
    }

    fn from_row(row: &PgRow) -> Self {
        DiscoveryUrl {
            use_type: row.get(0),
            url: row.get(1),
        }
    }
}

impl AttributeRow for Phone {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.use_type.clone()).bind(self.number.clone())
    }

    fn from_row(row: &PgRow) -> Self {
        Phone {
            use_type: row.get(0),
            number: row.get(1),
        }
    }
}

impl AttributeRow for Email {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query.bind(self.use_type.clone()).bind(self.address.clone())
    }

    fn from_row(row: &PgRow) -> Self {
        Email {
            use_type: row.get(0),
            address: row.get(1),
        }
    }
}

impl AttributeRow for AddressLine {
    fn bind<'q>(&self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(self.line.clone())
            .bind(self.key_name.clone())
            .bind(self.key_value.clone())
    }

    fn from_row(row: &PgRow) -> Self {
        AddressLine {
            line: row.get(0),
            key_name: row.get(1),
            key_value: row.get(2),
        }
    }
}

// Business attribute collections
pub const BUSINESS_NAMES: AttributeTable<Name> =
    AttributeTable::new("business_name", "business_key", &["lang_code", "name"]);
pub const BUSINESS_DESCRIPTIONS: AttributeTable<Description> =
    AttributeTable::new("business_descr", "business_key", &["lang_code", "descr"]);
pub const BUSINESS_IDENTIFIERS: AttributeTable<KeyedReference> = AttributeTable::new(
    "business_identifier",
    "business_key",
    &["tmodel_key", "key_name", "key_value"],
);
pub const BUSINESS_CATEGORIES: AttributeTable<KeyedReference> = AttributeTable::new(
    "business_category",
    "business_key",
    &["tmodel_key", "key_name", "key_value"],
);
pub const DISCOVERY_URLS: AttributeTable<DiscoveryUrl> =
    AttributeTable::new("discovery_url", "business_key", &["use_type", "url"]);

// Contact sub-collections (owned via the contact's generated key)
pub const CONTACT_DESCRIPTIONS: AttributeTable<Description> =
    AttributeTable::new("contact_descr", "contact_key", &["lang_code", "descr"]);
pub const CONTACT_PHONES: AttributeTable<Phone> =
    AttributeTable::new("phone", "contact_key", &["use_type", "phone_number"]);
pub const CONTACT_EMAILS: AttributeTable<Email> =
    AttributeTable::new("email", "contact_key", &["use_type", "email_address"]);
pub const ADDRESS_LINES: AttributeTable<AddressLine> = AttributeTable::new(
    "address_line",
    "address_key",
    &["line", "key_name", "key_value"],
);

// Service attribute collections
pub const SERVICE_NAMES: AttributeTable<Name> =
    AttributeTable::new("service_name", "service_key", &["lang_code", "name"]);
pub const SERVICE_DESCRIPTIONS: AttributeTable<Description> =
    AttributeTable::new("service_descr", "service_key", &["lang_code", "descr"]);
pub const SERVICE_CATEGORIES: AttributeTable<KeyedReference> = AttributeTable::new(
    "service_category",
    "service_key",
    &["tmodel_key", "key_name", "key_value"],
);

// Binding attribute collections
pub const BINDING_DESCRIPTIONS: AttributeTable<Description> =
    AttributeTable::new("binding_descr", "binding_key", &["lang_code", "descr"]);
pub const INSTANCE_DESCRIPTIONS: AttributeTable<Description> =
    AttributeTable::new("instance_descr", "instance_key", &["lang_code", "descr"]);

// TModel attribute collections
pub const TMODEL_DESCRIPTIONS: AttributeTable<Description> =
    AttributeTable::new("tmodel_descr", "tmodel_key", &["lang_code", "descr"]);
pub const TMODEL_OVERVIEW_DESCRIPTIONS: AttributeTable<Description> = AttributeTable::new(
    "tmodel_overview_descr",
    "tmodel_key",
    &["lang_code", "descr"],
);
pub const TMODEL_IDENTIFIERS: AttributeTable<KeyedReference> = AttributeTable::new(
    "tmodel_identifier",
    "tmodel_key",
    &["tmodel_key_ref", "key_name", "key_value"],
);
pub const TMODEL_CATEGORIES: AttributeTable<KeyedReference> = AttributeTable::new(
    "tmodel_category",
    "tmodel_key",
    &["tmodel_key_ref", "key_name", "key_value"],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sql_has_owner_seq_then_payload_binds() {
        assert_eq!(
            BUSINESS_NAMES.insert_sql(),
            "INSERT INTO business_name (business_key, seq, lang_code, name) \
             VALUES ($1, $2, $3, $4)"
        );
        assert_eq!(
            BUSINESS_CATEGORIES.insert_sql(),
            "INSERT INTO business_category (business_key, seq, tmodel_key, key_name, key_value) \
             VALUES ($1, $2, $3, $4, $5)"
        );
    }

    #[test]
    fn rows_bind_onto_a_query_borrowing_local_sql() {
        let name = Name::new("Acme");
        let sql = BUSINESS_NAMES.insert_sql();
        let query = sqlx::query(&sql).bind("owner").bind(0i32);
        drop(name.bind(query));
    }

    #[test]
    fn select_sql_orders_by_seq() {
        assert_eq!(
            ADDRESS_LINES.select_sql(),
            "SELECT line, key_name, key_value FROM address_line \
             WHERE address_key = $1 ORDER BY seq"
        );
    }
}
