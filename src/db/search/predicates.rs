//! Predicate query builders
//!
//! Each builder produces one parameterized query returning candidate primary
//! keys. Repeated keyed references are OR'd together within a predicate;
//! intersection across predicates happens by restricting each query to the
//! running candidate set (`AND <key> = ANY($n)`). SQL text only ever
//! interpolates compile-time identifiers and enum-derived ORDER BY
//! directions; caller values travel through bind parameters.

use sqlx::PgConnection;

use super::candidates::CandidateSet;
use crate::models::{DiscoveryUrl, FindQualifiers, KeyedReference};
use crate::{Error, Result};

enum Param {
    Text(String),
    TextArray(Vec<String>),
}

/// A parameterized key-set query under construction.
pub(crate) struct KeyQuery {
    sql: String,
    params: Vec<Param>,
}

impl KeyQuery {
    fn new(base: impl Into<String>) -> Self {
        Self {
            sql: base.into(),
            params: Vec::new(),
        }
    }

    fn push(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    /// Bind a text value, returning its `$n` placeholder.
    fn bind_text(&mut self, value: impl Into<String>) -> String {
        self.params.push(Param::Text(value.into()));
        format!("${}", self.params.len())
    }

    /// Bind a text-array value, returning its `$n` placeholder.
    fn bind_array(&mut self, value: Vec<String>) -> String {
        self.params.push(Param::TextArray(value));
        format!("${}", self.params.len())
    }

    /// Restrict to the running candidate set, when concrete.
    fn restrict(&mut self, key_expr: &str, candidates: &CandidateSet) {
        if let Some(keys) = candidates.keys() {
            let placeholder = self.bind_array(keys.to_vec());
            self.push(&format!(" AND {key_expr} = ANY({placeholder})"));
        }
    }

    pub(crate) async fn fetch_keys(&self, conn: &mut PgConnection) -> Result<Vec<String>> {
        let mut query = sqlx::query_scalar::<_, String>(&self.sql);
        for param in &self.params {
            query = match param {
                Param::Text(value) => query.bind(value),
                Param::TextArray(values) => query.bind(values),
            };
        }
        query.fetch_all(conn).await.map_err(Error::Database)
    }

    #[cfg(test)]
    pub(crate) fn sql(&self) -> &str {
        &self.sql
    }
}

/// Escape LIKE metacharacters in a caller value so it matches literally
/// inside a prefix pattern.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// OR-group over keyed references: exact name+value equality, plus scheme-key
/// equality when the reference carries one.
fn keyed_ref_group(
    query: &mut KeyQuery,
    alias: &str,
    scheme_column: &str,
    refs: &[KeyedReference],
) {
    query.push(" AND (");
    for (i, reference) in refs.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        let name = query.bind_text(reference.key_name.clone());
        let value = query.bind_text(reference.key_value.clone());
        match reference.tmodel_key.as_deref() {
            Some(tmodel_key) if !tmodel_key.is_empty() => {
                let scheme = query.bind_text(tmodel_key.to_string());
                query.push(&format!(
                    "({alias}.key_name = {name} AND {alias}.key_value = {value} \
                     AND {alias}.{scheme_column} = {scheme})"
                ));
            }
            _ => {
                query.push(&format!(
                    "({alias}.key_name = {name} AND {alias}.key_value = {value})"
                ));
            }
        }
    }
    query.push(")");
}

/// Name filter as an EXISTS over the entity's name rows. Prefix matching
/// escapes the caller value before building the LIKE pattern.
fn name_filter(
    query: &mut KeyQuery,
    name_table: &str,
    key_column: &str,
    names: &[String],
    exact: bool,
) {
    query.push(&format!(
        " AND EXISTS (SELECT 1 FROM {name_table} n \
         WHERE n.{key_column} = e.{key_column} AND ("
    ));
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        if exact {
            let value = query.bind_text(name.clone());
            query.push(&format!("n.name = {value}"));
        } else {
            let pattern = query.bind_text(format!("{}%", escape_like(name)));
            query.push(&format!("n.name LIKE {pattern}"));
        }
    }
    query.push("))");
}

// --- business predicates ---

pub(crate) fn business_identifier_query(
    refs: &[KeyedReference],
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query = KeyQuery::new(
        "SELECT DISTINCT t.business_key FROM business_identifier t WHERE 1=1",
    );
    keyed_ref_group(&mut query, "t", "tmodel_key", refs);
    query.restrict("t.business_key", candidates);
    query
}

pub(crate) fn business_category_query(
    refs: &[KeyedReference],
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query =
        KeyQuery::new("SELECT DISTINCT t.business_key FROM business_category t WHERE 1=1");
    keyed_ref_group(&mut query, "t", "tmodel_key", refs);
    query.restrict("t.business_key", candidates);
    query
}

pub(crate) fn business_discovery_url_query(
    urls: &[DiscoveryUrl],
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query =
        KeyQuery::new("SELECT DISTINCT du.business_key FROM discovery_url du WHERE (");
    for (i, discovery_url) in urls.iter().enumerate() {
        if i > 0 {
            query.push(" OR ");
        }
        let use_type = query.bind_text(discovery_url.use_type.clone());
        let url = query.bind_text(discovery_url.url.clone());
        query.push(&format!("(du.use_type = {use_type} AND du.url = {url})"));
    }
    query.push(")");
    query.restrict("du.business_key", candidates);
    query
}

/// Businesses with at least one binding whose instance infos reference any of
/// the listed tModel keys.
pub(crate) fn business_tmodel_query(
    tmodel_keys: &[String],
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query = KeyQuery::new(
        "SELECT DISTINCT bs.business_key \
         FROM business_service bs \
         JOIN binding_template bt ON bt.service_key = bs.service_key \
         JOIN tmodel_instance_info tii ON tii.binding_key = bt.binding_key \
         WHERE 1=1",
    );
    let keys = query.bind_array(tmodel_keys.to_vec());
    query.push(&format!(" AND tii.tmodel_key = ANY({keys})"));
    query.restrict("bs.business_key", candidates);
    query
}

/// The final business pass: filters by name when names were supplied, and
/// always imposes the canonical ordering. Sorts on the seq-0 name row; the
/// join stays outer so an entity without name rows is ordered, not dropped.
pub(crate) fn business_name_order_query(
    names: &[String],
    qualifiers: &FindQualifiers,
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query = KeyQuery::new(
        "SELECT e.business_key FROM business_entity e \
         LEFT JOIN business_name sn ON sn.business_key = e.business_key AND sn.seq = 0 \
         WHERE 1=1",
    );
    if !names.is_empty() {
        name_filter(
            &mut query,
            "business_name",
            "business_key",
            names,
            qualifiers.exact_name_match,
        );
    }
    query.restrict("e.business_key", candidates);
    query.push(&format!(
        " ORDER BY {}, e.business_key ASC",
        qualifiers.order_by("COALESCE(sn.name, '')", "e.last_update")
    ));
    query
}

// --- service predicates ---

pub(crate) fn service_category_query(
    refs: &[KeyedReference],
    business_key: Option<&str>,
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query =
        KeyQuery::new("SELECT DISTINCT t.service_key FROM service_category t WHERE 1=1");
    keyed_ref_group(&mut query, "t", "tmodel_key", refs);
    if let Some(business_key) = business_key {
        let scope = query.bind_text(business_key.to_string());
        query.push(&format!(
            " AND t.service_key IN \
             (SELECT bs.service_key FROM business_service bs WHERE bs.business_key = {scope})"
        ));
    }
    query.restrict("t.service_key", candidates);
    query
}

pub(crate) fn service_tmodel_query(
    tmodel_keys: &[String],
    business_key: Option<&str>,
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query = KeyQuery::new(
        "SELECT DISTINCT bt.service_key \
         FROM binding_template bt \
         JOIN tmodel_instance_info tii ON tii.binding_key = bt.binding_key \
         WHERE 1=1",
    );
    let keys = query.bind_array(tmodel_keys.to_vec());
    query.push(&format!(" AND tii.tmodel_key = ANY({keys})"));
    if let Some(business_key) = business_key {
        let scope = query.bind_text(business_key.to_string());
        query.push(&format!(
            " AND bt.service_key IN \
             (SELECT bs.service_key FROM business_service bs WHERE bs.business_key = {scope})"
        ));
    }
    query.restrict("bt.service_key", candidates);
    query
}

pub(crate) fn service_name_order_query(
    names: &[String],
    business_key: Option<&str>,
    qualifiers: &FindQualifiers,
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query = KeyQuery::new(
        "SELECT e.service_key FROM business_service e \
         LEFT JOIN service_name sn ON sn.service_key = e.service_key AND sn.seq = 0 \
         WHERE 1=1",
    );
    if !names.is_empty() {
        name_filter(
            &mut query,
            "service_name",
            "service_key",
            names,
            qualifiers.exact_name_match,
        );
    }
    if let Some(business_key) = business_key {
        let scope = query.bind_text(business_key.to_string());
        query.push(&format!(" AND e.business_key = {scope}"));
    }
    query.restrict("e.service_key", candidates);
    query.push(&format!(
        " ORDER BY {}, e.service_key ASC",
        qualifiers.order_by("COALESCE(sn.name, '')", "e.last_update")
    ));
    query
}

// --- tModel predicates ---

pub(crate) fn tmodel_identifier_query(
    refs: &[KeyedReference],
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query =
        KeyQuery::new("SELECT DISTINCT t.tmodel_key FROM tmodel_identifier t WHERE 1=1");
    keyed_ref_group(&mut query, "t", "tmodel_key_ref", refs);
    query.restrict("t.tmodel_key", candidates);
    query
}

pub(crate) fn tmodel_category_query(
    refs: &[KeyedReference],
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query =
        KeyQuery::new("SELECT DISTINCT t.tmodel_key FROM tmodel_category t WHERE 1=1");
    keyed_ref_group(&mut query, "t", "tmodel_key_ref", refs);
    query.restrict("t.tmodel_key", candidates);
    query
}

/// Final tModel pass. TModels carry a single name on the entity row, and
/// logically deleted tModels are never returned by find.
pub(crate) fn tmodel_name_order_query(
    name: Option<&str>,
    qualifiers: &FindQualifiers,
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query =
        KeyQuery::new("SELECT t.tmodel_key FROM tmodel t WHERE t.deleted = FALSE");
    if let Some(name) = name {
        if qualifiers.exact_name_match {
            let value = query.bind_text(name.to_string());
            query.push(&format!(" AND t.name = {value}"));
        } else {
            let pattern = query.bind_text(format!("{}%", escape_like(name)));
            query.push(&format!(" AND t.name LIKE {pattern}"));
        }
    }
    query.restrict("t.tmodel_key", candidates);
    query.push(&format!(
        " ORDER BY {}, t.tmodel_key ASC",
        qualifiers.order_by("t.name", "t.last_update")
    ));
    query
}

// --- binding predicates ---

pub(crate) fn binding_tmodel_query(
    tmodel_keys: &[String],
    service_key: &str,
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query = KeyQuery::new(
        "SELECT DISTINCT tii.binding_key \
         FROM tmodel_instance_info tii \
         JOIN binding_template bt ON bt.binding_key = tii.binding_key \
         WHERE 1=1",
    );
    let keys = query.bind_array(tmodel_keys.to_vec());
    query.push(&format!(" AND tii.tmodel_key = ANY({keys})"));
    let scope = query.bind_text(service_key.to_string());
    query.push(&format!(" AND bt.service_key = {scope}"));
    query.restrict("tii.binding_key", candidates);
    query
}

/// Final binding pass. Bindings carry no names, so the ordering axis is the
/// last-update timestamp under the qualifier's date direction.
pub(crate) fn binding_order_query(
    service_key: &str,
    qualifiers: &FindQualifiers,
    candidates: &CandidateSet,
) -> KeyQuery {
    let mut query =
        KeyQuery::new("SELECT bt.binding_key FROM binding_template bt WHERE 1=1");
    let scope = query.bind_text(service_key.to_string());
    query.push(&format!(" AND bt.service_key = {scope}"));
    query.restrict("bt.binding_key", candidates);
    query.push(&format!(
        " ORDER BY bt.last_update {}, bt.binding_key ASC",
        qualifiers.date_direction.sql()
    ));
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_escape_covers_wildcards_and_backslash() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
        assert_eq!(escape_like("Acme"), "Acme");
    }

    #[test]
    fn candidate_restriction_is_added_only_for_concrete_sets() {
        let refs = vec![KeyedReference::new("naics", "541511")];
        let unconstrained =
            business_category_query(&refs, &CandidateSet::Unconstrained);
        assert!(!unconstrained.sql().contains("ANY"));

        let narrowed = business_category_query(
            &refs,
            &CandidateSet::Keys(vec!["key-1".into(), "key-2".into()]),
        );
        assert!(narrowed.sql().contains("t.business_key = ANY($3)"));
    }

    #[test]
    fn keyed_refs_are_ord_within_the_predicate() {
        let refs = vec![
            KeyedReference::new("naics", "541511"),
            KeyedReference::new("naics", "541512").with_tmodel("uuid:c0b9fe13"),
        ];
        let query = business_identifier_query(&refs, &CandidateSet::Unconstrained);
        let sql = query.sql();
        assert!(sql.contains("(t.key_name = $1 AND t.key_value = $2) OR "));
        assert!(sql.contains("AND t.tmodel_key = $5"));
    }

    #[test]
    fn name_pass_orders_even_without_name_filter() {
        let query = business_name_order_query(
            &[],
            &FindQualifiers::default(),
            &CandidateSet::Unconstrained,
        );
        let sql = query.sql();
        assert!(!sql.contains("EXISTS"));
        assert!(sql.contains("LEFT JOIN business_name"));
        assert!(sql.ends_with(
            "ORDER BY COALESCE(sn.name, '') ASC, e.last_update DESC, e.business_key ASC"
        ));
    }

    #[test]
    fn prefix_match_uses_escaped_like_pattern() {
        let query = business_name_order_query(
            &["Acme".to_string()],
            &FindQualifiers::default(),
            &CandidateSet::Unconstrained,
        );
        assert!(query.sql().contains("n.name LIKE $1"));
    }
}
