//! Core registry entities and their nested attribute collections.
//!
//! Entity keys are opaque UUID-shaped strings. On save, an empty key requests
//! server-side key generation; submitted non-empty keys are preserved. The
//! `publisher_id` on businesses and tModels is assigned at creation and is the
//! sole ownership anchor thereafter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A localized name. Ordering within an entity is significant; the first name
/// is the entity's sort name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_code: Option<String>,
    pub value: String,
}

impl Name {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            lang_code: None,
            value: value.into(),
        }
    }
}

/// A localized description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang_code: Option<String>,
    pub value: String,
}

impl Description {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            lang_code: None,
            value: value.into(),
        }
    }
}

/// A (classification scheme, name, value) triple used for both identifier
/// and category tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmodel_key: Option<String>,
    pub key_name: String,
    pub key_value: String,
}

impl KeyedReference {
    pub fn new(key_name: impl Into<String>, key_value: impl Into<String>) -> Self {
        Self {
            tmodel_key: None,
            key_name: key_name.into(),
            key_value: key_value.into(),
        }
    }

    pub fn with_tmodel(mut self, tmodel_key: impl Into<String>) -> Self {
        self.tmodel_key = Some(tmodel_key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryUrl {
    pub use_type: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLine {
    pub line: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmodel_key: Option<String>,
    #[serde(default)]
    pub lines: Vec<AddressLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
    pub person_name: String,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub phones: Vec<Phone>,
    #[serde(default)]
    pub emails: Vec<Email>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// The root aggregate: a registered business and everything it owns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BusinessEntity {
    /// Empty on submission to request key generation.
    #[serde(default)]
    pub business_key: String,
    #[serde(default)]
    pub authorized_name: String,
    #[serde(default)]
    pub publisher_id: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub names: Vec<Name>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub identifiers: Vec<KeyedReference>,
    #[serde(default)]
    pub categories: Vec<KeyedReference>,
    #[serde(default)]
    pub discovery_urls: Vec<DiscoveryUrl>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    #[serde(default)]
    pub services: Vec<BusinessService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

/// A service offered by a business; owns its binding templates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BusinessService {
    #[serde(default)]
    pub service_key: String,
    /// Must reference an existing business. Filled in from the owning
    /// aggregate when saved as part of a business.
    #[serde(default)]
    pub business_key: String,
    #[serde(default)]
    pub names: Vec<Name>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub categories: Vec<KeyedReference>,
    #[serde(default)]
    pub bindings: Vec<BindingTemplate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

/// A binding points either at a concrete network endpoint or redirects to
/// another binding. Exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingTarget {
    AccessPoint { url_type: String, url: String },
    HostingRedirector { binding_key: String },
}

impl Default for BindingTarget {
    fn default() -> Self {
        BindingTarget::AccessPoint {
            url_type: "http".to_string(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BindingTemplate {
    #[serde(default)]
    pub binding_key: String,
    #[serde(default)]
    pub service_key: String,
    #[serde(default)]
    pub target: BindingTarget,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub instance_infos: Vec<TModelInstanceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

/// A reference from a binding to the tModel describing its technical fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TModelInstanceInfo {
    pub tmodel_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_parms: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverviewDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
}

/// A shared technical model. Deletion is logical: a deleted tModel is hidden
/// from find results but still retrievable by key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TModel {
    #[serde(default)]
    pub tmodel_key: String,
    #[serde(default)]
    pub publisher_id: String,
    #[serde(default)]
    pub authorized_name: String,
    #[serde(default)]
    pub operator: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview_doc: Option<OverviewDoc>,
    #[serde(default)]
    pub descriptions: Vec<Description>,
    #[serde(default)]
    pub identifiers: Vec<KeyedReference>,
    #[serde(default)]
    pub categories: Vec<KeyedReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}
