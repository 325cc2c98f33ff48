//! Registry data model
//!
//! The four core entities (business, service, binding, tModel), their nested
//! attribute collections, publisher assertions, and find qualifiers.

pub mod assertions;
pub mod entities;
pub mod qualifiers;

pub use assertions::{AssertionStatusItem, CompletionStatus, PublisherAssertion};
pub use entities::{
    Address, AddressLine, BindingTarget, BindingTemplate, BusinessEntity, BusinessService, Contact,
    Description, DiscoveryUrl, Email, KeyedReference, Name, OverviewDoc, Phone, TModel,
    TModelInstanceInfo,
};
pub use qualifiers::{
    FindQualifiers, SortAxis, SortDirection, EXACT_NAME_MATCH, SORT_BY_DATE_ASC,
    SORT_BY_DATE_DESC, SORT_BY_NAME_ASC, SORT_BY_NAME_DESC,
};
