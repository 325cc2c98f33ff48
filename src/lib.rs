//! Registry core for a UDDI v2 style service directory.
//!
//! Businesses publish services, services expose binding templates, and
//! bindings reference shared tModels. The crate provides the inquiry and
//! publishing orchestrators over a PostgreSQL store, the predicate-narrowing
//! search engine behind the find operations, and the publisher-assertion
//! protocol for jointly confirmed business relationships.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

pub use error::{Error, Result};
