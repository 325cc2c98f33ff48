//! Error taxonomy for the registry core.
//!
//! Storage failures always abort the surrounding operation and surface to the
//! caller unchanged; a missing parent row on fetch is an absent result, not an
//! error, and never appears here.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The backing store rejected or failed a statement.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A mutating operation referenced a key that does not exist.
    #[error("Invalid key: {kind} '{key}' does not exist")]
    InvalidKey { kind: &'static str, key: String },

    /// The publisher does not own the entity it is trying to mutate.
    #[error("Publisher '{publisher}' does not own {kind} '{key}'")]
    UserMismatch {
        kind: &'static str,
        key: String,
        publisher: String,
    },

    /// A publisher assertion is missing required keyed-reference fields.
    #[error("Malformed assertion between '{from_key}' and '{to_key}': {reason}")]
    MalformedAssertion {
        from_key: String,
        to_key: String,
        reason: &'static str,
    },

    /// Caller supplied conflicting or unknown find qualifiers.
    #[error("Unsupported find qualifiers: {0}")]
    UnsupportedQualifiers(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
