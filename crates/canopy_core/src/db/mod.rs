//! Relational storage bootstrap, migrations and catalog introspection.
//!
//! # Responsibility
//! - Open and configure database connections for the repository backend.
//! - Apply schema migrations in deterministic order.
//! - Expose live catalog metadata lookups to the persistence layer.
//!
//! # Invariants
//! - Migration state is tracked via `PRAGMA user_version`.
//! - Repository code must not touch application tables before migrations
//!   succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod metadata;
pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Errors from connection bootstrap and migration execution.
#[derive(Debug)]
pub enum DbError {
    /// Underlying driver error.
    Sqlite(rusqlite::Error),
    /// The database was written by a newer schema than this build supports.
    SchemaVersionAhead {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::SchemaVersionAhead {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::SchemaVersionAhead { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
