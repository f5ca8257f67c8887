//! Dialect-aware SQL fragment generation.
//!
//! # Responsibility
//! - Identify the configured database engine.
//! - Generate engine-specific SQL fragments from shared builder skeletons.
//!
//! # Invariants
//! - A dialect that cannot express a construct fails with a typed error
//!   naming the engine; generation never degrades to invalid SQL.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sequence;

pub type DialectResult<T> = Result<T, DialectError>;

/// Supported database engine dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectId {
    /// Portable ANSI-style generation.
    Default,
    /// SAP HANA.
    Hana,
    /// PostgreSQL.
    Postgres,
    /// MySQL.
    MySql,
    /// Sybase ASE.
    Sybase,
}

impl DialectId {
    /// Returns the engine identifier used in logs and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Hana => "hana",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sybase => "sybase",
        }
    }
}

impl Display for DialectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from dialect-aware SQL generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialectError {
    /// The engine cannot express the requested construct at all.
    UnsupportedOperation {
        dialect: DialectId,
        operation: &'static str,
    },
}

impl Display for DialectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedOperation { dialect, operation } => {
                write!(f, "dialect `{dialect}` does not support {operation}")
            }
        }
    }
}

impl Error for DialectError {}
