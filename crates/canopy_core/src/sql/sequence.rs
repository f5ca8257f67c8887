//! Sequence SQL builders.
//!
//! # Responsibility
//! - Generate next-value and drop statements for database sequences.
//!
//! # Invariants
//! - The sequence name is bound at construction; building is stateless and
//!   side-effect free apart from logging the generated text.

use super::{DialectError, DialectId, DialectResult};
use log::trace;

/// Builds the statement fetching the next value of a sequence.
#[derive(Debug, Clone)]
pub struct NextValueBuilder {
    dialect: DialectId,
    sequence: String,
}

impl NextValueBuilder {
    /// Binds the builder to a dialect and sequence name.
    pub fn new(dialect: DialectId, sequence: impl Into<String>) -> Self {
        Self {
            dialect,
            sequence: sequence.into(),
        }
    }

    /// Returns the bound sequence name.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Generates the next-value statement for the bound dialect.
    ///
    /// # Errors
    /// [`DialectError::UnsupportedOperation`] on engines without sequence
    /// support.
    pub fn build(&self) -> DialectResult<String> {
        let sql = match self.dialect {
            DialectId::Default => format!("SELECT NEXT VALUE FOR {}", self.sequence),
            DialectId::Hana => format!("SELECT {}.NEXTVAL FROM DUMMY", self.sequence),
            DialectId::Postgres => format!("SELECT nextval('{}')", self.sequence),
            DialectId::MySql | DialectId::Sybase => {
                return Err(DialectError::UnsupportedOperation {
                    dialect: self.dialect,
                    operation: "sequence next value generation",
                });
            }
        };
        trace!(
            "event=sql_generate module=sql builder=next_value dialect={} sql={sql}",
            self.dialect
        );
        Ok(sql)
    }
}

/// Builds the statement dropping a sequence.
#[derive(Debug, Clone)]
pub struct DropSequenceBuilder {
    dialect: DialectId,
    sequence: String,
}

impl DropSequenceBuilder {
    /// Binds the builder to a dialect and sequence name.
    pub fn new(dialect: DialectId, sequence: impl Into<String>) -> Self {
        Self {
            dialect,
            sequence: sequence.into(),
        }
    }

    /// Generates the drop-sequence statement for the bound dialect.
    ///
    /// # Errors
    /// [`DialectError::UnsupportedOperation`] on engines without sequence
    /// support.
    pub fn build(&self) -> DialectResult<String> {
        match self.dialect {
            DialectId::MySql | DialectId::Sybase => Err(DialectError::UnsupportedOperation {
                dialect: self.dialect,
                operation: "sequence removal",
            }),
            _ => {
                let sql = format!("DROP SEQUENCE {}", self.sequence);
                trace!(
                    "event=sql_generate module=sql builder=drop_sequence dialect={} sql={sql}",
                    self.dialect
                );
                Ok(sql)
            }
        }
    }
}
