//! Live catalog introspection for the persistence layer.
//!
//! # Responsibility
//! - Build table models (columns, keys, relations, type) from the catalog.
//! - Reconcile identifier case differences across engines via an explicit
//!   two-step lookup: exact name first, lowercased retry when the deployment
//!   is not case-sensitive.
//!
//! # Invariants
//! - The lowercase retry never runs when case sensitivity is enabled.
//! - A failed catalog query propagates; no partial model is returned.
//! - Primary-key flags are set only for columns whose name matches a key
//!   column reported by the catalog; unmatched key names are ignored.

use log::trace;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type IntrospectionResult<T> = Result<T, IntrospectionError>;

/// Errors from catalog metadata queries.
#[derive(Debug)]
pub enum IntrospectionError {
    /// A catalog query failed at the driver level.
    Query(rusqlite::Error),
}

impl Display for IntrospectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query(err) => write!(f, "catalog metadata query failed: {err}"),
        }
    }
}

impl Error for IntrospectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Query(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for IntrospectionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Query(value)
    }
}

/// Identifier case handling configured for the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseSensitivity {
    /// Object names match exactly; no fallback lookup is attempted.
    Sensitive,
    /// Empty exact lookups are retried with the lowercased name, covering
    /// engines that fold unquoted identifiers to lower case.
    Insensitive,
}

impl CaseSensitivity {
    /// Maps the configuration flag onto the lookup policy.
    pub fn from_flag(case_sensitive_names: bool) -> Self {
        if case_sensitive_names {
            Self::Sensitive
        } else {
            Self::Insensitive
        }
    }

    fn is_sensitive(self) -> bool {
        matches!(self, Self::Sensitive)
    }
}

/// One column of an introspected table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnModel {
    pub name: String,
    pub sql_type: String,
    pub primary_key: bool,
}

/// One foreign-key relation of an introspected table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationModel {
    pub fk_table: String,
    pub pk_table: String,
    pub fk_column: String,
    pub pk_column: String,
    pub fk_name: String,
    pub pk_name: String,
}

/// Catalog model of one table, accumulated by [`table_metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    pub table_name: String,
    pub schema_name: Option<String>,
    pub table_type: Option<String>,
    pub columns: Vec<ColumnModel>,
    pub relations: Vec<RelationModel>,
}

/// Strips one level of identifier quoting (`"Foo"` -> `Foo`).
pub fn normalize_table_name(table: &str) -> &str {
    if table.len() >= 2 && table.starts_with('"') && table.ends_with('"') {
        &table[1..table.len() - 1]
    } else {
        table
    }
}

/// Builds the catalog model for one table.
///
/// Columns, primary keys, foreign keys and the table type are queried in
/// that order, each through the exact-then-lowercase lookup protocol.
///
/// # Errors
/// Any driver-level query failure propagates as
/// [`IntrospectionError::Query`]; the partially accumulated model is
/// discarded.
pub fn table_metadata(
    conn: &Connection,
    table_name: &str,
    schema_name: Option<&str>,
    case: CaseSensitivity,
) -> IntrospectionResult<TableModel> {
    let lookup = normalize_table_name(table_name);
    trace!("event=table_metadata module=db table={lookup} case={case:?}");

    let mut model = TableModel {
        table_name: table_name.to_string(),
        schema_name: schema_name.map(str::to_string),
        table_type: None,
        columns: Vec::new(),
        relations: Vec::new(),
    };

    model.columns = lookup_with_fallback(lookup, case, |name| column_rows(conn, name))?;
    for key_column in lookup_with_fallback(lookup, case, |name| primary_key_names(conn, name))? {
        mark_primary_key(&mut model, &key_column);
    }
    model.relations = lookup_with_fallback(lookup, case, |name| relation_rows(conn, name))?;
    model.table_type = lookup_with_fallback(lookup, case, |name| table_type_rows(conn, name))?
        .into_iter()
        .next_back();

    Ok(model)
}

/// Returns the schema holding `table_name`, restricted to table-type
/// objects, or `None` when no such table exists.
///
/// The lookup is exact; the case fallback protocol does not apply here.
pub fn table_schema(conn: &Connection, table_name: &str) -> IntrospectionResult<Option<String>> {
    let mut stmt =
        conn.prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1;")?;
    let exists = stmt.exists([normalize_table_name(table_name)])?;
    Ok(exists.then(|| "main".to_string()))
}

/// Exact lookup, then one lowercased retry when empty and not
/// case-sensitive. Kept as two observable steps rather than a silent
/// normalization.
fn lookup_with_fallback<T>(
    table: &str,
    case: CaseSensitivity,
    mut query: impl FnMut(&str) -> IntrospectionResult<Vec<T>>,
) -> IntrospectionResult<Vec<T>> {
    let rows = query(table)?;
    if !rows.is_empty() || case.is_sensitive() {
        return Ok(rows);
    }
    let lowered = table.to_lowercase();
    if lowered == table {
        return Ok(rows);
    }
    trace!("event=table_metadata_fallback module=db table={table} retry={lowered}");
    query(&lowered)
}

fn mark_primary_key(model: &mut TableModel, key_column: &str) {
    for column in &mut model.columns {
        if column.name == key_column {
            column.primary_key = true;
        }
    }
}

fn column_rows(conn: &Connection, table: &str) -> IntrospectionResult<Vec<ColumnModel>> {
    let mut stmt = conn.prepare(
        "SELECT p.name, p.type
         FROM sqlite_master m, pragma_table_info(m.name) p
         WHERE m.name = ?1 AND m.type IN ('table', 'view')
         ORDER BY p.cid;",
    )?;
    let mut rows = stmt.query([table])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(ColumnModel {
            name: row.get(0)?,
            sql_type: row.get(1)?,
            primary_key: false,
        });
    }
    Ok(columns)
}

fn primary_key_names(conn: &Connection, table: &str) -> IntrospectionResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT p.name
         FROM sqlite_master m, pragma_table_info(m.name) p
         WHERE m.name = ?1 AND m.type = 'table' AND p.pk > 0
         ORDER BY p.pk;",
    )?;
    let mut rows = stmt.query([table])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}

fn relation_rows(conn: &Connection, table: &str) -> IntrospectionResult<Vec<RelationModel>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.\"table\", p.\"from\", p.\"to\"
         FROM sqlite_master m, pragma_foreign_key_list(m.name) p
         WHERE m.name = ?1 AND m.type = 'table'
         ORDER BY p.id, p.seq;",
    )?;
    let mut rows = stmt.query([table])?;
    let mut relations = Vec::new();
    while let Some(row) = rows.next()? {
        let id: i64 = row.get(0)?;
        let pk_table: String = row.get(1)?;
        // The catalog does not expose constraint names; synthesize stable
        // identifiers from the tables involved.
        relations.push(RelationModel {
            fk_table: table.to_string(),
            pk_table: pk_table.clone(),
            fk_column: row.get(2)?,
            pk_column: row.get(3)?,
            fk_name: format!("FK_{table}_{id}"),
            pk_name: format!("PK_{pk_table}"),
        });
    }
    Ok(relations)
}

fn table_type_rows(conn: &Connection, table: &str) -> IntrospectionResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT m.type FROM sqlite_master m WHERE m.name = ?1;")?;
    let mut rows = stmt.query([table])?;
    let mut types = Vec::new();
    while let Some(row) = rows.next()? {
        let object_type: String = row.get(0)?;
        types.push(object_type.to_uppercase());
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::normalize_table_name;

    #[test]
    fn normalize_strips_wrapping_quotes_only() {
        assert_eq!(normalize_table_name("\"Foo\""), "Foo");
        assert_eq!(normalize_table_name("Foo"), "Foo");
        assert_eq!(normalize_table_name("\"Foo"), "\"Foo");
        assert_eq!(normalize_table_name("\""), "\"");
    }
}
