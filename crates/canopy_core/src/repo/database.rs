//! Relational storage backend with a folder/document table mapping.
//!
//! # Responsibility
//! - Map repository entities onto object rows plus a path-keyed content
//!   table with a blob column.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Paths are at most 255 characters; longer writes are rejected before
//!   any statement runs.
//! - A NULL content blob reads as empty bytes, never as an error.
//! - The connection is acquired per logical operation through a scoped
//!   guard released on every exit path.

use crate::db::metadata::{table_metadata, CaseSensitivity};
use crate::model::actor::ActorContext;
use crate::model::entity::{EntityInformation, ObjectKind, PERMISSION_FULL};
use crate::model::path::{InvalidPathError, RepositoryPath};
use crate::repo::{now_epoch_ms, RepoResult, RepositoryBackend, RepositoryError};
use crate::sql::sequence::NextValueBuilder;
use crate::sql::{DialectId, DialectResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};

/// Storage limit of the `FILE_PATH` primary key columns.
pub const MAX_PATH_LENGTH: usize = 255;

const OBJECTS_TABLE: &str = "CANOPY_FILES";
const CONTENT_TABLE: &str = "CANOPY_FILES_CONTENT";

const REQUIRED_OBJECT_COLUMNS: &[&str] = &[
    "FILE_PATH",
    "FILE_PARENT",
    "FILE_NAME",
    "FILE_TYPE",
    "FILE_PERMISSIONS",
    "FILE_CREATED_BY",
    "FILE_CREATED_AT",
    "FILE_MODIFIED_BY",
    "FILE_MODIFIED_AT",
];
const REQUIRED_CONTENT_COLUMNS: &[&str] = &["FILE_PATH", "FILE_CONTENT"];

/// Database-backed repository.
pub struct DatabaseRepository {
    conn: Mutex<Connection>,
    dialect: DialectId,
}

impl std::fmt::Debug for DatabaseRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseRepository")
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}

impl DatabaseRepository {
    /// Wraps a migrated connection after validating the table shape.
    ///
    /// Required tables and columns are checked through live catalog
    /// introspection; a missing piece fails construction instead of
    /// surfacing later as a broken statement.
    pub fn try_new(
        conn: Connection,
        dialect: DialectId,
        case: CaseSensitivity,
    ) -> RepoResult<Self> {
        for (table, required) in [
            (OBJECTS_TABLE, REQUIRED_OBJECT_COLUMNS),
            (CONTENT_TABLE, REQUIRED_CONTENT_COLUMNS),
        ] {
            let model = table_metadata(&conn, table, None, case)?;
            if model.columns.is_empty() {
                return Err(RepositoryError::Initialization(format!(
                    "required table `{table}` is missing"
                )));
            }
            for &column in required {
                if !model.columns.iter().any(|c| c.name.eq_ignore_ascii_case(column)) {
                    return Err(RepositoryError::Initialization(format!(
                        "required column `{column}` is missing from table `{table}`"
                    )));
                }
            }
        }
        info!("event=repo_open module=repo.database status=ok dialect={dialect}");
        Ok(Self {
            conn: Mutex::new(conn),
            dialect,
        })
    }

    /// Returns the configured engine dialect.
    pub fn dialect(&self) -> DialectId {
        self.dialect
    }

    /// Generates the next-value statement for a sequence on the configured
    /// dialect.
    pub fn next_value_sql(&self, sequence: &str) -> DialectResult<String> {
        NextValueBuilder::new(self.dialect, sequence).build()
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RepositoryBackend for DatabaseRepository {
    fn kind(&self, path: &RepositoryPath) -> RepoResult<Option<ObjectKind>> {
        let conn = self.connection();
        kind_at(&conn, &path.to_string())
    }

    fn information(&self, path: &RepositoryPath) -> RepoResult<EntityInformation> {
        if path.is_root() {
            return Ok(root_information());
        }
        let conn = self.connection();
        let row = conn
            .query_row(
                "SELECT f.FILE_NAME, f.FILE_PERMISSIONS, f.FILE_CREATED_BY, f.FILE_CREATED_AT,
                        f.FILE_MODIFIED_BY, f.FILE_MODIFIED_AT,
                        IFNULL(length(c.FILE_CONTENT), 0)
                 FROM CANOPY_FILES f
                 LEFT JOIN CANOPY_FILES_CONTENT c ON c.FILE_PATH = f.FILE_PATH
                 WHERE f.FILE_PATH = ?1;",
                [path.to_string()],
                |row| {
                    Ok(EntityInformation {
                        name: row.get(0)?,
                        path: path.to_string(),
                        permissions: row.get(1)?,
                        size: row.get::<_, i64>(6)? as u64,
                        created_by: row.get(2)?,
                        created_at: row.get(3)?,
                        modified_by: row.get(4)?,
                        modified_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        row.ok_or_else(|| RepositoryError::NotFound(path.to_string()))
    }

    fn content(&self, path: &RepositoryPath) -> RepoResult<Vec<u8>> {
        let conn = self.connection();
        let blob = conn
            .query_row(
                "SELECT c.FILE_CONTENT
                 FROM CANOPY_FILES f
                 LEFT JOIN CANOPY_FILES_CONTENT c ON c.FILE_PATH = f.FILE_PATH
                 WHERE f.FILE_PATH = ?1 AND f.FILE_TYPE = 'document';",
                [path.to_string()],
                |row| row.get::<_, Option<Vec<u8>>>(0),
            )
            .optional()?;
        match blob {
            // NULL content and empty content are indistinguishable here.
            Some(stored) => Ok(stored.unwrap_or_default()),
            None => Err(RepositoryError::NotFound(path.to_string())),
        }
    }

    fn create_resource(
        &self,
        ctx: &ActorContext,
        path: &RepositoryPath,
        content: &[u8],
    ) -> RepoResult<()> {
        let path_str = checked_path(path)?;
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        if kind_at(&tx, &path_str)?.is_some() {
            return Err(RepositoryError::Conflict(path_str));
        }
        ensure_parents(&tx, ctx, path)?;
        insert_object(&tx, ctx, path, ObjectKind::Document)?;
        tx.execute(
            "INSERT INTO CANOPY_FILES_CONTENT (FILE_PATH, FILE_CONTENT) VALUES (?1, ?2);",
            params![path_str, content],
        )?;
        tx.commit()?;
        info!(
            "event=repo_create module=repo.database kind=document path={path} actor={}",
            ctx.name()
        );
        Ok(())
    }

    fn set_content(
        &self,
        ctx: &ActorContext,
        path: &RepositoryPath,
        content: &[u8],
    ) -> RepoResult<()> {
        let path_str = checked_path(path)?;
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        match kind_at(&tx, &path_str)? {
            Some(ObjectKind::Folder) => return Err(RepositoryError::Conflict(path_str)),
            Some(ObjectKind::Document) => {
                tx.execute(
                    "UPDATE CANOPY_FILES
                     SET FILE_MODIFIED_BY = ?2, FILE_MODIFIED_AT = ?3
                     WHERE FILE_PATH = ?1;",
                    params![path_str, ctx.name(), now_epoch_ms()],
                )?;
                tx.execute(
                    "INSERT INTO CANOPY_FILES_CONTENT (FILE_PATH, FILE_CONTENT)
                     VALUES (?1, ?2)
                     ON CONFLICT (FILE_PATH) DO UPDATE SET FILE_CONTENT = excluded.FILE_CONTENT;",
                    params![path_str, content],
                )?;
            }
            None => {
                ensure_parents(&tx, ctx, path)?;
                insert_object(&tx, ctx, path, ObjectKind::Document)?;
                tx.execute(
                    "INSERT INTO CANOPY_FILES_CONTENT (FILE_PATH, FILE_CONTENT) VALUES (?1, ?2);",
                    params![path_str, content],
                )?;
            }
        }
        tx.commit()?;
        info!(
            "event=repo_write module=repo.database path={path} bytes={} actor={}",
            content.len(),
            ctx.name()
        );
        Ok(())
    }

    fn create_collection(&self, ctx: &ActorContext, path: &RepositoryPath) -> RepoResult<()> {
        let path_str = checked_path(path)?;
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        if path.is_root() || kind_at(&tx, &path_str)?.is_some() {
            return Err(RepositoryError::Conflict(path_str));
        }
        ensure_parents(&tx, ctx, path)?;
        insert_object(&tx, ctx, path, ObjectKind::Folder)?;
        tx.commit()?;
        info!(
            "event=repo_create module=repo.database kind=folder path={path} actor={}",
            ctx.name()
        );
        Ok(())
    }

    fn children(&self, path: &RepositoryPath) -> RepoResult<Vec<String>> {
        let conn = self.connection();
        let path_str = path.to_string();
        if kind_at(&conn, &path_str)? != Some(ObjectKind::Folder) {
            return Err(RepositoryError::NotFound(path_str));
        }
        let mut stmt = conn.prepare(
            "SELECT FILE_NAME FROM CANOPY_FILES WHERE FILE_PARENT = ?1 ORDER BY FILE_NAME;",
        )?;
        let mut rows = stmt.query([path_str])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }

    fn remove(&self, path: &RepositoryPath) -> RepoResult<()> {
        let path_str = path.to_string();
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        let kind = kind_at(&tx, &path_str)?
            .ok_or_else(|| RepositoryError::NotFound(path_str.clone()))?;
        match kind {
            ObjectKind::Document => {
                tx.execute(
                    "DELETE FROM CANOPY_FILES_CONTENT WHERE FILE_PATH = ?1;",
                    [&path_str],
                )?;
                tx.execute("DELETE FROM CANOPY_FILES WHERE FILE_PATH = ?1;", [&path_str])?;
            }
            ObjectKind::Folder if path.is_root() => {
                tx.execute("DELETE FROM CANOPY_FILES_CONTENT;", [])?;
                tx.execute("DELETE FROM CANOPY_FILES;", [])?;
            }
            ObjectKind::Folder => {
                let prefix = like_prefix(&path_str);
                tx.execute(
                    "DELETE FROM CANOPY_FILES_CONTENT
                     WHERE FILE_PATH = ?1 OR FILE_PATH LIKE ?2 ESCAPE '\\';",
                    params![path_str, prefix],
                )?;
                tx.execute(
                    "DELETE FROM CANOPY_FILES
                     WHERE FILE_PATH = ?1 OR FILE_PATH LIKE ?2 ESCAPE '\\';",
                    params![path_str, prefix],
                )?;
            }
        }
        tx.commit()?;
        info!(
            "event=repo_remove module=repo.database path={path} kind={}",
            kind.as_str()
        );
        Ok(())
    }

    fn rename(
        &self,
        ctx: &ActorContext,
        from: &RepositoryPath,
        to: &RepositoryPath,
    ) -> RepoResult<()> {
        let from_str = from.to_string();
        let to_str = checked_path(to)?;
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        if kind_at(&tx, &from_str)?.is_none() {
            return Err(RepositoryError::NotFound(from_str));
        }
        if kind_at(&tx, &to_str)?.is_some() {
            return Err(RepositoryError::Conflict(to_str));
        }
        ensure_parents(&tx, ctx, to)?;

        for old_path in subtree_paths(&tx, &from_str)? {
            let new_path = rebase_path(&old_path, &from_str, &to_str)?;
            tx.execute(
                "UPDATE CANOPY_FILES
                 SET FILE_PATH = ?2, FILE_PARENT = ?3, FILE_NAME = ?4
                 WHERE FILE_PATH = ?1;",
                params![
                    old_path,
                    new_path,
                    parent_of(&new_path),
                    name_of(&new_path)
                ],
            )?;
            tx.execute(
                "UPDATE CANOPY_FILES_CONTENT SET FILE_PATH = ?2 WHERE FILE_PATH = ?1;",
                params![old_path, new_path],
            )?;
        }
        tx.execute(
            "UPDATE CANOPY_FILES SET FILE_MODIFIED_BY = ?2, FILE_MODIFIED_AT = ?3
             WHERE FILE_PATH = ?1;",
            params![to_str, ctx.name(), now_epoch_ms()],
        )?;
        tx.commit()?;
        info!(
            "event=repo_rename module=repo.database from={from} to={to} actor={}",
            ctx.name()
        );
        Ok(())
    }

    fn copy(
        &self,
        ctx: &ActorContext,
        from: &RepositoryPath,
        to: &RepositoryPath,
    ) -> RepoResult<()> {
        let from_str = from.to_string();
        let to_str = checked_path(to)?;
        let mut conn = self.connection();
        let tx = conn.transaction()?;

        if kind_at(&tx, &from_str)?.is_none() {
            return Err(RepositoryError::NotFound(from_str));
        }
        if kind_at(&tx, &to_str)?.is_some() {
            return Err(RepositoryError::Conflict(to_str));
        }
        ensure_parents(&tx, ctx, to)?;

        let stamp = now_epoch_ms();
        // Lexicographic order yields parents before their descendants.
        for old_path in subtree_paths(&tx, &from_str)? {
            let new_path = rebase_path(&old_path, &from_str, &to_str)?;
            tx.execute(
                "INSERT INTO CANOPY_FILES (FILE_PATH, FILE_PARENT, FILE_NAME, FILE_TYPE,
                                           FILE_PERMISSIONS, FILE_CREATED_BY, FILE_CREATED_AT,
                                           FILE_MODIFIED_BY, FILE_MODIFIED_AT)
                 SELECT ?2, ?3, ?4, FILE_TYPE, FILE_PERMISSIONS, ?5, ?6, ?5, ?6
                 FROM CANOPY_FILES WHERE FILE_PATH = ?1;",
                params![
                    old_path,
                    new_path,
                    parent_of(&new_path),
                    name_of(&new_path),
                    ctx.name(),
                    stamp
                ],
            )?;
            tx.execute(
                "INSERT INTO CANOPY_FILES_CONTENT (FILE_PATH, FILE_CONTENT)
                 SELECT ?2, FILE_CONTENT FROM CANOPY_FILES_CONTENT WHERE FILE_PATH = ?1;",
                params![old_path, new_path],
            )?;
        }
        tx.commit()?;
        info!(
            "event=repo_copy module=repo.database from={from} to={to} actor={}",
            ctx.name()
        );
        Ok(())
    }
}

fn root_information() -> EntityInformation {
    EntityInformation {
        name: String::new(),
        path: "/".to_string(),
        permissions: PERMISSION_FULL,
        size: 0,
        created_by: "system".to_string(),
        created_at: 0,
        modified_by: "system".to_string(),
        modified_at: 0,
    }
}

fn kind_at(conn: &Connection, path_str: &str) -> RepoResult<Option<ObjectKind>> {
    if path_str == "/" {
        return Ok(Some(ObjectKind::Folder));
    }
    let stored = conn
        .query_row(
            "SELECT FILE_TYPE FROM CANOPY_FILES WHERE FILE_PATH = ?1;",
            [path_str],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(stored.as_deref().and_then(ObjectKind::parse))
}

fn ensure_parents(conn: &Connection, ctx: &ActorContext, path: &RepositoryPath) -> RepoResult<()> {
    let mut ancestors = Vec::new();
    let mut cursor = path.parent();
    while let Some(ancestor) = cursor {
        if ancestor.is_root() {
            break;
        }
        cursor = ancestor.parent();
        ancestors.push(ancestor);
    }
    for ancestor in ancestors.into_iter().rev() {
        match kind_at(conn, &ancestor.to_string())? {
            Some(ObjectKind::Folder) => {}
            Some(ObjectKind::Document) => {
                return Err(RepositoryError::Conflict(ancestor.to_string()));
            }
            None => insert_object(conn, ctx, &ancestor, ObjectKind::Folder)?,
        }
    }
    Ok(())
}

fn insert_object(
    conn: &Connection,
    ctx: &ActorContext,
    path: &RepositoryPath,
    kind: ObjectKind,
) -> RepoResult<()> {
    let stamp = now_epoch_ms();
    let parent = path.parent().map_or_else(|| "/".to_string(), |p| p.to_string());
    conn.execute(
        "INSERT INTO CANOPY_FILES (FILE_PATH, FILE_PARENT, FILE_NAME, FILE_TYPE,
                                   FILE_PERMISSIONS, FILE_CREATED_BY, FILE_CREATED_AT,
                                   FILE_MODIFIED_BY, FILE_MODIFIED_AT)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?6, ?7);",
        params![
            path.to_string(),
            parent,
            path.last_segment(),
            kind.as_str(),
            PERMISSION_FULL,
            ctx.name(),
            stamp
        ],
    )?;
    Ok(())
}

fn subtree_paths(conn: &Connection, root: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT FILE_PATH FROM CANOPY_FILES
         WHERE FILE_PATH = ?1 OR FILE_PATH LIKE ?2 ESCAPE '\\'
         ORDER BY FILE_PATH;",
    )?;
    let mut rows = stmt.query(params![root, like_prefix(root)])?;
    let mut paths = Vec::new();
    while let Some(row) = rows.next()? {
        paths.push(row.get(0)?);
    }
    Ok(paths)
}

fn rebase_path(old_path: &str, from: &str, to: &str) -> RepoResult<String> {
    let new_path = format!("{to}{}", &old_path[from.len()..]);
    if new_path.chars().count() > MAX_PATH_LENGTH {
        return Err(RepositoryError::InvalidPath(InvalidPathError::TooLong {
            length: new_path.chars().count(),
            max: MAX_PATH_LENGTH,
        }));
    }
    Ok(new_path)
}

fn checked_path(path: &RepositoryPath) -> RepoResult<String> {
    let path_str = path.to_string();
    if path_str.chars().count() > MAX_PATH_LENGTH {
        return Err(RepositoryError::InvalidPath(InvalidPathError::TooLong {
            length: path_str.chars().count(),
            max: MAX_PATH_LENGTH,
        }));
    }
    Ok(path_str)
}

fn parent_of(path_str: &str) -> String {
    match path_str.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path_str[..index].to_string(),
    }
}

fn name_of(path_str: &str) -> &str {
    path_str.rsplit('/').next().unwrap_or("")
}

fn like_prefix(path_str: &str) -> String {
    let mut escaped = String::with_capacity(path_str.len() + 2);
    for ch in path_str.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push_str("/%");
    escaped
}

#[cfg(test)]
mod tests {
    use super::{like_prefix, name_of, parent_of, rebase_path};

    #[test]
    fn parent_and_name_derivation() {
        assert_eq!(parent_of("/a/b/c.txt"), "/a/b");
        assert_eq!(parent_of("/a"), "/");
        assert_eq!(name_of("/a/b/c.txt"), "c.txt");
    }

    #[test]
    fn like_prefix_escapes_wildcards() {
        assert_eq!(like_prefix("/a_b"), "/a\\_b/%");
        assert_eq!(like_prefix("/a%b"), "/a\\%b/%");
        assert_eq!(like_prefix("/plain"), "/plain/%");
    }

    #[test]
    fn rebase_moves_subtree_paths() {
        assert_eq!(rebase_path("/a/x.txt", "/a", "/b").unwrap(), "/b/x.txt");
        assert_eq!(rebase_path("/a", "/a", "/b").unwrap(), "/b");
    }
}
