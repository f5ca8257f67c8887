//! Backend selection and repository construction.
//!
//! # Responsibility
//! - Translate a repository configuration into a constructed backend.
//!
//! # Invariants
//! - Configuration problems surface as creation errors; backend start-up
//!   problems surface as initialization errors.

use crate::db::metadata::CaseSensitivity;
use crate::db::{open_db, open_db_in_memory};
use crate::repo::database::DatabaseRepository;
use crate::repo::local::LocalRepository;
use crate::repo::{RepoResult, Repository, RepositoryError};
use crate::sql::DialectId;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Storage substrate selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Filesystem tree under a configured root directory.
    Local,
    /// Relational folder/document mapping.
    Database,
}

/// Configuration consumed by [`create_repository`].
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Which substrate to construct.
    pub backend: BackendKind,
    /// Filesystem root; required for the local backend.
    pub root_dir: Option<PathBuf>,
    /// Database file; `None` selects an in-memory database.
    pub database_file: Option<PathBuf>,
    /// Whether object-name lookups are case-sensitive (disables the
    /// lowercase fallback in catalog introspection).
    pub case_sensitive_names: bool,
    /// Engine dialect used for generated SQL.
    pub dialect: DialectId,
}

impl RepositoryConfig {
    /// Local-backend configuration rooted at `root_dir`.
    pub fn local(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Local,
            root_dir: Some(root_dir.into()),
            database_file: None,
            case_sensitive_names: false,
            dialect: DialectId::Default,
        }
    }

    /// Database-backend configuration over an in-memory database.
    pub fn database_in_memory() -> Self {
        Self {
            backend: BackendKind::Database,
            root_dir: None,
            database_file: None,
            case_sensitive_names: false,
            dialect: DialectId::Default,
        }
    }
}

/// Constructs the repository selected by `config`.
pub fn create_repository(config: &RepositoryConfig) -> RepoResult<Repository> {
    match config.backend {
        BackendKind::Local => {
            let root = config.root_dir.as_ref().ok_or_else(|| {
                RepositoryError::Creation("local backend requires `root_dir`".to_string())
            })?;
            let backend = LocalRepository::try_new(root.clone())?;
            Ok(Repository::new(Arc::new(backend)))
        }
        BackendKind::Database => {
            let conn = match &config.database_file {
                Some(file) => open_db(file),
                None => open_db_in_memory(),
            }
            .map_err(|err| RepositoryError::Initialization(err.to_string()))?;
            let backend = DatabaseRepository::try_new(
                conn,
                config.dialect,
                CaseSensitivity::from_flag(config.case_sensitive_names),
            )?;
            Ok(Repository::new(Arc::new(backend)))
        }
    }
}
