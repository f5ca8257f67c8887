//! Core of the canopy virtual content repository.
//!
//! One path-addressed namespace of collections and resources served over
//! two storage substrates: a local filesystem tree and a relational
//! folder/document mapping. The persistence side carries dialect-aware SQL
//! generation and live catalog introspection.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sql;

pub use db::metadata::{
    table_metadata, table_schema, CaseSensitivity, ColumnModel, IntrospectionError,
    IntrospectionResult, RelationModel, TableModel,
};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging};
pub use model::actor::ActorContext;
pub use model::entity::{
    is_binary_content, EntityInformation, ObjectKind, PERMISSION_EXECUTE, PERMISSION_FULL,
    PERMISSION_READ, PERMISSION_WRITE,
};
pub use model::path::{InvalidPathError, PathResult, RepositoryPath};
pub use repo::database::DatabaseRepository;
pub use repo::factory::{create_repository, BackendKind, RepositoryConfig};
pub use repo::local::LocalRepository;
pub use repo::{
    Collection, Entity, RepoResult, Repository, RepositoryBackend, RepositoryError, Resource,
};
pub use service::repository_service::RepositoryService;
pub use sql::sequence::{DropSequenceBuilder, NextValueBuilder};
pub use sql::{DialectError, DialectId, DialectResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
