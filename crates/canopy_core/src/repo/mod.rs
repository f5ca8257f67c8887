//! Repository abstraction and storage backend implementations.
//!
//! # Responsibility
//! - Define the backend capability contract shared by all substrates.
//! - Expose collection/resource handles as transient views over one path.
//!
//! # Invariants
//! - Folder and document are mutually exclusive at a given path.
//! - Handles never own canonical state; they hold a path plus a backend
//!   reference and re-query storage on every call.
//! - Content buffers are defensively copied on both read and write.

use crate::db::metadata::IntrospectionError;
use crate::db::DbError;
use crate::model::actor::ActorContext;
use crate::model::entity::{EntityInformation, ObjectKind};
use crate::model::path::{InvalidPathError, RepositoryPath};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod database;
pub mod factory;
pub mod local;

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Errors surfaced by repository operations.
///
/// Each failure class stays distinct so calling layers can render
/// path-not-found, conflicts and backend unavailability differently.
#[derive(Debug)]
pub enum RepositoryError {
    /// Malformed or out-of-root path.
    InvalidPath(InvalidPathError),
    /// Operation target does not exist with the expected kind.
    NotFound(String),
    /// Rename/copy/create destination is already occupied.
    Conflict(String),
    /// Local backend I/O failure, wrapped with the failing path.
    Io {
        path: String,
        source: std::io::Error,
    },
    /// Database backend transport failure.
    Db(DbError),
    /// Catalog metadata lookup failure.
    Introspection(IntrospectionError),
    /// Backend failed to start up.
    Initialization(String),
    /// Backend could not be allocated from the configuration.
    Creation(String),
}

impl Display for RepositoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(err) => write!(f, "{err}"),
            Self::NotFound(path) => write!(f, "entity not found: {path}"),
            Self::Conflict(path) => write!(f, "destination already exists: {path}"),
            Self::Io { path, source } => write!(f, "i/o failure at {path}: {source}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Introspection(err) => write!(f, "{err}"),
            Self::Initialization(message) => {
                write!(f, "repository initialization failed: {message}")
            }
            Self::Creation(message) => write!(f, "repository creation failed: {message}"),
        }
    }
}

impl Error for RepositoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidPath(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::Introspection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvalidPathError> for RepositoryError {
    fn from(value: InvalidPathError) -> Self {
        Self::InvalidPath(value)
    }
}

impl From<DbError> for RepositoryError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<IntrospectionError> for RepositoryError {
    fn from(value: IntrospectionError) -> Self {
        Self::Introspection(value)
    }
}

/// Capability contract implemented by every storage substrate.
///
/// Backends exclusively own the path-to-storage mapping; all methods take
/// normalized paths and re-resolve storage state per call.
pub trait RepositoryBackend: Send + Sync {
    /// Returns the kind occupying `path`, or `None` when vacant.
    fn kind(&self, path: &RepositoryPath) -> RepoResult<Option<ObjectKind>>;

    /// Returns the metadata snapshot for the entity at `path`.
    fn information(&self, path: &RepositoryPath) -> RepoResult<EntityInformation>;

    /// Returns a fresh copy of the document content at `path`.
    fn content(&self, path: &RepositoryPath) -> RepoResult<Vec<u8>>;

    /// Creates a document at `path` with the given content.
    ///
    /// Missing parent collections are created implicitly; an occupied path
    /// is a conflict.
    fn create_resource(
        &self,
        ctx: &ActorContext,
        path: &RepositoryPath,
        content: &[u8],
    ) -> RepoResult<()>;

    /// Writes document content, creating the document when absent.
    ///
    /// Refreshes `modified_by`/`modified_at`; never touches `created_*`.
    fn set_content(
        &self,
        ctx: &ActorContext,
        path: &RepositoryPath,
        content: &[u8],
    ) -> RepoResult<()>;

    /// Creates a collection at `path`, including missing parents.
    fn create_collection(&self, ctx: &ActorContext, path: &RepositoryPath) -> RepoResult<()>;

    /// Returns the child names of the collection at `path`, sorted by name.
    fn children(&self, path: &RepositoryPath) -> RepoResult<Vec<String>>;

    /// Removes the entity at `path`; collections are removed transitively.
    ///
    /// Removing a vacant path is a not-found error, not a no-op.
    fn remove(&self, path: &RepositoryPath) -> RepoResult<()>;

    /// Moves the entity at `from` to the vacant path `to`.
    fn rename(
        &self,
        ctx: &ActorContext,
        from: &RepositoryPath,
        to: &RepositoryPath,
    ) -> RepoResult<()>;

    /// Copies the entity at `from` to the vacant path `to`.
    fn copy(
        &self,
        ctx: &ActorContext,
        from: &RepositoryPath,
        to: &RepositoryPath,
    ) -> RepoResult<()>;
}

/// Entry point handing out collection/resource handles over one backend.
#[derive(Clone)]
pub struct Repository {
    backend: Arc<dyn RepositoryBackend>,
}

/// Resolved repository entity.
pub enum Entity {
    Collection(Collection),
    Resource(Resource),
}

impl Repository {
    /// Wraps a constructed backend.
    pub fn new(backend: Arc<dyn RepositoryBackend>) -> Self {
        Self { backend }
    }

    /// Returns a handle on the root collection.
    pub fn root(&self) -> Collection {
        Collection {
            backend: Arc::clone(&self.backend),
            path: RepositoryPath::root(),
        }
    }

    /// Returns a collection handle for `path` (the entity may be vacant).
    pub fn collection(&self, path: &str) -> RepoResult<Collection> {
        Ok(Collection {
            backend: Arc::clone(&self.backend),
            path: RepositoryPath::parse(path)?,
        })
    }

    /// Returns a resource handle for `path` (the entity may be vacant).
    pub fn resource(&self, path: &str) -> RepoResult<Resource> {
        Ok(Resource {
            backend: Arc::clone(&self.backend),
            path: RepositoryPath::parse(path)?,
        })
    }

    /// Resolves `path` to the entity currently occupying it, if any.
    pub fn resolve(&self, path: &str) -> RepoResult<Option<Entity>> {
        let parsed = RepositoryPath::parse(path)?;
        let entity = match self.backend.kind(&parsed)? {
            Some(ObjectKind::Folder) => Some(Entity::Collection(Collection {
                backend: Arc::clone(&self.backend),
                path: parsed,
            })),
            Some(ObjectKind::Document) => Some(Entity::Resource(Resource {
                backend: Arc::clone(&self.backend),
                path: parsed,
            })),
            None => None,
        };
        Ok(entity)
    }
}

/// Current wall-clock time in Unix epoch milliseconds.
pub(crate) fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Transient view over a folder-like container.
#[derive(Clone)]
pub struct Collection {
    backend: Arc<dyn RepositoryBackend>,
    path: RepositoryPath,
}

impl Collection {
    /// Returns the normalized path of this handle.
    pub fn path(&self) -> &RepositoryPath {
        &self.path
    }

    /// Returns whether a collection currently occupies this path.
    pub fn exists(&self) -> RepoResult<bool> {
        Ok(self.backend.kind(&self.path)? == Some(ObjectKind::Folder))
    }

    /// Returns the metadata snapshot of this collection.
    pub fn information(&self) -> RepoResult<EntityInformation> {
        self.require_folder()?;
        self.backend.information(&self.path)
    }

    /// Returns the sorted child names of this collection.
    pub fn children(&self) -> RepoResult<Vec<String>> {
        self.backend.children(&self.path)
    }

    /// Creates this collection, including missing parents.
    pub fn create(&self, ctx: &ActorContext) -> RepoResult<()> {
        self.backend.create_collection(ctx, &self.path)
    }

    /// Removes this collection and all descendants.
    pub fn remove(&self) -> RepoResult<()> {
        self.require_folder()?;
        self.backend.remove(&self.path)
    }

    /// Moves this collection to a vacant destination path.
    pub fn rename(&self, ctx: &ActorContext, new_path: &str) -> RepoResult<Collection> {
        let destination = RepositoryPath::parse(new_path)?;
        self.require_folder()?;
        self.backend.rename(ctx, &self.path, &destination)?;
        Ok(Collection {
            backend: Arc::clone(&self.backend),
            path: destination,
        })
    }

    /// Copies this collection to a vacant destination path.
    pub fn copy(&self, ctx: &ActorContext, new_path: &str) -> RepoResult<Collection> {
        let destination = RepositoryPath::parse(new_path)?;
        self.require_folder()?;
        self.backend.copy(ctx, &self.path, &destination)?;
        Ok(Collection {
            backend: Arc::clone(&self.backend),
            path: destination,
        })
    }

    /// Returns a handle on a named child collection.
    pub fn collection(&self, name: &str) -> RepoResult<Collection> {
        Ok(Collection {
            backend: Arc::clone(&self.backend),
            path: self.path.join(name)?,
        })
    }

    /// Returns a handle on a named child resource.
    pub fn resource(&self, name: &str) -> RepoResult<Resource> {
        Ok(Resource {
            backend: Arc::clone(&self.backend),
            path: self.path.join(name)?,
        })
    }

    fn require_folder(&self) -> RepoResult<()> {
        if self.backend.kind(&self.path)? != Some(ObjectKind::Folder) {
            return Err(RepositoryError::NotFound(self.path.to_string()));
        }
        Ok(())
    }
}

/// Transient view over a content-bearing leaf entity.
#[derive(Clone)]
pub struct Resource {
    backend: Arc<dyn RepositoryBackend>,
    path: RepositoryPath,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Resource {
    /// Returns the normalized path of this handle.
    pub fn path(&self) -> &RepositoryPath {
        &self.path
    }

    /// Returns whether a document currently occupies this path.
    pub fn exists(&self) -> RepoResult<bool> {
        Ok(self.backend.kind(&self.path)? == Some(ObjectKind::Document))
    }

    /// Returns the metadata snapshot of this resource.
    pub fn information(&self) -> RepoResult<EntityInformation> {
        self.require_document()?;
        self.backend.information(&self.path)
    }

    /// Returns a fresh copy of the stored content.
    ///
    /// Mutating the returned buffer never alters stored state.
    pub fn content(&self) -> RepoResult<Vec<u8>> {
        self.backend.content(&self.path)
    }

    /// Returns whether the stored content classifies as binary.
    pub fn is_binary(&self) -> RepoResult<bool> {
        Ok(crate::model::entity::is_binary_content(&self.content()?))
    }

    /// Creates this resource with initial content.
    ///
    /// Fails with a conflict when the path is already occupied.
    pub fn create(&self, ctx: &ActorContext, content: &[u8]) -> RepoResult<()> {
        self.backend.create_resource(ctx, &self.path, content)
    }

    /// Writes content, creating the resource when absent.
    pub fn set_content(&self, ctx: &ActorContext, content: &[u8]) -> RepoResult<()> {
        self.backend.set_content(ctx, &self.path, content)
    }

    /// Removes this resource.
    pub fn remove(&self) -> RepoResult<()> {
        self.require_document()?;
        self.backend.remove(&self.path)
    }

    /// Moves this resource to a vacant destination path.
    pub fn rename(&self, ctx: &ActorContext, new_path: &str) -> RepoResult<Resource> {
        let destination = RepositoryPath::parse(new_path)?;
        self.require_document()?;
        self.backend.rename(ctx, &self.path, &destination)?;
        Ok(Resource {
            backend: Arc::clone(&self.backend),
            path: destination,
        })
    }

    /// Copies this resource to a vacant destination path.
    pub fn copy(&self, ctx: &ActorContext, new_path: &str) -> RepoResult<Resource> {
        let destination = RepositoryPath::parse(new_path)?;
        self.require_document()?;
        self.backend.copy(ctx, &self.path, &destination)?;
        Ok(Resource {
            backend: Arc::clone(&self.backend),
            path: destination,
        })
    }

    fn require_document(&self) -> RepoResult<()> {
        if self.backend.kind(&self.path)? != Some(ObjectKind::Document) {
            return Err(RepositoryError::NotFound(self.path.to_string()));
        }
        Ok(())
    }
}
