//! Caller-facing repository facade.
//!
//! # Responsibility
//! - Provide the inbound read/write/list entry points used by front-end
//!   layers (servlets, script engines, tooling).
//!
//! # Invariants
//! - The actor identity is scoped to exactly one mutating call; the
//!   service constructs the context for the operation and drops it after.

use crate::model::actor::ActorContext;
use crate::model::entity::EntityInformation;
use crate::repo::{Entity, RepoResult, Repository};

/// Facade over one constructed repository.
pub struct RepositoryService {
    repository: Repository,
}

impl RepositoryService {
    /// Wraps a constructed repository.
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Returns the underlying repository for handle-level access.
    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Resolves a path to the entity currently occupying it, if any.
    pub fn resolve(&self, path: &str) -> RepoResult<Option<Entity>> {
        self.repository.resolve(path)
    }

    /// Reads resource content as a fresh buffer.
    pub fn read(&self, path: &str) -> RepoResult<Vec<u8>> {
        self.repository.resource(path)?.content()
    }

    /// Writes resource content on behalf of `actor`, creating the resource
    /// and missing parent collections when absent.
    pub fn write(&self, path: &str, content: &[u8], actor: &str) -> RepoResult<()> {
        let ctx = ActorContext::new(actor);
        self.repository.resource(path)?.set_content(&ctx, content)
    }

    /// Lists the child names of a collection.
    pub fn list(&self, path: &str) -> RepoResult<Vec<String>> {
        self.repository.collection(path)?.children()
    }

    /// Removes the entity at `path`; collections are removed transitively.
    pub fn remove(&self, path: &str) -> RepoResult<()> {
        match self.resolve(path)? {
            Some(Entity::Collection(collection)) => collection.remove(),
            Some(Entity::Resource(resource)) => resource.remove(),
            None => Err(crate::repo::RepositoryError::NotFound(path.to_string())),
        }
    }

    /// Returns the metadata snapshot of the entity at `path`.
    pub fn metadata(&self, path: &str) -> RepoResult<EntityInformation> {
        match self.resolve(path)? {
            Some(Entity::Collection(collection)) => collection.information(),
            Some(Entity::Resource(resource)) => resource.information(),
            None => Err(crate::repo::RepositoryError::NotFound(path.to_string())),
        }
    }
}
