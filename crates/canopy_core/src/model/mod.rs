//! Domain model shared by every storage backend.
//!
//! # Responsibility
//! - Define the canonical path, metadata and identity types.
//! - Keep backend implementations free of model interpretation logic.
//!
//! # Invariants
//! - Every entity is identified by its normalized repository path.
//! - Metadata views are read-only snapshots, never live storage references.

pub mod actor;
pub mod entity;
pub mod path;
