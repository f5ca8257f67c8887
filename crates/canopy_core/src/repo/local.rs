//! Filesystem storage backend.
//!
//! # Responsibility
//! - Map repository entities 1:1 onto filesystem nodes under one root.
//! - Persist logical identity metadata in sidecar records per path.
//!
//! # Invariants
//! - Content lives under `<root>/files`, sidecars under `<root>/meta`;
//!   the two trees mirror each other.
//! - Every mutation runs under a per-path scoped lock, released on all
//!   exit paths including failures.
//! - `created_*` sidecar fields survive content overwrites; `modified_*`
//!   are refreshed from the actor context and clock.

use crate::model::actor::ActorContext;
use crate::model::entity::{EntityInformation, ObjectKind, PERMISSION_FULL};
use crate::model::path::RepositoryPath;
use crate::repo::{now_epoch_ms, RepoResult, RepositoryBackend, RepositoryError};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

const FILES_DIR: &str = "files";
const META_DIR: &str = "meta";
const SIDECAR_SUFFIX: &str = ".json";

/// Logical identity metadata persisted next to each entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SidecarRecord {
    created_by: String,
    created_at: i64,
    modified_by: String,
    modified_at: i64,
    permissions: u32,
}

impl SidecarRecord {
    fn fresh(ctx: &ActorContext, stamp: i64) -> Self {
        Self {
            created_by: ctx.name().to_string(),
            created_at: stamp,
            modified_by: ctx.name().to_string(),
            modified_at: stamp,
            permissions: PERMISSION_FULL,
        }
    }

    fn touch(&mut self, ctx: &ActorContext, stamp: i64) {
        self.modified_by = ctx.name().to_string();
        self.modified_at = stamp.max(self.modified_at);
    }
}

/// Filesystem-backed repository.
pub struct LocalRepository {
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LocalRepository {
    /// Prepares the content and sidecar trees under `root`.
    pub fn try_new(root: impl Into<PathBuf>) -> RepoResult<Self> {
        let root = root.into();
        for dir in [root.join(FILES_DIR), root.join(META_DIR)] {
            fs::create_dir_all(&dir).map_err(|source| {
                RepositoryError::Initialization(format!(
                    "cannot prepare {}: {source}",
                    dir.display()
                ))
            })?;
        }
        info!(
            "event=repo_open module=repo.local status=ok root={}",
            root.display()
        );
        Ok(Self {
            root,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn node_path(&self, path: &RepositoryPath) -> PathBuf {
        let mut node = self.root.join(FILES_DIR);
        for segment in path.segments() {
            node.push(segment);
        }
        node
    }

    fn sidecar_path(&self, path: &RepositoryPath) -> PathBuf {
        let mut sidecar = self.root.join(META_DIR);
        if path.is_root() {
            return sidecar.join(format!(".root{SIDECAR_SUFFIX}"));
        }
        for segment in path.segments() {
            sidecar.push(segment);
        }
        sidecar.set_file_name(format!("{}{SIDECAR_SUFFIX}", path.last_segment()));
        sidecar
    }

    fn meta_dir_path(&self, path: &RepositoryPath) -> PathBuf {
        let mut dir = self.root.join(META_DIR);
        for segment in path.segments() {
            dir.push(segment);
        }
        dir
    }

    fn path_lock(&self, path: &RepositoryPath) -> Arc<Mutex<()>> {
        let mut locks = lock_unpoisoned(&self.locks);
        Arc::clone(
            locks
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    fn read_sidecar(&self, path: &RepositoryPath) -> Option<SidecarRecord> {
        let raw = fs::read(self.sidecar_path(path)).ok()?;
        serde_json::from_slice(&raw).ok()
    }

    fn write_sidecar(&self, path: &RepositoryPath, record: &SidecarRecord) -> RepoResult<()> {
        let sidecar = self.sidecar_path(path);
        if let Some(parent) = sidecar.parent() {
            fs::create_dir_all(parent).map_err(|source| io_err(path, source))?;
        }
        let raw = serde_json::to_vec(record).map_err(|source| {
            io_err(path, std::io::Error::new(std::io::ErrorKind::InvalidData, source))
        })?;
        fs::write(&sidecar, raw).map_err(|source| io_err(path, source))
    }

    /// Creates missing ancestor collections, stamped by `ctx`.
    fn ensure_parents(&self, ctx: &ActorContext, path: &RepositoryPath) -> RepoResult<()> {
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
            match self.kind(&ancestor)? {
                Some(ObjectKind::Folder) => {}
                Some(ObjectKind::Document) => {
                    return Err(RepositoryError::Conflict(ancestor.to_string()));
                }
                None => {
                    fs::create_dir(self.node_path(&ancestor))
                        .map_err(|source| io_err(&ancestor, source))?;
                    self.write_sidecar(&ancestor, &SidecarRecord::fresh(ctx, now_epoch_ms()))?;
                }
            }
        }
        Ok(())
    }

    fn remove_meta(&self, path: &RepositoryPath, kind: ObjectKind) {
        if path.is_root() {
            return;
        }
        // Sidecar cleanup is best-effort; a missing record never fails the
        // entity removal itself.
        let _ = fs::remove_file(self.sidecar_path(path));
        if kind == ObjectKind::Folder {
            let _ = fs::remove_dir_all(self.meta_dir_path(path));
        }
    }

    fn copy_tree(
        &self,
        ctx: &ActorContext,
        from: &RepositoryPath,
        to: &RepositoryPath,
    ) -> RepoResult<()> {
        match self.kind(from)? {
            Some(ObjectKind::Document) => {
                let content = fs::read(self.node_path(from)).map_err(|source| io_err(from, source))?;
                fs::write(self.node_path(to), content).map_err(|source| io_err(to, source))?;
                self.write_sidecar(to, &SidecarRecord::fresh(ctx, now_epoch_ms()))
            }
            Some(ObjectKind::Folder) => {
                fs::create_dir(self.node_path(to)).map_err(|source| io_err(to, source))?;
                self.write_sidecar(to, &SidecarRecord::fresh(ctx, now_epoch_ms()))?;
                for name in self.children(from)? {
                    self.copy_tree(ctx, &from.join(&name)?, &to.join(&name)?)?;
                }
                Ok(())
            }
            None => Err(RepositoryError::NotFound(from.to_string())),
        }
    }
}

impl RepositoryBackend for LocalRepository {
    fn kind(&self, path: &RepositoryPath) -> RepoResult<Option<ObjectKind>> {
        if path.is_root() {
            return Ok(Some(ObjectKind::Folder));
        }
        let node = self.node_path(path);
        if node.is_dir() {
            Ok(Some(ObjectKind::Folder))
        } else if node.is_file() {
            Ok(Some(ObjectKind::Document))
        } else {
            Ok(None)
        }
    }

    fn information(&self, path: &RepositoryPath) -> RepoResult<EntityInformation> {
        let kind = self
            .kind(path)?
            .ok_or_else(|| RepositoryError::NotFound(path.to_string()))?;

        let size = match kind {
            ObjectKind::Document => fs::metadata(self.node_path(path))
                .map_err(|source| io_err(path, source))?
                .len(),
            ObjectKind::Folder => 0,
        };

        let record = self.read_sidecar(path).unwrap_or_else(|| {
            // Node created outside the repository: derive what the
            // filesystem knows and leave the actors unknown.
            let stamp = fs::metadata(self.node_path(path))
                .ok()
                .and_then(|meta| meta.modified().ok())
                .and_then(|modified| modified.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|elapsed| elapsed.as_millis() as i64)
                .unwrap_or(0);
            SidecarRecord {
                created_by: "unknown".to_string(),
                created_at: stamp,
                modified_by: "unknown".to_string(),
                modified_at: stamp,
                permissions: PERMISSION_FULL,
            }
        });

        Ok(EntityInformation {
            name: path.last_segment().to_string(),
            path: path.to_string(),
            permissions: record.permissions,
            size,
            created_by: record.created_by,
            created_at: record.created_at,
            modified_by: record.modified_by,
            modified_at: record.modified_at,
        })
    }

    fn content(&self, path: &RepositoryPath) -> RepoResult<Vec<u8>> {
        if self.kind(path)? != Some(ObjectKind::Document) {
            return Err(RepositoryError::NotFound(path.to_string()));
        }
        fs::read(self.node_path(path)).map_err(|source| io_err(path, source))
    }

    fn create_resource(
        &self,
        ctx: &ActorContext,
        path: &RepositoryPath,
        content: &[u8],
    ) -> RepoResult<()> {
        let lock = self.path_lock(path);
        let _guard = lock_unpoisoned(&lock);

        if self.kind(path)?.is_some() {
            return Err(RepositoryError::Conflict(path.to_string()));
        }
        self.ensure_parents(ctx, path)?;
        fs::write(self.node_path(path), content).map_err(|source| io_err(path, source))?;
        self.write_sidecar(path, &SidecarRecord::fresh(ctx, now_epoch_ms()))?;
        info!(
            "event=repo_create module=repo.local kind=document path={path} actor={}",
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
        let lock = self.path_lock(path);
        let _guard = lock_unpoisoned(&lock);

        match self.kind(path)? {
            Some(ObjectKind::Folder) => return Err(RepositoryError::Conflict(path.to_string())),
            Some(ObjectKind::Document) => {
                let mut record = self
                    .read_sidecar(path)
                    .unwrap_or_else(|| SidecarRecord::fresh(ctx, now_epoch_ms()));
                fs::write(self.node_path(path), content)
                    .map_err(|source| io_err(path, source))?;
                record.touch(ctx, now_epoch_ms());
                self.write_sidecar(path, &record)?;
            }
            None => {
                self.ensure_parents(ctx, path)?;
                fs::write(self.node_path(path), content)
                    .map_err(|source| io_err(path, source))?;
                self.write_sidecar(path, &SidecarRecord::fresh(ctx, now_epoch_ms()))?;
            }
        }
        info!(
            "event=repo_write module=repo.local path={path} bytes={} actor={}",
            content.len(),
            ctx.name()
        );
        Ok(())
    }

    fn create_collection(&self, ctx: &ActorContext, path: &RepositoryPath) -> RepoResult<()> {
        let lock = self.path_lock(path);
        let _guard = lock_unpoisoned(&lock);

        if path.is_root() || self.kind(path)?.is_some() {
            return Err(RepositoryError::Conflict(path.to_string()));
        }
        self.ensure_parents(ctx, path)?;
        fs::create_dir(self.node_path(path)).map_err(|source| io_err(path, source))?;
        self.write_sidecar(path, &SidecarRecord::fresh(ctx, now_epoch_ms()))?;
        info!(
            "event=repo_create module=repo.local kind=folder path={path} actor={}",
            ctx.name()
        );
        Ok(())
    }

    fn children(&self, path: &RepositoryPath) -> RepoResult<Vec<String>> {
        if self.kind(path)? != Some(ObjectKind::Folder) {
            return Err(RepositoryError::NotFound(path.to_string()));
        }
        let entries = fs::read_dir(self.node_path(path)).map_err(|source| io_err(path, source))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| io_err(path, source))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn remove(&self, path: &RepositoryPath) -> RepoResult<()> {
        let lock = self.path_lock(path);
        let _guard = lock_unpoisoned(&lock);

        let kind = self
            .kind(path)?
            .ok_or_else(|| RepositoryError::NotFound(path.to_string()))?;
        match kind {
            ObjectKind::Document => {
                fs::remove_file(self.node_path(path)).map_err(|source| io_err(path, source))?;
            }
            ObjectKind::Folder if path.is_root() => {
                // Root stays; removing it empties the repository.
                for name in self.children(path)? {
                    self.remove(&path.join(&name)?)?;
                }
            }
            ObjectKind::Folder => {
                fs::remove_dir_all(self.node_path(path))
                    .map_err(|source| io_err(path, source))?;
            }
        }
        self.remove_meta(path, kind);
        info!("event=repo_remove module=repo.local path={path} kind={}", kind.as_str());
        Ok(())
    }

    fn rename(
        &self,
        ctx: &ActorContext,
        from: &RepositoryPath,
        to: &RepositoryPath,
    ) -> RepoResult<()> {
        let lock = self.path_lock(from);
        let _guard = lock_unpoisoned(&lock);

        let kind = self
            .kind(from)?
            .ok_or_else(|| RepositoryError::NotFound(from.to_string()))?;
        if self.kind(to)?.is_some() {
            return Err(RepositoryError::Conflict(to.to_string()));
        }

        self.ensure_parents(ctx, to)?;
        fs::rename(self.node_path(from), self.node_path(to))
            .map_err(|source| io_err(from, source))?;

        if let Some(mut record) = self.read_sidecar(from) {
            record.touch(ctx, now_epoch_ms());
            self.write_sidecar(to, &record)?;
        }
        if kind == ObjectKind::Folder {
            let _ = fs::rename(self.meta_dir_path(from), self.meta_dir_path(to));
        }
        let _ = fs::remove_file(self.sidecar_path(from));

        info!(
            "event=repo_rename module=repo.local from={from} to={to} actor={}",
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
        let lock = self.path_lock(to);
        let _guard = lock_unpoisoned(&lock);

        if self.kind(from)?.is_none() {
            return Err(RepositoryError::NotFound(from.to_string()));
        }
        if self.kind(to)?.is_some() {
            return Err(RepositoryError::Conflict(to.to_string()));
        }
        self.ensure_parents(ctx, to)?;
        self.copy_tree(ctx, from, to)?;
        info!(
            "event=repo_copy module=repo.local from={from} to={to} actor={}",
            ctx.name()
        );
        Ok(())
    }
}

fn io_err(path: &RepositoryPath, source: std::io::Error) -> RepositoryError {
    RepositoryError::Io {
        path: path.to_string(),
        source,
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
