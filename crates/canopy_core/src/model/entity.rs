//! Entity metadata view and object typing.
//!
//! # Responsibility
//! - Define the read-only metadata snapshot shared by all backends.
//! - Define the sealed folder/document object typing used by storage code.
//!
//! # Invariants
//! - `modified_at` is never earlier than `created_at`.
//! - Identity is the normalized path, not the snapshot instance.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Read permission bit.
pub const PERMISSION_READ: u32 = 0b100;
/// Write permission bit.
pub const PERMISSION_WRITE: u32 = 0b010;
/// Execute/traverse permission bit.
pub const PERMISSION_EXECUTE: u32 = 0b001;
/// Default permission mask for newly created entities.
pub const PERMISSION_FULL: u32 = PERMISSION_READ | PERMISSION_WRITE | PERMISSION_EXECUTE;

/// Sealed object typing for repository entities.
///
/// Folder and document are mutually exclusive at a given path. Backends
/// switch on the string identifier when choosing which table or filesystem
/// node shape to touch, so the identifier set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Container entity holding named children.
    Folder,
    /// Leaf entity holding binary or text content.
    Document,
}

impl ObjectKind {
    /// Returns the stable string identifier persisted by backends.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Folder => "folder",
            Self::Document => "document",
        }
    }

    /// Parses a persisted identifier back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "folder" => Some(Self::Folder),
            "document" => Some(Self::Document),
            _ => None,
        }
    }
}

/// Read-only metadata snapshot for one repository entity.
///
/// Timestamps are Unix epoch milliseconds. Two snapshots are equal whenever
/// they describe the same normalized path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInformation {
    /// Last path segment.
    pub name: String,
    /// Full normalized repository path.
    pub path: String,
    /// Permission bitmask.
    pub permissions: u32,
    /// Content size in bytes; `0` for folders.
    pub size: u64,
    /// Actor that created the entity.
    pub created_by: String,
    /// Creation time in epoch milliseconds.
    pub created_at: i64,
    /// Actor of the latest content mutation.
    pub modified_by: String,
    /// Latest mutation time in epoch milliseconds.
    pub modified_at: i64,
}

impl PartialEq for EntityInformation {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for EntityInformation {}

impl Hash for EntityInformation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// Classifies content bytes as binary or text.
///
/// A NUL byte or invalid UTF-8 marks the buffer as binary; everything else
/// is treated as text.
pub fn is_binary_content(content: &[u8]) -> bool {
    content.contains(&0) || std::str::from_utf8(content).is_err()
}

#[cfg(test)]
mod tests {
    use super::{is_binary_content, EntityInformation, ObjectKind, PERMISSION_FULL};

    fn info(path: &str, modified_by: &str) -> EntityInformation {
        EntityInformation {
            name: path.rsplit('/').next().unwrap_or("").to_string(),
            path: path.to_string(),
            permissions: PERMISSION_FULL,
            size: 0,
            created_by: "guest".to_string(),
            created_at: 1,
            modified_by: modified_by.to_string(),
            modified_at: 2,
        }
    }

    #[test]
    fn object_kind_round_trips_string_identifier() {
        assert_eq!(ObjectKind::parse("folder"), Some(ObjectKind::Folder));
        assert_eq!(ObjectKind::parse("document"), Some(ObjectKind::Document));
        assert_eq!(ObjectKind::parse("link"), None);
        assert_eq!(ObjectKind::Document.as_str(), "document");
    }

    #[test]
    fn equality_ignores_everything_but_path() {
        assert_eq!(info("/a/x.txt", "guest1"), info("/a/x.txt", "guest2"));
        assert_ne!(info("/a/x.txt", "guest1"), info("/a/y.txt", "guest1"));
    }

    #[test]
    fn sniffing_separates_text_from_binary() {
        assert!(!is_binary_content(b"plain text"));
        assert!(!is_binary_content(b""));
        assert!(is_binary_content(&[0x00, 0x01, 0x02]));
        assert!(is_binary_content(&[0xff, 0xfe]));
    }
}
