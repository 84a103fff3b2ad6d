// src/archive/entry.rs

//! Entry model for archive members
//!
//! An [`ArchiveEntry`] is one member of a snapshot: the previously recorded
//! state of a package loaded from the manifest, or a freshly listed member
//! of a source tarball. Entries are ordered by path and compared for change
//! detection by a canonical byte encoding of their full metadata plus a
//! digest of their payload. The two notions are independent: entries with
//! the same path always occupy the same slot in a merge regardless of
//! whether their contents agree.

use std::str::FromStr;

use sha2::{Digest, Sha256};

/// Kind of archive member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Regular,
    Directory,
    /// Symlinks, hardlinks, fifos, devices
    Other,
}

impl EntryKind {
    pub fn as_str(&self) -> &str {
        match self {
            EntryKind::Regular => "regular",
            EntryKind::Directory => "directory",
            EntryKind::Other => "other",
        }
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "regular" => Ok(EntryKind::Regular),
            "directory" => Ok(EntryKind::Directory),
            "other" => Ok(EntryKind::Other),
            _ => Err(format!("Invalid entry kind: {}", s)),
        }
    }
}

/// Header metadata of an archive member, used to derive the canonical
/// encoding at listing time
#[derive(Debug, Clone, Default)]
pub struct EntryMetadata {
    pub mode: u32,
    pub uid: u64,
    pub gid: u64,
    pub size: u64,
    pub mtime: u64,
    pub link_target: Option<String>,
    /// Hex SHA-256 of the member payload (empty payload hashes too)
    pub payload_sha256: String,
}

/// One member of a package snapshot
///
/// Equality is defined by the canonical encoding alone: two entries with the
/// same path but different mode, mtime, or payload are unequal. Path
/// ordering is deliberately not implemented here (`Ord` would have to agree
/// with `Eq`); the diff layer wraps entries for its heap instead.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub kind: EntryKind,
    /// Unix seconds, for display only
    pub mtime: i64,
    canonical: Vec<u8>,
}

impl ArchiveEntry {
    /// Build an entry from a freshly listed archive member, deriving the
    /// canonical encoding from its header metadata and payload digest.
    pub fn new(path: String, kind: EntryKind, meta: &EntryMetadata) -> Self {
        let canonical = Self::encode(&path, kind, meta);
        Self {
            path,
            kind,
            mtime: meta.mtime as i64,
            canonical,
        }
    }

    /// Rebuild an entry from persisted parts (manifest load)
    pub fn from_parts(path: String, kind: EntryKind, mtime: i64, canonical: Vec<u8>) -> Self {
        Self {
            path,
            kind,
            mtime,
            canonical,
        }
    }

    /// The canonical encoding this entry is compared by
    pub fn canonical(&self) -> &[u8] {
        &self.canonical
    }

    /// Canonical encoding: NUL-separated header fields followed by the
    /// payload digest. Stable across store/load round-trips because the
    /// manifest persists these bytes verbatim.
    fn encode(path: &str, kind: EntryKind, meta: &EntryMetadata) -> Vec<u8> {
        format!(
            "{}\x00{}\x00{:o}\x00{}\x00{}\x00{}\x00{}\x00{}\x00{}",
            path,
            kind.as_str(),
            meta.mode,
            meta.uid,
            meta.gid,
            meta.size,
            meta.mtime,
            meta.link_target.as_deref().unwrap_or(""),
            meta.payload_sha256,
        )
        .into_bytes()
    }
}

impl PartialEq for ArchiveEntry {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for ArchiveEntry {}

/// Hex SHA-256 of a payload buffer
pub fn payload_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}
