// src/error.rs

use thiserror::Error;

/// Core error types for tarpkg
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database initialization error
    #[error("Failed to initialize database: {0}")]
    Init(String),

    /// Source tarball cannot be opened or parsed
    #[error("Unreadable archive {path}: {reason}")]
    ArchiveUnreadable { path: String, reason: String },

    /// Stored snapshot cannot be decoded
    #[error("Corrupt manifest for package '{0}'")]
    ManifestCorrupt(String),

    /// Delete requested for a package with no manifest record
    #[error("Package '{0}' is not installed")]
    PackageNotFound(String),

    /// Tracked state and the filesystem tree disagree
    #[error("Filesystem inconsistency: {0}")]
    FilesystemInconsistency(String),
}

/// Result type alias using tarpkg's Error type
pub type Result<T> = std::result::Result<T, Error>;
