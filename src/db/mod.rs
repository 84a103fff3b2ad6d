// src/db/mod.rs

//! Manifest database for tarpkg
//!
//! This module handles all SQLite operations including:
//! - Database initialization and schema migration
//! - Connection management and transaction handling
//! - The [`ManifestStore`]: durable per-package snapshot records
//!
//! A stored snapshot must always equal the post-operation on-disk state's
//! provenance; [`ManifestStore::store`] is therefore a single transaction
//! replacing the whole snapshot, and the database runs in WAL mode so a
//! committed store survives process restart.

pub mod models;
pub mod schema;

use crate::archive::{ArchiveEntry, EntryKind};
use crate::error::{Error, Result};
use models::{EntryRow, PackageRecord};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default manifest database location under a root directory
pub fn default_db_path(root: &Path) -> PathBuf {
    root.join(".tarpkg").join("tarpkg.db")
}

/// Initialize the manifest database at the specified path
///
/// Creates the database file, sets pragmas, and applies migrations.
/// This is idempotent - calling it on an existing database is safe.
pub fn init(db_path: &str) -> Result<()> {
    debug!("Initializing database at: {}", db_path);

    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Init(format!("Failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)?;

    // Set pragmas for better performance and reliability
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    schema::migrate(&conn)?;

    Ok(())
}

/// Open an existing manifest database
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        return Err(Error::Init(format!("Database not found at path: {}", db_path)));
    }

    let conn = Connection::open(db_path)?;

    // Set pragmas
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;

    Ok(conn)
}

/// Run `f` inside a transaction, committing on Ok and rolling back on Err
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&rusqlite::Transaction) -> Result<T>,
{
    let tx = conn.transaction()?;
    let result = f(&tx)?;
    tx.commit()?;
    Ok(result)
}

/// Durable store of "what is currently installed", keyed by package name
pub struct ManifestStore {
    conn: Connection,
}

impl ManifestStore {
    /// Open the store, creating and migrating the database as needed
    pub fn open(db_path: &str) -> Result<Self> {
        init(db_path)?;
        let conn = open(db_path)?;
        Ok(Self { conn })
    }

    /// Whether a record exists for `name`
    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(PackageRecord::find_by_name(&self.conn, name)?.is_some())
    }

    /// Load the stored snapshot for `name`
    pub fn load(&self, name: &str) -> Result<Vec<ArchiveEntry>> {
        let record = PackageRecord::find_by_name(&self.conn, name)?
            .ok_or_else(|| Error::PackageNotFound(name.to_string()))?;
        let package_id = record
            .id
            .ok_or_else(|| Error::ManifestCorrupt(name.to_string()))?;

        let rows = EntryRow::find_by_package(&self.conn, package_id)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let kind = row
                .kind
                .parse::<EntryKind>()
                .map_err(|_| Error::ManifestCorrupt(name.to_string()))?;
            entries.push(ArchiveEntry::from_parts(
                row.path,
                kind,
                row.mtime,
                row.canonical,
            ));
        }

        Ok(entries)
    }

    /// Store the full snapshot for `name`, overwriting any prior record.
    /// One transaction: the old snapshot is never observable half-replaced.
    pub fn store(&mut self, name: &str, entries: &[ArchiveEntry]) -> Result<()> {
        transaction(&mut self.conn, |tx| {
            let package_id = match PackageRecord::find_by_name(tx, name)? {
                Some(record) => {
                    let id = record
                        .id
                        .ok_or_else(|| Error::ManifestCorrupt(name.to_string()))?;
                    PackageRecord::touch(tx, id)?;
                    EntryRow::delete_by_package(tx, id)?;
                    id
                }
                None => PackageRecord::new(name.to_string()).insert(tx)?,
            };

            for entry in entries {
                EntryRow::new(
                    package_id,
                    entry.path.clone(),
                    entry.kind.as_str().to_string(),
                    entry.mtime,
                    entry.canonical().to_vec(),
                )
                .insert(tx)?;
            }

            Ok(())
        })?;

        debug!("Stored snapshot for {} ({} entries)", name, entries.len());
        Ok(())
    }

    /// Remove the record for `name` entirely
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let record = PackageRecord::find_by_name(&self.conn, name)?
            .ok_or_else(|| Error::PackageNotFound(name.to_string()))?;
        let package_id = record
            .id
            .ok_or_else(|| Error::ManifestCorrupt(name.to_string()))?;

        PackageRecord::delete(&self.conn, package_id)?;
        Ok(())
    }

    /// All recorded package names, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        PackageRecord::list_names(&self.conn)
    }
}
