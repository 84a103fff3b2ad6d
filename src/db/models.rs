// src/db/models.rs

//! Data models for tarpkg database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

/// A PackageRecord represents one installed tarball, keyed by base name
#[derive(Debug, Clone)]
pub struct PackageRecord {
    pub id: Option<i64>,
    pub name: String,
    pub installed_at: Option<String>,
    pub updated_at: Option<String>,
}

impl PackageRecord {
    /// Create a new PackageRecord
    pub fn new(name: String) -> Self {
        Self {
            id: None,
            name,
            installed_at: None,
            updated_at: None,
        }
    }

    /// Insert this package into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO packages (name) VALUES (?1)",
            params![&self.name],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a package by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, installed_at, updated_at FROM packages WHERE name = ?1",
        )?;

        let package = stmt.query_row([name], Self::from_row).optional()?;

        Ok(package)
    }

    /// List all package names, sorted
    pub fn list_names(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM packages ORDER BY name")?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(names)
    }

    /// Mark a package as updated now
    pub fn touch(conn: &Connection, id: i64) -> Result<()> {
        conn.execute(
            "UPDATE packages SET updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
            [id],
        )?;
        Ok(())
    }

    /// Delete a package by ID (entries cascade)
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM packages WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Convert a database row to a PackageRecord
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            installed_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }
}

/// An EntryRow is one archive member of a package's stored snapshot.
/// The kind column is kept raw here; decoding to a typed kind happens in
/// the manifest layer where a bad value becomes a corrupt-manifest error.
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub id: Option<i64>,
    pub package_id: i64,
    pub path: String,
    pub kind: String,
    pub mtime: i64,
    pub canonical: Vec<u8>,
}

impl EntryRow {
    /// Create a new EntryRow
    pub fn new(package_id: i64, path: String, kind: String, mtime: i64, canonical: Vec<u8>) -> Self {
        Self {
            id: None,
            package_id,
            path,
            kind,
            mtime,
            canonical,
        }
    }

    /// Insert this entry into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO entries (package_id, path, kind, mtime, canonical)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &self.package_id,
                &self.path,
                &self.kind,
                &self.mtime,
                &self.canonical,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find all entries belonging to a package
    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, package_id, path, kind, mtime, canonical
             FROM entries WHERE package_id = ?1",
        )?;

        let entries = stmt
            .query_map([package_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Delete all entries belonging to a package
    pub fn delete_by_package(conn: &Connection, package_id: i64) -> Result<()> {
        conn.execute("DELETE FROM entries WHERE package_id = ?1", [package_id])?;
        Ok(())
    }

    /// Convert a database row to an EntryRow
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            package_id: row.get(1)?,
            path: row.get(2)?,
            kind: row.get(3)?,
            mtime: row.get(4)?,
            canonical: row.get(5)?,
        })
    }
}
