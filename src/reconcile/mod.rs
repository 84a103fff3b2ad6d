// src/reconcile/mod.rs

//! Reconciler: applies snapshot deltas to a live filesystem tree
//!
//! [`update`] installs a tarball on first sight and differentially updates
//! it afterwards; [`delete`] removes every tracked non-directory file.
//! After a successful apply, the full new snapshot is stored as the
//! package's manifest record, so the next diff compares against a valid
//! baseline.
//!
//! Within one update, all removals happen during the merge and the single
//! batched extraction runs after it; callers must not rely on that
//! ordering. If the process dies between the filesystem mutations and the
//! record write, tree and manifest disagree until the next successful
//! update — there is no recovery path, and errors abort before the record
//! is written precisely so the stored snapshot never describes a tree that
//! was not produced.

use crate::archive::{EntryKind, Tarball};
use crate::db::ManifestStore;
use crate::diff::{diff, ChangeRecord};
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Outcome of one [`update`] call, for CLI reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// No prior record existed: every entry was extracted unconditionally
    Installed { entries: usize },
    /// Differential update against the stored snapshot
    Updated { extracted: usize, removed: usize },
}

/// Install or update a tarball into `root`
///
/// The package is keyed by the tarball's base file name. With no prior
/// record this is a fresh install: every member is extracted, no diff is
/// computed. Otherwise the stored snapshot is diffed against the fresh
/// listing; added and modified non-directory members are queued and
/// extracted in one batched pass, removed non-directory members are
/// deleted immediately, and directory members are never individually
/// reconciled.
pub fn update(tarball_path: &Path, root: &Path, store: &mut ManifestStore) -> Result<UpdateOutcome> {
    let tarball = Tarball::open(tarball_path)?;
    let name = tarball.name().to_string();
    let new_entries = tarball.entries()?;

    if !store.exists(&name)? {
        info!("Installing {} ({} entries)", name, new_entries.len());
        let entries = tarball.extract_all(root)?;
        store.store(&name, &new_entries)?;
        return Ok(UpdateOutcome::Installed { entries });
    }

    info!("Updating {}", name);
    let old_entries = store.load(&name)?;

    let mut queued: HashSet<String> = HashSet::new();
    let mut removed = 0usize;

    for change in diff(old_entries, new_entries.clone()) {
        match change {
            ChangeRecord::Added(entry) | ChangeRecord::Modified { new: entry, .. } => {
                if entry.kind != EntryKind::Directory {
                    debug!(
                        "update {} {}",
                        root.join(&entry.path).display(),
                        display_mtime(entry.mtime)
                    );
                    queued.insert(entry.path);
                }
            }
            ChangeRecord::Removed(entry) => {
                if entry.kind != EntryKind::Directory {
                    let target = root.join(&entry.path);
                    debug!("remove {}", target.display());
                    std::fs::remove_file(&target).map_err(|e| {
                        Error::FilesystemInconsistency(format!(
                            "failed to remove {}: {}",
                            target.display(),
                            e
                        ))
                    })?;
                    removed += 1;
                }
            }
        }
    }

    let extracted = if queued.is_empty() {
        0
    } else {
        tarball.extract_paths(root, &queued)?
    };

    store.store(&name, &new_entries)?;
    Ok(UpdateOutcome::Updated { extracted, removed })
}

/// Delete an installed package from `root`
///
/// Every non-directory path in the stored snapshot is removed; a path
/// already missing on disk is a [`Error::FilesystemInconsistency`], not
/// silently skipped, because it signals manifest/tree drift. Directories
/// are left in place. Returns the number of files removed.
pub fn delete(name: &str, root: &Path, store: &mut ManifestStore) -> Result<usize> {
    let entries = store.load(name)?;
    info!("Deleting {} ({} entries)", name, entries.len());

    let mut removed = 0usize;
    for entry in &entries {
        if entry.kind == EntryKind::Directory {
            continue;
        }
        let target = root.join(&entry.path);
        debug!("remove {}", target.display());
        std::fs::remove_file(&target).map_err(|e| {
            Error::FilesystemInconsistency(format!(
                "failed to remove {}: {}",
                target.display(),
                e
            ))
        })?;
        removed += 1;
    }

    store.delete(name)?;
    Ok(removed)
}

/// All installed package names, sorted
pub fn list(store: &ManifestStore) -> Result<Vec<String>> {
    store.list()
}

fn display_mtime(mtime: i64) -> String {
    chrono::DateTime::from_timestamp(mtime, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| mtime.to_string())
}
