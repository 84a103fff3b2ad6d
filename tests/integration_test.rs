// tests/integration_test.rs

//! Integration tests for tarpkg
//!
//! These tests drive the reconciler end-to-end over real tarballs in
//! temporary roots and verify the on-disk tree against the stored manifest.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tarpkg::db::ManifestStore;
use tarpkg::reconcile::{self, UpdateOutcome};
use tarpkg::Error;

enum Member<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

/// Build a gzipped tarball at `tar_path` with a fixed mtime, so building
/// the same member list twice yields byte-identical snapshots
fn build_tarball(tar_path: &Path, members: &[Member]) {
    std::fs::create_dir_all(tar_path.parent().unwrap()).unwrap();
    let file = File::create(tar_path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for member in members {
        match member {
            Member::Dir(path) => {
                let mut header = tar::Header::new_gnu();
                header.set_entry_type(tar::EntryType::Directory);
                header.set_path(path).unwrap();
                header.set_mode(0o755);
                header.set_uid(0);
                header.set_gid(0);
                header.set_size(0);
                header.set_mtime(1_700_000_000);
                header.set_cksum();
                builder.append(&header, std::io::empty()).unwrap();
            }
            Member::File(path, content) => {
                let mut header = tar::Header::new_gnu();
                header.set_path(path).unwrap();
                header.set_mode(0o644);
                header.set_uid(0);
                header.set_gid(0);
                header.set_size(content.len() as u64);
                header.set_mtime(1_700_000_000);
                header.set_cksum();
                builder.append(&header, *content).unwrap();
            }
        }
    }

    builder.into_inner().unwrap().finish().unwrap();
}

struct Scratch {
    _temp: tempfile::TempDir,
    root: PathBuf,
    base: PathBuf,
    db_path: String,
}

fn scratch() -> Scratch {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("root");
    std::fs::create_dir(&root).unwrap();
    let db_path = temp
        .path()
        .join("manifest.db")
        .to_string_lossy()
        .to_string();
    Scratch {
        base: temp.path().to_path_buf(),
        _temp: temp,
        root,
        db_path,
    }
}

#[test]
fn test_fresh_install_extracts_everything() {
    let s = scratch();
    let tar_path = s.base.join("v1/hello.tar.gz");
    build_tarball(
        &tar_path,
        &[
            Member::Dir("dir/"),
            Member::File("a.txt", b"1"),
            Member::File("dir/b.txt", b"2"),
        ],
    );

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    let outcome = reconcile::update(&tar_path, &s.root, &mut store).unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Installed { entries: 3 },
        "fresh install should extract every entry, all kinds"
    );
    assert_eq!(std::fs::read(s.root.join("a.txt")).unwrap(), b"1");
    assert_eq!(std::fs::read(s.root.join("dir/b.txt")).unwrap(), b"2");
    assert!(s.root.join("dir").is_dir());

    // the stored snapshot equals the archive listing
    let snapshot = store.load("hello.tar.gz").unwrap();
    let paths: HashSet<_> = snapshot.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["dir/", "a.txt", "dir/b.txt"].into_iter().collect());
}

#[test]
fn test_update_applies_differential_changes() {
    let s = scratch();
    let v1 = s.base.join("v1/pkg.tar.gz");
    let v2 = s.base.join("v2/pkg.tar.gz");
    build_tarball(
        &v1,
        &[
            Member::Dir("dir/"),
            Member::File("a.txt", b"1"),
            Member::File("keep.txt", b"same"),
        ],
    );
    build_tarball(
        &v2,
        &[
            Member::Dir("dir/"),
            Member::File("a.txt", b"2"),
            Member::File("b.txt", b"3"),
            Member::File("keep.txt", b"same"),
        ],
    );

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    reconcile::update(&v1, &s.root, &mut store).unwrap();

    // tamper with the unchanged file: an update must not re-extract it
    std::fs::write(s.root.join("keep.txt"), b"locally modified").unwrap();

    let outcome = reconcile::update(&v2, &s.root, &mut store).unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            extracted: 2,
            removed: 0
        },
        "one modified + one added file, nothing removed"
    );

    assert_eq!(std::fs::read(s.root.join("a.txt")).unwrap(), b"2");
    assert_eq!(std::fs::read(s.root.join("b.txt")).unwrap(), b"3");
    assert_eq!(
        std::fs::read(s.root.join("keep.txt")).unwrap(),
        b"locally modified",
        "unchanged entries are never re-extracted"
    );

    // the record now equals the v2 snapshot
    let snapshot = store.load("pkg.tar.gz").unwrap();
    let paths: HashSet<_> = snapshot.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        ["dir/", "a.txt", "b.txt", "keep.txt"].into_iter().collect()
    );
}

#[test]
fn test_update_removes_vanished_files() {
    let s = scratch();
    let v1 = s.base.join("v1/pkg.tar.gz");
    let v2 = s.base.join("v2/pkg.tar.gz");
    build_tarball(
        &v1,
        &[
            Member::Dir("dir/"),
            Member::File("gone.txt", b"x"),
            Member::File("dir/stays.txt", b"y"),
        ],
    );
    build_tarball(&v2, &[Member::Dir("dir/"), Member::File("dir/stays.txt", b"y")]);

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    reconcile::update(&v1, &s.root, &mut store).unwrap();
    let outcome = reconcile::update(&v2, &s.root, &mut store).unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            extracted: 0,
            removed: 1
        }
    );
    assert!(!s.root.join("gone.txt").exists());
    assert!(s.root.join("dir/stays.txt").exists());
    // directory entries are never individually deleted
    assert!(s.root.join("dir").is_dir());
}

#[test]
fn test_update_same_tarball_is_a_no_op() {
    let s = scratch();
    let tar_path = s.base.join("v1/pkg.tar.gz");
    build_tarball(
        &tar_path,
        &[Member::Dir("dir/"), Member::File("a.txt", b"1")],
    );

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    reconcile::update(&tar_path, &s.root, &mut store).unwrap();
    let outcome = reconcile::update(&tar_path, &s.root, &mut store).unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            extracted: 0,
            removed: 0
        },
        "identical snapshots diff to an empty change sequence"
    );
}

#[test]
fn test_delete_removes_files_and_record_but_not_directories() {
    let s = scratch();
    let tar_path = s.base.join("v1/pkg.tar.gz");
    build_tarball(
        &tar_path,
        &[
            Member::Dir("dir/"),
            Member::File("a.txt", b"1"),
            Member::File("dir/b.txt", b"2"),
        ],
    );

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    reconcile::update(&tar_path, &s.root, &mut store).unwrap();

    let removed = reconcile::delete("pkg.tar.gz", &s.root, &mut store).unwrap();

    assert_eq!(removed, 2);
    assert!(!s.root.join("a.txt").exists());
    assert!(!s.root.join("dir/b.txt").exists());
    assert!(
        s.root.join("dir").is_dir(),
        "directories are left untouched by delete"
    );
    assert!(!store.exists("pkg.tar.gz").unwrap());
}

#[test]
fn test_delete_unknown_package_is_not_found() {
    let s = scratch();
    let mut store = ManifestStore::open(&s.db_path).unwrap();

    let result = reconcile::delete("ghost.tar.gz", &s.root, &mut store);
    assert!(matches!(result, Err(Error::PackageNotFound(_))));
}

#[test]
fn test_delete_with_missing_file_is_an_inconsistency() {
    let s = scratch();
    let tar_path = s.base.join("v1/pkg.tar.gz");
    build_tarball(&tar_path, &[Member::File("a.txt", b"1")]);

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    reconcile::update(&tar_path, &s.root, &mut store).unwrap();

    // drift: someone removed the file behind our back
    std::fs::remove_file(s.root.join("a.txt")).unwrap();

    let result = reconcile::delete("pkg.tar.gz", &s.root, &mut store);
    assert!(
        matches!(result, Err(Error::FilesystemInconsistency(_))),
        "a missing tracked file is surfaced, not swallowed"
    );
    assert!(
        store.exists("pkg.tar.gz").unwrap(),
        "the record survives a failed delete"
    );
}

#[test]
fn test_failed_update_leaves_record_at_old_snapshot() {
    let s = scratch();
    let v1 = s.base.join("v1/pkg.tar.gz");
    let v2 = s.base.join("v2/pkg.tar.gz");
    build_tarball(&v1, &[Member::File("x.txt", b"1"), Member::File("y.txt", b"2")]);
    build_tarball(&v2, &[Member::File("y.txt", b"2")]);

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    reconcile::update(&v1, &s.root, &mut store).unwrap();

    // drift: x.txt is gone, so the removal step must fail
    std::fs::remove_file(s.root.join("x.txt")).unwrap();

    let result = reconcile::update(&v2, &s.root, &mut store);
    assert!(matches!(result, Err(Error::FilesystemInconsistency(_))));

    // the record was not advanced to v2
    let snapshot = store.load("pkg.tar.gz").unwrap();
    assert!(
        snapshot.iter().any(|e| e.path == "x.txt"),
        "a failed update must not record a snapshot that does not match reality"
    );
}

#[test]
fn test_unreadable_archive_is_surfaced() {
    let s = scratch();
    let mut store = ManifestStore::open(&s.db_path).unwrap();

    // missing file
    let result = reconcile::update(
        Path::new("/nonexistent/pkg.tar.gz"),
        &s.root,
        &mut store,
    );
    assert!(matches!(result, Err(Error::ArchiveUnreadable { .. })));

    // not a tarball at all
    let bogus = s.base.join("bogus.tar.gz");
    std::fs::write(&bogus, b"this is not a gzip stream").unwrap();
    let result = reconcile::update(&bogus, &s.root, &mut store);
    assert!(matches!(result, Err(Error::ArchiveUnreadable { .. })));

    // neither attempt created a record
    assert_eq!(reconcile::list(&store).unwrap().len(), 0);
}

#[test]
fn test_list_reflects_installs_and_deletes() {
    let s = scratch();
    let mut store = ManifestStore::open(&s.db_path).unwrap();
    assert!(reconcile::list(&store).unwrap().is_empty());

    for name in ["zeta.tar.gz", "alpha.tar.gz"] {
        let tar_path = s.base.join("pkgs").join(name);
        build_tarball(&tar_path, &[Member::File("f.txt", b"1")]);
        // packages may own the same path in different roots; keep them apart
        let root = s.base.join("roots").join(name);
        std::fs::create_dir_all(&root).unwrap();
        reconcile::update(&tar_path, &root, &mut store).unwrap();
    }

    assert_eq!(
        reconcile::list(&store).unwrap(),
        ["alpha.tar.gz", "zeta.tar.gz"],
        "names come back sorted"
    );

    let root = s.base.join("roots/alpha.tar.gz");
    reconcile::delete("alpha.tar.gz", &root, &mut store).unwrap();
    assert_eq!(reconcile::list(&store).unwrap(), ["zeta.tar.gz"]);
}

#[test]
fn test_reinstall_after_delete_is_fresh_install() {
    let s = scratch();
    let tar_path = s.base.join("v1/pkg.tar.gz");
    build_tarball(&tar_path, &[Member::File("a.txt", b"1")]);

    let mut store = ManifestStore::open(&s.db_path).unwrap();
    reconcile::update(&tar_path, &s.root, &mut store).unwrap();
    reconcile::delete("pkg.tar.gz", &s.root, &mut store).unwrap();

    let outcome = reconcile::update(&tar_path, &s.root, &mut store).unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Installed { entries: 1 },
        "no record means the fresh-install branch, not a diff"
    );
    assert_eq!(std::fs::read(s.root.join("a.txt")).unwrap(), b"1");
}
