// src/archive/tarball.rs

//! Tarball source
//!
//! Opens `.tar`, `.tar.gz`, `.tar.xz`, and `.tar.zst` archives, lists their
//! members as [`ArchiveEntry`] values, and extracts members into a target
//! root. Listing and extraction are separate passes over the archive; the
//! decompressors are streaming, so neither pass materializes the archive in
//! memory.

use crate::archive::entry::{payload_digest, ArchiveEntry, EntryKind, EntryMetadata};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tar::{Archive, EntryType};
use tracing::debug;
use xz2::read::XzDecoder;

/// Archive compression format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompressionFormat {
    None,
    Gzip,
    Xz,
    Zstd,
}

/// A tarball package source, addressed by path
pub struct Tarball {
    path: PathBuf,
    name: String,
    compression: CompressionFormat,
}

impl Tarball {
    /// Open a tarball, deriving the package name from the file base name
    pub fn open(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::ArchiveUnreadable {
                path: path.display().to_string(),
                reason: "path has no file name".to_string(),
            })?;

        let compression = Self::detect_compression(&name)?;

        if !path.is_file() {
            return Err(Error::ArchiveUnreadable {
                path: path.display().to_string(),
                reason: "no such file".to_string(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            name,
            compression,
        })
    }

    /// Package name: the tarball's base file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Detect compression format from the file name
    fn detect_compression(name: &str) -> Result<CompressionFormat> {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(CompressionFormat::Gzip)
        } else if name.ends_with(".tar.xz") {
            Ok(CompressionFormat::Xz)
        } else if name.ends_with(".tar.zst") {
            Ok(CompressionFormat::Zstd)
        } else if name.ends_with(".tar") {
            Ok(CompressionFormat::None)
        } else {
            Err(Error::ArchiveUnreadable {
                path: name.to_string(),
                reason: "unsupported format, expected .tar, .tar.gz, .tar.xz, or .tar.zst"
                    .to_string(),
            })
        }
    }

    fn unreadable(&self, reason: impl std::fmt::Display) -> Error {
        Error::ArchiveUnreadable {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Open and decompress the archive for one streaming pass
    fn reader(&self) -> Result<Archive<Box<dyn Read>>> {
        let file = File::open(&self.path)
            .map_err(|e| self.unreadable(format!("failed to open: {}", e)))?;

        let reader: Box<dyn Read> = match self.compression {
            CompressionFormat::None => Box::new(file),
            CompressionFormat::Gzip => Box::new(GzDecoder::new(file)),
            CompressionFormat::Xz => Box::new(XzDecoder::new(file)),
            CompressionFormat::Zstd => {
                let decoder = zstd::Decoder::new(file)
                    .map_err(|e| self.unreadable(format!("failed to create zstd decoder: {}", e)))?;
                Box::new(decoder)
            }
        };

        Ok(Archive::new(reader))
    }

    /// List every member as an [`ArchiveEntry`], reading each payload to
    /// fold its digest into the canonical encoding
    pub fn entries(&self) -> Result<Vec<ArchiveEntry>> {
        let mut archive = self.reader()?;
        let mut entries = Vec::new();

        for entry in archive
            .entries()
            .map_err(|e| self.unreadable(format!("failed to read entries: {}", e)))?
        {
            let mut entry = entry.map_err(|e| self.unreadable(format!("bad entry: {}", e)))?;

            let entry_path = entry
                .path()
                .map_err(|e| self.unreadable(format!("bad entry path: {}", e)))?
                .to_string_lossy()
                .to_string();

            let header = entry.header();
            let kind = match header.entry_type() {
                EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                    EntryKind::Regular
                }
                EntryType::Directory => EntryKind::Directory,
                _ => EntryKind::Other,
            };

            let meta = EntryMetadata {
                mode: header
                    .mode()
                    .map_err(|e| self.unreadable(format!("bad mode: {}", e)))?,
                uid: header
                    .uid()
                    .map_err(|e| self.unreadable(format!("bad uid: {}", e)))?,
                gid: header
                    .gid()
                    .map_err(|e| self.unreadable(format!("bad gid: {}", e)))?,
                size: header
                    .size()
                    .map_err(|e| self.unreadable(format!("bad size: {}", e)))?,
                mtime: header
                    .mtime()
                    .map_err(|e| self.unreadable(format!("bad mtime: {}", e)))?,
                link_target: entry
                    .link_name()
                    .map_err(|e| self.unreadable(format!("bad link name: {}", e)))?
                    .map(|l| l.to_string_lossy().to_string()),
                payload_sha256: {
                    let mut content = Vec::new();
                    entry
                        .read_to_end(&mut content)
                        .map_err(|e| self.unreadable(format!("failed to read payload: {}", e)))?;
                    payload_digest(&content)
                },
            };

            entries.push(ArchiveEntry::new(entry_path, kind, &meta));
        }

        debug!("Listed {} entries from {}", entries.len(), self.name);
        Ok(entries)
    }

    /// Unpack every member into `root`, creating parent directories.
    /// Used for fresh installs, which skip no kind.
    pub fn extract_all(&self, root: &Path) -> Result<usize> {
        let mut archive = self.reader()?;
        let mut count = 0;

        for entry in archive
            .entries()
            .map_err(|e| self.unreadable(format!("failed to read entries: {}", e)))?
        {
            let mut entry = entry.map_err(|e| self.unreadable(format!("bad entry: {}", e)))?;
            self.unpack_entry(&mut entry, root)?;
            count += 1;
        }

        debug!("Extracted {} entries into {}", count, root.display());
        Ok(count)
    }

    /// Unpack only the members whose paths are in `paths` — the single
    /// batched extraction pass of an update
    pub fn extract_paths(&self, root: &Path, paths: &HashSet<String>) -> Result<usize> {
        let mut archive = self.reader()?;
        let mut count = 0;

        for entry in archive
            .entries()
            .map_err(|e| self.unreadable(format!("failed to read entries: {}", e)))?
        {
            let mut entry = entry.map_err(|e| self.unreadable(format!("bad entry: {}", e)))?;

            let entry_path = entry
                .path()
                .map_err(|e| self.unreadable(format!("bad entry path: {}", e)))?
                .to_string_lossy()
                .to_string();

            if !paths.contains(&entry_path) {
                continue;
            }

            self.unpack_entry(&mut entry, root)?;
            count += 1;
        }

        debug!("Extracted {} updated entries into {}", count, root.display());
        Ok(count)
    }

    /// Unpack one member under `root`. `unpack_in` creates parent
    /// directories and refuses paths that escape the root.
    fn unpack_entry(&self, entry: &mut tar::Entry<'_, Box<dyn Read>>, root: &Path) -> Result<()> {
        let entry_path = entry
            .path()
            .map_err(|e| self.unreadable(format!("bad entry path: {}", e)))?
            .to_string_lossy()
            .to_string();

        let unpacked = entry.unpack_in(root).map_err(|e| {
            Error::FilesystemInconsistency(format!(
                "failed to extract {} into {}: {}",
                entry_path,
                root.display(),
                e
            ))
        })?;

        if !unpacked {
            return Err(self.unreadable(format!("entry {} escapes extraction root", entry_path)));
        }

        Ok(())
    }
}
