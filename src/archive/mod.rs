// src/archive/mod.rs

//! Tarball reading: entry model and archive source

pub mod entry;
pub mod tarball;

pub use entry::{ArchiveEntry, EntryKind, EntryMetadata};
pub use tarball::Tarball;
