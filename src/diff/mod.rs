// src/diff/mod.rs

//! Snapshot diffing
//!
//! Computes the delta between two package snapshots with one linear merge
//! pass over two heap-ordered cursors. Neither input needs to be sorted:
//! each [`EntryHeap`] heapifies in O(N) and pops in O(log N), so peak
//! memory stays at the two heaps plus the merge cursor, and no sorted
//! array is ever materialized.
//!
//! [`diff`] is lazy: records are produced on demand, so a caller may begin
//! applying changes before the merge has finished. A partially consumed
//! [`Diff`] leaves its cursors mid-merge; it is only safe to drop it if the
//! whole operation is being abandoned.

use crate::archive::ArchiveEntry;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Heap ordering wrapper: path only, so entries with equal paths meet in
/// the merge even when their contents differ
struct ByPath(ArchiveEntry);

impl Ord for ByPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.path.cmp(&other.0.path)
    }
}

impl PartialOrd for ByPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ByPath {
    fn eq(&self, other: &Self) -> bool {
        self.0.path == other.0.path
    }
}

impl Eq for ByPath {}

/// An unsorted entry collection viewed as a descending-path sequence
///
/// `BinaryHeap` is a max-heap, so `pop` yields the greatest remaining path
/// first. Exhaustion is signalled by `None` from both `peek` and `pop`;
/// neither ever panics.
pub struct EntryHeap {
    heap: BinaryHeap<ByPath>,
}

impl EntryHeap {
    pub fn new(entries: Vec<ArchiveEntry>) -> Self {
        Self {
            heap: entries.into_iter().map(ByPath).collect(),
        }
    }

    /// Current head without consuming it
    pub fn peek(&self) -> Option<&ArchiveEntry> {
        self.heap.peek().map(|w| &w.0)
    }

    /// Consume and return the current head
    pub fn pop(&mut self) -> Option<ArchiveEntry> {
        self.heap.pop().map(|w| w.0)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// One unit of change between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    /// Present only in the new snapshot
    Added(ArchiveEntry),
    /// Present only in the old snapshot
    Removed(ArchiveEntry),
    /// Same path in both, canonical encodings differ
    Modified { old: ArchiveEntry, new: ArchiveEntry },
}

impl ChangeRecord {
    /// The path this record is about
    pub fn path(&self) -> &str {
        match self {
            ChangeRecord::Added(e) | ChangeRecord::Removed(e) => &e.path,
            ChangeRecord::Modified { new, .. } => &new.path,
        }
    }
}

/// Lazily diff two snapshots, emitting records in descending path order
pub fn diff(old: Vec<ArchiveEntry>, new: Vec<ArchiveEntry>) -> Diff {
    Diff {
        old: EntryHeap::new(old),
        new: EntryHeap::new(new),
    }
}

/// The lazy merge over the two snapshot heaps
pub struct Diff {
    old: EntryHeap,
    new: EntryHeap,
}

impl Iterator for Diff {
    type Item = ChangeRecord;

    fn next(&mut self) -> Option<ChangeRecord> {
        loop {
            let order = match (self.old.peek(), self.new.peek()) {
                (None, None) => return None,
                // one side exhausted: drain the survivor
                (Some(_), None) => Ordering::Greater,
                (None, Some(_)) => Ordering::Less,
                (Some(old), Some(new)) => old.path.cmp(&new.path),
            };

            match order {
                // old's head sorts after new's: the path exists only in old
                Ordering::Greater => {
                    if let Some(old) = self.old.pop() {
                        return Some(ChangeRecord::Removed(old));
                    }
                }
                Ordering::Less => {
                    if let Some(new) = self.new.pop() {
                        return Some(ChangeRecord::Added(new));
                    }
                }
                Ordering::Equal => {
                    if let (Some(old), Some(new)) = (self.old.pop(), self.new.pop()) {
                        if old != new {
                            return Some(ChangeRecord::Modified { old, new });
                        }
                        // identical entries: no record, keep merging
                    }
                }
            }
        }
    }
}
