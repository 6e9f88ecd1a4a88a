//! Cold storage for allocations past their visibility deadline.

use crate::{Result, RoomId, Token, UserId};
use core::fmt;
use parking_lot::RwLock;

/// Surrogate key of an archive record. Assigned by the archive store, never
/// related to the live token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ArchiveId(pub u64);

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A write-once snapshot of a swept allocation.
///
/// Carries the allocation's immutable fields, its counters at sweep time, and
/// a flattened text summary of every share. It is never expanded back into
/// shares.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchiveRecord {
    pub token: Token,
    pub originator: UserId,
    pub room: RoomId,
    pub total_amount: u64,
    pub total_share_count: u64,
    pub remaining_amount: u64,
    pub remaining_share_count: u64,
    pub created_at: u64,
    pub archived_at: u64,
    /// Comma-separated, one entry per share in creation order:
    /// `amount: 3 (unclaimed)` or `amount: 5 (id: 42, at: 1700000000000)`.
    pub share_summary: String,
}

/// Durable home of archive records.
///
/// An `append` that returns `Ok` must have persisted the record: the sweep
/// deletes the live allocation right after.
pub trait ArchiveStore: Send + Sync {
    /// Persists `record` and returns its new id.
    ///
    /// # Errors
    /// Returns [`crate::Error::Storage`] if the record could not be written.
    fn append(&self, record: ArchiveRecord) -> Result<ArchiveId>;

    fn get(&self, id: ArchiveId) -> Option<ArchiveRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`ArchiveStore`]. Ids are assigned sequentially from `1`.
#[derive(Default, Debug)]
pub struct MemoryArchive {
    records: RwLock<Vec<ArchiveRecord>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records with their ids, oldest first.
    pub fn records(&self) -> Vec<(ArchiveId, ArchiveRecord)> {
        self.records
            .read()
            .iter()
            .cloned()
            .zip(1..)
            .map(|(record, id)| (ArchiveId(id), record))
            .collect()
    }
}

impl ArchiveStore for MemoryArchive {
    fn append(&self, record: ArchiveRecord) -> Result<ArchiveId> {
        let mut records = self.records.write();
        records.push(record);
        Ok(ArchiveId(records.len() as u64))
    }

    fn get(&self, id: ArchiveId) -> Option<ArchiveRecord> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.records.read().get(index).cloned()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}
