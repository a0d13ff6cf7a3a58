//! Per-kthread record history.
//!
//! The tracker is the only owner of the kthread -> history map. It is
//! append-only: records are kept in arrival order and never reordered,
//! deduplicated or evicted.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::Serialize;

use crate::record::{BundleRecord, OwnerKey};
use crate::validate::RecordCheck;

/// A record together with where it came from and its intra-record check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedRecord {
    /// 1-based input line number.
    pub line_number: usize,
    pub record: BundleRecord,
    pub check: RecordCheck,
}

/// Ordered history of one kthread's bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerHistory {
    pub owner: OwnerKey,
    entries: Vec<TrackedRecord>,
}

impl OwnerHistory {
    #[must_use]
    pub fn new(owner: OwnerKey) -> Self {
        Self {
            owner,
            entries: Vec::new(),
        }
    }

    /// Build a history directly from records, numbering lines from 1.
    ///
    /// Used where records are not read from a stream (tests, replays).
    #[must_use]
    pub fn from_records(owner: OwnerKey, records: impl IntoIterator<Item = BundleRecord>) -> Self {
        let mut history = Self::new(owner);
        for (i, record) in records.into_iter().enumerate() {
            let check = crate::validate::validate_record(&record);
            history.push(TrackedRecord {
                line_number: i + 1,
                record,
                check,
            });
        }
        history
    }

    fn push(&mut self, entry: TrackedRecord) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[TrackedRecord] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TrackedRecord> {
        self.entries.last()
    }

    /// `used` values in arrival order.
    pub fn used_sequence(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|entry| entry.record.used)
    }

    /// Indices of entries whose intra-record check failed.
    #[must_use]
    pub fn invalid_entries(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.check.ok())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Owner key -> history map, single writer.
#[derive(Debug, Clone, Default)]
pub struct HistoryTracker {
    owners: BTreeMap<OwnerKey, OwnerHistory>,
    records: usize,
}

impl HistoryTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `entry` to the end of `owner`'s history, creating it on first use.
    ///
    /// Returns the entry's zero-based index within that history.
    pub fn append(&mut self, owner: OwnerKey, entry: TrackedRecord) -> usize {
        let history = match self.owners.entry(owner) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => {
                tracing::debug!(kthread = owner, "tracking new kthread");
                slot.insert(OwnerHistory::new(owner))
            }
        };
        history.push(entry);
        self.records += 1;
        history.len() - 1
    }

    #[must_use]
    pub fn get(&self, owner: OwnerKey) -> Option<&OwnerHistory> {
        self.owners.get(&owner)
    }

    /// Histories in ascending owner order.
    pub fn iter(&self) -> impl Iterator<Item = &OwnerHistory> {
        self.owners.values()
    }

    /// Consume the tracker, yielding histories in ascending owner order.
    pub fn into_histories(self) -> impl Iterator<Item = OwnerHistory> {
        self.owners.into_values()
    }

    #[must_use]
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records
    }
}
