//! Data structures shared across the reconciliation pipeline.

use std::collections::BTreeMap;

/// A name→size snapshot of one side of the reconciliation, plus its byte
/// total.
///
/// The same shape serves three roles: the remote bucket snapshot, the local
/// directory snapshot, and the planned work set. Names use `/` as the
/// segment separator on every platform. Keys are unique; inserting an
/// existing key replaces its size and adjusts the total.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: BTreeMap<String, u64>,
    total_bytes: u64,
}

impl Inventory {
    /// Creates an empty inventory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` with `size` bytes, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, size: u64) {
        let key = key.into();
        if let Some(previous) = self.entries.insert(key, size) {
            self.total_bytes -= previous;
        }
        self.total_bytes += size;
    }

    /// Size in bytes recorded for `key`, if present.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the inventory has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry sizes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Iterates entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, u64)> for Inventory {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut inventory = Inventory::new();
        for (key, size) in iter {
            inventory.insert(key, size);
        }
        inventory
    }
}

/// Result of one transfer attempt.
///
/// `bytes` on the completed variant is the on-disk size re-read after the
/// download finished, which may differ from the expected size if the remote
/// changed mid-run. Failures carry the object key so the run summary can
/// name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The object was written to its destination path.
    Completed { key: String, bytes: u64 },
    /// The attempt failed; the destination holds no final-named file.
    Failed { key: String },
}

impl TransferOutcome {
    /// Key of the work item this outcome belongs to.
    pub fn key(&self) -> &str {
        match self {
            TransferOutcome::Completed { key, .. } => key,
            TransferOutcome::Failed { key } => key,
        }
    }

    /// Whether the attempt completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed { .. })
    }
}
