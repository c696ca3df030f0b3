//! Delta planning: which remote entries need transferring.

use crate::types::Inventory;
use std::collections::HashSet;

/// Selects the remote entries that are missing locally or whose local size
/// differs.
///
/// Size equality is the sole equivalence test; no content hashing is
/// performed. Entries present locally but absent remotely are left alone —
/// the delta is one-directional.
pub fn delta(remote: &Inventory, local: &Inventory) -> Inventory {
    remote
        .iter()
        .filter(|(key, size)| local.get(key) != Some(*size))
        .map(|(key, size)| (key.to_string(), size))
        .collect()
}

/// Narrows `work` to the entries whose key appears in `names`, preserving
/// sizes and recomputing the byte total.
pub fn retain_named(work: &Inventory, names: &HashSet<String>) -> Inventory {
    work.iter()
        .filter(|(key, _)| names.contains(*key))
        .map(|(key, size)| (key.to_string(), size))
        .collect()
}
