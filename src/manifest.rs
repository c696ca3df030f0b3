//! Manifest files: CSV snapshots of an inventory, reusable as work-set
//! filters.
//!
//! Format: UTF-8 text, a literal `File,Size` header row, then one
//! `<name>,<size>` row per entry. Names must not contain the delimiter.

use crate::error::SyncError;
use crate::types::Inventory;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

const HEADER: &str = "File,Size";

/// Reads the name column of a manifest, ignoring the header and the size
/// column.
///
/// Blank lines are skipped and a row without a delimiter is taken whole as
/// a name. The size column is informational only; filtering uses names
/// alone.
pub fn read_names(path: &Path) -> Result<HashSet<String>, SyncError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| SyncError::Manifest(format!("cannot read {}: {e}", path.display())))?;

    let mut names = HashSet::new();
    for line in content.lines().skip(1) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let name = match line.split_once(',') {
            Some((name, _size)) => name,
            None => line,
        };
        names.insert(name.to_string());
    }
    Ok(names)
}

/// Writes `inventory` as a manifest, one row per entry in iteration order.
pub fn write_inventory(path: &Path, inventory: &Inventory) -> Result<(), SyncError> {
    let mut content = String::with_capacity(HEADER.len() + 1 + inventory.len() * 32);
    content.push_str(HEADER);
    content.push('\n');
    for (key, size) in inventory.iter() {
        // Infallible for String.
        let _ = writeln!(content, "{key},{size}");
    }

    std::fs::write(path, content)
        .map_err(|e| SyncError::Manifest(format!("cannot write {}: {e}", path.display())))
}
