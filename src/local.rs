//! Local directory enumeration.

use crate::error::SyncError;
use crate::types::Inventory;
use std::path::Path;
use walkdir::WalkDir;

/// Walks `root` recursively and records every regular file with its path
/// relative to `root`, `/`-separated on every platform, and its size in
/// bytes.
///
/// Symbolic links are not followed and symlink entries themselves are
/// skipped, as are directories and other non-regular files. Leftover
/// `.part` files from an interrupted run are ordinary files and are
/// inventoried like any other; their size never matches a remote key's, so
/// they never mask a pending download.
pub fn local_inventory(root: &Path) -> Result<Inventory, SyncError> {
    let mut inventory = Inventory::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| SyncError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let size = entry.metadata().map_err(|e| SyncError::Io(e.into()))?.len();
        inventory.insert(relative_name(relative), size);
    }

    Ok(inventory)
}

/// Joins path components with `/` regardless of the platform separator.
fn relative_name(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
