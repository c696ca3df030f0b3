//! Remote object-store interface and full-bucket enumeration.

use crate::error::SyncError;
use crate::types::Inventory;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Upper bound on listing round-trips for a single bucket. A healthy remote
/// paginates in thousands of keys per page, so hitting this means the marker
/// loop is not converging.
const MAX_LIST_PAGES: usize = 100_000;

/// One page of a bucket listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// (key, size) pairs in this page.
    pub entries: Vec<(String, u64)>,
    /// Cursor for the next page; `None` when the listing is complete.
    pub next_marker: Option<String>,
}

/// The two operations the engine needs from an object store.
///
/// Implemented by the S3-compatible HTTP backend in production and by
/// in-memory fakes in tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns one page of the bucket listing starting after `marker`.
    async fn list_page(
        &self,
        bucket: &str,
        marker: Option<&str>,
    ) -> Result<ListPage, SyncError>;

    /// Downloads one object to `dest`, blocking until it is fully written.
    async fn fetch(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), SyncError>;
}

/// Enumerates the entire bucket, following pagination markers until the
/// remote reports no more pages.
///
/// The marker must strictly advance between pages and the page count is
/// capped; a remote that violates either is reported as a listing failure
/// rather than looped on forever. Any page failure propagates to the caller.
pub async fn remote_inventory(
    store: &dyn ObjectStore,
    bucket: &str,
) -> Result<Inventory, SyncError> {
    let mut inventory = Inventory::new();
    let mut marker: Option<String> = None;

    for page_index in 0..MAX_LIST_PAGES {
        let page = store.list_page(bucket, marker.as_deref()).await?;
        debug!(
            "listing page {}: {} entries, truncated={}",
            page_index,
            page.entries.len(),
            page.next_marker.is_some()
        );

        for (key, size) in page.entries {
            inventory.insert(key, size);
        }

        match page.next_marker {
            None => return Ok(inventory),
            Some(next) => {
                if marker.as_deref().is_some_and(|previous| next.as_str() <= previous) {
                    return Err(SyncError::Listing {
                        bucket: bucket.to_string(),
                        reason: format!("page marker '{next}' did not advance"),
                    });
                }
                marker = Some(next);
            }
        }
    }

    Err(SyncError::Listing {
        bucket: bucket.to_string(),
        reason: format!("exceeded {MAX_LIST_PAGES} listing pages"),
    })
}
