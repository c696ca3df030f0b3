//! Bounded-concurrency transfer execution with per-item failure isolation.

use crate::error::SyncError;
use crate::progress::ProgressSink;
use crate::remote::ObjectStore;
use crate::types::{Inventory, TransferOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Transfers every entry of `work` from `bucket` into `dest_root`.
///
/// At most `max_workers` transfers are in flight at once (a value of 0 is
/// treated as 1). Each item is attempted exactly once; any error during one
/// item is logged with its key and converted into a failure outcome without
/// disturbing sibling transfers. Outcomes are collected in completion
/// order, which bears no relation to the work set's iteration order.
///
/// `progress` advances by each item's *expected* size once its attempt
/// completes, success or not, so the counter always reaches the total the
/// sink was constructed with.
pub async fn execute(
    store: Arc<dyn ObjectStore>,
    bucket: &str,
    work: &Inventory,
    dest_root: &Path,
    max_workers: usize,
    progress: Arc<ProgressSink>,
) -> Vec<TransferOutcome> {
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut tasks = JoinSet::new();

    for (key, expected) in work.iter() {
        let store = Arc::clone(&store);
        let progress = Arc::clone(&progress);
        let semaphore = Arc::clone(&semaphore);
        let bucket = bucket.to_string();
        let key = key.to_string();
        let dest = destination_path(dest_root, &key);

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire()
                .await
                .expect("semaphore is never closed");
            let outcome = transfer_one(store.as_ref(), &bucket, &key, &dest).await;
            // Expected size, not actual: the counter must reach the declared
            // total even when attempts fail.
            progress.advance(expected);
            outcome
        });
    }

    let mut outcomes = Vec::with_capacity(work.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("transfer task aborted: {e}"),
        }
    }
    outcomes
}

async fn transfer_one(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    dest: &Path,
) -> TransferOutcome {
    match try_transfer(store, bucket, key, dest).await {
        Ok(bytes) => {
            info!("downloaded {key} ({bytes} bytes)");
            TransferOutcome::Completed {
                key: key.to_string(),
                bytes,
            }
        }
        Err(e) => {
            error!("failed to download {key}: {e}");
            TransferOutcome::Failed {
                key: key.to_string(),
            }
        }
    }
}

async fn try_transfer(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    dest: &Path,
) -> Result<u64, SyncError> {
    if let Some(parent) = dest.parent() {
        // Idempotent; workers may race on shared parents.
        tokio::fs::create_dir_all(parent).await?;
    }
    store.fetch(bucket, key, dest).await?;
    // Report what actually landed on disk, not the expected size.
    Ok(tokio::fs::metadata(dest).await?.len())
}

fn destination_path(dest_root: &Path, key: &str) -> PathBuf {
    let mut dest = dest_root.to_path_buf();
    dest.extend(key.split('/'));
    dest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::local_inventory;
    use crate::plan::delta;
    use crate::remote::{remote_inventory, ListPage};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use tempfile::TempDir;

    /// In-memory store: serves `objects` and fails any key in `fail`.
    struct FakeStore {
        objects: BTreeMap<String, Vec<u8>>,
        fail: HashSet<String>,
    }

    impl FakeStore {
        fn new(objects: &[(&str, &[u8])]) -> Self {
            Self {
                objects: objects
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_vec()))
                    .collect(),
                fail: HashSet::new(),
            }
        }

        fn failing(mut self, key: &str) -> Self {
            self.fail.insert(key.to_string());
            self
        }

        fn inventory(&self) -> Inventory {
            self.objects
                .iter()
                .map(|(k, v)| (k.clone(), v.len() as u64))
                .collect()
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn list_page(
            &self,
            _bucket: &str,
            _marker: Option<&str>,
        ) -> Result<ListPage, SyncError> {
            Ok(ListPage {
                entries: self
                    .objects
                    .iter()
                    .map(|(k, v)| (k.clone(), v.len() as u64))
                    .collect(),
                next_marker: None,
            })
        }

        async fn fetch(&self, _bucket: &str, key: &str, dest: &Path) -> Result<(), SyncError> {
            if self.fail.contains(key) {
                return Err(SyncError::Denied {
                    resource: format!("/bucket/{key}"),
                });
            }
            let bytes = self.objects.get(key).ok_or_else(|| SyncError::Status {
                status: reqwest::StatusCode::NOT_FOUND,
                resource: format!("/bucket/{key}"),
            })?;
            tokio::fs::write(dest, bytes).await?;
            Ok(())
        }
    }

    async fn run(
        store: FakeStore,
        work: &Inventory,
        dest_root: &Path,
        max_workers: usize,
    ) -> (Vec<TransferOutcome>, Arc<ProgressSink>) {
        let progress = Arc::new(ProgressSink::new(work.total_bytes()));
        let outcomes = execute(
            Arc::new(store),
            "bucket",
            work,
            dest_root,
            max_workers,
            Arc::clone(&progress),
        )
        .await;
        (outcomes, progress)
    }

    #[tokio::test]
    async fn one_failure_does_not_disturb_siblings() {
        let dir = TempDir::new().unwrap();
        let store = FakeStore::new(&[
            ("one.bin", b"11111"),
            ("two.bin", b"222"),
            ("three.bin", b"3333333"),
        ])
        .failing("two.bin");
        let work = store.inventory();

        let (outcomes, progress) = run(store, &work, dir.path(), 4).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|o| o.is_completed()).count(), 2);
        let failed: Vec<&str> = outcomes
            .iter()
            .filter(|o| !o.is_completed())
            .map(|o| o.key())
            .collect();
        assert_eq!(failed, vec!["two.bin"]);

        assert_eq!(std::fs::read(dir.path().join("one.bin")).unwrap(), b"11111");
        assert_eq!(
            std::fs::read(dir.path().join("three.bin")).unwrap(),
            b"3333333"
        );
        assert!(!dir.path().join("two.bin").exists());

        // Progress reaches the full expected total despite the failure.
        assert_eq!(progress.completed_bytes(), work.total_bytes());
    }

    #[tokio::test]
    async fn creates_nested_destination_directories() {
        let dir = TempDir::new().unwrap();
        let store = FakeStore::new(&[("deep/tree/of/dirs/file.bin", b"payload")]);
        let work = store.inventory();

        let (outcomes, _) = run(store, &work, dir.path(), 1).await;

        assert!(outcomes[0].is_completed());
        assert_eq!(
            std::fs::read(dir.path().join("deep/tree/of/dirs/file.bin")).unwrap(),
            b"payload"
        );
    }

    #[tokio::test]
    async fn reports_the_on_disk_size_not_the_expected_one() {
        let dir = TempDir::new().unwrap();
        let store = FakeStore::new(&[("shrunk.bin", b"ab")]);
        // The work set claims 10 bytes; the store serves 2.
        let mut work = Inventory::new();
        work.insert("shrunk.bin", 10);

        let (outcomes, progress) = run(store, &work, dir.path(), 1).await;

        assert_eq!(
            outcomes[0],
            TransferOutcome::Completed {
                key: "shrunk.bin".to_string(),
                bytes: 2
            }
        );
        // The counter still advances by the expected size.
        assert_eq!(progress.completed_bytes(), 10);
    }

    #[tokio::test]
    async fn empty_work_set_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let store = FakeStore::new(&[]);
        let (outcomes, progress) = run(store, &Inventory::new(), dir.path(), 4).await;
        assert!(outcomes.is_empty());
        assert_eq!(progress.completed_bytes(), 0);
    }

    #[tokio::test]
    async fn replanning_after_a_full_transfer_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FakeStore::new(&[("a/x.bin", b"xxxx"), ("b/y.bin", b"yy")]);
        let remote = remote_inventory(&store, "bucket").await.unwrap();

        let work = delta(&remote, &local_inventory(dir.path()).unwrap());
        assert_eq!(work.len(), 2);
        let (outcomes, _) = run(store, &work, dir.path(), 2).await;
        assert!(outcomes.iter().all(|o| o.is_completed()));

        let replanned = delta(&remote, &local_inventory(dir.path()).unwrap());
        assert!(replanned.is_empty());
    }
}
