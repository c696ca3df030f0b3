//! Command-level flows: sync, manifest-narrowed sync, inventory export.

use crate::error::SyncError;
use crate::executor::execute;
use crate::local::local_inventory;
use crate::manifest;
use crate::plan::{delta, retain_named};
use crate::progress::ProgressSink;
use crate::remote::{remote_inventory, ObjectStore};
use crate::types::{Inventory, TransferOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Options for one sync invocation.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Bucket to reconcile against.
    pub bucket: String,
    /// Pre-existing local destination folder.
    pub dest: PathBuf,
    /// Maximum concurrent transfers (0 is treated as 1).
    pub max_workers: usize,
    /// Plan and report only; perform no transfer.
    pub dry_run: bool,
    /// Narrow the work set to the names listed in this manifest.
    pub manifest: Option<PathBuf>,
}

/// What one run planned and did.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub planned_files: usize,
    pub planned_bytes: u64,
    pub completed_files: usize,
    /// Keys whose transfer failed, sorted.
    pub failed: Vec<String>,
    /// Sum of on-disk sizes of completed transfers.
    pub bytes_transferred: u64,
    pub dry_run: bool,
}

/// Reconciles `options.bucket` against `options.dest` and transfers the
/// delta.
///
/// Listing failures abort the run; per-item transfer failures are reported
/// in the returned summary and never abort it.
pub async fn sync_bucket(
    store: Arc<dyn ObjectStore>,
    options: &SyncOptions,
) -> Result<SyncReport, SyncError> {
    info!("pulling remote inventory of '{}'", options.bucket);
    let remote = remote_inventory(store.as_ref(), &options.bucket).await?;
    info!(
        "remote file count: {}, total size: {} bytes",
        remote.len(),
        remote.total_bytes()
    );

    info!("pulling local inventory of {}", options.dest.display());
    let local = local_inventory(&options.dest)?;
    info!(
        "local file count: {}, total size: {} bytes",
        local.len(),
        local.total_bytes()
    );

    let mut work = delta(&remote, &local);
    info!(
        "{} files missing or stale, {} bytes to transfer",
        work.len(),
        work.total_bytes()
    );

    if let Some(path) = &options.manifest {
        let names = manifest::read_names(path)?;
        work = retain_named(&work, &names);
        info!(
            "manifest narrowed the work set to {} files, {} bytes",
            work.len(),
            work.total_bytes()
        );
    }

    if options.dry_run {
        info!(
            "dry run: would transfer {} files, total size: {} bytes",
            work.len(),
            work.total_bytes()
        );
        return Ok(SyncReport {
            planned_files: work.len(),
            planned_bytes: work.total_bytes(),
            dry_run: true,
            ..Default::default()
        });
    }

    let progress = Arc::new(ProgressSink::new(work.total_bytes()));
    let outcomes = execute(
        store,
        &options.bucket,
        &work,
        &options.dest,
        options.max_workers,
        Arc::clone(&progress),
    )
    .await;
    progress.finish();

    Ok(summarize(&work, outcomes))
}

/// Snapshots the full remote inventory of `bucket` into a manifest file.
///
/// The result can be fed back as a sync filter or kept as an audit record.
pub async fn export_inventory(
    store: &dyn ObjectStore,
    bucket: &str,
    output: &Path,
) -> Result<usize, SyncError> {
    info!("pulling remote inventory of '{}'", bucket);
    let remote = remote_inventory(store, bucket).await?;
    info!(
        "remote file count: {}, total size: {} bytes",
        remote.len(),
        remote.total_bytes()
    );

    manifest::write_inventory(output, &remote)?;
    info!(
        "manifest written to {} ({} entries)",
        output.display(),
        remote.len()
    );
    Ok(remote.len())
}

fn summarize(work: &Inventory, outcomes: Vec<TransferOutcome>) -> SyncReport {
    let mut report = SyncReport {
        planned_files: work.len(),
        planned_bytes: work.total_bytes(),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            TransferOutcome::Completed { bytes, .. } => {
                report.completed_files += 1;
                report.bytes_transferred += bytes;
            }
            TransferOutcome::Failed { key } => report.failed.push(key),
        }
    }
    report.failed.sort();

    info!(
        "sync finished: {} of {} files transferred, {} bytes written",
        report.completed_files, report.planned_files, report.bytes_transferred
    );
    for key in &report.failed {
        error!("failed: {key}");
    }
    if !report.failed.is_empty() {
        warn!(
            "{} of {} transfers failed; a rerun will retry them",
            report.failed.len(),
            report.planned_files
        );
    }
    report
}
