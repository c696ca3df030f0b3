//! snowpull - reconcile an S3-compatible storage appliance against local disk
//!
//! This library enumerates a remote bucket and a local directory tree,
//! computes the delta between them, and transfers the missing or changed
//! objects under a bounded worker pool. Runs are idempotent: a file already
//! present locally with a matching size is never transferred again, so an
//! interrupted migration simply resumes on the next invocation.
//!
//! # Features
//!
//! - **Full-bucket enumeration**: marker-style pagination with defensive
//!   termination on misbehaving remotes
//! - **Size-based reconciliation**: only missing or size-mismatched objects
//!   are transferred
//! - **Manifest narrowing**: restrict a run to names listed in a CSV manifest
//! - **Bounded concurrency**: a single worker-count knob
//! - **Failure isolation**: one failed object never aborts its siblings
//! - **Log-friendly progress**: rate/ETA lines through `tracing`, meaningful
//!   when redirected to a file
//!
//! # Example
//!
//! ```no_run
//! use snowpull::{sync_bucket, S3Store, SyncOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(S3Store::new("https://192.0.2.10:8443", None)?);
//! let report = sync_bucket(
//!     store,
//!     &SyncOptions {
//!         bucket: "shipment-42".to_string(),
//!         dest: "/data/restore".into(),
//!         max_workers: 8,
//!         dry_run: false,
//!         manifest: None,
//!     },
//! )
//! .await?;
//! println!("{} files transferred", report.completed_files);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod executor;
pub mod local;
pub mod manifest;
pub mod orchestrator;
pub mod plan;
pub mod progress;
pub mod remote;
pub mod s3;
mod sign;
pub mod types;

pub use error::SyncError;
pub use executor::execute;
pub use local::local_inventory;
pub use manifest::{read_names, write_inventory};
pub use orchestrator::{export_inventory, sync_bucket, SyncOptions, SyncReport};
pub use plan::{delta, retain_named};
pub use progress::ProgressSink;
pub use remote::{remote_inventory, ListPage, ObjectStore};
pub use s3::S3Store;
pub use sign::Credentials;
pub use types::{Inventory, TransferOutcome};
