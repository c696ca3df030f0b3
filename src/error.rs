//! Error types for reconciliation and transfer operations.

use std::io;
use thiserror::Error;

/// Errors that can occur while listing, planning, or transferring.
#[derive(Error, Debug)]
pub enum SyncError {
    /// I/O error during file operations.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// HTTP transport error during a remote call.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The configured endpoint URL could not be parsed.
    #[error("invalid endpoint URL '{0}'")]
    Endpoint(String),

    /// Bucket enumeration failed or misbehaved.
    #[error("listing bucket '{bucket}' failed: {reason}")]
    Listing { bucket: String, reason: String },

    /// The remote rejected our credentials (HTTP 401/403).
    #[error("access denied for {resource} (check access key and secret)")]
    Denied { resource: String },

    /// Any other unexpected HTTP status from the remote.
    #[error("remote returned HTTP {status} for {resource}")]
    Status {
        status: reqwest::StatusCode,
        resource: String,
    },

    /// Manifest file could not be read or written.
    #[error("manifest error: {0}")]
    Manifest(String),
}
