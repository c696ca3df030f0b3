//! Aggregate byte-progress accounting, reported through the log.
//!
//! Progress lines go through `tracing` rather than an interactive bar so
//! they stay meaningful when output is redirected to a file. Only the
//! transfer executor advances the counter.

use indicatif::{HumanBytes, HumanDuration};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

/// Minimum spacing between periodic progress lines.
const REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Completed-bytes accumulator against a total fixed at construction.
///
/// Shared explicitly with the worker pool; updates are atomic, so
/// concurrent `advance` calls never lose increments.
pub struct ProgressSink {
    total_bytes: u64,
    completed_bytes: AtomicU64,
    started: Instant,
    last_report: Mutex<Instant>,
}

impl ProgressSink {
    /// Creates a sink expecting `total_bytes` in aggregate.
    pub fn new(total_bytes: u64) -> Self {
        let now = Instant::now();
        // Backdate the throttle so the first advance reports immediately.
        let last_report = now.checked_sub(REPORT_INTERVAL).unwrap_or(now);
        Self {
            total_bytes,
            completed_bytes: AtomicU64::new(0),
            started: now,
            last_report: Mutex::new(last_report),
        }
    }

    /// Adds `bytes` to the completed counter and emits a throttled progress
    /// line.
    pub fn advance(&self, bytes: u64) {
        let done = self.completed_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;

        // Reporting is best-effort: if another worker holds the slot, skip.
        let Ok(mut last_report) = self.last_report.try_lock() else {
            return;
        };
        if last_report.elapsed() < REPORT_INTERVAL {
            return;
        }
        *last_report = Instant::now();
        drop(last_report);

        self.report(done);
    }

    /// Bytes accumulated so far.
    pub fn completed_bytes(&self) -> u64 {
        self.completed_bytes.load(Ordering::Relaxed)
    }

    /// The fixed total this run is measured against.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Emits the final progress line with the overall average rate.
    pub fn finish(&self) {
        let done = self.completed_bytes();
        let elapsed = self.started.elapsed();
        let rate = average_rate(done, elapsed);
        info!(
            "transferred {} of {} in {}, average {}/s",
            HumanBytes(done),
            HumanBytes(self.total_bytes),
            HumanDuration(elapsed),
            HumanBytes(rate)
        );
    }

    fn report(&self, done: u64) {
        let elapsed = self.started.elapsed();
        let rate = average_rate(done, elapsed);
        let percent = if self.total_bytes > 0 {
            done * 100 / self.total_bytes
        } else {
            100
        };
        let remaining = self.total_bytes.saturating_sub(done);
        let eta = if rate > 0 {
            Duration::from_secs(remaining / rate)
        } else {
            Duration::ZERO
        };
        info!(
            "transferred {} / {} ({percent}%), {}/s, ETA {}",
            HumanBytes(done),
            HumanBytes(self.total_bytes),
            HumanBytes(rate),
            HumanDuration(eta)
        );
    }
}

fn average_rate(done: u64, elapsed: Duration) -> u64 {
    let seconds = elapsed.as_secs_f64();
    if seconds > 0.0 {
        (done as f64 / seconds) as u64
    } else {
        0
    }
}
