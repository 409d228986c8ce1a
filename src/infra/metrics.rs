//! Lock-free run counters
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only and are never used for coordination.

use crate::domain::types::ReconciliationResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

pub struct Metrics {
    started_at: Instant,
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_aborted: AtomicU64,
    rows_updated: AtomicU64,
    rows_failed: AtomicU64,
    rows_rejected: AtomicU64,
    last_run_duration_ms: AtomicU64,
}

/// Point-in-time copy of all counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_aborted: u64,
    pub rows_updated: u64,
    pub rows_failed: u64,
    pub rows_rejected: u64,
    pub last_run_duration_ms: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            runs_started: AtomicU64::new(0),
            runs_completed: AtomicU64::new(0),
            runs_aborted: AtomicU64::new(0),
            rows_updated: AtomicU64::new(0),
            rows_failed: AtomicU64::new(0),
            rows_rejected: AtomicU64::new(0),
            last_run_duration_ms: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed run and the rows the parser turned away
    pub fn record_run_completed(
        &self,
        result: &ReconciliationResult,
        rejected_rows: usize,
        duration_ms: u64,
    ) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.rows_updated.fetch_add(result.success_count, Ordering::Relaxed);
        self.rows_failed.fetch_add(result.error_count, Ordering::Relaxed);
        self.rows_rejected.fetch_add(rejected_rows as u64, Ordering::Relaxed);
        self.last_run_duration_ms.store(duration_ms, Ordering::Relaxed);
    }

    pub fn record_run_aborted(&self, duration_ms: u64) {
        self.runs_aborted.fetch_add(1, Ordering::Relaxed);
        self.last_run_duration_ms.store(duration_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_aborted: self.runs_aborted.load(Ordering::Relaxed),
            rows_updated: self.rows_updated.load(Ordering::Relaxed),
            rows_failed: self.rows_failed.load(Ordering::Relaxed),
            rows_rejected: self.rows_rejected.load(Ordering::Relaxed),
            last_run_duration_ms: self.last_run_duration_ms.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Log the snapshot as one structured event
    pub fn log(&self) {
        info!(
            uptime_secs = self.uptime_secs,
            runs_started = self.runs_started,
            runs_completed = self.runs_completed,
            runs_aborted = self.runs_aborted,
            rows_updated = self.rows_updated,
            rows_failed = self.rows_failed,
            rows_rejected = self.rows_rejected,
            "metrics"
        );
    }
}
