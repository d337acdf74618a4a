use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::fs::passthrough::OpenMode;

/// Counters describing what a writer has done so far.
#[derive(Debug, Default)]
pub struct WriterStats {
    created: AtomicU64,
    reopened: AtomicU64,
    cache_hits: AtomicU64,
    bytes_written: AtomicU64,
    holes: AtomicU64,
    zero_fallbacks: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Files opened in create-or-truncate mode.
    pub created: u64,
    /// Files reopened for append after their handle was closed.
    pub reopened: u64,
    /// Writes served by an idle cached handle.
    pub cache_hits: u64,
    /// Bytes written as data, including fallback zero blocks.
    pub bytes_written: u64,
    /// Zero blocks materialized as holes.
    pub holes: u64,
    /// Zero blocks written as data after a safe extension failure.
    pub zero_fallbacks: u64,
}

impl WriterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_open(&self, mode: OpenMode) {
        let counter = match mode {
            OpenMode::Create => &self.created,
            OpenMode::Append => &self.reopened,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bytes(&self, n: usize) {
        self.bytes_written.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_hole(&self) {
        self.holes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_zero_fallback(&self) {
        self.zero_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            reopened: self.reopened.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            holes: self.holes.load(Ordering::Relaxed),
            zero_fallbacks: self.zero_fallbacks.load(Ordering::Relaxed),
        }
    }
}
