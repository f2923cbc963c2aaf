use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::MemoMetricsSnapshot;

/// Atomic counters shared by all operations on one cache.
#[derive(Debug, Default)]
pub struct MemoCounters {
    get_calls: AtomicU64,
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    getter_failures: AtomicU64,
    set_calls: AtomicU64,
    invalidate_calls: AtomicU64,
    invalidate_hits: AtomicU64,
    invalidate_all_calls: AtomicU64,
    purge_runs: AtomicU64,
    purged_entries: AtomicU64,
}

impl MemoCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_get_hit(&self) {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        self.get_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_get_miss(&self) {
        self.get_calls.fetch_add(1, Ordering::Relaxed);
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_getter_failure(&self) {
        self.getter_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_set(&self) {
        self.set_calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalidate(&self, removed: bool) {
        self.invalidate_calls.fetch_add(1, Ordering::Relaxed);
        if removed {
            self.invalidate_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_invalidate_all(&self) {
        self.invalidate_all_calls.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_purge(&self, removed: usize) {
        self.purge_runs.fetch_add(1, Ordering::Relaxed);
        self.purged_entries
            .fetch_add(removed as u64, Ordering::Relaxed);
    }

    /// Copies the counters, stamping the current entry count.
    pub fn snapshot(&self, entries: usize) -> MemoMetricsSnapshot {
        MemoMetricsSnapshot {
            get_calls: self.get_calls.load(Ordering::Relaxed),
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            getter_failures: self.getter_failures.load(Ordering::Relaxed),
            set_calls: self.set_calls.load(Ordering::Relaxed),
            invalidate_calls: self.invalidate_calls.load(Ordering::Relaxed),
            invalidate_hits: self.invalidate_hits.load(Ordering::Relaxed),
            invalidate_all_calls: self.invalidate_all_calls.load(Ordering::Relaxed),
            purge_runs: self.purge_runs.load(Ordering::Relaxed),
            purged_entries: self.purged_entries.load(Ordering::Relaxed),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let counters = MemoCounters::new();
        counters.record_get_miss();
        counters.record_get_hit();
        counters.record_get_hit();
        counters.record_getter_failure();
        counters.record_set();
        counters.record_invalidate(true);
        counters.record_invalidate(false);
        counters.record_invalidate_all();
        counters.record_purge(3);

        let snapshot = counters.snapshot(7);
        assert_eq!(snapshot.get_calls, 3);
        assert_eq!(snapshot.get_hits, 2);
        assert_eq!(snapshot.get_misses, 1);
        assert_eq!(snapshot.getter_failures, 1);
        assert_eq!(snapshot.set_calls, 1);
        assert_eq!(snapshot.invalidate_calls, 2);
        assert_eq!(snapshot.invalidate_hits, 1);
        assert_eq!(snapshot.invalidate_all_calls, 1);
        assert_eq!(snapshot.purge_runs, 1);
        assert_eq!(snapshot.purged_entries, 3);
        assert_eq!(snapshot.entries, 7);
    }
}
