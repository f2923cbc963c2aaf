/// Point-in-time copy of a cache's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoMetricsSnapshot {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,
    pub getter_failures: u64,

    pub set_calls: u64,

    pub invalidate_calls: u64,
    pub invalidate_hits: u64, // calls whose prefix matched a stored path
    pub invalidate_all_calls: u64,

    pub purge_runs: u64,
    pub purged_entries: u64,

    // gauge captured at snapshot time
    pub entries: usize,
}

impl MemoMetricsSnapshot {
    /// Fraction of `get` calls served from the cache, `0.0` with no calls.
    pub fn hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            return 0.0;
        }
        self.get_hits as f64 / self.get_calls as f64
    }
}
