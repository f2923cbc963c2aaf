//! Cache metrics.
//!
//! Recording and reading are split: [`MemoCounters`] owns the atomic
//! counters a cache bumps on its hot path, and
//! [`MemoMetricsSnapshot`] is the plain copy handed to callers.
//!
//! ```text
//!   MemoCache ──record_*──► MemoCounters (AtomicU64, Relaxed)
//!                                │
//!                          snapshot(entries)
//!                                ▼
//!                       MemoMetricsSnapshot
//! ```

pub mod counters;
pub mod snapshot;

pub use counters::MemoCounters;
pub use snapshot::MemoMetricsSnapshot;
