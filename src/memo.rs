//! Argument-keyed memoization cache.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │ MemoCache<V, E>                                                          │
//! │                                                                          │
//! │   layout: KeyLayout        arity + key order (immutable)                 │
//! │   getter: Fn(&[Arg]) -> Result<V, E>                                     │
//! │   state:  Mutex<{ KeyTree<V>, inserts_since_sweep }>                     │
//! │   metrics: MemoCounters                                                  │
//! └──────────────────────────────────────────────────────────────────────────┘
//!
//!   get(args)
//!     │ normalize (pad with Nil)      ──► TooManyArguments
//!     │ key_path (by key order)       ──► NanKey
//!     ▼
//!   lock ─► tree.get(path) ──hit──► clone, return
//!              │
//!             miss ─► getter(args) ──Err──► return Getter(e), store nothing
//!                          │
//!                         Ok(v) ─► tree.insert(path, v) ─► maybe sweep ─► return v
//! ```
//!
//! ## Core Operations
//!
//! | Operation          | Description                                          |
//! |--------------------|------------------------------------------------------|
//! | `get`              | Cached value, or call the getter once and store it   |
//! | `set`              | Write a value without calling the getter             |
//! | `invalidate`       | Forget every entry under a key-ordered prefix        |
//! | `invalidate_all`   | Forget everything                                    |
//! | `peek`/`contains`  | Look up without calling the getter                   |
//! | `purge_collected`  | Drop entries whose object key was dropped            |
//!
//! ## Thread Safety
//!
//! One `parking_lot::Mutex` guards the tree. The lock is held across the
//! getter call, so two concurrent misses on the same arguments evaluate the
//! getter once. The getter must not call back into the same cache.
//!
//! ## Object Keys
//!
//! [`Arg::Object`] keys are held weakly: once every [`ObjectRef`] to the
//! object is dropped, its entries become unreachable and are removed by the
//! next sweep. A cached value that itself holds an `ObjectRef` to its key
//! keeps that entry alive.
//!
//! [`ObjectRef`]: crate::key::ObjectRef
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use memokit::args;
//! use memokit::key::Arg;
//! use memokit::memo::MemoCache;
//!
//! let calls = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&calls);
//! let item_name = MemoCache::new(1, move |args: &[Arg]| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//!     match args[0].as_int() {
//!         Some(42) => Ok("Claw of Attack".to_string()),
//!         _ => Err("unknown item"),
//!     }
//! });
//!
//! assert_eq!(item_name.get(&args![42]).unwrap(), "Claw of Attack");
//! assert_eq!(item_name.get(&args![42]).unwrap(), "Claw of Attack");
//! assert_eq!(calls.load(Ordering::SeqCst), 1);
//!
//! item_name.invalidate(&args![42]).unwrap();
//! item_name.get(&args![42]).unwrap();
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! ```

use std::fmt;
use std::num::NonZeroUsize;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::builder::{DEFAULT_SWEEP_INTERVAL, MemoBuilder};
use crate::error::{ConfigError, KeyError, MemoError};
use crate::key::{Arg, KeySlot};
use crate::layout::KeyLayout;
use crate::metrics::{MemoCounters, MemoMetricsSnapshot};
use crate::store::tree::KeyTree;
use crate::traits::Invalidate;

/// Boxed getter called on a miss with the full, padded argument list.
pub type Getter<V, E> = Box<dyn Fn(&[Arg]) -> Result<V, E> + Send + Sync>;

struct MemoState<V> {
    tree: KeyTree<V>,
    inserts_since_sweep: usize,
}

impl<V> MemoState<V> {
    /// Inserts and runs a sweep once `sweep_interval` insertions accumulated.
    fn store(
        &mut self,
        path: Vec<KeySlot>,
        value: V,
        sweep_interval: Option<NonZeroUsize>,
        metrics: &MemoCounters,
    ) -> Option<V> {
        debug_assert_eq!(path.len(), self.tree.depth());
        let previous = self.tree.insert(path, value);
        if let Some(interval) = sweep_interval {
            self.inserts_since_sweep += 1;
            if self.inserts_since_sweep >= interval.get() {
                self.sweep(metrics);
            }
        }
        previous
    }

    fn sweep(&mut self, metrics: &MemoCounters) -> usize {
        self.inserts_since_sweep = 0;
        let removed = self.tree.purge();
        metrics.record_purge(removed);
        if removed > 0 {
            debug!(removed, "purged entries with collected object keys");
        }
        removed
    }
}

/// Memoizing wrapper around a getter of fixed arity.
pub struct MemoCache<V, E> {
    layout: KeyLayout,
    getter: Getter<V, E>,
    state: Mutex<MemoState<V>>,
    sweep_interval: Option<NonZeroUsize>,
    metrics: MemoCounters,
}

impl<V, E> MemoCache<V, E> {
    /// Creates a cache keyed on every argument, in call order.
    pub fn new<F>(arity: usize, getter: F) -> Self
    where
        F: Fn(&[Arg]) -> Result<V, E> + Send + Sync + 'static,
    {
        Self::from_parts(
            KeyLayout::identity(arity),
            Some(DEFAULT_SWEEP_INTERVAL),
            Box::new(getter),
        )
    }

    /// Creates a cache keyed on the given 0-based positions, outermost first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KeyPositionOutOfRange`] if a position is not a
    /// valid argument index.
    pub fn with_key_order<F>(
        arity: usize,
        key_order: Vec<usize>,
        getter: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&[Arg]) -> Result<V, E> + Send + Sync + 'static,
    {
        let layout = KeyLayout::with_key_order(arity, key_order)?;
        Ok(Self::from_parts(
            layout,
            Some(DEFAULT_SWEEP_INTERVAL),
            Box::new(getter),
        ))
    }

    /// Starts a [`MemoBuilder`] for a getter of `arity` arguments.
    pub fn builder(arity: usize) -> MemoBuilder {
        MemoBuilder::new(arity)
    }

    pub(crate) fn from_parts(
        layout: KeyLayout,
        sweep_interval: Option<NonZeroUsize>,
        getter: Getter<V, E>,
    ) -> Self {
        let state = MemoState {
            tree: KeyTree::new(layout.depth()),
            inserts_since_sweep: 0,
        };
        Self {
            layout,
            getter,
            state: Mutex::new(state),
            sweep_interval,
            metrics: MemoCounters::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.layout.arity()
    }

    pub fn key_order(&self) -> &[usize] {
        self.layout.key_order()
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Returns the cached value for `args`, calling the getter on a miss.
    ///
    /// Missing trailing arguments are treated as [`Arg::Nil`]. A getter error
    /// is returned as [`MemoError::Getter`] and nothing is cached, so the
    /// next call retries.
    pub fn get(&self, args: &[Arg]) -> Result<V, MemoError<E>>
    where
        V: Clone,
    {
        let args = self.layout.normalize(args)?;
        let path = self.layout.key_path(&args)?;

        let mut state = self.state.lock();
        if let Some(value) = state.tree.get(&path) {
            self.metrics.record_get_hit();
            return Ok(value.clone());
        }
        self.metrics.record_get_miss();
        trace!(arity = self.layout.arity(), "memo miss, calling getter");

        match (self.getter)(&*args) {
            Ok(value) => {
                state.store(path, value.clone(), self.sweep_interval, &self.metrics);
                Ok(value)
            },
            Err(err) => {
                self.metrics.record_getter_failure();
                Err(MemoError::Getter(err))
            },
        }
    }

    /// Stores `value` for `args` without calling the getter.
    ///
    /// `args` are positional, exactly as for [`get`](Self::get). Returns the
    /// value that was replaced.
    pub fn set(&self, args: &[Arg], value: V) -> Result<Option<V>, KeyError> {
        let args = self.layout.normalize(args)?;
        let path = self.layout.key_path(&args)?;
        self.metrics.record_set();
        trace!(arity = self.layout.arity(), "memo set");
        let mut state = self.state.lock();
        Ok(state.store(path, value, self.sweep_interval, &self.metrics))
    }

    /// Forgets every entry whose key path starts with `prefix`.
    ///
    /// `prefix` is given in key order, not call order: with key order
    /// `[1, 0, 2]`, `invalidate(&[b, a])` clears every `(a, b, _)` call.
    /// An empty prefix clears the whole cache. Returns `Ok(false)` when
    /// nothing matched.
    pub fn invalidate(&self, prefix: &[Arg]) -> Result<bool, KeyError> {
        let path = self.layout.prefix_path(prefix)?;
        let removed = self.state.lock().tree.remove_prefix(&path);
        self.metrics.record_invalidate(removed);
        Ok(removed)
    }

    /// Forgets every entry.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        state.tree.clear();
        state.inserts_since_sweep = 0;
        self.metrics.record_invalidate_all();
        debug!(arity = self.layout.arity(), "memo cache cleared");
    }

    /// Returns the cached value without calling the getter.
    pub fn peek(&self, args: &[Arg]) -> Result<Option<V>, KeyError>
    where
        V: Clone,
    {
        let args = self.layout.normalize(args)?;
        let path = self.layout.key_path(&args)?;
        Ok(self.state.lock().tree.get(&path).cloned())
    }

    /// Returns `true` if a value is cached for `args`.
    pub fn contains(&self, args: &[Arg]) -> Result<bool, KeyError> {
        let args = self.layout.normalize(args)?;
        let path = self.layout.key_path(&args)?;
        Ok(self.state.lock().tree.get(&path).is_some())
    }

    /// Number of cached values reachable through live keys.
    pub fn len(&self) -> usize {
        self.state.lock().tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().tree.is_empty()
    }

    /// Drops entries keyed by objects that no longer have strong handles.
    ///
    /// Returns how many dead keys were removed.
    pub fn purge_collected(&self) -> usize {
        self.state.lock().sweep(&self.metrics)
    }

    /// Snapshot of this cache's counters.
    pub fn metrics(&self) -> MemoMetricsSnapshot {
        self.metrics.snapshot(self.len())
    }
}

impl<V, E> fmt::Debug for MemoCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // try_lock: Debug may be reached from inside the getter
        let entries = self.state.try_lock().map(|state| state.tree.len());
        f.debug_struct("MemoCache")
            .field("layout", &self.layout)
            .field("sweep_interval", &self.sweep_interval)
            .field("entries", &entries)
            .finish_non_exhaustive()
    }
}

impl<V: Send, E> Invalidate for MemoCache<V, E> {
    fn invalidate(&self, prefix: &[Arg]) -> Result<bool, KeyError> {
        MemoCache::invalidate(self, prefix)
    }

    fn invalidate_all(&self) {
        MemoCache::invalidate_all(self);
    }

    fn purge_collected(&self) -> usize {
        MemoCache::purge_collected(self)
    }

    fn len(&self) -> usize {
        MemoCache::len(self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::args;
    use crate::key::ObjectRef;

    /// Getter that records every call and echoes its arguments.
    fn counting_echo() -> (MemoCache<Vec<Arg>, String>, Arc<AtomicUsize>, usize) {
        counting_echo_with(MemoBuilder::new(2))
    }

    fn counting_echo_with(
        builder: MemoBuilder,
    ) -> (MemoCache<Vec<Arg>, String>, Arc<AtomicUsize>, usize) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let cache = builder
            .build(move |args: &[Arg]| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(args.to_vec())
            })
            .unwrap();
        let arity = cache.arity();
        (cache, calls, arity)
    }

    fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    #[test]
    fn get_calls_getter_once_per_tuple() {
        let (cache, counter, _) = counting_echo();
        assert_eq!(cache.get(&args![1, 2]).unwrap(), args![1, 2]);
        assert_eq!(cache.get(&args![1, 2]).unwrap(), args![1, 2]);
        assert_eq!(calls(&counter), 1);

        cache.get(&args![2, 1]).unwrap();
        assert_eq!(calls(&counter), 2);
        assert_eq!(cache.len(), 2);
        cache.state.lock().tree.debug_validate_invariants();
    }

    #[test]
    fn set_overrides_without_calling_getter() {
        let (cache, counter, _) = counting_echo();
        assert_eq!(cache.set(&args![1, 2], args!["seeded"]).unwrap(), None);
        assert_eq!(cache.get(&args![1, 2]).unwrap(), args!["seeded"]);
        assert_eq!(calls(&counter), 0);

        let previous = cache.set(&args![1, 2], args!["corrected"]).unwrap();
        assert_eq!(previous, Some(args!["seeded"]));
        assert_eq!(cache.get(&args![1, 2]).unwrap(), args!["corrected"]);
        assert_eq!(calls(&counter), 0);
    }

    #[test]
    fn set_with_custom_key_order_writes_final_level_only() {
        let (cache, counter, _) = counting_echo_with(MemoBuilder::new(3).key_order([2, 0, 1]));
        cache.set(&args!["a", "b", "c"], args!["v"]).unwrap();
        cache.state.lock().tree.debug_validate_invariants();
        assert_eq!(cache.len(), 1);

        // no partial tuple resolves to a value
        assert_eq!(cache.peek(&args!["a", "x", "c"]).unwrap(), None);
        assert_eq!(cache.peek(&args!["a", "b", "c"]).unwrap(), Some(args!["v"]));
        assert_eq!(calls(&counter), 0);
    }

    #[test]
    fn getter_failure_is_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let cache = MemoCache::new(1, move |_: &[Arg]| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err("item not loaded yet".to_string())
            } else {
                Ok(7)
            }
        });

        let err = cache.get(&args![1]).unwrap_err();
        assert_eq!(err, MemoError::Getter("item not loaded yet".to_string()));
        assert!(cache.is_empty());

        assert_eq!(cache.get(&args![1]).unwrap(), 7);
        assert_eq!(calls(&attempts), 2);
        assert_eq!(cache.metrics().getter_failures, 1);
    }

    #[test]
    fn missing_arguments_use_nil_slot() {
        let (cache, counter, _) = counting_echo();
        cache.get(&args![1]).unwrap();
        assert!(cache.contains(&args![1, Arg::Nil]).unwrap());
        assert!(!cache.contains(&args![1, false]).unwrap());
        assert!(!cache.contains(&args![1, 0]).unwrap());
        assert!(!cache.contains(&args![1, ""]).unwrap());
        assert_eq!(calls(&counter), 1);
    }

    #[test]
    fn too_many_arguments_is_rejected() {
        let (cache, counter, arity) = counting_echo();
        let err = cache.get(&args![1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            MemoError::Key(KeyError::TooManyArguments { arity, got: 3 })
        );
        assert_eq!(calls(&counter), 0);
    }

    #[test]
    fn invalidate_prefix_and_missing_path() {
        let (cache, counter, _) = counting_echo();
        cache.get(&args![1, 1]).unwrap();
        cache.get(&args![1, 2]).unwrap();
        cache.get(&args![2, 1]).unwrap();

        assert!(cache.invalidate(&args![1]).unwrap());
        assert!(!cache.invalidate(&args![1]).unwrap());
        assert!(!cache.invalidate(&args![3, 3]).unwrap());
        assert_eq!(cache.len(), 1);

        cache.get(&args![2, 1]).unwrap();
        assert_eq!(calls(&counter), 3);

        let metrics = cache.metrics();
        assert_eq!(metrics.invalidate_calls, 3);
        assert_eq!(metrics.invalidate_hits, 1);
    }

    #[test]
    fn invalidate_prefix_too_long_is_rejected() {
        let (cache, _, _) = counting_echo();
        assert_eq!(
            cache.invalidate(&args![1, 2, 3]).unwrap_err(),
            KeyError::PrefixTooLong { depth: 2, got: 3 }
        );
    }

    #[test]
    fn invalidate_all_forces_refetch() {
        let (cache, counter, _) = counting_echo();
        cache.get(&args![1, 1]).unwrap();
        cache.get(&args![2, 2]).unwrap();
        cache.invalidate_all();
        assert!(cache.is_empty());

        cache.get(&args![1, 1]).unwrap();
        cache.get(&args![2, 2]).unwrap();
        assert_eq!(calls(&counter), 4);
    }

    #[test]
    fn zero_arity_caches_single_value() {
        let (cache, counter, _) = counting_echo_with(MemoBuilder::new(0));
        assert_eq!(cache.get(&[]).unwrap(), Vec::<Arg>::new());
        cache.get(&[]).unwrap();
        assert_eq!(calls(&counter), 1);
        assert!(cache.invalidate(&[]).unwrap());
        cache.get(&[]).unwrap();
        assert_eq!(calls(&counter), 2);
    }

    #[test]
    fn unkeyed_arguments_share_an_entry() {
        let (cache, counter, _) = counting_echo_with(MemoBuilder::new(2).key_order([0]));
        let first = cache.get(&args![1, "first"]).unwrap();
        let second = cache.get(&args![1, "second"]).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls(&counter), 1);
    }

    /// Values must not hold their own object key, or the entry never dies.
    fn object_cache(sweep_interval: usize) -> MemoCache<bool, String> {
        MemoBuilder::new(1)
            .sweep_interval(sweep_interval)
            .build(|args: &[Arg]| Ok(args[0].as_object().is_some()))
            .unwrap()
    }

    #[test]
    fn dropped_object_keys_are_purged() {
        let cache = object_cache(0);
        let frame = ObjectRef::new("GameTooltip");
        assert!(cache.get(&args![&frame]).unwrap());
        assert!(!cache.get(&args![5]).unwrap());
        assert_eq!(cache.len(), 2);

        assert_eq!(cache.purge_collected(), 0);
        drop(frame);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_collected(), 1);
        assert!(cache.contains(&args![5]).unwrap());
        assert_eq!(cache.metrics().purged_entries, 1);
    }

    #[test]
    fn live_object_keys_survive_sweeps() {
        let cache = object_cache(1);
        let frame = ObjectRef::new("GameTooltip");
        cache.get(&args![&frame]).unwrap();
        cache.get(&args![1]).unwrap();
        cache.get(&args![2]).unwrap();
        assert!(cache.contains(&args![&frame]).unwrap());
        assert_eq!(cache.metrics().purge_runs, 3);
    }

    #[test]
    fn automatic_sweep_runs_on_interval() {
        let cache = object_cache(2);
        let frame = ObjectRef::new(0u8);
        cache.get(&args![&frame]).unwrap();
        drop(frame);

        assert_eq!(cache.metrics().purge_runs, 0);
        cache.get(&args![1]).unwrap();
        let metrics = cache.metrics();
        assert_eq!(metrics.purge_runs, 1);
        assert_eq!(metrics.purged_entries, 1);
        assert_eq!(metrics.entries, 1);
    }

    #[test]
    fn metrics_track_hits_and_misses() {
        let (cache, _, _) = counting_echo();
        cache.get(&args![1, 1]).unwrap();
        cache.get(&args![1, 1]).unwrap();
        cache.get(&args![1, 1]).unwrap();
        cache.peek(&args![1, 1]).unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.get_calls, 3);
        assert_eq!(metrics.get_hits, 2);
        assert_eq!(metrics.get_misses, 1);
        assert_eq!(metrics.entries, 1);
    }

    #[test]
    fn debug_output_does_not_require_debug_values() {
        struct Opaque;
        let cache: MemoCache<Arc<Opaque>, String> =
            MemoCache::new(1, |_: &[Arg]| Ok(Arc::new(Opaque)));
        let rendered = format!("{cache:?}");
        assert!(rendered.contains("MemoCache"));
        assert!(rendered.contains("entries"));
    }
}
