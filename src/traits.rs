//! # Memo Cache Traits
//!
//! [`MemoCache`](crate::memo::MemoCache) is generic over its value and getter
//! error types, which makes caches for different getters different types.
//! The traits here expose the operations that do not mention those types, so
//! heterogeneous caches can be driven together (e.g. by
//! [`MemoRegistry`](crate::registry::MemoRegistry)).
//!
//! ```text
//!   ┌──────────────────────────────────────────┐
//!   │ Invalidate: Send + Sync                  │
//!   │                                          │
//!   │  invalidate(&self, &[Arg]) → bool        │
//!   │  invalidate_all(&self)                   │
//!   │  purge_collected(&self) → usize          │
//!   │  len(&self) → usize                      │
//!   │  is_empty(&self) → bool   (default)      │
//!   └──────────────────────────────────────────┘
//!                      ▲
//!                      │ impl<V: Send, E>
//!              MemoCache<V, E>
//! ```
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use memokit::args;
//! use memokit::key::Arg;
//! use memokit::memo::MemoCache;
//! use memokit::traits::Invalidate;
//!
//! let names = MemoCache::new(1, |_: &[Arg]| Ok::<_, String>("name".to_string()));
//! let counts = MemoCache::new(2, |_: &[Arg]| Ok::<_, String>(3u32));
//! names.get(&args![1]).unwrap();
//! counts.get(&args![1, 2]).unwrap();
//!
//! let names: Arc<dyn Invalidate> = Arc::new(names);
//! let counts: Arc<dyn Invalidate> = Arc::new(counts);
//! let caches = [names, counts];
//! for cache in &caches {
//!     cache.invalidate_all();
//! }
//! assert!(caches.iter().all(|c| c.is_empty()));
//! ```

use crate::error::KeyError;
use crate::key::Arg;

/// Type-erased invalidation interface of a memo cache.
///
/// Object safe; implemented by every `MemoCache<V, E>` with `V: Send`.
pub trait Invalidate: Send + Sync {
    /// Forgets every entry under the key-ordered `prefix`; `Ok(false)` when
    /// nothing matched.
    fn invalidate(&self, prefix: &[Arg]) -> Result<bool, KeyError>;

    /// Forgets every entry.
    fn invalidate_all(&self);

    /// Drops entries whose object key has no strong handles left.
    fn purge_collected(&self) -> usize;

    /// Number of cached values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
