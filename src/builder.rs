//! Configuration and builder for memo caches.
//!
//! ## Example
//!
//! ```rust
//! use memokit::args;
//! use memokit::builder::MemoBuilder;
//! use memokit::key::Arg;
//!
//! // getter(a, b, c) keyed on b, then a; c is passed through unkeyed
//! let cache = MemoBuilder::new(3)
//!     .key_order([1, 0])
//!     .sweep_interval(256)
//!     .build(|args: &[Arg]| Ok::<_, String>(args.len()))
//!     .unwrap();
//!
//! assert_eq!(cache.get(&args![1, 2, 3]), Ok(3));
//! assert_eq!(cache.key_order(), &[1, 0]);
//! ```

use std::num::NonZeroUsize;

use crate::error::ConfigError;
use crate::key::Arg;
use crate::layout::KeyLayout;
use crate::memo::MemoCache;

/// Insertions between automatic sweeps of dead object keys.
pub const DEFAULT_SWEEP_INTERVAL: NonZeroUsize = match NonZeroUsize::new(1024) {
    Some(interval) => interval,
    None => panic!("sweep interval must be non-zero"),
};

/// Plain configuration for a memo cache.
///
/// | Field            | Type                     | Default | Description                               |
/// |------------------|--------------------------|---------|-------------------------------------------|
/// | `key_order`      | `Option<Vec<usize>>`     | `None`  | 0-based keyed positions; `None` = all     |
/// | `sweep_interval` | `Option<NonZeroUsize>`   | `1024`  | Insertions between sweeps; `None` = never |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoConfig {
    pub key_order: Option<Vec<usize>>,
    pub sweep_interval: Option<NonZeroUsize>,
}

impl Default for MemoConfig {
    fn default() -> Self {
        Self {
            key_order: None,
            sweep_interval: Some(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

impl MemoConfig {
    /// Validates the key order against `arity`.
    pub fn layout(&self, arity: usize) -> Result<KeyLayout, ConfigError> {
        match &self.key_order {
            Some(order) => KeyLayout::with_key_order(arity, order.clone()),
            None => Ok(KeyLayout::identity(arity)),
        }
    }
}

/// Builder for [`MemoCache`] instances.
#[derive(Debug, Clone)]
pub struct MemoBuilder {
    arity: usize,
    config: MemoConfig,
}

impl MemoBuilder {
    /// Starts a builder for a getter taking `arity` arguments.
    pub fn new(arity: usize) -> Self {
        Self::from_config(arity, MemoConfig::default())
    }

    pub fn from_config(arity: usize, config: MemoConfig) -> Self {
        Self { arity, config }
    }

    /// Sets the 0-based argument positions used as keys, outermost first.
    pub fn key_order(mut self, order: impl IntoIterator<Item = usize>) -> Self {
        self.config.key_order = Some(order.into_iter().collect());
        self
    }

    /// Sweeps dead object keys every `every` insertions; `0` disables
    /// automatic sweeps (call [`MemoCache::purge_collected`] instead).
    pub fn sweep_interval(mut self, every: usize) -> Self {
        self.config.sweep_interval = NonZeroUsize::new(every);
        self
    }

    pub fn config(&self) -> &MemoConfig {
        &self.config
    }

    /// Builds the cache around `getter`.
    ///
    /// Fails if the key order names a position outside the arity.
    pub fn build<V, E, F>(self, getter: F) -> Result<MemoCache<V, E>, ConfigError>
    where
        F: Fn(&[Arg]) -> Result<V, E> + Send + Sync + 'static,
    {
        let layout = self.config.layout(self.arity)?;
        Ok(MemoCache::from_parts(
            layout,
            self.config.sweep_interval,
            Box::new(getter),
        ))
    }
}
