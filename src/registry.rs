//! Name → cache table.
//!
//! Code that substitutes cached calls for original calls usually needs to
//! find the cache bound to a function by name, and to flush every cache at
//! once (e.g. when the world state the getters read from is reset). The
//! registry does only that; it does not intercept calls itself.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use memokit::args;
//! use memokit::key::Arg;
//! use memokit::memo::MemoCache;
//! use memokit::registry::MemoRegistry;
//!
//! let registry = MemoRegistry::new();
//! let item_name = Arc::new(MemoCache::new(1, |args: &[Arg]| {
//!     Ok::<_, String>(format!("item {}", args[0].as_int().unwrap_or_default()))
//! }));
//! registry.register("GetItemName", Arc::clone(&item_name)).unwrap();
//!
//! let cache = registry.get::<String, String>("GetItemName").unwrap();
//! assert_eq!(cache.get(&args![7]).unwrap(), "item 7");
//!
//! registry.invalidate_all();
//! assert!(item_name.is_empty());
//! ```

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::RegistryError;
use crate::key::Arg;
use crate::memo::MemoCache;
use crate::traits::Invalidate;

struct Registered {
    cache: Arc<dyn Invalidate>,
    typed: Arc<dyn Any + Send + Sync>,
}

/// Thread-safe table of named memo caches.
#[derive(Default)]
pub struct MemoRegistry {
    entries: RwLock<FxHashMap<String, Registered>>,
}

impl MemoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `cache` to `name`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::AlreadyRegistered`] if the name is taken.
    pub fn register<V, E>(
        &self,
        name: impl Into<String>,
        cache: Arc<MemoCache<V, E>>,
    ) -> Result<(), RegistryError>
    where
        V: Send + 'static,
        E: 'static,
    {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }
        debug!(name = %name, arity = cache.arity(), "registered memo cache");
        let typed: Arc<dyn Any + Send + Sync> = cache.clone();
        entries.insert(name, Registered { cache, typed });
        Ok(())
    }

    /// Removes the cache bound to `name`; returns `true` if there was one.
    pub fn unregister(&self, name: &str) -> bool {
        self.entries.write().remove(name).is_some()
    }

    /// Returns the cache bound to `name` if it has value type `V` and error
    /// type `E`.
    pub fn get<V, E>(&self, name: &str) -> Option<Arc<MemoCache<V, E>>>
    where
        V: Send + 'static,
        E: 'static,
    {
        let typed = Arc::clone(&self.entries.read().get(name)?.typed);
        typed.downcast::<MemoCache<V, E>>().ok()
    }

    /// Returns the type-erased cache bound to `name`.
    pub fn get_dyn(&self, name: &str) -> Option<Arc<dyn Invalidate>> {
        self.entries
            .read()
            .get(name)
            .map(|entry| Arc::clone(&entry.cache))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Invalidates `prefix` in the cache bound to `name`.
    pub fn invalidate(&self, name: &str, prefix: &[Arg]) -> Result<bool, RegistryError> {
        let cache = self
            .get_dyn(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        Ok(cache.invalidate(prefix)?)
    }

    /// Clears every registered cache.
    pub fn invalidate_all(&self) {
        for cache in self.caches() {
            cache.invalidate_all();
        }
    }

    /// Sweeps dead object keys from every registered cache.
    pub fn purge_collected(&self) -> usize {
        self.caches()
            .iter()
            .map(|cache| cache.purge_collected())
            .sum()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    // Caches are cloned out so no registry lock is held while they run.
    fn caches(&self) -> Vec<Arc<dyn Invalidate>> {
        self.entries
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.cache))
            .collect()
    }
}

impl std::fmt::Debug for MemoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoRegistry")
            .field("names", &self.names())
            .finish()
    }
}
