//! Storage backing memo caches.
//!
//! The store owns entries and lookup semantics only; locking, getter calls
//! and metrics live in [`crate::memo`].

pub(crate) mod tree;
