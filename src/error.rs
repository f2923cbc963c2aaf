//! Error types for the memokit library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when a cache is configured with a key order that
//!   references argument positions outside the getter's arity.
//! - [`KeyError`]: Returned when call arguments cannot be turned into a key
//!   path (too many arguments, a prefix deeper than the tree, a `NaN` key).
//! - [`MemoError`]: Returned by [`MemoCache::get`](crate::memo::MemoCache::get);
//!   wraps either the getter's own error or a [`KeyError`].
//! - [`RegistryError`]: Returned by [`MemoRegistry`](crate::registry::MemoRegistry)
//!   operations.
//!
//! A getter failure is never cached: the next `get` for the same arguments
//! calls the getter again.
//!
//! ## Example Usage
//!
//! ```
//! use memokit::error::ConfigError;
//! use memokit::memo::MemoCache;
//!
//! let bad = MemoCache::<u32, String>::with_key_order(2, vec![0, 2], |_| Ok(0));
//! assert_eq!(
//!     bad.err(),
//!     Some(ConfigError::KeyPositionOutOfRange { position: 2, arity: 2 })
//! );
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A key order entry names an argument the getter does not take.
    #[error("key position {position} is out of range for arity {arity}")]
    KeyPositionOutOfRange { position: usize, arity: usize },
}

// ---------------------------------------------------------------------------
// KeyError
// ---------------------------------------------------------------------------

/// Error returned when arguments cannot be mapped onto the key tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// More arguments were supplied than the getter accepts.
    #[error("expected at most {arity} arguments, got {got}")]
    TooManyArguments { arity: usize, got: usize },

    /// An invalidation prefix is longer than the number of keyed positions.
    #[error("invalidation prefix has {got} keys but the cache is keyed on {depth}")]
    PrefixTooLong { depth: usize, got: usize },

    /// `NaN` never compares equal to itself and cannot address an entry.
    #[error("argument at position {position} is NaN and cannot be used as a key")]
    NanKey { position: usize },
}

// ---------------------------------------------------------------------------
// MemoError
// ---------------------------------------------------------------------------

/// Error returned by a memoized lookup.
///
/// `E` is the getter's error type and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoError<E> {
    /// The getter failed; nothing was stored.
    #[error("getter failed: {0}")]
    Getter(E),

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl<E> MemoError<E> {
    /// Returns the getter's error, if that is what failed.
    pub fn into_getter_error(self) -> Option<E> {
        match self {
            MemoError::Getter(err) => Some(err),
            MemoError::Key(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Error returned by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a cache named `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("no cache named `{0}` is registered")]
    NotRegistered(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
