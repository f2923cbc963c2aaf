//! memokit: argument-keyed memoization with weak object keys and prefix
//! invalidation.
//!
//! A [`MemoCache`](memo::MemoCache) wraps a getter of fixed arity. Calls are
//! keyed by their arguments (in a configurable order) in a tree with one
//! level per keyed argument, so a partial key tuple addresses a whole
//! subtree. See `DESIGN.md` for how the pieces fit together.

pub mod builder;
pub mod error;
pub mod key;
pub mod layout;
pub mod memo;
pub mod metrics;
pub mod prelude;
pub mod registry;
pub mod traits;

pub(crate) mod store;
