pub use crate::args;
pub use crate::builder::{MemoBuilder, MemoConfig};
pub use crate::error::{ConfigError, KeyError, MemoError, RegistryError};
pub use crate::key::{Arg, ObjectRef};
pub use crate::layout::KeyLayout;
pub use crate::memo::MemoCache;
pub use crate::metrics::MemoMetricsSnapshot;
pub use crate::registry::MemoRegistry;
pub use crate::traits::Invalidate;
