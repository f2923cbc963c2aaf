//! Argument values and the key slots derived from them.
//!
//! ## Architecture
//!
//! ```text
//!   caller args                      tree keys
//!   ───────────                      ─────────
//!   Arg::Nil            ──────────►  KeySlot::Nil        (sentinel, never "absent")
//!   Arg::Bool / Int     ──────────►  KeySlot::Bool / Int (strong)
//!   Arg::Float(1.0)     ──────────►  KeySlot::Int(1)     (integral floats normalize)
//!   Arg::Float(0.5)     ──────────►  KeySlot::Float(bits)
//!   Arg::Str            ──────────►  KeySlot::Str        (strong)
//!   Arg::Object(Arc)    ─downgrade─► KeySlot::Object(Weak, addr)
//! ```
//!
//! Object keys compare by address. The `Weak` stored in the tree keeps the
//! allocation (not the object) alive, so an address held by a dead key can
//! never be handed out to a new object while the key is still in the tree.
//! Dead keys are unreachable by lookups and are removed by the next purge.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::error::KeyError;

type Object = dyn Any + Send + Sync;

/// Strong handle to an identity-keyed object.
///
/// Two handles are equal only if they point at the same allocation. Entries
/// keyed by an object stay reachable while any strong handle to it exists.
///
/// ```
/// use memokit::key::ObjectRef;
///
/// let frame = ObjectRef::new("tooltip");
/// let same = frame.clone();
/// let other = ObjectRef::new("tooltip");
///
/// assert_eq!(frame, same);
/// assert_ne!(frame, other);
/// assert_eq!(frame.downcast_ref::<&str>(), Some(&"tooltip"));
/// ```
#[derive(Clone)]
pub struct ObjectRef(Arc<Object>);

impl ObjectRef {
    /// Wraps `value` in a fresh identity.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Uses an existing shared object as an identity key.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    /// Returns the wrapped value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Returns `true` if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        addr_of(&self.0) == addr_of(&other.0)
    }

    /// Number of strong handles currently keeping the object alive.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    fn downgrade(&self) -> WeakKey {
        WeakKey {
            addr: addr_of(&self.0),
            weak: Arc::downgrade(&self.0),
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", addr_of(&self.0))
    }
}

fn addr_of(object: &Arc<Object>) -> usize {
    Arc::as_ptr(object).cast::<()>() as usize
}

/// A single call argument.
///
/// `Nil` is a real value: it stands for an absent argument and gets its own
/// cache slot, distinct from `false`, `0` and `""`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Arg {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Object(ObjectRef),
}

impl Arg {
    /// Returns `true` for [`Arg::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Arg::Nil)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Arg::Object(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

macro_rules! int_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Int(i64::from(value))
                }
            }
        )*
    };
}

int_arg!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Arg::Float(f64::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(Arc::from(value))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(Arc::from(value))
    }
}

impl From<Arc<str>> for Arg {
    fn from(value: Arc<str>) -> Self {
        Arg::Str(value)
    }
}

impl From<ObjectRef> for Arg {
    fn from(value: ObjectRef) -> Self {
        Arg::Object(value)
    }
}

impl From<&ObjectRef> for Arg {
    fn from(value: &ObjectRef) -> Self {
        Arg::Object(value.clone())
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map_or(Arg::Nil, Into::into)
    }
}

/// Builds a `Vec<Arg>` from heterogeneous values.
///
/// ```
/// use memokit::args;
/// use memokit::key::Arg;
///
/// let call = args![42, "player", None::<i32>];
/// assert_eq!(call, vec![Arg::Int(42), Arg::from("player"), Arg::Nil]);
/// ```
#[macro_export]
macro_rules! args {
    () => { ::std::vec::Vec::<$crate::key::Arg>::new() };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::key::Arg::from($value)),+]
    };
}

// ---------------------------------------------------------------------------
// KeySlot
// ---------------------------------------------------------------------------

/// Weakly held object key, hashed by address.
#[derive(Clone)]
pub(crate) struct WeakKey {
    addr: usize,
    weak: Weak<Object>,
}

impl WeakKey {
    fn is_live(&self) -> bool {
        self.weak.strong_count() > 0
    }
}

impl PartialEq for WeakKey {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl Eq for WeakKey {}

impl Hash for WeakKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr.hash(state);
    }
}

impl fmt::Debug for WeakKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakKey")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("live", &self.is_live())
            .finish()
    }
}

/// One level's key, derived from an [`Arg`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeySlot {
    Nil,
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(Arc<str>),
    Object(WeakKey),
}

impl KeySlot {
    /// Converts the argument at `position` into a key.
    pub(crate) fn from_arg(arg: &Arg, position: usize) -> Result<Self, KeyError> {
        Ok(match arg {
            Arg::Nil => KeySlot::Nil,
            Arg::Bool(v) => KeySlot::Bool(*v),
            Arg::Int(v) => KeySlot::Int(*v),
            Arg::Float(v) => float_key(*v).ok_or(KeyError::NanKey { position })?,
            Arg::Str(v) => KeySlot::Str(Arc::clone(v)),
            Arg::Object(obj) => KeySlot::Object(obj.downgrade()),
        })
    }

    /// Scalar keys are always live; object keys die with their object.
    pub(crate) fn is_live(&self) -> bool {
        match self {
            KeySlot::Object(key) => key.is_live(),
            _ => true,
        }
    }
}

// i64 bounds as f64; the upper bound itself is 2^63 and does not fit.
const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_EXCLUSIVE_F: f64 = 9_223_372_036_854_775_808.0;

fn float_key(value: f64) -> Option<KeySlot> {
    if value.is_nan() {
        return None;
    }
    if value.fract() == 0.0 && (I64_MIN_F..I64_MAX_EXCLUSIVE_F).contains(&value) {
        // -0.0 lands here too and becomes Int(0)
        return Some(KeySlot::Int(value as i64));
    }
    Some(KeySlot::Float(value.to_bits()))
}
