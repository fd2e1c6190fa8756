#![forbid(unsafe_code)]

//! Dynamic field values.
//!
//! [`Value`] is the currency of the change-detection engine: accessors read
//! it, normalizers canonicalize it, snapshots store it, and change sets carry
//! `(old, new)` pairs of it.
//!
//! # Design
//!
//! `List` and `Map` are shared mutable containers (`Rc<RefCell<..>>`): an
//! accessor may hand out a handle that aliases live instance state, which is
//! exactly why snapshots store a [`deep_copy`](Value::deep_copy) of them.
//! Every other variant is immutable once constructed and safe to share by
//! handle.
//!
//! # Invariants
//!
//! 1. `Value` has a deterministic total order; equality is derived from it,
//!    so values never compare "equal but unordered". Floats use
//!    `f64::total_cmp`, which makes `NaN == NaN`.
//! 2. `deep_copy()` returns a value that shares no mutable container with
//!    the original, at any nesting depth.
//! 3. Comparison never mutates; comparing a shared container with itself is
//!    safe (pointer-equal containers short-circuit).

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};

/// A dynamic field value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent / unset. Also the implicit "old value" for a field never
    /// observed before.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Rc<str>),
    Timestamp(DateTime<Utc>),
    /// Fixed-size immutable sequence.
    Tuple(Rc<[Value]>),
    /// Frozen unordered-unique set.
    Set(Rc<BTreeSet<Value>>),
    /// Shared mutable sequence. Cloning shares the underlying storage.
    List(Rc<RefCell<Vec<Value>>>),
    /// Shared mutable string-keyed mapping. Cloning shares the storage.
    Map(Rc<RefCell<BTreeMap<String, Value>>>),
}

impl Value {
    /// Build a text value.
    #[must_use]
    pub fn text(s: impl AsRef<str>) -> Self {
        Self::Text(Rc::from(s.as_ref()))
    }

    /// Build a tuple from an iterator of values.
    #[must_use]
    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Tuple(items.into_iter().collect())
    }

    /// Build a frozen set from an iterator of values.
    #[must_use]
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Set(Rc::new(items.into_iter().collect()))
    }

    /// Build a shared mutable list from an iterator of values.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Build a shared mutable map from `(key, value)` pairs.
    #[must_use]
    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self::Map(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is a shared mutable container (`List` or `Map`).
    ///
    /// Mutable values must be deep-copied before being stored anywhere that
    /// outlives the current call; everything else is safe to share by handle.
    #[inline]
    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        matches!(self, Self::List(_) | Self::Map(_))
    }

    /// Short variant name, for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Recursively detach this value from all shared mutable storage.
    ///
    /// The result compares equal to `self` but mutating any container
    /// reachable from the original can no longer affect it.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        match self {
            Self::Tuple(items) => Self::Tuple(items.iter().map(Value::deep_copy).collect()),
            Self::Set(items) => Self::Set(Rc::new(items.iter().map(Value::deep_copy).collect())),
            Self::List(items) => Self::List(Rc::new(RefCell::new(
                items.borrow().iter().map(Value::deep_copy).collect(),
            ))),
            Self::Map(entries) => Self::Map(Rc::new(RefCell::new(
                entries
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_copy()))
                    .collect(),
            ))),
            other => other.clone(),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Text(_) => 4,
            Self::Timestamp(_) => 5,
            Self::Tuple(_) => 6,
            Self::Set(_) => 7,
            Self::List(_) => 8,
            Self::Map(_) => 9,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Tuple(a), Self::Tuple(b)) => a.cmp(b),
            (Self::Set(a), Self::Set(b)) => a.cmp(b),
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ordering::Equal;
                }
                a.borrow().cmp(&b.borrow())
            }
            (Self::Map(a), Self::Map(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ordering::Equal;
                }
                a.borrow().cmp(&b.borrow())
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Self::Set(items) => {
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::text(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
