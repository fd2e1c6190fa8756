#![forbid(unsafe_code)]

//! Per-instance snapshot storage.
//!
//! A [`Snapshot`] holds the last-observed normalized value of each tracked
//! field for one (instance, registration) pair. Snapshots live in a
//! [`SnapshotCell`] owned by the instance itself, so they are reclaimed with
//! the instance; no process-wide table of tracked instances exists anywhere.
//!
//! # Invariants
//!
//! 1. Snapshots are keyed by [`RegistrationId`]; independent registrations on
//!    the same instance never observe each other's baselines.
//! 2. A snapshot is created lazily on first observation and only ever
//!    contains fields that have actually been observed (deferred fields are
//!    absent until materialized).

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use crate::value::Value;

static NEXT_REGISTRATION_ID: AtomicU64 = AtomicU64::new(1);

/// Stable handle for one listener registration.
///
/// Minted from a process-wide counter at connect time, and used as the
/// snapshot key, so equality and hashing are well defined independent of any
/// listener identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    /// Mint the next process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_REGISTRATION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Last-observed normalized values for one (instance, registration).
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    values: AHashMap<&'static str, Value>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Overwrite the stored value for a field.
    pub fn write(&mut self, field: &'static str, value: Value) {
        self.values.insert(field, value);
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observed field names, sorted for deterministic inspection.
    #[must_use]
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.values.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Snapshot storage cell embedded in a record instance.
///
/// Interior-mutable so observation can run against `&self` during lifecycle
/// dispatch. The borrow taken by [`with_snapshot`](Self::with_snapshot) is
/// released before any listener runs, so listeners may trigger further
/// observation of the same instance.
#[derive(Debug, Default)]
pub struct SnapshotCell {
    inner: RefCell<AHashMap<RegistrationId, Snapshot>>,
}

impl SnapshotCell {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the snapshot for `key`, creating an empty one if this
    /// is the first observation under that registration.
    pub fn with_snapshot<R>(&self, key: RegistrationId, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        let mut map = self.inner.borrow_mut();
        f(map.entry(key).or_default())
    }

    /// Inspect the snapshot for `key` without creating one.
    pub fn peek<R>(&self, key: RegistrationId, f: impl FnOnce(Option<&Snapshot>) -> R) -> R {
        f(self.inner.borrow().get(&key))
    }

    /// Number of registrations that have observed this instance.
    #[must_use]
    pub fn observed_registrations(&self) -> usize {
        self.inner.borrow().len()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
