#![forbid(unsafe_code)]

//! In-memory [`Record`] fixture for test suites.
//!
//! Enabled with the `test-helpers` feature. `TestRecord` stores values in a
//! plain map, supports marking fields deferred, and owns a [`SnapshotCell`]
//! like any real host instance would.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::meta::ModelMeta;
use crate::record::Record;
use crate::snapshot::SnapshotCell;
use crate::value::Value;

/// A configurable in-memory record instance.
#[derive(Debug)]
pub struct TestRecord {
    meta: &'static ModelMeta,
    values: RefCell<BTreeMap<&'static str, Value>>,
    deferred: RefCell<BTreeSet<&'static str>>,
    snapshots: SnapshotCell,
}

impl TestRecord {
    /// A fresh instance with every field unset (reads as [`Value::Null`]).
    #[must_use]
    pub fn new(meta: &'static ModelMeta) -> Self {
        Self {
            meta,
            values: RefCell::new(BTreeMap::new()),
            deferred: RefCell::new(BTreeSet::new()),
            snapshots: SnapshotCell::new(),
        }
    }

    /// Assign a field value.
    pub fn set(&self, field: &'static str, value: impl Into<Value>) {
        self.values.borrow_mut().insert(field, value.into());
    }

    /// Mark a field as not yet loaded from storage.
    pub fn defer(&self, field: &'static str) {
        self.deferred.borrow_mut().insert(field);
    }

    /// Load a deferred field: clears the deferred mark and assigns the value.
    pub fn materialize(&self, field: &'static str, value: impl Into<Value>) {
        self.deferred.borrow_mut().remove(field);
        self.set(field, value);
    }
}

impl Record for TestRecord {
    fn meta(&self) -> &'static ModelMeta {
        self.meta
    }

    fn raw_value(&self, field: &str) -> Value {
        self.values
            .borrow()
            .get(field)
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn deferred_fields(&self) -> BTreeSet<&'static str> {
        self.deferred.borrow().clone()
    }

    fn snapshots(&self) -> &SnapshotCell {
        &self.snapshots
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
