#![forbid(unsafe_code)]

//! The host-instance boundary.

use std::collections::BTreeSet;

use crate::meta::ModelMeta;
use crate::snapshot::SnapshotCell;
use crate::value::Value;

/// A persisted record instance, as seen by the change-detection engine.
///
/// Host frameworks implement this for their model instances. The engine only
/// ever reads through this trait; it never mutates instance state other than
/// the [`SnapshotCell`] the instance hands out.
///
/// # Contract
///
/// - [`raw_value`](Self::raw_value) is called only with names declared in
///   [`meta`](Self::meta), must return the field's current raw representation
///   without traversing relationships, and must not touch
///   [`snapshots`](Self::snapshots) (observation holds a borrow on the cell
///   while reading). Unset fields read as [`Value::Null`].
/// - [`deferred_fields`](Self::deferred_fields) reports fields whose values
///   have not been materialized from storage; they are excluded from
///   observation until loaded.
pub trait Record {
    /// Static metadata for this instance's record type.
    fn meta(&self) -> &'static ModelMeta;

    /// Current raw value of one declared field.
    fn raw_value(&self, field: &str) -> Value;

    /// Names of declared fields not yet loaded from storage.
    fn deferred_fields(&self) -> BTreeSet<&'static str> {
        BTreeSet::new()
    }

    /// This instance's snapshot storage. Snapshot lifetime equals instance
    /// lifetime.
    fn snapshots(&self) -> &SnapshotCell;
}
