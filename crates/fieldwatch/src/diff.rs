#![forbid(unsafe_code)]

//! Change detection.
//!
//! [`compute_and_update`] diffs an instance's current field values against
//! the snapshot stored for one registration, updates the snapshot to the
//! newly observed values, and returns the [`ChangeSet`] of fields that
//! differed.
//!
//! # Design
//!
//! - Values are normalized before comparison, so the snapshot only ever holds
//!   canonical forms and two representations of the same logical value never
//!   register as a change.
//! - An absent snapshot entry compares as [`Value::Null`] (normalize first,
//!   then default-fill).
//! - Deferred fields are skipped entirely (neither read, diffed, nor stored)
//!   until the instance reports them materialized.
//! - Copy-on-store: shared mutable containers are
//!   [`deep_copy`](Value::deep_copy)'d into the snapshot, so mutating the
//!   live value after observation cannot rewrite the stored baseline. The
//!   change set itself delivers the live handle.
//!
//! # Invariants
//!
//! 1. Calling twice with no intervening value change yields an empty result
//!    the second time; the first call already advanced the snapshot. It is
//!    NOT safe to call twice expecting the same non-empty result.
//! 2. A normalization failure aborts the diff and propagates; the snapshot
//!    keeps whatever was written before the failing field.

use std::collections::BTreeMap;

use fieldwatch_core::{FieldDescriptor, Record, RegistrationId, Value};
use tracing::trace;

use crate::error::DispatchError;

/// The `(old, new)` pair recorded for one changed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// Fields whose normalized value differs from the stored snapshot, with
/// their `(old, new)` pairs. Deterministically ordered by field name.
///
/// An empty change set suppresses listener delivery entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: BTreeMap<&'static str, FieldChange>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.entries.contains_key(field)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.entries.get(field)
    }

    /// Changed field names, in name order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Iterate `(name, change)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &FieldChange)> + '_ {
        self.entries.iter().map(|(name, change)| (*name, change))
    }

    fn insert(&mut self, field: &'static str, old: Value, new: Value) {
        self.entries.insert(field, FieldChange { old, new });
    }
}

/// Diff `fields` on `instance` against the snapshot for `key`, updating the
/// snapshot as a side effect. Returns the (possibly empty) change set.
pub fn compute_and_update(
    instance: &dyn Record,
    key: RegistrationId,
    fields: &[&'static FieldDescriptor],
) -> Result<ChangeSet, DispatchError> {
    let deferred = instance.deferred_fields();
    let changed = instance
        .snapshots()
        .with_snapshot(key, |snapshot| -> Result<ChangeSet, DispatchError> {
            let mut changed = ChangeSet::new();
            for field in fields {
                if deferred.contains(field.name()) {
                    continue;
                }
                let raw = field.value_from_object(instance);
                let new = field.normalize(raw).map_err(|source| {
                    DispatchError::Normalize {
                        field: field.name(),
                        source,
                    }
                })?;
                let old = snapshot.get(field.name()).cloned().unwrap_or(Value::Null);
                if old != new {
                    let stored = if new.is_mutable() {
                        new.deep_copy()
                    } else {
                        new.clone()
                    };
                    snapshot.write(field.name(), stored);
                    changed.insert(field.name(), old, new);
                }
            }
            Ok(changed)
        })?;
    trace!(
        model = instance.meta().name,
        registration = key.as_u64(),
        changed = changed.len(),
        "diff"
    );
    Ok(changed)
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwatch_core::testing::TestRecord;
    use fieldwatch_core::{FieldDescriptor, ModelMeta, normalize};

    static EVENT: ModelMeta = ModelMeta {
        name: "event",
        fields: &[
            FieldDescriptor::scalar("name"),
            FieldDescriptor::scalar("starts_at").with_normalizer(normalize::datetime),
            FieldDescriptor::scalar("attendees"),
        ],
    };

    fn all_fields() -> Vec<&'static FieldDescriptor> {
        EVENT.fields.iter().collect()
    }

    #[test]
    fn first_observation_reports_old_as_null() {
        let record = TestRecord::new(&EVENT);
        record.set("name", "launch");
        let key = RegistrationId::next();

        let changed = compute_and_update(&record, key, &all_fields()).unwrap();
        assert_eq!(
            changed.get("name"),
            Some(&FieldChange {
                old: Value::Null,
                new: Value::text("launch"),
            })
        );
        // Unset fields stay null and are not recorded as changes.
        assert!(!changed.contains("attendees"));
    }

    #[test]
    fn second_observation_without_change_is_empty() {
        let record = TestRecord::new(&EVENT);
        record.set("name", "launch");
        let key = RegistrationId::next();

        let first = compute_and_update(&record, key, &all_fields()).unwrap();
        assert!(!first.is_empty());
        let second = compute_and_update(&record, key, &all_fields()).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn change_reports_true_before_and_after() {
        let record = TestRecord::new(&EVENT);
        record.set("name", "launch");
        let key = RegistrationId::next();
        compute_and_update(&record, key, &all_fields()).unwrap();

        record.set("name", "liftoff");
        let changed = compute_and_update(&record, key, &all_fields()).unwrap();
        assert_eq!(
            changed.get("name"),
            Some(&FieldChange {
                old: Value::text("launch"),
                new: Value::text("liftoff"),
            })
        );
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn normalized_representations_compare_equal() {
        let record = TestRecord::new(&EVENT);
        record.set("starts_at", "2024-05-01T10:00:00Z");
        let key = RegistrationId::next();
        compute_and_update(&record, key, &all_fields()).unwrap();

        // Same logical instant, structured representation.
        let parsed = normalize::datetime(Value::text("2024-05-01T10:00:00Z")).unwrap();
        record.set("starts_at", parsed);
        let changed = compute_and_update(&record, key, &all_fields()).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn snapshot_stores_normalized_form() {
        let record = TestRecord::new(&EVENT);
        record.set("starts_at", "2024-05-01T10:00:00Z");
        let key = RegistrationId::next();
        compute_and_update(&record, key, &all_fields()).unwrap();

        record.snapshots().peek(key, |snap| {
            let stored = snap.unwrap().get("starts_at").unwrap();
            assert_eq!(stored.kind_name(), "timestamp");
        });
    }

    #[test]
    fn mutable_values_are_copied_into_snapshot() {
        let record = TestRecord::new(&EVENT);
        let attendees = Value::list([Value::text("ada")]);
        record.set("attendees", attendees.clone());
        let key = RegistrationId::next();
        compute_and_update(&record, key, &all_fields()).unwrap();

        // Mutate the live list after it was recorded.
        if let Value::List(items) = &attendees {
            items.borrow_mut().push(Value::text("grace"));
        }

        let changed = compute_and_update(&record, key, &all_fields()).unwrap();
        let change = changed.get("attendees").unwrap();
        assert_eq!(change.old, Value::list([Value::text("ada")]));
        assert_eq!(
            change.new,
            Value::list([Value::text("ada"), Value::text("grace")])
        );
    }

    #[test]
    fn deferred_fields_are_skipped_until_materialized() {
        let record = TestRecord::new(&EVENT);
        record.set("name", "launch");
        record.defer("attendees");
        let key = RegistrationId::next();

        compute_and_update(&record, key, &all_fields()).unwrap();
        record.snapshots().peek(key, |snap| {
            let snap = snap.unwrap();
            assert!(snap.contains("name"));
            assert!(!snap.contains("attendees"));
        });

        record.materialize("attendees", Value::list([Value::text("ada")]));
        let changed = compute_and_update(&record, key, &all_fields()).unwrap();
        let change = changed.get("attendees").unwrap();
        assert_eq!(change.old, Value::Null);
    }

    #[test]
    fn normalization_failure_propagates() {
        let record = TestRecord::new(&EVENT);
        record.set("starts_at", "not a timestamp");
        let key = RegistrationId::next();

        let err = compute_and_update(&record, key, &all_fields()).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Normalize {
                field: "starts_at",
                ..
            }
        ));
    }

    #[test]
    fn registrations_keep_independent_baselines() {
        let record = TestRecord::new(&EVENT);
        record.set("name", "launch");
        let first = RegistrationId::next();
        let second = RegistrationId::next();

        compute_and_update(&record, first, &all_fields()).unwrap();
        record.set("name", "liftoff");
        compute_and_update(&record, second, &all_fields()).unwrap();

        // `first` still has the old baseline and sees the change; `second`
        // observed after the mutation and sees nothing.
        let changed = compute_and_update(&record, first, &all_fields()).unwrap();
        assert!(changed.contains("name"));
        let changed = compute_and_update(&record, second, &all_fields()).unwrap();
        assert!(changed.is_empty());
    }

    #[test]
    fn changeset_iteration_is_name_ordered() {
        let mut set = ChangeSet::new();
        set.insert("b", Value::Null, Value::Int(2));
        set.insert("a", Value::Null, Value::Int(1));
        let names: Vec<_> = set.names().collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(set.iter().count(), 2);
    }
}
