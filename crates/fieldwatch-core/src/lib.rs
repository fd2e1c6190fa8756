#![forbid(unsafe_code)]

//! Core model boundary for FieldWatch: field values, model metadata,
//! normalization, and per-instance snapshot storage.
//!
//! This crate defines the narrow interface between the change-detection
//! engine (the `fieldwatch` crate) and a host record/persistence framework:
//!
//! - [`Value`]: a dynamic field value with shared-mutable container variants
//!   and a deterministic total order.
//! - [`ModelMeta`] / [`FieldDescriptor`]: static, declaration-ordered field
//!   metadata for a record type.
//! - [`normalize`]: canonicalizing converters from raw stored/assigned
//!   representations into comparable values.
//! - [`Record`]: the trait a host instance implements to expose metadata,
//!   raw field values, deferred fields, and its snapshot cell.
//! - [`SnapshotCell`] / [`Snapshot`]: last-observed values per
//!   (instance, registration), owned by the instance and reclaimed with it.

pub mod meta;
pub mod normalize;
pub mod record;
pub mod snapshot;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod value;

pub use meta::{FieldDescriptor, FieldKind, ModelMeta};
pub use normalize::{NormalizeError, Normalizer};
pub use record::Record;
pub use snapshot::{RegistrationId, Snapshot, SnapshotCell};
pub use value::Value;
