#![forbid(unsafe_code)]

//! Field-scoped change notifications for record persistence lifecycles.
//!
//! FieldWatch lets application code register interest in a subset of a record
//! type's fields and receive a callback, before or after a persistence
//! operation, containing exactly the fields whose values differ from the
//! last observed snapshot, with both old and new values.
//!
//! # Architecture
//!
//! - A [`SignalHub`] owns an explicit [`LifecycleBus`] plus two channels:
//!   [`pre_save_changed`](SignalHub::pre_save_changed) and
//!   [`post_save_changed`](SignalHub::post_save_changed).
//! - The host framework publishes lifecycle events on the bus (instance
//!   initialized, before persist, after persist) and implements [`Record`]
//!   for its instances.
//! - Connecting a listener resolves the watched fields, then attaches bus
//!   proxies that seed per-instance snapshots on initialization and diff
//!   against them on the channel's save stage. Listeners are only invoked
//!   when at least one watched field actually changed.
//!
//! Execution is single-threaded and cooperative: dispatch runs synchronously
//! on the thread that performs the persistence operation, and errors from
//! normalizers or listeners propagate to the publisher of the triggering
//! event.
//!
//! # Example
//!
//! ```
//! use fieldwatch::{FieldDescriptor, ModelMeta, SignalHub};
//! use fieldwatch_core::testing::TestRecord;
//!
//! static POST: ModelMeta = ModelMeta {
//!     name: "post",
//!     fields: &[
//!         FieldDescriptor::scalar("title"),
//!         FieldDescriptor::scalar("body"),
//!     ],
//! };
//!
//! let hub = SignalHub::new();
//! hub.mark_ready();
//! hub.pre_save_changed()
//!     .connect("log_title", &POST, Some(&["title"]), |event| {
//!         let change = event.changed_fields.get("title").unwrap();
//!         println!("title: {} -> {}", change.old, change.new);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! let post = TestRecord::new(&POST);
//! post.set("title", "hello");
//! hub.initialized(&post).unwrap();
//!
//! post.set("title", "hello, world");
//! hub.pre_save(&post).unwrap(); // listener runs: title changed
//! hub.pre_save(&post).unwrap(); // listener skipped: nothing changed
//! ```

pub mod bus;
pub mod channel;
pub mod diff;
pub mod error;
pub mod hub;
pub mod resolve;
pub mod validate;

pub use bus::{Lifecycle, LifecycleBus, Stage};
pub use channel::{ChangedChannel, ChangedEvent, PostSaveInfo};
pub use diff::{ChangeSet, FieldChange};
pub use error::{ConnectError, DispatchError};
pub use hub::SignalHub;
pub use validate::ConnectOptions;

pub use fieldwatch_core::{
    FieldDescriptor, FieldKind, ModelMeta, NormalizeError, Normalizer, Record, RegistrationId,
    Snapshot, SnapshotCell, Value, normalize,
};
