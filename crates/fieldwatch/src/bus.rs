#![forbid(unsafe_code)]

//! The lifecycle event bus.
//!
//! An explicit, injectable dispatcher for the three host lifecycle events the
//! engine consumes: instance initialized, before persist, after persist. The
//! host publishes; channels subscribe. Because the bus is a plain value (no
//! global registry), the whole engine can be exercised in tests without a
//! live framework instance.
//!
//! # Invariants
//!
//! 1. Handlers for a (stage, model) pair run in subscription order.
//! 2. Dispatch iterates a snapshot of the handler list: a handler may publish
//!    further events or subscribe new handlers without deadlocking, and a
//!    handler subscribed during dispatch is not invoked for the event already
//!    in flight.
//! 3. A handler error stops dispatch immediately and propagates to the
//!    publisher; later handlers are not invoked.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use fieldwatch_core::Record;
use tracing::trace;

use crate::error::DispatchError;

/// Which lifecycle moment an event or subscription refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Instance construction finished; used to seed snapshots.
    Initialized,
    /// About to persist.
    PreSave,
    /// Persisted.
    PostSave,
}

/// One lifecycle event, as published by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle<'a> {
    Initialized,
    PreSave,
    PostSave {
        /// Whether the record was newly created by this save.
        created: bool,
        /// Identifier of the data store the save went to.
        using: &'a str,
    },
}

impl Lifecycle<'_> {
    #[inline]
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Initialized => Stage::Initialized,
            Self::PreSave => Stage::PreSave,
            Self::PostSave { .. } => Stage::PostSave,
        }
    }
}

type Handler = Rc<dyn Fn(&dyn Record, &Lifecycle<'_>) -> Result<(), DispatchError>>;

/// Typed publish/subscribe dispatcher for lifecycle events.
///
/// Also carries the readiness gate: model metadata may only be queried (and
/// listeners connected) once the host has called [`mark_ready`](Self::mark_ready).
pub struct LifecycleBus {
    ready: Cell<bool>,
    handlers: RefCell<AHashMap<(Stage, &'static str), Vec<Handler>>>,
}

impl LifecycleBus {
    /// A fresh bus, not yet ready.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ready: Cell::new(false),
            handlers: RefCell::new(AHashMap::new()),
        }
    }

    /// Signal that host startup has completed and model metadata is safe to
    /// query. Idempotent.
    pub fn mark_ready(&self) {
        self.ready.set(true);
    }

    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    /// Subscribe a handler for one (stage, model) pair.
    pub fn subscribe(
        &self,
        stage: Stage,
        model: &'static str,
        handler: impl Fn(&dyn Record, &Lifecycle<'_>) -> Result<(), DispatchError> + 'static,
    ) {
        self.handlers
            .borrow_mut()
            .entry((stage, model))
            .or_default()
            .push(Rc::new(handler));
    }

    /// Publish one event for one instance. Handlers run synchronously, in
    /// subscription order, on the calling thread; the first error aborts
    /// dispatch and propagates.
    pub fn publish(
        &self,
        instance: &dyn Record,
        event: &Lifecycle<'_>,
    ) -> Result<(), DispatchError> {
        let model = instance.meta().name;
        let snapshot: Vec<Handler> = match self.handlers.borrow().get(&(event.stage(), model)) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };
        trace!(stage = ?event.stage(), model, handlers = snapshot.len(), "publish");
        for handler in &snapshot {
            handler(instance, event)?;
        }
        Ok(())
    }

    /// Publish "instance initialized".
    pub fn initialized(&self, instance: &dyn Record) -> Result<(), DispatchError> {
        self.publish(instance, &Lifecycle::Initialized)
    }

    /// Publish "about to persist".
    pub fn pre_save(&self, instance: &dyn Record) -> Result<(), DispatchError> {
        self.publish(instance, &Lifecycle::PreSave)
    }

    /// Publish "persisted".
    pub fn post_save(
        &self,
        instance: &dyn Record,
        created: bool,
        using: &str,
    ) -> Result<(), DispatchError> {
        self.publish(instance, &Lifecycle::PostSave { created, using })
    }

    /// Total number of subscribed handlers, across all (stage, model) pairs.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().values().map(Vec::len).sum()
    }
}

impl Default for LifecycleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LifecycleBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBus")
            .field("ready", &self.ready.get())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use fieldwatch_core::testing::TestRecord;
    use fieldwatch_core::{FieldDescriptor, ModelMeta, NormalizeError};

    static WIDGET: ModelMeta = ModelMeta {
        name: "widget",
        fields: &[FieldDescriptor::scalar("label")],
    };

    static GADGET: ModelMeta = ModelMeta {
        name: "gadget",
        fields: &[FieldDescriptor::scalar("label")],
    };

    #[test]
    fn publish_without_handlers_is_ok() {
        let bus = LifecycleBus::new();
        let record = TestRecord::new(&WIDGET);
        assert!(bus.initialized(&record).is_ok());
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let bus = LifecycleBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let sink = Rc::clone(&order);
            bus.subscribe(Stage::PreSave, "widget", move |_, _| {
                sink.borrow_mut().push(tag);
                Ok(())
            });
        }

        let record = TestRecord::new(&WIDGET);
        bus.pre_save(&record).unwrap();
        assert_eq!(*order.borrow(), ["first", "second", "third"]);
    }

    #[test]
    fn dispatch_is_scoped_by_stage_and_model() {
        let bus = LifecycleBus::new();
        let hits = Rc::new(Cell::new(0u32));

        let sink = Rc::clone(&hits);
        bus.subscribe(Stage::PreSave, "widget", move |_, _| {
            sink.set(sink.get() + 1);
            Ok(())
        });

        let widget = TestRecord::new(&WIDGET);
        let gadget = TestRecord::new(&GADGET);
        bus.pre_save(&gadget).unwrap();
        bus.post_save(&widget, false, "default").unwrap();
        assert_eq!(hits.get(), 0);

        bus.pre_save(&widget).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn post_save_event_carries_extras() {
        let bus = LifecycleBus::new();
        let seen = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&seen);
        bus.subscribe(Stage::PostSave, "widget", move |_, event| {
            if let Lifecycle::PostSave { created, using } = *event {
                *sink.borrow_mut() = Some((created, using.to_string()));
            }
            Ok(())
        });

        let record = TestRecord::new(&WIDGET);
        bus.post_save(&record, true, "replica").unwrap();
        assert_eq!(*seen.borrow(), Some((true, "replica".to_string())));
    }

    #[test]
    fn handler_error_stops_dispatch() {
        let bus = LifecycleBus::new();
        let reached = Rc::new(Cell::new(false));

        bus.subscribe(Stage::PreSave, "widget", |_, _| {
            Err(DispatchError::listener(NormalizeError::new("boom")))
        });
        let sink = Rc::clone(&reached);
        bus.subscribe(Stage::PreSave, "widget", move |_, _| {
            sink.set(true);
            Ok(())
        });

        let record = TestRecord::new(&WIDGET);
        assert!(bus.pre_save(&record).is_err());
        assert!(!reached.get());
    }

    #[test]
    fn handler_may_publish_reentrantly() {
        let bus = Rc::new(LifecycleBus::new());
        let depth = Rc::new(Cell::new(0u32));

        let inner_bus = Rc::clone(&bus);
        let counter = Rc::clone(&depth);
        bus.subscribe(Stage::PreSave, "widget", move |instance, _| {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                inner_bus.post_save(instance, false, "default")?;
            }
            Ok(())
        });
        let counter = Rc::clone(&depth);
        bus.subscribe(Stage::PostSave, "widget", move |_, _| {
            counter.set(counter.get() + 10);
            Ok(())
        });

        let record = TestRecord::new(&WIDGET);
        bus.pre_save(&record).unwrap();
        assert_eq!(depth.get(), 11);
    }

    #[test]
    fn subscription_during_dispatch_skips_event_in_flight() {
        let bus = Rc::new(LifecycleBus::new());
        let late_hits = Rc::new(Cell::new(0u32));

        let outer_bus = Rc::clone(&bus);
        let sink = Rc::clone(&late_hits);
        bus.subscribe(Stage::PreSave, "widget", move |_, _| {
            let sink = Rc::clone(&sink);
            outer_bus.subscribe(Stage::PreSave, "widget", move |_, _| {
                sink.set(sink.get() + 1);
                Ok(())
            });
            Ok(())
        });

        let record = TestRecord::new(&WIDGET);
        bus.pre_save(&record).unwrap();
        assert_eq!(late_hits.get(), 0, "late handler must skip in-flight event");

        bus.pre_save(&record).unwrap();
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn readiness_gate_flips_once() {
        let bus = LifecycleBus::new();
        assert!(!bus.is_ready());
        bus.mark_ready();
        bus.mark_ready();
        assert!(bus.is_ready());
    }
}
