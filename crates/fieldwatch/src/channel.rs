#![forbid(unsafe_code)]

//! Changed-field notification channels.
//!
//! A [`ChangedChannel`] owns the registrations for one notification point
//! ("before persist changed" or "after persist changed") and bridges them to
//! the [`LifecycleBus`]. Connecting a listener attaches two proxies to the
//! bus: one on [`Stage::Initialized`] that seeds the registration's snapshot,
//! and one on the channel's own save stage that diffs the instance and
//! invokes the listener, but only if at least one watched field actually
//! changed. That filter is the central contract of the whole engine: an empty
//! change set means the listener is never called.
//!
//! Channels are parameterized by their trigger stage; both pre-save and
//! post-save behavior share this one implementation.
//!
//! # Invariants
//!
//! 1. `connect` validates completely (readiness, options, field resolution,
//!    duplicate key) before touching the bus; a failed connect attaches
//!    nothing.
//! 2. One registration per (channel, model, key); duplicates are rejected
//!    with existing registrations untouched.
//! 3. Registrations have no teardown: once attached, a listener lives for
//!    the life of the bus.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use fieldwatch_core::{FieldDescriptor, ModelMeta, Record, RegistrationId};
use tracing::debug;

use crate::bus::{Lifecycle, LifecycleBus, Stage};
use crate::diff::{self, ChangeSet};
use crate::error::{ConnectError, DispatchError};
use crate::resolve;
use crate::validate::{self, ConnectOptions};

/// Extra context delivered on the post-save channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostSaveInfo<'a> {
    /// Whether the save created the record.
    pub created: bool,
    /// Identifier of the data store the save went to.
    pub using: &'a str,
}

/// What a listener receives: the instance, the non-empty change set, and,
/// on the post-save channel, the save context.
pub struct ChangedEvent<'a> {
    pub instance: &'a dyn Record,
    pub changed_fields: &'a ChangeSet,
    pub save: Option<PostSaveInfo<'a>>,
}

impl fmt::Debug for ChangedEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangedEvent")
            .field("model", &self.instance.meta().name)
            .field("changed_fields", &self.changed_fields)
            .field("save", &self.save)
            .finish()
    }
}

struct Registration {
    id: RegistrationId,
    key: String,
    fields: Rc<[&'static FieldDescriptor]>,
}

/// One notification channel: a registration table plus its bus wiring.
pub struct ChangedChannel {
    name: &'static str,
    stage: Stage,
    bus: Rc<LifecycleBus>,
    registrations: RefCell<AHashMap<&'static str, Vec<Registration>>>,
}

impl ChangedChannel {
    /// Build a channel that triggers on `stage` ([`Stage::PreSave`] or
    /// [`Stage::PostSave`]).
    #[must_use]
    pub fn new(name: &'static str, stage: Stage, bus: Rc<LifecycleBus>) -> Self {
        Self {
            name,
            stage,
            bus,
            registrations: RefCell::new(AHashMap::new()),
        }
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Connect `listener` for `model` with default options.
    ///
    /// `fields` narrows the watched set to the named fields; `None` watches
    /// every declared non-reverse field. `key` identifies this listener for
    /// duplicate detection: one registration per (channel, model, key).
    pub fn connect<F>(
        &self,
        key: impl Into<String>,
        model: &'static ModelMeta,
        fields: Option<&[&str]>,
        listener: F,
    ) -> Result<RegistrationId, ConnectError>
    where
        F: Fn(&ChangedEvent<'_>) -> Result<(), DispatchError> + 'static,
    {
        self.connect_with(key, model, fields, ConnectOptions::default(), listener)
    }

    /// Connect with explicit [`ConnectOptions`].
    ///
    /// Validation runs completely before any bus attachment: a failed
    /// connect leaves no proxy behind and no snapshot will ever be created
    /// for the rejected registration.
    pub fn connect_with<F>(
        &self,
        key: impl Into<String>,
        model: &'static ModelMeta,
        fields: Option<&[&str]>,
        options: ConnectOptions,
        listener: F,
    ) -> Result<RegistrationId, ConnectError>
    where
        F: Fn(&ChangedEvent<'_>) -> Result<(), DispatchError> + 'static,
    {
        let key = key.into();
        validate::validate(&self.bus, options)?;
        let resolved: Rc<[&'static FieldDescriptor]> = resolve::resolve(model, fields)?.into();
        if self
            .registrations
            .borrow()
            .get(model.name)
            .is_some_and(|list| list.iter().any(|r| r.key == key))
        {
            return Err(ConnectError::DuplicateListener {
                channel: self.name,
                model: model.name,
                key,
            });
        }

        let id = RegistrationId::next();
        let listener: Rc<dyn Fn(&ChangedEvent<'_>) -> Result<(), DispatchError>> =
            Rc::new(listener);

        // Seed the snapshot when an instance comes into being. The result is
        // discarded on purpose: initialization never notifies.
        let prime_fields = Rc::clone(&resolved);
        self.bus
            .subscribe(Stage::Initialized, model.name, move |instance, _event| {
                diff::compute_and_update(instance, id, &prime_fields).map(|_| ())
            });

        let watch_fields = Rc::clone(&resolved);
        self.bus
            .subscribe(self.stage, model.name, move |instance, event| {
                let changed = diff::compute_and_update(instance, id, &watch_fields)?;
                if changed.is_empty() {
                    return Ok(());
                }
                let save = match *event {
                    Lifecycle::PostSave { created, using } => {
                        Some(PostSaveInfo { created, using })
                    }
                    _ => None,
                };
                listener(&ChangedEvent {
                    instance,
                    changed_fields: &changed,
                    save,
                })
            });

        debug!(
            channel = self.name,
            model = model.name,
            key = %key,
            fields = resolved.len(),
            registration = id.as_u64(),
            "listener connected"
        );
        self.registrations
            .borrow_mut()
            .entry(model.name)
            .or_default()
            .push(Registration {
                id,
                key,
                fields: resolved,
            });
        Ok(id)
    }

    /// Whether `key` is registered on this channel for `model`.
    #[must_use]
    pub fn is_connected(&self, key: &str, model: &ModelMeta) -> bool {
        self.registrations
            .borrow()
            .get(model.name)
            .is_some_and(|list| list.iter().any(|r| r.key == key))
    }

    /// The watched field names for a registration, in declaration order.
    #[must_use]
    pub fn watched_field_names(&self, key: &str, model: &ModelMeta) -> Option<Vec<&'static str>> {
        self.registrations
            .borrow()
            .get(model.name)
            .and_then(|list| list.iter().find(|r| r.key == key))
            .map(|r| r.fields.iter().map(|f| f.name()).collect())
    }

    /// The registration handle for a connected key.
    #[must_use]
    pub fn registration_id(&self, key: &str, model: &ModelMeta) -> Option<RegistrationId> {
        self.registrations
            .borrow()
            .get(model.name)
            .and_then(|list| list.iter().find(|r| r.key == key))
            .map(|r| r.id)
    }

    /// Number of registrations on this channel, across all models.
    #[must_use]
    pub fn registration_count(&self) -> usize {
        self.registrations.borrow().values().map(Vec::len).sum()
    }
}

impl fmt::Debug for ChangedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangedChannel")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("registrations", &self.registration_count())
            .finish()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
