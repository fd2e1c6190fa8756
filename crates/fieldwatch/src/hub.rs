#![forbid(unsafe_code)]

//! The public surface: one hub owning the bus and both channels.

use std::rc::Rc;

use fieldwatch_core::Record;

use crate::bus::{LifecycleBus, Stage};
use crate::channel::ChangedChannel;
use crate::error::DispatchError;

/// Owns the shared [`LifecycleBus`] and the two pre-built notification
/// channels, `pre_save_changed` and `post_save_changed`.
///
/// The host side publishes through the hub ([`initialized`](Self::initialized),
/// [`pre_save`](Self::pre_save), [`post_save`](Self::post_save)) and signals
/// startup completion with [`mark_ready`](Self::mark_ready); application code
/// connects listeners through the channel accessors.
#[derive(Debug)]
pub struct SignalHub {
    bus: Rc<LifecycleBus>,
    pre_save_changed: ChangedChannel,
    post_save_changed: ChangedChannel,
}

impl SignalHub {
    /// A hub with its own private bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_bus(Rc::new(LifecycleBus::new()))
    }

    /// A hub wired onto an existing bus (for hosts that already own one).
    #[must_use]
    pub fn with_bus(bus: Rc<LifecycleBus>) -> Self {
        Self {
            pre_save_changed: ChangedChannel::new(
                "pre_save_changed",
                Stage::PreSave,
                Rc::clone(&bus),
            ),
            post_save_changed: ChangedChannel::new(
                "post_save_changed",
                Stage::PostSave,
                Rc::clone(&bus),
            ),
            bus,
        }
    }

    /// The shared bus.
    #[must_use]
    pub fn bus(&self) -> &Rc<LifecycleBus> {
        &self.bus
    }

    /// Fires before a save operation, for listeners whose watched fields
    /// changed since the last observation.
    #[must_use]
    pub fn pre_save_changed(&self) -> &ChangedChannel {
        &self.pre_save_changed
    }

    /// Fires after a save operation, additionally carrying whether the record
    /// was created and which data store was used.
    #[must_use]
    pub fn post_save_changed(&self) -> &ChangedChannel {
        &self.post_save_changed
    }

    /// Signal that host startup has completed; listeners may now connect.
    pub fn mark_ready(&self) {
        self.bus.mark_ready();
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.bus.is_ready()
    }

    /// Host hook: an instance finished initializing (seeds snapshots).
    pub fn initialized(&self, instance: &dyn Record) -> Result<(), DispatchError> {
        self.bus.initialized(instance)
    }

    /// Host hook: an instance is about to be persisted.
    pub fn pre_save(&self, instance: &dyn Record) -> Result<(), DispatchError> {
        self.bus.pre_save(instance)
    }

    /// Host hook: an instance was persisted.
    pub fn post_save(
        &self,
        instance: &dyn Record,
        created: bool,
        using: &str,
    ) -> Result<(), DispatchError> {
        self.bus.post_save(instance, created, using)
    }
}

impl Default for SignalHub {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
