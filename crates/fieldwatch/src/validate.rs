#![forbid(unsafe_code)]

//! Registration-time preconditions.
//!
//! Checks that must pass before a channel touches the bus: the host readiness
//! gate and the requested delivery options. Field validation is delegated to
//! [`resolve`](crate::resolve::resolve); the duplicate-listener invariant is
//! enforced against the channel's registration table. The "sender must be a
//! model type" precondition is static here: `connect` takes
//! `&'static ModelMeta`, so an instance cannot be passed where a type is
//! required.

use crate::bus::LifecycleBus;
use crate::error::ConnectError;

/// Delivery options for a registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectOptions {
    /// Request weak-reference delivery semantics. Unsupported: proxy
    /// listeners are closures that must stay alive independently of the
    /// caller's reference, so requesting this fails the registration.
    pub weak: bool,
}

pub(crate) fn validate(bus: &LifecycleBus, options: ConnectOptions) -> Result<(), ConnectError> {
    if !bus.is_ready() {
        return Err(ConnectError::NotReady);
    }
    if options.weak {
        return Err(ConnectError::WeakUnsupported);
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_before_readiness() {
        let bus = LifecycleBus::new();
        assert_eq!(
            validate(&bus, ConnectOptions::default()),
            Err(ConnectError::NotReady)
        );

        bus.mark_ready();
        assert_eq!(validate(&bus, ConnectOptions::default()), Ok(()));
    }

    #[test]
    fn rejects_weak_delivery() {
        let bus = LifecycleBus::new();
        bus.mark_ready();
        assert_eq!(
            validate(&bus, ConnectOptions { weak: true }),
            Err(ConnectError::WeakUnsupported)
        );
    }
}
