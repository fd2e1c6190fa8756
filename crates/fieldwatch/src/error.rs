#![forbid(unsafe_code)]

//! Error taxonomy.
//!
//! [`ConnectError`] covers everything that can go wrong while registering a
//! listener; all variants surface synchronously at connect time and a failed
//! connect leaves no partial registration behind. [`DispatchError`] covers
//! runtime failures during observation and listener invocation; they
//! propagate synchronously to whoever published the lifecycle event. Nothing
//! is retried or swallowed on either path.

use fieldwatch_core::NormalizeError;
use thiserror::Error;

/// Registration-time failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error(
        "model metadata is not ready; connect listeners after host startup has completed"
    )]
    NotReady,

    #[error(
        "weak listener references are not supported; keep the listener alive and hold the returned registration id"
    )]
    WeakUnsupported,

    #[error("model `{model}` has no field named `{name}`")]
    UnknownField { model: &'static str, name: String },

    #[error(
        "field `{name}` on model `{model}` is a reverse related field and has no scalar value to watch"
    )]
    ReverseRelation {
        model: &'static str,
        name: &'static str,
    },

    #[error("no watchable fields selected for model `{model}`")]
    EmptyFieldSet { model: &'static str },

    #[error("listener key `{key}` is already connected to `{channel}` for model `{model}`")]
    DuplicateListener {
        channel: &'static str,
        model: &'static str,
        key: String,
    },
}

/// Runtime failure during diffing or listener invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to normalize field `{field}`: {source}")]
    Normalize {
        field: &'static str,
        #[source]
        source: NormalizeError,
    },

    #[error("listener failed: {0}")]
    Listener(#[source] Box<dyn std::error::Error>),
}

impl DispatchError {
    /// Wrap a listener-side failure.
    #[must_use]
    pub fn listener(err: impl std::error::Error + 'static) -> Self {
        Self::Listener(Box::new(err))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
