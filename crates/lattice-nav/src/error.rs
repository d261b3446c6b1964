//! Error types for the navigation runtime.

use std::path::PathBuf;
use std::time::Duration;

use lattice_nav_core::LifetimeError;

use crate::screen::ContainerKind;

/// Result type alias for navigation operations.
pub type NavResult<T> = std::result::Result<T, NavError>;

/// Errors produced by navigation containers and the transition authority.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    /// A view state or disposal scope was used outside its lifetime.
    #[error(transparent)]
    Lifetime(#[from] LifetimeError),

    /// A screen failed while being constructed or initialized.
    ///
    /// The failed entry has been torn down and the container's previous top
    /// is still in place.
    #[error("push of screen '{screen}' failed: {source}")]
    PushFailed {
        /// Name of the screen that failed.
        screen: String,
        /// The underlying failure.
        #[source]
        source: Box<NavError>,
    },

    /// The requested transition does not apply to the container's contents.
    #[error("invalid transition on {kind} container: {reason}")]
    InvalidTransition {
        /// The container the transition targeted.
        kind: ContainerKind,
        /// What was wrong.
        reason: String,
    },

    /// Too many transitions are already waiting on the container.
    #[error("{kind} container transition queue is full ({capacity} pending)")]
    QueueFull {
        /// The container whose queue overflowed.
        kind: ContainerKind,
        /// The configured queue limit.
        capacity: usize,
    },

    /// The intent router rejected an intent.
    #[error("invalid navigation intent: {0}")]
    InvalidIntent(String),

    /// A view was asked to bind to a second view state.
    #[error("view of screen '{screen}' is already bound to a view state")]
    ViewAlreadyBound {
        /// Name of the screen.
        screen: String,
    },

    /// Asset loading failed.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// A screen-defined failure.
    #[error("screen error: {0}")]
    Screen(String),

    /// The transition authority behind a handle has been dropped.
    #[error("transition authority is no longer available")]
    AuthorityUnavailable,

    /// No async runtime is available to drive transitions.
    #[error("no async runtime available to drive navigation transitions")]
    RuntimeUnavailable,

    /// A screen panicked during a transition; the container recovered.
    #[error("screen panicked during transition: {0}")]
    Panicked(String),

    /// The container driver stopped before reporting the transition result.
    #[error("transition was aborted before completing")]
    TransitionAborted,
}

impl NavError {
    /// Create an [`NavError::InvalidTransition`].
    pub fn invalid_transition(kind: ContainerKind, reason: impl Into<String>) -> Self {
        Self::InvalidTransition {
            kind,
            reason: reason.into(),
        }
    }

    /// Create a screen-defined error.
    pub fn screen(message: impl Into<String>) -> Self {
        Self::Screen(message.into())
    }

    /// Whether this error (or the failure it wraps) is a use of disposed state.
    pub fn is_state_disposed(&self) -> bool {
        match self {
            Self::Lifetime(LifetimeError::StateDisposed { .. }) => true,
            Self::PushFailed { source, .. } => source.is_state_disposed(),
            _ => false,
        }
    }
}

/// Errors reported by an [`AssetResolver`](crate::asset::AssetResolver).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    /// No asset is registered under the key.
    #[error("asset not found: {0}")]
    AssetNotFound(String),

    /// The resolver gave up waiting for the asset.
    #[error("loading asset '{key}' timed out after {after:?}")]
    LoadTimeout {
        /// The requested key.
        key: String,
        /// How long the resolver waited.
        after: Duration,
    },

    /// A loaded asset did not have the requested type.
    #[error("asset '{key}' is not a {expected}")]
    TypeMismatch {
        /// The requested key.
        key: String,
        /// The type the caller asked for.
        expected: &'static str,
    },
}

/// Errors that can occur while loading navigator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("failed to read navigator config '{path}': {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration was not valid TOML for this schema.
    #[error("invalid navigator config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was out of range.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// What was wrong.
        message: String,
    },
}
