//! Error types for the reactive primitives.

/// Result type alias for lifetime-checked operations.
pub type LifetimeResult<T> = std::result::Result<T, LifetimeError>;

/// Errors raised when a state object or disposal scope is used outside its lifetime.
///
/// These are programming errors: callers are expected to surface them
/// immediately instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifetimeError {
    /// A view state (or one of its fields) was used after it was disposed.
    #[error("view state '{state}' has already been disposed")]
    StateDisposed {
        /// Name of the disposed state, for diagnostics.
        state: String,
    },

    /// A disposal scope was released twice, or a handle was registered late.
    #[error("disposal scope '{scope}' has already been released")]
    ScopeAlreadyReleased {
        /// Name of the released scope.
        scope: String,
    },

    /// One or more release callbacks failed while a scope was being released.
    ///
    /// Every callback still ran; `first` is the earliest failure.
    #[error("{failures} release callback(s) failed in scope '{scope}', first: {first}")]
    ReleaseFailed {
        /// Name of the scope being released.
        scope: String,
        /// Number of callbacks that reported an error.
        failures: usize,
        /// The first reported failure.
        first: ReleaseError,
    },
}

impl LifetimeError {
    /// Create a [`LifetimeError::StateDisposed`] for the named state.
    pub fn state_disposed(state: impl Into<String>) -> Self {
        Self::StateDisposed {
            state: state.into(),
        }
    }

    /// Create a [`LifetimeError::ScopeAlreadyReleased`] for the named scope.
    pub fn scope_released(scope: impl Into<String>) -> Self {
        Self::ScopeAlreadyReleased {
            scope: scope.into(),
        }
    }
}

/// Failure reported by a single release callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ReleaseError(pub String);

impl ReleaseError {
    /// Create a release error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
