//! Per-screen resource tracking.
//!
//! A [`DisposalScope`] collects release callbacks (subscription tokens,
//! loaded asset handles, view-state teardown) registered during one screen's
//! lifetime and runs them exactly once when the screen is removed.
//!
//! Callbacks run in reverse registration order so dependent resources unwind
//! before the resources they depend on. A failing callback does not stop the
//! release: the remaining callbacks still run and the first failure is
//! reported to the caller.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{LifetimeError, LifetimeResult, ReleaseError};
use crate::signal::Subscription;

type ReleaseFn = Box<dyn FnOnce() -> Result<(), ReleaseError> + Send>;

/// A resource that knows how to release itself.
pub trait Disposable: Send + 'static {
    /// Release the resource.
    fn dispose(self) -> Result<(), ReleaseError>;
}

impl Disposable for Subscription {
    fn dispose(self) -> Result<(), ReleaseError> {
        self.unsubscribe();
        Ok(())
    }
}

struct ScopeState {
    handles: Vec<ReleaseFn>,
    released: bool,
}

struct ScopeInner {
    name: String,
    state: Mutex<ScopeState>,
}

impl ScopeInner {
    fn take_handles(&self) -> LifetimeResult<Vec<ReleaseFn>> {
        let mut state = self.state.lock();
        if state.released {
            return Err(LifetimeError::scope_released(self.name.clone()));
        }
        state.released = true;
        Ok(std::mem::take(&mut state.handles))
    }

    fn run(&self, handles: Vec<ReleaseFn>) -> LifetimeResult<()> {
        let count = handles.len();
        let mut failures = 0;
        let mut first = None;

        for handle in handles.into_iter().rev() {
            if let Err(err) = handle() {
                tracing::warn!(target: "lattice_nav::scope", scope = %self.name, error = %err, "release callback failed");
                failures += 1;
                first.get_or_insert(err);
            }
        }

        tracing::debug!(target: "lattice_nav::scope", scope = %self.name, count, failures, "scope released");

        match first {
            None => Ok(()),
            Some(first) => Err(LifetimeError::ReleaseFailed {
                scope: self.name.clone(),
                failures,
                first,
            }),
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if state.released {
            return;
        }
        state.released = true;
        let handles = std::mem::take(&mut state.handles);
        if handles.is_empty() {
            return;
        }
        tracing::warn!(
            target: "lattice_nav::scope",
            scope = %self.name,
            count = handles.len(),
            "disposal scope dropped without release; releasing now"
        );
        let _ = self.run(handles);
    }
}

/// Registry guaranteeing exactly-once release of a screen's resources.
///
/// Cloning a scope yields another handle to the same registry. When the last
/// handle is dropped without [`release_all`](Self::release_all) having been
/// called, the scope releases itself and logs a warning.
///
/// # Example
///
/// ```
/// use lattice_nav_core::DisposalScope;
/// use std::sync::Arc;
/// use parking_lot::Mutex;
///
/// let scope = DisposalScope::new("home");
/// let log = Arc::new(Mutex::new(Vec::new()));
/// for n in 0..3 {
///     let log = log.clone();
///     scope.register(move || log.lock().push(n)).unwrap();
/// }
///
/// scope.release_all().unwrap();
/// assert_eq!(*log.lock(), vec![2, 1, 0]);
/// assert!(scope.release_all().is_err());
/// ```
#[derive(Clone)]
pub struct DisposalScope {
    inner: Arc<ScopeInner>,
}

impl DisposalScope {
    /// Create an empty scope with a diagnostic name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                name: name.into(),
                state: Mutex::new(ScopeState {
                    handles: Vec::new(),
                    released: false,
                }),
            }),
        }
    }

    /// The diagnostic name of this scope.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Register an infallible release callback.
    pub fn register<F>(&self, release: F) -> LifetimeResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.register_fallible(move || {
            release();
            Ok(())
        })
    }

    /// Register a release callback that may report a failure.
    pub fn register_fallible<F>(&self, release: F) -> LifetimeResult<()>
    where
        F: FnOnce() -> Result<(), ReleaseError> + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        if state.released {
            return Err(LifetimeError::scope_released(self.inner.name.clone()));
        }
        state.handles.push(Box::new(release));
        Ok(())
    }

    /// Register a [`Disposable`] resource.
    pub fn add<D: Disposable>(&self, resource: D) -> LifetimeResult<()> {
        self.register_fallible(move || resource.dispose())
    }

    /// Release every registered callback, newest first.
    ///
    /// The second call fails with [`LifetimeError::ScopeAlreadyReleased`]
    /// and invokes nothing.
    #[tracing::instrument(skip_all, target = "lattice_nav::scope", level = "trace", fields(scope = %self.inner.name))]
    pub fn release_all(&self) -> LifetimeResult<()> {
        let handles = self.inner.take_handles()?;
        self.inner.run(handles)
    }

    /// Whether [`release_all`](Self::release_all) has run.
    pub fn is_released(&self) -> bool {
        self.inner.state.lock().released
    }

    /// Number of callbacks waiting to be released.
    pub fn len(&self) -> usize {
        self.inner.state.lock().handles.len()
    }

    /// Whether no callbacks are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DisposalScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("DisposalScope")
            .field("name", &self.inner.name)
            .field("pending", &state.handles.len())
            .field("released", &state.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_release_reverse_order() {
        let scope = DisposalScope::new("order");
        let log = Arc::new(Mutex::new(Vec::new()));
        for tag in ["state", "binding", "asset"] {
            let log = log.clone();
            scope.register(move || log.lock().push(tag)).unwrap();
        }
        assert_eq!(scope.len(), 3);

        scope.release_all().unwrap();
        assert_eq!(*log.lock(), vec!["asset", "binding", "state"]);
        assert!(scope.is_released());
        assert!(scope.is_empty());
    }

    #[test]
    fn test_second_release_fails_without_reinvoking() {
        let scope = DisposalScope::new("twice");
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        scope
            .register(move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        scope.release_all().unwrap();
        let err = scope.release_all().unwrap_err();
        assert!(matches!(err, LifetimeError::ScopeAlreadyReleased { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_after_release_fails() {
        let scope = DisposalScope::new("late");
        scope.release_all().unwrap();
        let err = scope.register(|| {}).unwrap_err();
        assert_eq!(err, LifetimeError::scope_released("late"));
    }

    #[test]
    fn test_failures_reported_and_release_continues() {
        let scope = DisposalScope::new("failing");
        let ran = Arc::new(AtomicUsize::new(0));

        let ran_clone = ran.clone();
        scope
            .register(move || {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        scope
            .register_fallible(|| Err(ReleaseError::new("first registered")))
            .unwrap();
        scope
            .register_fallible(|| Err(ReleaseError::new("last registered")))
            .unwrap();

        let err = scope.release_all().unwrap_err();
        match err {
            LifetimeError::ReleaseFailed { failures, first, .. } => {
                assert_eq!(failures, 2);
                // Reverse order: the last registered callback fails first.
                assert_eq!(first, ReleaseError::new("last registered"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_scope_releases_itself() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let scope = DisposalScope::new("dropped");
            let clone = scope.clone();
            let calls_clone = calls.clone();
            clone
                .register(move || {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_from_release_callback_is_rejected() {
        let scope = DisposalScope::new("nested");
        let rejected = Arc::new(AtomicUsize::new(0));
        let scope_clone = scope.clone();
        let rejected_clone = rejected.clone();
        scope
            .register(move || {
                if scope_clone.register(|| {}).is_err() {
                    rejected_clone.fetch_add(1, Ordering::SeqCst);
                }
            })
            .unwrap();

        scope.release_all().unwrap();
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
    }
}
