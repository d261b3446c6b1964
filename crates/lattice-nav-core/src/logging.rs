//! Logging facilities for Lattice Nav.
//!
//! Lattice Nav uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_nav=debug")
//!     .init();
//! ```
//!
//! Every subsystem logs under a stable target listed in [`targets`], so a
//! filter such as `lattice_nav::container=trace` narrows output to the
//! transition queue of each navigation container.

/// Span names used throughout Lattice Nav for tracing.
pub mod span_names {
    /// A full push/pop/clear transition on one container.
    pub const TRANSITION: &str = "lattice_nav::transition";
    /// Intent routing and enqueueing, timed with [`PerfSpan`](super::PerfSpan).
    pub const DISPATCH: &str = "lattice_nav::dispatch";
}

/// Target names for log filtering.
pub mod targets {
    /// Reactive core target.
    pub const CORE: &str = "lattice_nav_core";
    /// Signal fan-out target.
    pub const SIGNAL: &str = "lattice_nav::signal";
    /// View state fields and lifetimes.
    pub const STATE: &str = "lattice_nav::state";
    /// Disposal scopes.
    pub const SCOPE: &str = "lattice_nav::scope";
    /// Navigation containers and their transition queues.
    pub const CONTAINER: &str = "lattice_nav::container";
    /// The transition authority.
    pub const AUTHORITY: &str = "lattice_nav::authority";
    /// Interactivity handoff between containers.
    pub const INTERACTION: &str = "lattice_nav::interaction";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to time whole transitions; the span closes when the guard is dropped.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "lattice_nav::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level log under the core target.
#[macro_export]
macro_rules! nav_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "lattice_nav_core", $($arg)*)
    };
}

/// Debug-level log under the core target.
#[macro_export]
macro_rules! nav_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "lattice_nav_core", $($arg)*)
    };
}

/// Warn-level log under the core target.
#[macro_export]
macro_rules! nav_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "lattice_nav_core", $($arg)*)
    };
}
