//! Reactive primitives for Lattice Nav.
//!
//! This crate provides the building blocks every screen of a Lattice Nav
//! application is assembled from:
//!
//! - **Signals**: ordered, synchronous observer lists with explicit
//!   [`Subscription`] tokens
//! - **View-state fields**: [`ObservableProperty`] and [`IntentStream`],
//!   retired together through a shared [`StateLifetime`]
//! - **Disposal scopes**: [`DisposalScope`] releases everything a screen
//!   registered, exactly once, newest first
//! - **Logging**: tracing targets and helper macros
//!
//! # Example
//!
//! ```
//! use lattice_nav_core::{DisposalScope, StateLifetime};
//!
//! let scope = DisposalScope::new("settings");
//! let lifetime = StateLifetime::new("settings");
//! let volume = lifetime.property("volume", 3_u8);
//!
//! volume
//!     .subscribe(|v| println!("volume = {v}"))
//!     .unwrap()
//!     .add_to(&scope)
//!     .unwrap();
//!
//! let state = lifetime.clone();
//! scope.register(move || { let _ = state.dispose(); }).unwrap();
//!
//! volume.set(4);
//! scope.release_all().unwrap();
//! assert!(lifetime.is_disposed());
//! ```

mod error;
pub mod logging;
pub mod property;
pub mod scope;
pub mod signal;

pub use error::{LifetimeError, LifetimeResult, ReleaseError};
pub use logging::PerfSpan;
pub use property::{IntentStream, ObservableProperty, ReadOnlyProperty, StateLifetime};
pub use scope::{Disposable, DisposalScope};
pub use signal::{ConnectionId, Signal, Subscription};
