//! Lattice Nav - stack-based screen navigation with async lifecycles.
//!
//! This crate provides the navigation runtime of a Lattice Nav application:
//!
//! - **Screens**: a [`View`](mvp::View) and a [`Presenter`](mvp::Presenter)
//!   sharing one disposable [`ViewState`](mvp::ViewState), assembled into a
//!   [`Screen`] by [`MvpScreen`](mvp::MvpScreen)
//! - **Containers**: a page stack, a modal stack and a single-entry sheet
//!   slot, each running its transitions strictly one at a time
//! - **Transition authority**: the single dispatcher that maps intents to
//!   container transitions
//! - **Interactivity**: exactly one entry receives input at a time
//!
//! The reactive primitives (signals, observable fields, disposal scopes)
//! live in `lattice_nav_core` and are re-exported here.
//!
//! # Example
//!
//! ```no_run
//! use lattice_nav::prelude::*;
//! # struct Home;
//! # impl Screen for Home {
//! #     fn name(&self) -> &str { "home" }
//! #     fn construct(&self, _: &ScreenContext) -> NavResult<()> { Ok(()) }
//! #     fn initialize<'a>(&'a self, _: &'a ScreenContext) -> BoxFuture<'a, NavResult<()>> { ready(Ok(())) }
//! #     fn enter<'a>(&'a self, _: &'a ScreenContext) -> BoxFuture<'a, ()> { ready(()) }
//! #     fn exit<'a>(&'a self, _: &'a ScreenContext) -> BoxFuture<'a, ()> { ready(()) }
//! #     fn set_interactive(&self, _: bool) {}
//! # }
//!
//! #[derive(Debug)]
//! enum Intent {
//!     Home,
//!     Back,
//! }
//!
//! #[tokio::main]
//! async fn main() -> NavResult<()> {
//!     let authority = TransitionAuthority::new(
//!         |intent: Intent, _: &TransitionHandle<Intent>| -> NavResult<NavCommand> {
//!             Ok(match intent {
//!                 Intent::Home => NavCommand::push_page(Home),
//!                 Intent::Back => NavCommand::PopActive,
//!             })
//!         },
//!     );
//!
//!     authority.dispatch(Intent::Home)?.await?;
//!     authority.dispatch(Intent::Back)?.await?;
//!     authority.shutdown().await
//! }
//! ```

pub mod asset;
pub mod authority;
pub mod config;
pub mod container;
pub mod debug;
mod error;
mod interaction;
pub mod mvp;
pub mod screen;

pub use lattice_nav_core::{
    DisposalScope, IntentStream, LifetimeError, ObservableProperty, ReadOnlyProperty, Signal,
    StateLifetime, Subscription,
};

pub use asset::{AssetHandle, AssetResolver};
pub use authority::{IntentRouter, NavCommand, TransitionAuthority, TransitionHandle};
pub use config::{ContainerConfig, NavigatorConfig};
pub use container::{EntrySnapshot, NavigationContainer, PopTarget, TransitionOutcome, TransitionTicket};
pub use error::{AssetError, ConfigError, NavError, NavResult};
pub use futures_util::future::BoxFuture;
pub use screen::{
    ContainerKind, EntryId, LifecycleEvent, Screen, ScreenContext, ScreenPhase, ready,
};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::asset::{AssetHandle, AssetResolver};
    pub use crate::authority::{IntentRouter, NavCommand, TransitionAuthority, TransitionHandle};
    pub use crate::config::{ContainerConfig, NavigatorConfig};
    pub use crate::container::{PopTarget, TransitionOutcome, TransitionTicket};
    pub use crate::error::{AssetError, NavError, NavResult};
    pub use crate::mvp::{MvpScreen, Presenter, View, ViewState};
    pub use crate::screen::{
        ContainerKind, EntryId, LifecycleEvent, Screen, ScreenContext, ScreenPhase, ready,
    };
    pub use futures_util::future::BoxFuture;
    pub use lattice_nav_core::{
        DisposalScope, IntentStream, ObservableProperty, StateLifetime, Subscription,
    };
}
