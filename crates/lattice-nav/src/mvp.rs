//! View / ViewState / Presenter triad.
//!
//! Each screen is split into three parts:
//!
//! - a [`ViewState`]: observable fields and intent streams, nothing else;
//! - a [`View`]: binds the state to visuals and turns raw UI events into
//!   state intents. Views never navigate;
//! - a [`Presenter`]: builds the state, seeds it (possibly after awaiting
//!   application services), subscribes to intents and forwards navigation
//!   requests to the transition authority.
//!
//! [`MvpScreen`] pairs a view with a presenter and implements the
//! [`Screen`] capability the containers drive.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use lattice_nav::prelude::*;
//!
//! struct CounterState {
//!     lifetime: StateLifetime,
//!     count: ObservableProperty<u32>,
//!     increment: IntentStream<()>,
//! }
//!
//! impl ViewState for CounterState {
//!     fn lifetime(&self) -> &StateLifetime {
//!         &self.lifetime
//!     }
//! }
//!
//! struct CounterView;
//!
//! impl View for CounterView {
//!     type State = CounterState;
//!
//!     fn initialize<'a>(
//!         &'a self,
//!         state: &'a Arc<CounterState>,
//!         cx: &'a ScreenContext,
//!     ) -> BoxFuture<'a, NavResult<()>> {
//!         Box::pin(async move {
//!             state.count.subscribe(|n| println!("count: {n}"))?.add_to(cx.scope())?;
//!             Ok(())
//!         })
//!     }
//! }
//!
//! struct CounterPresenter;
//!
//! impl Presenter for CounterPresenter {
//!     type State = CounterState;
//!
//!     fn create_state(&self, cx: &ScreenContext) -> NavResult<CounterState> {
//!         let lifetime = StateLifetime::new(cx.screen_name());
//!         Ok(CounterState {
//!             count: lifetime.property("count", 0),
//!             increment: lifetime.intent("increment"),
//!             lifetime,
//!         })
//!     }
//!
//!     fn view_did_load<'a>(
//!         &'a self,
//!         state: &'a Arc<CounterState>,
//!         cx: &'a ScreenContext,
//!     ) -> BoxFuture<'a, NavResult<()>> {
//!         Box::pin(async move {
//!             let weak = Arc::downgrade(state);
//!             state
//!                 .increment
//!                 .subscribe(move |_| {
//!                     if let Some(state) = weak.upgrade() {
//!                         state.count.set(state.count.get() + 1);
//!                     }
//!                 })?
//!                 .add_to(cx.scope())?;
//!             Ok(())
//!         })
//!     }
//! }
//!
//! let screen = MvpScreen::new("counter", CounterView, CounterPresenter);
//! assert_eq!(screen.name(), "counter");
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};

use futures_util::future::BoxFuture;
use lattice_nav_core::{LifetimeResult, ReleaseError, StateLifetime};

use crate::error::{NavError, NavResult};
use crate::screen::{ContainerKind, Screen, ScreenContext, ready};

/// A disposable bag of observable fields and intent streams.
pub trait ViewState: Send + Sync + 'static {
    /// The lifetime every field of this state was created from.
    fn lifetime(&self) -> &StateLifetime;

    /// Retire the state. Succeeds exactly once.
    fn dispose(&self) -> LifetimeResult<()> {
        self.lifetime().dispose()
    }

    /// Whether the state has been disposed.
    fn is_disposed(&self) -> bool {
        self.lifetime().is_disposed()
    }
}

/// A passive render adapter bound to one view state.
pub trait View: Send + Sync + 'static {
    /// The state this view renders.
    type State: ViewState;

    /// Bind to `state`. Called once; every binding made here must be
    /// registered into `cx.scope()`.
    fn initialize<'a>(
        &'a self,
        state: &'a Arc<Self::State>,
        cx: &'a ScreenContext,
    ) -> BoxFuture<'a, NavResult<()>>;

    /// Play the enter visual transition.
    fn play_enter<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        ready(())
    }

    /// Play the exit visual transition.
    fn play_exit<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        ready(())
    }

    /// Enable or suspend input handling.
    fn set_interactive(&self, _interactive: bool) {}
}

/// Business wiring for one view/state pair.
pub trait Presenter: Send + Sync + 'static {
    /// The state this presenter builds and drives.
    type State: ViewState;

    /// Build the view state.
    fn create_state(&self, cx: &ScreenContext) -> NavResult<Self::State>;

    /// One-time setup after the view initialized: subscribe to intents,
    /// seed fields, call application services.
    fn view_did_load<'a>(
        &'a self,
        state: &'a Arc<Self::State>,
        cx: &'a ScreenContext,
    ) -> BoxFuture<'a, NavResult<()>>;

    /// Page screens only: the screen has entered, is `Active` and has been
    /// handed input if it is the top of the highest occupied layer. Skipped
    /// when a queued pop cut the enter phase short.
    fn view_did_push_enter(&self, _state: &Arc<Self::State>, _cx: &ScreenContext) {}

    /// The screen is about to play its exit transition.
    fn view_will_exit(&self, _state: &Arc<Self::State>, _cx: &ScreenContext) {}
}

/// A [`Screen`] assembled from a view and a presenter sharing one state.
pub struct MvpScreen<V, P>
where
    V: View,
    P: Presenter<State = V::State>,
{
    name: String,
    view: V,
    presenter: P,
    state: OnceLock<Arc<V::State>>,
}

impl<V, P> MvpScreen<V, P>
where
    V: View,
    P: Presenter<State = V::State>,
{
    /// Pair a view with a presenter.
    pub fn new(name: impl Into<String>, view: V, presenter: P) -> Self {
        Self {
            name: name.into(),
            view,
            presenter,
            state: OnceLock::new(),
        }
    }

    /// The bound view state, once constructed.
    pub fn state(&self) -> Option<&Arc<V::State>> {
        self.state.get()
    }

    /// The view.
    pub fn view(&self) -> &V {
        &self.view
    }

    /// The presenter.
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    fn bound_state(&self) -> NavResult<&Arc<V::State>> {
        self.state
            .get()
            .ok_or_else(|| NavError::screen(format!("screen '{}' has no view state yet", self.name)))
    }
}

impl<V, P> Screen for MvpScreen<V, P>
where
    V: View,
    P: Presenter<State = V::State>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn construct(&self, cx: &ScreenContext) -> NavResult<()> {
        if self.state.get().is_some() {
            return Err(NavError::ViewAlreadyBound {
                screen: self.name.clone(),
            });
        }
        let state = Arc::new(self.presenter.create_state(cx)?);
        if self.state.set(state.clone()).is_err() {
            return Err(NavError::ViewAlreadyBound {
                screen: self.name.clone(),
            });
        }

        // Registered first, so the state is retired after every binding.
        cx.scope()
            .register_fallible(move || state.dispose().map_err(|err| ReleaseError::new(err.to_string())))?;
        Ok(())
    }

    fn initialize<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, NavResult<()>> {
        Box::pin(async move {
            let state = self.bound_state()?;
            self.view.initialize(state, cx).await?;
            self.presenter.view_did_load(state, cx).await
        })
    }

    fn enter<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        self.view.play_enter(cx)
    }

    fn entered(&self, cx: &ScreenContext) {
        if cx.kind() != ContainerKind::Page {
            return;
        }
        if let Some(state) = self.state.get() {
            self.presenter.view_did_push_enter(state, cx);
        }
    }

    fn exit<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let Some(state) = self.state.get() {
                self.presenter.view_will_exit(state, cx);
            }
            self.view.play_exit(cx).await;
        })
    }

    fn set_interactive(&self, interactive: bool) {
        self.view.set_interactive(interactive);
    }
}

impl<V, P> fmt::Debug for MvpScreen<V, P>
where
    V: View,
    P: Presenter<State = V::State>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MvpScreen")
            .field("name", &self.name)
            .field("constructed", &self.state.get().is_some())
            .finish()
    }
}
