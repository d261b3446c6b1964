//! The transition authority: the single dispatcher of navigation intents.
//!
//! Presenters never touch containers. They hold a [`TransitionHandle`] and
//! dispatch intents; an application-supplied [`IntentRouter`] maps each
//! intent to a [`NavCommand`], and the authority queues the command on the
//! target container. Dispatch is synchronous, so the order in which intents
//! are dispatched is the order in which their transitions run on each
//! container.

use std::fmt;
use std::sync::{Arc, Weak};

use lattice_nav_core::logging::{span_names, targets};
use lattice_nav_core::{LifetimeResult, PerfSpan, Signal, Subscription};

use crate::asset::AssetResolver;
use crate::config::NavigatorConfig;
use crate::container::{
    ContainerOp, ContainerShared, EntryIds, NavigationContainer, PopTarget, TransitionTicket,
};
use crate::debug::StackTreeDebug;
use crate::error::{ConfigError, NavError, NavResult};
use crate::interaction::InteractionArbiter;
use crate::screen::{ContainerKind, EntryId, LifecycleEvent, Screen};

/// A concrete navigation command.
#[derive(Clone)]
pub enum NavCommand {
    /// Push a screen onto a container (replacing the occupant of a slot).
    Push {
        /// Target container.
        kind: ContainerKind,
        /// The screen to push.
        screen: Arc<dyn Screen>,
    },
    /// Pop an entry from a container.
    Pop {
        /// Target container.
        kind: ContainerKind,
        /// Which entry to pop.
        target: PopTarget,
    },
    /// Pop the top entry of the highest layer that holds (or is about to
    /// hold) an entry.
    PopActive,
    /// Pop every entry of a container, top first.
    Clear {
        /// Target container.
        kind: ContainerKind,
    },
}

impl NavCommand {
    /// Push `screen` onto the container of `kind`.
    pub fn push(kind: ContainerKind, screen: impl Screen) -> Self {
        Self::Push {
            kind,
            screen: Arc::new(screen),
        }
    }

    /// Push a page.
    pub fn push_page(screen: impl Screen) -> Self {
        Self::push(ContainerKind::Page, screen)
    }

    /// Push a modal.
    pub fn push_modal(screen: impl Screen) -> Self {
        Self::push(ContainerKind::Modal, screen)
    }

    /// Show a sheet, replacing the current one.
    pub fn show_sheet(screen: impl Screen) -> Self {
        Self::push(ContainerKind::Sheet, screen)
    }

    /// Pop the top entry of `kind`.
    pub fn pop(kind: ContainerKind) -> Self {
        Self::Pop {
            kind,
            target: PopTarget::Top,
        }
    }

    /// Pop a specific entry of `kind`.
    pub fn pop_entry(kind: ContainerKind, entry: EntryId) -> Self {
        Self::Pop {
            kind,
            target: PopTarget::Entry(entry),
        }
    }
}

impl fmt::Debug for NavCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push { kind, screen } => f
                .debug_struct("Push")
                .field("kind", kind)
                .field("screen", &screen.name())
                .finish(),
            Self::Pop { kind, target } => f
                .debug_struct("Pop")
                .field("kind", kind)
                .field("target", target)
                .finish(),
            Self::PopActive => write!(f, "PopActive"),
            Self::Clear { kind } => f.debug_struct("Clear").field("kind", kind).finish(),
        }
    }
}

/// Maps application intents to navigation commands.
///
/// Routers may construct screens, and may hand the given handle to the
/// presenters of those screens so they can dispatch further intents.
/// Closures of the right shape are routers.
pub trait IntentRouter<I>: Send + Sync + 'static {
    /// Resolve `intent` to a command, or reject it.
    fn route(&self, intent: I, transitions: &TransitionHandle<I>) -> NavResult<NavCommand>;
}

impl<I, F> IntentRouter<I> for F
where
    F: Fn(I, &TransitionHandle<I>) -> NavResult<NavCommand> + Send + Sync + 'static,
{
    fn route(&self, intent: I, transitions: &TransitionHandle<I>) -> NavResult<NavCommand> {
        self(intent, transitions)
    }
}

struct AuthorityInner<I> {
    router: Box<dyn IntentRouter<I>>,
    containers: [Arc<NavigationContainer>; 3],
    ids: Arc<EntryIds>,
    arbiter: Arc<InteractionArbiter>,
    events: Arc<Signal<LifecycleEvent>>,
}

impl<I: fmt::Debug + Send + 'static> AuthorityInner<I> {
    fn container(&self, kind: ContainerKind) -> &Arc<NavigationContainer> {
        &self.containers[kind.layer()]
    }

    fn dispatch(self: &Arc<Self>, intent: I) -> NavResult<TransitionTicket> {
        let _perf = PerfSpan::new(span_names::DISPATCH);
        tracing::debug!(target: targets::AUTHORITY, ?intent, "dispatching intent");
        let handle = TransitionHandle {
            inner: Arc::downgrade(self),
        };
        let command = self.router.route(intent, &handle).inspect_err(|err| {
            tracing::warn!(target: targets::AUTHORITY, error = %err, "intent rejected");
        })?;
        self.execute(command)
    }

    fn execute(&self, command: NavCommand) -> NavResult<TransitionTicket> {
        tracing::trace!(target: targets::AUTHORITY, ?command, "executing command");
        match command {
            NavCommand::Push { kind, screen } => self.container(kind).enqueue(ContainerOp::Push(screen)),
            NavCommand::Pop { kind, target } => {
                if let PopTarget::Entry(entry) = target {
                    if let Some(owner) = self.ids.kind_of(entry).filter(|owner| *owner != kind) {
                        return Err(NavError::invalid_transition(
                            kind,
                            format!("entry belongs to the {owner} container"),
                        ));
                    }
                }
                self.container(kind).enqueue(ContainerOp::Pop(target))
            }
            NavCommand::PopActive => {
                let kind = ContainerKind::ALL
                    .into_iter()
                    .rev()
                    .find(|kind| self.container(*kind).has_pending_content())
                    .ok_or_else(|| NavError::invalid_transition(ContainerKind::Page, "no screen to pop"))?;
                self.container(kind).enqueue(ContainerOp::Pop(PopTarget::Top))
            }
            NavCommand::Clear { kind } => self.container(kind).enqueue(ContainerOp::Clear),
        }
    }
}

/// Owns the navigation containers and serializes every transition on them.
///
/// Dropping the authority drops the containers; entries still alive at that
/// point release their disposal scopes on drop. Call
/// [`shutdown`](Self::shutdown) for an orderly teardown that runs exit
/// transitions.
pub struct TransitionAuthority<I: 'static> {
    inner: Arc<AuthorityInner<I>>,
}

impl<I: fmt::Debug + Send + 'static> TransitionAuthority<I> {
    /// Create an authority with default configuration and no asset resolver.
    pub fn new(router: impl IntentRouter<I>) -> Self {
        Self::assemble(NavigatorConfig::default(), None, Box::new(router))
    }

    /// Start building an authority.
    pub fn builder(router: impl IntentRouter<I>) -> TransitionAuthorityBuilder<I> {
        TransitionAuthorityBuilder {
            router: Box::new(router),
            config: NavigatorConfig::default(),
            assets: None,
        }
    }

    fn assemble(
        config: NavigatorConfig,
        assets: Option<Arc<dyn AssetResolver>>,
        router: Box<dyn IntentRouter<I>>,
    ) -> Self {
        let events = Arc::new(Signal::new("lifecycle"));
        let shared = ContainerShared {
            ids: Arc::new(EntryIds::default()),
            arbiter: Arc::new(InteractionArbiter::new(events.clone())),
            events,
            assets,
        };
        let containers = ContainerKind::ALL
            .map(|kind| Arc::new(NavigationContainer::new(kind, config.container(kind).clone(), &shared)));

        tracing::debug!(target: targets::AUTHORITY, ?config, "transition authority created");
        Self {
            inner: Arc::new(AuthorityInner {
                router,
                containers,
                ids: shared.ids,
                arbiter: shared.arbiter,
                events: shared.events,
            }),
        }
    }

    /// A weak handle for presenters.
    pub fn handle(&self) -> TransitionHandle<I> {
        TransitionHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Route `intent` and queue the resulting transition.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, intent: I) -> NavResult<TransitionTicket> {
        self.inner.dispatch(intent)
    }

    /// Queue a command directly, bypassing the router.
    pub fn execute(&self, command: NavCommand) -> NavResult<TransitionTicket> {
        self.inner.execute(command)
    }

    /// The container of `kind`.
    pub fn container(&self, kind: ContainerKind) -> &NavigationContainer {
        self.inner.container(kind)
    }

    /// The single entry currently receiving input, if any.
    pub fn interactive_entry(&self) -> Option<(ContainerKind, EntryId)> {
        self.inner.arbiter.current()
    }

    /// The lifecycle event signal shared by all containers.
    pub fn lifecycle(&self) -> &Signal<LifecycleEvent> {
        &self.inner.events
    }

    /// Subscribe to lifecycle events of every container.
    pub fn on_lifecycle<F>(&self, slot: F) -> LifetimeResult<Subscription>
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(slot)
    }

    /// Wait until every container has drained its queue.
    pub async fn settled(&self) {
        loop {
            for container in &self.inner.containers {
                container.wait_idle().await;
            }
            // A transition on one container may have queued work on another.
            if self.inner.containers.iter().all(|container| container.is_idle()) {
                return;
            }
        }
    }

    /// Clear every container, top layer first, running exit transitions.
    ///
    /// Returns the first failure after all containers were cleared.
    pub async fn shutdown(&self) -> NavResult<()> {
        tracing::debug!(target: targets::AUTHORITY, "shutting down navigation");
        let tickets = ContainerKind::ALL
            .into_iter()
            .rev()
            .map(|kind| self.inner.execute(NavCommand::Clear { kind }))
            .collect::<NavResult<Vec<_>>>()?;

        let mut first_error = None;
        for ticket in tickets {
            if let Err(err) = ticket.await {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// A printable tree of all containers and their entries.
    pub fn debug_tree(&self) -> StackTreeDebug<'_> {
        StackTreeDebug::new(ContainerKind::ALL.map(|kind| self.container(kind)), self.interactive_entry())
    }
}

impl<I: 'static> fmt::Debug for TransitionAuthority<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionAuthority")
            .field("containers", &self.inner.containers)
            .finish_non_exhaustive()
    }
}

/// Builder for [`TransitionAuthority`].
pub struct TransitionAuthorityBuilder<I> {
    router: Box<dyn IntentRouter<I>>,
    config: NavigatorConfig,
    assets: Option<Arc<dyn AssetResolver>>,
}

impl<I: fmt::Debug + Send + 'static> TransitionAuthorityBuilder<I> {
    /// Use `config` for all containers.
    pub fn config(mut self, config: NavigatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Inject the asset resolver screens load through.
    pub fn assets(mut self, resolver: impl AssetResolver) -> Self {
        self.assets = Some(Arc::new(resolver));
        self
    }

    /// Inject a shared asset resolver.
    pub fn shared_assets(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.assets = Some(resolver);
        self
    }

    /// Validate the configuration and build the authority.
    pub fn build(self) -> Result<TransitionAuthority<I>, ConfigError> {
        self.config.validate()?;
        Ok(TransitionAuthority::assemble(self.config, self.assets, self.router))
    }
}

/// A weak, cloneable handle to a [`TransitionAuthority`].
///
/// Presenters keep one of these; it does not keep the authority alive.
pub struct TransitionHandle<I: 'static> {
    inner: Weak<AuthorityInner<I>>,
}

impl<I: fmt::Debug + Send + 'static> TransitionHandle<I> {
    /// Route `intent` and queue the resulting transition.
    ///
    /// Fails with [`NavError::AuthorityUnavailable`] once the authority is
    /// dropped.
    pub fn dispatch(&self, intent: I) -> NavResult<TransitionTicket> {
        self.upgrade()?.dispatch(intent)
    }

    /// Queue a command directly.
    pub fn execute(&self, command: NavCommand) -> NavResult<TransitionTicket> {
        self.upgrade()?.execute(command)
    }

    /// Whether the authority is still alive.
    pub fn is_available(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn upgrade(&self) -> NavResult<Arc<AuthorityInner<I>>> {
        self.inner.upgrade().ok_or(NavError::AuthorityUnavailable)
    }
}

impl<I: 'static> Clone for TransitionHandle<I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I: 'static> fmt::Debug for TransitionHandle<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionHandle")
            .field("available", &(self.inner.strong_count() > 0))
            .finish()
    }
}
