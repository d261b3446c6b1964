//! The screen capability and its lifecycle vocabulary.
//!
//! Navigation containers never know what a screen is made of. They drive any
//! type implementing [`Screen`] through the same phases:
//!
//! ```text
//! Constructing -> Initializing -> Entering -> Active -> Exiting -> Disposed
//! ```
//!
//! Most applications do not implement [`Screen`] by hand; they pair a
//! [`View`](crate::mvp::View) with a [`Presenter`](crate::mvp::Presenter)
//! through [`MvpScreen`](crate::mvp::MvpScreen).

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use lattice_nav_core::DisposalScope;
use lattice_nav_core::logging::targets;
use slotmap::new_key_type;

use crate::asset::{AssetHandle, AssetResolver};
use crate::error::{NavError, NavResult};

new_key_type! {
    /// Identifies one live entry in a navigation container.
    ///
    /// IDs are unique across all containers of a navigator and become
    /// stale once the entry is disposed.
    pub struct EntryId;
}

/// The kind of navigation container, which is also its stacking layer.
///
/// Layers are ordered `Page < Sheet < Modal`: a live entry in a higher layer
/// takes interactivity away from every lower layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContainerKind {
    /// The page stack.
    Page,
    /// The single-entry sheet slot.
    Sheet,
    /// The modal stack.
    Modal,
}

impl ContainerKind {
    /// All kinds, from the bottom layer to the top.
    pub const ALL: [ContainerKind; 3] = [Self::Page, Self::Sheet, Self::Modal];

    /// Whether this container holds at most one entry.
    pub fn is_slot(self) -> bool {
        matches!(self, Self::Sheet)
    }

    /// Layer index, bottom = 0.
    pub(crate) fn layer(self) -> usize {
        match self {
            Self::Page => 0,
            Self::Sheet => 1,
            Self::Modal => 2,
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Sheet => write!(f, "sheet"),
            Self::Modal => write!(f, "modal"),
        }
    }
}

/// Lifecycle phase of a container entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenPhase {
    /// The view state is being built.
    Constructing,
    /// The view is initializing (may await asset loads).
    Initializing,
    /// Enter visuals and hooks are running.
    Entering,
    /// Fully entered. Interactive only while it is the top of the top layer.
    Active,
    /// Exit visuals and hooks are running.
    Exiting,
    /// Resources released; the entry is gone from its container.
    Disposed,
}

impl ScreenPhase {
    /// Whether the entry has been torn down.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Disposed)
    }
}

impl fmt::Display for ScreenPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constructing => write!(f, "Constructing"),
            Self::Initializing => write!(f, "Initializing"),
            Self::Entering => write!(f, "Entering"),
            Self::Active => write!(f, "Active"),
            Self::Exiting => write!(f, "Exiting"),
            Self::Disposed => write!(f, "Disposed"),
        }
    }
}

/// Notification emitted by a container whenever an entry changes phase or
/// gains/loses interactivity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// An entry moved to a new phase.
    Phase {
        /// Container holding the entry.
        kind: ContainerKind,
        /// The entry.
        entry: EntryId,
        /// The screen's name.
        screen: String,
        /// The phase just entered.
        phase: ScreenPhase,
    },
    /// The enter phase was skipped because a pop was already queued.
    EnterSkipped {
        /// Container holding the entry.
        kind: ContainerKind,
        /// The entry.
        entry: EntryId,
        /// The screen's name.
        screen: String,
    },
    /// An entry gained or lost interactivity.
    Interactivity {
        /// Container holding the entry.
        kind: ContainerKind,
        /// The entry.
        entry: EntryId,
        /// The screen's name.
        screen: String,
        /// Whether the entry is now interactive.
        interactive: bool,
    },
}

impl LifecycleEvent {
    /// The entry this event concerns.
    pub fn entry(&self) -> EntryId {
        match self {
            Self::Phase { entry, .. }
            | Self::EnterSkipped { entry, .. }
            | Self::Interactivity { entry, .. } => *entry,
        }
    }

    /// The name of the screen this event concerns.
    pub fn screen(&self) -> &str {
        match self {
            Self::Phase { screen, .. }
            | Self::EnterSkipped { screen, .. }
            | Self::Interactivity { screen, .. } => screen,
        }
    }
}

/// Everything a screen may use during its lifecycle.
///
/// The context is created by the container when the entry is appended and
/// lives exactly as long as the entry.
#[derive(Clone)]
pub struct ScreenContext {
    kind: ContainerKind,
    entry: EntryId,
    screen: String,
    scope: DisposalScope,
    assets: Option<Arc<dyn AssetResolver>>,
}

impl ScreenContext {
    pub(crate) fn new(
        kind: ContainerKind,
        entry: EntryId,
        screen: impl Into<String>,
        assets: Option<Arc<dyn AssetResolver>>,
    ) -> Self {
        let screen = screen.into();
        Self {
            kind,
            entry,
            scope: DisposalScope::new(format!("{kind}/{screen}")),
            screen,
            assets,
        }
    }

    /// The container kind holding this screen.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// The entry ID of this screen.
    pub fn entry(&self) -> EntryId {
        self.entry
    }

    /// The screen's name.
    pub fn screen_name(&self) -> &str {
        &self.screen
    }

    /// The screen's disposal scope.
    pub fn scope(&self) -> &DisposalScope {
        &self.scope
    }

    /// Load an asset and register its release into this screen's scope.
    ///
    /// Fails with [`AssetError::AssetNotFound`](crate::error::AssetError)
    /// when no resolver was configured.
    pub async fn load_asset(&self, key: &str) -> NavResult<AssetHandle> {
        let resolver = self
            .assets
            .clone()
            .ok_or_else(|| crate::error::AssetError::AssetNotFound(key.to_string()))?;

        let handle = resolver.load(key).await?;
        tracing::trace!(target: targets::CONTAINER, screen = %self.screen, key, "asset loaded");

        let release = handle.clone();
        let owner = resolver.clone();
        if let Err(err) = self.scope.register(move || owner.release(&release)) {
            // The screen was torn down while the load was in flight.
            resolver.release(&handle);
            return Err(err.into());
        }
        Ok(handle)
    }
}

impl fmt::Debug for ScreenContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenContext")
            .field("kind", &self.kind)
            .field("entry", &self.entry)
            .field("screen", &self.screen)
            .field("scope", &self.scope)
            .finish()
    }
}

/// The capability set a navigation container requires of a screen.
///
/// Containers call these in lifecycle order and never concurrently for the
/// same screen. `construct` and `initialize` may fail; any failure aborts
/// the push and tears the entry down without running `enter` or `exit`.
pub trait Screen: Send + Sync + 'static {
    /// A short name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Build the view state (the `Constructing` phase).
    fn construct(&self, cx: &ScreenContext) -> NavResult<()>;

    /// Initialize the view against its state (the `Initializing` phase).
    fn initialize<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, NavResult<()>>;

    /// Play enter visuals and run enter hooks (the `Entering` phase).
    fn enter<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, ()>;

    /// Runs once the entry is `Active` and interactivity has been handed
    /// out. Not called when the enter phase was skipped.
    fn entered(&self, _cx: &ScreenContext) {}

    /// Play exit visuals and run exit hooks (the `Exiting` phase).
    fn exit<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, ()>;

    /// Enable or suspend input handling.
    fn set_interactive(&self, interactive: bool);

    /// Final teardown, after the disposal scope has been released.
    fn dispose(&self, _cx: &ScreenContext) {}
}

impl fmt::Debug for dyn Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Screen").field("name", &self.name()).finish()
    }
}

/// Wrap a ready value as a boxed future, for trivial trait implementations.
pub fn ready<'a, T: Send + 'a>(value: T) -> BoxFuture<'a, T> {
    Box::pin(std::future::ready(value))
}

pub(crate) fn push_failed(screen: &str, source: NavError) -> NavError {
    NavError::PushFailed {
        screen: screen.to_string(),
        source: Box::new(source),
    }
}
