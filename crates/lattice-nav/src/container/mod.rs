//! Navigation containers: the page stack, the modal stack and the sheet slot.
//!
//! A container owns an ordered sequence of entries and a FIFO queue of
//! pending transitions. Transitions run one at a time on a driver task;
//! a request made while another is in flight waits its turn, so a pop
//! queued behind an in-flight push always observes the pushed entry.
//!
//! Every push runs `Constructing -> Initializing -> Entering -> Active`.
//! A failure during construction or initialization rolls the push back:
//! the entry's scope is released, the entry is removed and the previous
//! top becomes interactive again without re-entering. Every pop runs
//! `Exiting -> Disposed` and releases the entry's scope exactly once.
//!
//! A screen that panics fails its transition with [`NavError::Panicked`]
//! instead of taking the driver down; entries it left mid-phase are torn
//! down and the queue keeps draining.

mod entry;
mod queue;

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lattice_nav_core::Signal;
use lattice_nav_core::logging::{span_names, targets};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::Instrument;

pub use entry::EntrySnapshot;
pub(crate) use entry::EntryIds;
pub use queue::{PopTarget, TransitionOutcome, TransitionTicket};
pub(crate) use queue::ContainerOp;

use crate::asset::AssetResolver;
use crate::config::ContainerConfig;
use crate::error::{NavError, NavResult};
use crate::interaction::{InteractionArbiter, LayerStatus, TopEntry};
use crate::screen::{
    ContainerKind, EntryId, LifecycleEvent, Screen, ScreenContext, ScreenPhase, push_failed,
};

use entry::{EntryRecord, EntryTable};
use queue::{PendingOp, TransitionQueue};

/// Shared wiring every container of one navigator receives.
pub(crate) struct ContainerShared {
    pub(crate) ids: Arc<EntryIds>,
    pub(crate) arbiter: Arc<InteractionArbiter>,
    pub(crate) events: Arc<Signal<LifecycleEvent>>,
    pub(crate) assets: Option<Arc<dyn AssetResolver>>,
}

/// One navigation container.
///
/// Containers are owned by the
/// [`TransitionAuthority`](crate::authority::TransitionAuthority), which is
/// the only component that queues transitions on them. The public surface
/// is read-only.
pub struct NavigationContainer {
    kind: ContainerKind,
    config: ContainerConfig,
    entries: Mutex<EntryTable>,
    queue: Mutex<TransitionQueue>,
    /// Set while a slot occupant is being replaced, so the layer keeps
    /// lower layers suspended between the two entries.
    swapping: AtomicBool,
    idle: watch::Sender<bool>,
    ids: Arc<EntryIds>,
    arbiter: Arc<InteractionArbiter>,
    events: Arc<Signal<LifecycleEvent>>,
    assets: Option<Arc<dyn AssetResolver>>,
}

impl NavigationContainer {
    pub(crate) fn new(kind: ContainerKind, config: ContainerConfig, shared: &ContainerShared) -> Self {
        let (idle, _) = watch::channel(true);
        Self {
            kind,
            config,
            entries: Mutex::new(EntryTable::default()),
            queue: Mutex::new(TransitionQueue::default()),
            swapping: AtomicBool::new(false),
            idle,
            ids: shared.ids.clone(),
            arbiter: shared.arbiter.clone(),
            events: shared.events.clone(),
            assets: shared.assets.clone(),
        }
    }

    /// The container kind.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// The container's configuration.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Number of entries currently in the container, in any phase.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the container holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// The topmost entry.
    pub fn top(&self) -> Option<EntryId> {
        self.entries.lock().top()
    }

    /// Whether `entry` currently lives in this container.
    pub fn contains(&self, entry: EntryId) -> bool {
        self.entries.lock().get(entry).is_some()
    }

    /// The phase of `entry`, or `None` once it has been removed.
    pub fn phase(&self, entry: EntryId) -> Option<ScreenPhase> {
        self.entries.lock().get(entry).map(|record| record.phase)
    }

    /// A snapshot of all entries, bottom first.
    pub fn entries(&self) -> Vec<EntrySnapshot> {
        self.entries.lock().snapshot()
    }

    /// Number of transitions waiting behind the one in flight.
    pub fn pending(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// Whether no transition is queued or running.
    pub fn is_idle(&self) -> bool {
        *self.idle.borrow()
    }

    /// Wait until no transition is queued or running.
    pub async fn wait_idle(&self) {
        let mut idle = self.idle.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = idle.wait_for(|idle| *idle).await;
    }

    /// Whether the container holds entries or has a push queued.
    pub(crate) fn has_pending_content(&self) -> bool {
        !self.is_empty() || self.queue.lock().has_pending_push()
    }

    /// Append `op` to the queue and make sure a driver is running.
    pub(crate) fn enqueue(self: &Arc<Self>, op: ContainerOp) -> NavResult<TransitionTicket> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| NavError::RuntimeUnavailable)?;
        let (reply, receiver) = oneshot::channel();

        let start_driver = {
            let mut queue = self.queue.lock();
            if queue.pending.len() >= self.config.max_pending_transitions {
                tracing::warn!(
                    target: targets::CONTAINER,
                    kind = %self.kind,
                    ?op,
                    capacity = self.config.max_pending_transitions,
                    "transition queue full, rejecting"
                );
                return Err(NavError::QueueFull {
                    kind: self.kind,
                    capacity: self.config.max_pending_transitions,
                });
            }
            tracing::trace!(target: targets::CONTAINER, kind = %self.kind, ?op, "transition queued");
            queue.pending.push_back(PendingOp { op, reply });
            self.idle.send_replace(false);
            !std::mem::replace(&mut queue.running, true)
        };

        if start_driver {
            runtime.spawn(self.clone().drive());
        }
        Ok(TransitionTicket::new(self.kind, receiver))
    }

    async fn drive(self: Arc<Self>) {
        loop {
            let next = {
                let mut queue = self.queue.lock();
                match queue.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        queue.running = false;
                        self.idle.send_replace(true);
                        return;
                    }
                }
            };

            let span = tracing::debug_span!(
                target: targets::CONTAINER,
                span_names::TRANSITION,
                kind = %self.kind,
                op = ?next.op
            );
            let pushing = match &next.op {
                ContainerOp::Push(screen) => Some(screen.name().to_string()),
                _ => None,
            };
            let result = AssertUnwindSafe(self.run(next.op))
                .catch_unwind()
                .instrument(span)
                .await
                .unwrap_or_else(|panic| Err(self.recover(panic, pushing.as_deref())));
            if let Err(err) = &result {
                tracing::warn!(target: targets::CONTAINER, kind = %self.kind, error = %err, "transition failed");
            }
            if next.reply.send(result).is_err() {
                tracing::trace!(target: targets::CONTAINER, kind = %self.kind, "transition ticket dropped");
            }
        }
    }

    async fn run(&self, op: ContainerOp) -> NavResult<TransitionOutcome> {
        match op {
            ContainerOp::Push(screen) => self.push(screen).await,
            ContainerOp::Pop(target) => self.pop(target).await,
            ContainerOp::Clear => self.clear().await,
        }
    }

    async fn push(&self, screen: Arc<dyn Screen>) -> NavResult<TransitionOutcome> {
        if self.kind.is_slot() {
            let occupant = self.entries.lock().top();
            if let Some(occupant) = occupant {
                tracing::debug!(target: targets::CONTAINER, kind = %self.kind, "replacing slot occupant");
                self.swapping.store(true, Ordering::SeqCst);
                if let Err(err) = self.retire(occupant).await {
                    // The occupant is gone either way; the new screen proceeds.
                    tracing::warn!(target: targets::CONTAINER, kind = %self.kind, error = %err, "slot occupant released with errors");
                }
            }
        }

        let id = self.ids.allocate(self.kind);
        let cx = ScreenContext::new(self.kind, id, screen.name(), self.assets.clone());
        self.entries.lock().append(
            id,
            EntryRecord {
                screen: screen.clone(),
                cx: cx.clone(),
                phase: ScreenPhase::Constructing,
            },
        );
        self.swapping.store(false, Ordering::SeqCst);
        self.announce(id, screen.name(), ScreenPhase::Constructing);

        if let Err(err) = screen.construct(&cx) {
            return Err(self.roll_back(id, &screen, &cx, err));
        }

        self.set_phase(id, ScreenPhase::Initializing);
        if let Err(err) = screen.initialize(&cx).await {
            return Err(self.roll_back(id, &screen, &cx, err));
        }

        let skip_enter = self.config.skip_enter_when_pop_queued && self.removal_queued(id);
        if skip_enter {
            tracing::debug!(target: targets::CONTAINER, kind = %self.kind, screen = screen.name(), "pop already queued, skipping enter");
            self.events.emit(LifecycleEvent::EnterSkipped {
                kind: self.kind,
                entry: id,
                screen: screen.name().to_string(),
            });
        } else {
            self.set_phase(id, ScreenPhase::Entering);
            screen.enter(&cx).await;
        }

        self.set_phase(id, ScreenPhase::Active);
        if !skip_enter {
            screen.entered(&cx);
        }
        tracing::debug!(target: targets::CONTAINER, kind = %self.kind, screen = screen.name(), "screen pushed");
        Ok(TransitionOutcome::Pushed {
            kind: self.kind,
            entry: id,
        })
    }

    async fn pop(&self, target: PopTarget) -> NavResult<TransitionOutcome> {
        let id = {
            let entries = self.entries.lock();
            match target {
                PopTarget::Top => entries
                    .top()
                    .ok_or_else(|| NavError::invalid_transition(self.kind, "container is empty"))?,
                PopTarget::Entry(id) if entries.get(id).is_some() => id,
                PopTarget::Entry(_) => {
                    return Err(NavError::invalid_transition(
                        self.kind,
                        "entry is not in this container",
                    ));
                }
            }
        };

        self.retire(id).await?;
        Ok(TransitionOutcome::Popped {
            kind: self.kind,
            entry: id,
        })
    }

    async fn clear(&self) -> NavResult<TransitionOutcome> {
        let mut count = 0;
        let mut first_error = None;
        loop {
            let top = self.entries.lock().top();
            let Some(top) = top else { break };
            if let Err(err) = self.retire(top).await {
                first_error.get_or_insert(err);
            }
            count += 1;
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(TransitionOutcome::Cleared {
                kind: self.kind,
                count,
            }),
        }
    }

    /// Exit, release and remove one entry. The entry is removed even when
    /// releasing its scope reports failures.
    async fn retire(&self, id: EntryId) -> NavResult<()> {
        let found = self
            .entries
            .lock()
            .get(id)
            .map(|record| (record.screen.clone(), record.cx.clone()));
        let Some((screen, cx)) = found else {
            return Err(NavError::invalid_transition(self.kind, "entry is not in this container"));
        };

        self.set_phase(id, ScreenPhase::Exiting);
        screen.exit(&cx).await;

        let released = cx.scope().release_all();
        screen.dispose(&cx);
        self.set_phase(id, ScreenPhase::Disposed);
        tracing::debug!(target: targets::CONTAINER, kind = %self.kind, screen = screen.name(), "screen removed");
        released.map_err(NavError::from)
    }

    /// Tear down an entry whose push failed and wrap the failure.
    fn roll_back(
        &self,
        id: EntryId,
        screen: &Arc<dyn Screen>,
        cx: &ScreenContext,
        err: NavError,
    ) -> NavError {
        tracing::warn!(target: targets::CONTAINER, kind = %self.kind, screen = screen.name(), error = %err, "push failed, rolling back");
        if let Err(release) = cx.scope().release_all() {
            tracing::warn!(target: targets::CONTAINER, kind = %self.kind, error = %release, "rollback release reported failures");
        }
        screen.dispose(cx);
        self.set_phase(id, ScreenPhase::Disposed);
        push_failed(screen.name(), err)
    }

    /// Clean up after a screen panicked mid-transition.
    ///
    /// Every entry caught between phases is released, disposed and removed,
    /// which hands input back to whatever top remains `Active`.
    fn recover(&self, panic: Box<dyn Any + Send>, pushing: Option<&str>) -> NavError {
        let message = panic_message(panic.as_ref());
        tracing::error!(target: targets::CONTAINER, kind = %self.kind, panic = %message, "screen panicked during transition");
        self.swapping.store(false, Ordering::SeqCst);

        let stranded: Vec<_> = {
            let entries = self.entries.lock();
            entries
                .snapshot()
                .into_iter()
                .filter(|entry| entry.phase != ScreenPhase::Active)
                .filter_map(|entry| {
                    entries
                        .get(entry.id)
                        .map(|record| (entry.id, record.screen.clone(), record.cx.clone()))
                })
                .collect()
        };
        for (id, screen, cx) in stranded {
            if let Err(err) = cx.scope().release_all() {
                tracing::warn!(target: targets::CONTAINER, kind = %self.kind, screen = screen.name(), error = %err, "release after panic reported failures");
            }
            if std::panic::catch_unwind(AssertUnwindSafe(|| screen.dispose(&cx))).is_err() {
                tracing::warn!(target: targets::CONTAINER, kind = %self.kind, screen = screen.name(), "dispose panicked");
            }
            self.set_phase(id, ScreenPhase::Disposed);
        }
        self.sync_interaction();

        let err = NavError::Panicked(message);
        match pushing {
            Some(screen) => push_failed(screen, err),
            None => err,
        }
    }

    /// Whether the transition at the front of the queue would remove `id`.
    fn removal_queued(&self, id: EntryId) -> bool {
        let is_top = self.entries.lock().top() == Some(id);
        self.queue.lock().pending.front().is_some_and(|next| match &next.op {
            ContainerOp::Pop(PopTarget::Entry(target)) => *target == id,
            op => is_top && op.removes(id),
        })
    }

    fn set_phase(&self, id: EntryId, phase: ScreenPhase) {
        let screen = {
            let mut entries = self.entries.lock();
            if phase.is_terminal() {
                entries.remove(id).map(|record| record.screen)
            } else {
                entries.get_mut(id).map(|record| {
                    record.phase = phase;
                    record.screen.clone()
                })
            }
        };
        if phase.is_terminal() {
            self.ids.retire(id);
        }
        if let Some(screen) = screen {
            self.announce(id, screen.name(), phase);
        }
    }

    fn announce(&self, id: EntryId, screen: &str, phase: ScreenPhase) {
        tracing::trace!(target: targets::CONTAINER, kind = %self.kind, screen, %phase, "phase changed");
        self.sync_interaction();
        self.events.emit(LifecycleEvent::Phase {
            kind: self.kind,
            entry: id,
            screen: screen.to_string(),
            phase,
        });
    }

    fn sync_interaction(&self) {
        let status = {
            let entries = self.entries.lock();
            let active_top = entries.top().and_then(|top| {
                entries
                    .get(top)
                    .filter(|record| record.phase == ScreenPhase::Active)
                    .map(|record| TopEntry {
                        kind: self.kind,
                        entry: top,
                        screen: record.screen.clone(),
                    })
            });
            LayerStatus {
                occupied: !entries.is_empty() || self.swapping.load(Ordering::SeqCst),
                active_top,
            }
        };
        self.arbiter.update(self.kind, status);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

impl fmt::Debug for NavigationContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationContainer")
            .field("kind", &self.kind)
            .field("entries", &self.entries())
            .field("pending", &self.pending())
            .finish()
    }
}
