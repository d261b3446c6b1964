//! Interactivity handoff between navigation containers.
//!
//! At most one entry is interactive at any time: the `Active` top entry of
//! the highest non-empty layer (`Page < Sheet < Modal`). While that top
//! entry is still constructing, entering or exiting, nothing is
//! interactive. Lower layers never regain input while a higher layer holds
//! any entry.

use std::sync::Arc;

use lattice_nav_core::Signal;
use lattice_nav_core::logging::targets;
use parking_lot::Mutex;

use crate::screen::{ContainerKind, EntryId, LifecycleEvent, Screen};

/// The `Active` top entry of one container.
#[derive(Clone)]
pub(crate) struct TopEntry {
    pub(crate) kind: ContainerKind,
    pub(crate) entry: EntryId,
    pub(crate) screen: Arc<dyn Screen>,
}

/// What a container reports about itself after every change.
#[derive(Clone, Default)]
pub(crate) struct LayerStatus {
    /// The container holds at least one entry, in any phase.
    pub(crate) occupied: bool,
    /// The top entry, if it is `Active`.
    pub(crate) active_top: Option<TopEntry>,
}

#[derive(Default)]
struct ArbiterState {
    layers: [LayerStatus; 3],
    current: Option<TopEntry>,
}

impl ArbiterState {
    fn resolve(&self) -> Option<TopEntry> {
        self.layers
            .iter()
            .rev()
            .find(|layer| layer.occupied)
            .and_then(|layer| layer.active_top.clone())
    }
}

/// Decides which single entry receives input.
pub(crate) struct InteractionArbiter {
    /// Held from computing a handoff until both sides have been told, so
    /// handoffs from different containers reach screens in decision order.
    handoff: Mutex<()>,
    state: Mutex<ArbiterState>,
    events: Arc<Signal<LifecycleEvent>>,
}

impl InteractionArbiter {
    pub(crate) fn new(events: Arc<Signal<LifecycleEvent>>) -> Self {
        Self {
            handoff: Mutex::new(()),
            state: Mutex::new(ArbiterState::default()),
            events,
        }
    }

    /// The currently interactive entry.
    pub(crate) fn current(&self) -> Option<(ContainerKind, EntryId)> {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|top| (top.kind, top.entry))
    }

    /// Record a container's new status and move interactivity if needed.
    pub(crate) fn update(&self, kind: ContainerKind, status: LayerStatus) {
        let _handoff = self.handoff.lock();
        let (revoke, grant) = {
            let mut state = self.state.lock();
            state.layers[kind.layer()] = status;
            let next = state.resolve();

            let unchanged = match (&state.current, &next) {
                (Some(current), Some(next)) => current.entry == next.entry,
                (None, None) => true,
                _ => false,
            };
            if unchanged {
                return;
            }
            let previous = std::mem::replace(&mut state.current, next.clone());
            (previous, next)
        };

        // Screens are called without the state lock held, so they may query
        // `current`.
        if let Some(top) = revoke {
            self.apply(&top, false);
        }
        if let Some(top) = grant {
            self.apply(&top, true);
        }
    }

    fn apply(&self, top: &TopEntry, interactive: bool) {
        tracing::debug!(
            target: targets::INTERACTION,
            kind = %top.kind,
            screen = top.screen.name(),
            interactive,
            "interactivity changed"
        );
        top.screen.set_interactive(interactive);
        self.events.emit(LifecycleEvent::Interactivity {
            kind: top.kind,
            entry: top.entry,
            screen: top.screen.name().to_string(),
            interactive,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use futures_util::future::BoxFuture;
    use slotmap::SlotMap;

    use super::*;
    use crate::error::NavResult;
    use crate::screen::{ScreenContext, ready};

    struct Tracked {
        name: &'static str,
        interactive: AtomicBool,
    }

    impl Tracked {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                interactive: AtomicBool::new(false),
            })
        }

        fn is_interactive(&self) -> bool {
            self.interactive.load(Ordering::SeqCst)
        }
    }

    impl Screen for Tracked {
        fn name(&self) -> &str {
            self.name
        }

        fn construct(&self, _cx: &ScreenContext) -> NavResult<()> {
            Ok(())
        }

        fn initialize<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, NavResult<()>> {
            ready(Ok(()))
        }

        fn enter<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
            ready(())
        }

        fn exit<'a>(&'a self, _cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
            ready(())
        }

        fn set_interactive(&self, interactive: bool) {
            self.interactive.store(interactive, Ordering::SeqCst);
        }
    }

    /// Stalls inside its first revocation until released.
    struct Stalling {
        inner: Tracked,
        stall: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl Screen for Stalling {
        fn name(&self) -> &str {
            self.inner.name
        }

        fn construct(&self, cx: &ScreenContext) -> NavResult<()> {
            self.inner.construct(cx)
        }

        fn initialize<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, NavResult<()>> {
            self.inner.initialize(cx)
        }

        fn enter<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
            self.inner.enter(cx)
        }

        fn exit<'a>(&'a self, cx: &'a ScreenContext) -> BoxFuture<'a, ()> {
            self.inner.exit(cx)
        }

        fn set_interactive(&self, interactive: bool) {
            if !interactive {
                let stall = self.stall.lock().take();
                if let Some((stalled, release)) = stall {
                    stalled.send(()).unwrap();
                    release.recv().unwrap();
                }
            }
            self.inner.set_interactive(interactive);
        }
    }

    fn active(kind: ContainerKind, entry: EntryId, screen: Arc<dyn Screen>) -> LayerStatus {
        LayerStatus {
            occupied: true,
            active_top: Some(TopEntry { kind, entry, screen }),
        }
    }

    #[test]
    fn test_higher_layer_takes_input() {
        let mut ids: SlotMap<EntryId, ()> = SlotMap::with_key();
        let (page_id, modal_id) = (ids.insert(()), ids.insert(()));
        let arbiter = InteractionArbiter::new(Arc::new(Signal::new("events")));
        let page = Tracked::new("page");
        let modal = Tracked::new("modal");

        arbiter.update(ContainerKind::Page, active(ContainerKind::Page, page_id, page.clone()));
        assert!(page.is_interactive());
        assert_eq!(arbiter.current(), Some((ContainerKind::Page, page_id)));

        // A modal that is still constructing suspends the page.
        arbiter.update(
            ContainerKind::Modal,
            LayerStatus {
                occupied: true,
                active_top: None,
            },
        );
        assert!(!page.is_interactive());
        assert_eq!(arbiter.current(), None);

        arbiter.update(ContainerKind::Modal, active(ContainerKind::Modal, modal_id, modal.clone()));
        assert!(modal.is_interactive());
        assert!(!page.is_interactive());

        arbiter.update(ContainerKind::Modal, LayerStatus::default());
        assert!(!modal.is_interactive());
        assert!(page.is_interactive());
    }

    #[test]
    fn test_events_only_on_change() {
        let mut ids: SlotMap<EntryId, ()> = SlotMap::with_key();
        let page_id = ids.insert(());
        let events = Arc::new(Signal::new("events"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = events
            .subscribe(move |event: &LifecycleEvent| sink.lock().push(event.clone()))
            .unwrap();

        let arbiter = InteractionArbiter::new(events);
        let page = Tracked::new("page");
        arbiter.update(ContainerKind::Page, active(ContainerKind::Page, page_id, page.clone()));
        arbiter.update(ContainerKind::Page, active(ContainerKind::Page, page_id, page.clone()));

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_handoffs_reach_screens_in_decision_order() {
        let mut ids: SlotMap<EntryId, ()> = SlotMap::with_key();
        let (old_id, new_id) = (ids.insert(()), ids.insert(()));
        let arbiter = Arc::new(InteractionArbiter::new(Arc::new(Signal::new("events"))));
        let (stalled_tx, stalled_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let old = Arc::new(Stalling {
            inner: Tracked {
                name: "old",
                interactive: AtomicBool::new(false),
            },
            stall: Mutex::new(Some((stalled_tx, release_rx))),
        });
        let new = Tracked::new("new");
        arbiter.update(ContainerKind::Page, active(ContainerKind::Page, old_id, old.clone()));

        // Hand input from `old` to `new`; the revocation of `old` stalls.
        let first = {
            let arbiter = arbiter.clone();
            let status = active(ContainerKind::Page, new_id, new.clone());
            thread::spawn(move || arbiter.update(ContainerKind::Page, status))
        };
        stalled_rx.recv().unwrap();

        // Meanwhile `new` starts exiting, so nothing should be interactive.
        let second = {
            let arbiter = arbiter.clone();
            thread::spawn(move || {
                arbiter.update(
                    ContainerKind::Page,
                    LayerStatus {
                        occupied: true,
                        active_top: None,
                    },
                )
            })
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();
        first.join().unwrap();
        second.join().unwrap();

        assert_eq!(arbiter.current(), None);
        assert!(!new.is_interactive());
        assert!(!old.inner.is_interactive());
    }
}
