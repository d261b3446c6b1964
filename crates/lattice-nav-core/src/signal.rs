//! Ordered signal fan-out for Lattice Nav.
//!
//! A [`Signal`] holds an ordered list of observer slots. Emitting the signal
//! synchronously invokes every slot that was subscribed at the moment of the
//! emit, in subscription order. There is no queueing and no replay: a slot
//! subscribed after an emit never sees that emit.
//!
//! Subscribing returns a [`Subscription`] token. Tokens do not disconnect
//! when dropped; they are released explicitly, usually by handing them to a
//! [`DisposalScope`](crate::DisposalScope) with [`Subscription::add_to`].
//!
//! # Example
//!
//! ```
//! use lattice_nav_core::{DisposalScope, Signal};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicI32, Ordering};
//!
//! let scope = DisposalScope::new("example");
//! let signal = Signal::<i32>::new("value_changed");
//! let total = Arc::new(AtomicI32::new(0));
//!
//! let total_clone = total.clone();
//! signal
//!     .subscribe(move |&n| {
//!         total_clone.fetch_add(n, Ordering::SeqCst);
//!     })
//!     .unwrap()
//!     .add_to(&scope)
//!     .unwrap();
//!
//! signal.emit(42);
//! scope.release_all().unwrap();
//! signal.emit(1); // no subscribers left
//! assert_eq!(total.load(Ordering::SeqCst), 42);
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::{LifetimeError, LifetimeResult};
use crate::scope::DisposalScope;

new_key_type! {
    /// A unique identifier for a signal subscription.
    ///
    /// The ID remains valid until the subscription is released or the
    /// signal is closed.
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// Slot storage plus the subscription order.
///
/// The slot map reuses vacated slots, so iteration order alone does not
/// reflect subscription order; `order` does.
struct Connections<Args> {
    slots: SlotMap<ConnectionId, Slot<Args>>,
    order: Vec<ConnectionId>,
    closed: bool,
}

struct SignalInner<Args> {
    name: String,
    connections: Mutex<Connections<Args>>,
    blocked: AtomicBool,
}

impl<Args> SignalInner<Args> {
    fn shut(&self) -> bool {
        let mut connections = self.connections.lock();
        if connections.closed {
            return false;
        }
        connections.closed = true;
        connections.slots.clear();
        connections.order.clear();
        true
    }

    fn remove(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        if connections.slots.remove(id).is_some() {
            connections.order.retain(|&existing| existing != id);
            true
        } else {
            false
        }
    }
}

/// Type-erased disconnect access, so tokens don't carry the argument type.
trait Disconnect: Send + Sync {
    fn disconnect(&self, id: ConnectionId) -> bool;
    fn close(&self) -> bool;
}

impl<Args: Send + 'static> Disconnect for SignalInner<Args> {
    fn disconnect(&self, id: ConnectionId) -> bool {
        self.remove(id)
    }

    fn close(&self) -> bool {
        self.shut()
    }
}

/// A type-safe signal with ordered, synchronous fan-out.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to subscribed slots. Use `()` for
///   signals without a payload.
///
/// # Thread Safety
///
/// `Signal<Args>` is `Send + Sync`. The slot list is snapshotted under the
/// lock and the lock is released before any slot runs, so slots may freely
/// subscribe, unsubscribe or emit re-entrantly.
pub struct Signal<Args> {
    inner: Arc<SignalInner<Args>>,
}

impl<Args: Send + 'static> Signal<Args> {
    /// Create a new signal with no subscriptions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                name: name.into(),
                connections: Mutex::new(Connections {
                    slots: SlotMap::with_key(),
                    order: Vec::new(),
                    closed: false,
                }),
                blocked: AtomicBool::new(false),
            }),
        }
    }

    /// The diagnostic name given at construction.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Subscribe a slot (closure) to this signal.
    ///
    /// Fails with [`LifetimeError::StateDisposed`] once the signal is closed.
    pub fn subscribe<F>(&self, slot: F) -> LifetimeResult<Subscription>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut connections = self.inner.connections.lock();
        if connections.closed {
            return Err(LifetimeError::state_disposed(self.inner.name.clone()));
        }
        let id = connections.slots.insert(Arc::new(slot));
        connections.order.push(id);
        drop(connections);

        let inner: Arc<dyn Disconnect> = self.inner.clone();
        Ok(Subscription {
            signal: Arc::downgrade(&inner),
            id,
            signal_name: self.inner.name.clone(),
        })
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.inner.remove(id)
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        let mut connections = self.inner.connections.lock();
        connections.slots.clear();
        connections.order.clear();
    }

    /// Get the number of subscribed slots.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().slots.len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` deliver nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.inner.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.inner.blocked.load(Ordering::SeqCst)
    }

    /// Close the signal: drop every slot and refuse new subscriptions.
    ///
    /// Returns `false` if the signal was already closed.
    pub fn close(&self) -> bool {
        self.inner.shut()
    }

    /// A callback that closes this signal later without keeping it alive.
    pub(crate) fn closer(&self) -> impl FnOnce() + Send + 'static {
        let inner: Arc<dyn Disconnect> = self.inner.clone();
        let weak = Arc::downgrade(&inner);
        move || {
            if let Some(signal) = weak.upgrade() {
                signal.close();
            }
        }
    }

    /// Check whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.connections.lock().closed
    }

    /// Emit the signal, invoking every currently subscribed slot in order.
    ///
    /// Returns the number of slots invoked. Blocked or closed signals
    /// deliver nothing.
    #[tracing::instrument(skip_all, target = "lattice_nav::signal", level = "trace", fields(signal = %self.inner.name))]
    pub fn emit(&self, args: Args) -> usize {
        if self.is_blocked() {
            tracing::trace!(target: "lattice_nav::signal", "signal blocked, skipping emit");
            return 0;
        }

        let snapshot: Vec<Slot<Args>> = {
            let connections = self.inner.connections.lock();
            if connections.closed {
                return 0;
            }
            connections
                .order
                .iter()
                .filter_map(|id| connections.slots.get(*id).cloned())
                .collect()
        };
        tracing::trace!(target: "lattice_nav::signal", connection_count = snapshot.len(), "emitting signal");

        for slot in &snapshot {
            slot(&args);
        }
        snapshot.len()
    }
}

impl<Args: Send + 'static> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.inner.name)
            .field("connections", &self.connection_count())
            .field("blocked", &self.is_blocked())
            .finish()
    }
}

/// An explicit unsubscribe token returned by [`Signal::subscribe`].
///
/// Dropping a token does *not* disconnect it. Release it with
/// [`unsubscribe`](Self::unsubscribe), or hand it to a disposal scope with
/// [`add_to`](Self::add_to) so it is released together with its screen.
#[must_use = "a subscription stays connected until released; register it into a DisposalScope"]
pub struct Subscription {
    signal: Weak<dyn Disconnect>,
    id: ConnectionId,
    signal_name: String,
}

impl Subscription {
    /// The connection ID of this subscription.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Name of the signal this subscription belongs to.
    pub fn signal_name(&self) -> &str {
        &self.signal_name
    }

    /// Disconnect the slot.
    ///
    /// Returns `false` if the signal is gone or the slot was already removed
    /// (for example because the owning state was disposed first).
    pub fn unsubscribe(self) -> bool {
        match self.signal.upgrade() {
            Some(signal) => signal.disconnect(self.id),
            None => false,
        }
    }

    /// Register this subscription's teardown into a disposal scope.
    ///
    /// Fails with [`LifetimeError::ScopeAlreadyReleased`] if the scope has
    /// already been released; the slot is disconnected immediately in that
    /// case so it cannot leak.
    pub fn add_to(self, scope: &DisposalScope) -> LifetimeResult<()> {
        if scope.is_released() {
            self.unsubscribe();
            return Err(LifetimeError::scope_released(scope.name()));
        }
        let signal = self.signal.clone();
        let id = self.id;
        scope.register(move || {
            if let Some(signal) = signal.upgrade() {
                signal.disconnect(id);
            }
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("signal", &self.signal_name)
            .field("id", &self.id)
            .finish()
    }
}
