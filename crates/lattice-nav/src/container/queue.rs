//! Per-container FIFO transition queue.
//!
//! Requests are appended synchronously at call time, so arrival order is the
//! order in which callers asked, not the order in which some future happens
//! to be polled. A single driver task per container drains the queue one
//! operation at a time.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::{NavError, NavResult};
use crate::screen::{ContainerKind, EntryId, Screen};

/// Which entry a pop removes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PopTarget {
    /// The topmost entry.
    #[default]
    Top,
    /// A specific entry, which need not be the top.
    Entry(EntryId),
}

/// What a completed transition did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// A screen was pushed and is now `Active`.
    Pushed {
        /// The container.
        kind: ContainerKind,
        /// The new entry.
        entry: EntryId,
    },
    /// An entry was exited, disposed and removed.
    Popped {
        /// The container.
        kind: ContainerKind,
        /// The removed entry.
        entry: EntryId,
    },
    /// Every entry of the container was removed.
    Cleared {
        /// The container.
        kind: ContainerKind,
        /// How many entries were removed.
        count: usize,
    },
}

impl TransitionOutcome {
    /// The entry pushed or popped, if any.
    pub fn entry(&self) -> Option<EntryId> {
        match self {
            Self::Pushed { entry, .. } | Self::Popped { entry, .. } => Some(*entry),
            Self::Cleared { .. } => None,
        }
    }
}

pub(crate) enum ContainerOp {
    Push(Arc<dyn Screen>),
    Pop(PopTarget),
    Clear,
}

impl ContainerOp {
    /// Whether running this op would remove `entry`, given that it is the top.
    pub(crate) fn removes(&self, entry: EntryId) -> bool {
        match self {
            Self::Push(_) => false,
            Self::Pop(PopTarget::Top) | Self::Clear => true,
            Self::Pop(PopTarget::Entry(target)) => *target == entry,
        }
    }
}

impl fmt::Debug for ContainerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(screen) => write!(f, "Push({})", screen.name()),
            Self::Pop(target) => write!(f, "Pop({target:?})"),
            Self::Clear => write!(f, "Clear"),
        }
    }
}

pub(crate) struct PendingOp {
    pub(crate) op: ContainerOp,
    pub(crate) reply: oneshot::Sender<NavResult<TransitionOutcome>>,
}

#[derive(Default)]
pub(crate) struct TransitionQueue {
    pub(crate) pending: VecDeque<PendingOp>,
    pub(crate) running: bool,
}

impl TransitionQueue {
    pub(crate) fn has_pending_push(&self) -> bool {
        self.pending
            .iter()
            .any(|pending| matches!(pending.op, ContainerOp::Push(_)))
    }
}

/// Completion of one queued transition.
///
/// Awaiting the ticket yields the transition's result. Dropping it does not
/// cancel the transition; failures are still logged by the container.
#[must_use = "dropping a ticket discards the transition result (the transition still runs)"]
pub struct TransitionTicket {
    kind: ContainerKind,
    receiver: oneshot::Receiver<NavResult<TransitionOutcome>>,
}

impl TransitionTicket {
    pub(crate) fn new(
        kind: ContainerKind,
        receiver: oneshot::Receiver<NavResult<TransitionOutcome>>,
    ) -> Self {
        Self { kind, receiver }
    }

    /// The container this transition was queued on.
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }
}

impl Future for TransitionTicket {
    type Output = NavResult<TransitionOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(NavError::TransitionAborted)))
    }
}

impl fmt::Debug for TransitionTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTicket")
            .field("kind", &self.kind)
            .finish()
    }
}
