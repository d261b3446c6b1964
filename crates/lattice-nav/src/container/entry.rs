//! Entry storage for navigation containers.

use std::sync::Arc;

use parking_lot::Mutex;
use slotmap::{SecondaryMap, SlotMap};

use crate::screen::{ContainerKind, EntryId, Screen, ScreenContext, ScreenPhase};

/// Allocates entry IDs for every container of one navigator, so an ID alone
/// identifies both the entry and its container.
#[derive(Default)]
pub(crate) struct EntryIds {
    ids: Mutex<SlotMap<EntryId, ContainerKind>>,
}

impl EntryIds {
    pub(crate) fn allocate(&self, kind: ContainerKind) -> EntryId {
        self.ids.lock().insert(kind)
    }

    pub(crate) fn retire(&self, id: EntryId) {
        self.ids.lock().remove(id);
    }

    pub(crate) fn kind_of(&self, id: EntryId) -> Option<ContainerKind> {
        self.ids.lock().get(id).copied()
    }
}

/// One live screen in a container.
pub(crate) struct EntryRecord {
    pub(crate) screen: Arc<dyn Screen>,
    pub(crate) cx: ScreenContext,
    pub(crate) phase: ScreenPhase,
}

/// A read-only snapshot of a container entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntrySnapshot {
    /// The entry ID.
    pub id: EntryId,
    /// The screen's name.
    pub screen: String,
    /// The entry's lifecycle phase.
    pub phase: ScreenPhase,
}

/// Entries in visual stacking order (last = topmost).
#[derive(Default)]
pub(crate) struct EntryTable {
    records: SecondaryMap<EntryId, EntryRecord>,
    order: Vec<EntryId>,
}

impl EntryTable {
    pub(crate) fn append(&mut self, id: EntryId, record: EntryRecord) {
        self.records.insert(id, record);
        self.order.push(id);
    }

    pub(crate) fn remove(&mut self, id: EntryId) -> Option<EntryRecord> {
        let record = self.records.remove(id)?;
        self.order.retain(|&existing| existing != id);
        Some(record)
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<&EntryRecord> {
        self.records.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: EntryId) -> Option<&mut EntryRecord> {
        self.records.get_mut(id)
    }

    pub(crate) fn top(&self) -> Option<EntryId> {
        self.order.last().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<EntrySnapshot> {
        self.order
            .iter()
            .filter_map(|&id| {
                self.records.get(id).map(|record| EntrySnapshot {
                    id,
                    screen: record.screen.name().to_string(),
                    phase: record.phase,
                })
            })
            .collect()
    }
}
