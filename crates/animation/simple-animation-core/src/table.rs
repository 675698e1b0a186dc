//! Slot table of state records.
//!
//! Removing a record leaves a hole; the table's logical length never shrinks
//! and the first hole is reused by the next insertion. Every slot carries a
//! generation bumped on removal so stale handles can be told apart from the
//! record that reused their slot. `version` changes on every insert/remove.

use crate::handle::StateHandle;
use crate::state::StateRecord;

#[derive(Debug, Default)]
pub struct StateTable {
    slots: Vec<Option<StateRecord>>,
    generations: Vec<u32>,
    live: usize,
    version: u64,
}

impl StateTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            live: 0,
            version: 0,
        }
    }

    /// Logical length, holes included.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn live_count(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Slot the next insertion will occupy.
    pub fn next_slot(&self) -> usize {
        self.slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len())
    }

    /// Place a record built for the next free slot. Returns its slot.
    pub fn insert(&mut self, build: impl FnOnce(usize) -> StateRecord) -> usize {
        let slot = self.next_slot();
        let record = build(slot);
        debug_assert_eq!(record.slot(), slot, "record built for the wrong slot");
        if slot == self.slots.len() {
            self.slots.push(Some(record));
            self.generations.push(0);
        } else {
            self.slots[slot] = Some(record);
        }
        self.live += 1;
        self.version = self.version.wrapping_add(1);
        slot
    }

    /// Free `slot`. No-op when the slot is already empty.
    pub fn remove(&mut self, slot: usize) -> Option<StateRecord> {
        let removed = self.slots.get_mut(slot).and_then(Option::take)?;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.live -= 1;
        self.version = self.version.wrapping_add(1);
        Some(removed)
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&StateRecord> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut StateRecord> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// First live record with this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.iter().find(|r| r.name() == name).map(StateRecord::slot)
    }

    pub fn any_enabled(&self) -> bool {
        self.iter().any(StateRecord::enabled)
    }

    /// Live records in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &StateRecord> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StateRecord> {
        self.slots.iter_mut().flatten()
    }

    /// Handle for the live record in `slot`.
    pub fn handle(&self, slot: usize) -> Option<StateHandle> {
        self.get(slot)
            .map(|_| StateHandle::new(slot, self.generations[slot]))
    }

    /// Slot of the live record `handle` was taken from, if it is still there.
    pub fn resolve(&self, handle: StateHandle) -> Option<usize> {
        let slot = handle.slot();
        match (self.slots.get(slot), self.generations.get(slot)) {
            (Some(Some(_)), Some(gen)) if *gen == handle.generation() => Some(slot),
            _ => None,
        }
    }

    /// First live slot at or after `from`.
    pub(crate) fn next_live_from(&self, from: usize) -> Option<usize> {
        (from..self.slots.len()).find(|&i| self.slots[i].is_some())
    }
}
