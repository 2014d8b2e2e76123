//! NS-local slot bookkeeping: which slots are free, who owns the rest,
//! and whether an owner has been signalled.
//!
//! The peer never sees this. A `SlotTable` always sits behind the mailbox's
//! `IrqSpinLock`, so every method here runs with interrupts masked and is
//! O(N) at worst.

use super::mask::{SlotIndex, SlotMask};

struct SlotMeta<T> {
    owner: Option<T>,
    woken: bool,
}

pub struct SlotTable<T, const N: usize> {
    empty_slots: SlotMask<N>,
    meta: [SlotMeta<T>; N],
}

impl<T, const N: usize> SlotTable<T, N> {
    /// All slots free, no owners.
    pub const fn new() -> Self {
        Self {
            empty_slots: SlotMask::full(),
            meta: [const { SlotMeta { owner: None, woken: false } }; N],
        }
    }

    /// Back to the freshly-initialized state.
    pub fn reset(&mut self) {
        for meta in self.meta.iter_mut() {
            meta.owner = None;
            meta.woken = false;
        }
        self.empty_slots = SlotMask::full();
    }

    /// Claim the lowest free slot, or `None` when the queue is full.
    pub fn acquire_empty_slot(&mut self) -> Option<SlotIndex> {
        let idx = self.empty_slots.lowest()?;
        self.empty_slots.remove(idx);
        Some(idx)
    }

    /// Return `idx` to the pool.
    ///
    /// Owner and woken flag are cleared before the empty bit is set: once a
    /// slot is advertised as free, an allocator must find it fully reset.
    pub fn release_slot(&mut self, idx: SlotIndex) {
        let meta = &mut self.meta[idx.get()];
        meta.owner = None;
        meta.woken = false;
        self.empty_slots.insert(idx);
    }

    pub fn set_owner(&mut self, idx: SlotIndex, owner: T) {
        self.meta[idx.get()].owner = Some(owner);
    }

    pub fn owner(&self, idx: SlotIndex) -> Option<&T> {
        self.meta[idx.get()].owner.as_ref()
    }

    pub fn set_woken(&mut self, idx: SlotIndex) {
        self.meta[idx.get()].woken = true;
    }

    pub fn is_woken(&self, idx: SlotIndex) -> bool {
        self.meta[idx.get()].woken
    }

    /// Consume the woken flag of `idx`. True if it was set.
    pub fn take_woken(&mut self, idx: SlotIndex) -> bool {
        let meta = &mut self.meta[idx.get()];
        core::mem::replace(&mut meta.woken, false)
    }

    pub fn is_empty_slot(&self, idx: SlotIndex) -> bool {
        self.empty_slots.contains(idx)
    }

    pub fn empty_slots(&self) -> SlotMask<N> {
        self.empty_slots
    }

    /// Number of slots currently owned by a caller.
    pub fn used(&self) -> usize {
        N - self.empty_slots.count()
    }
}

impl<T, const N: usize> Default for SlotTable<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
