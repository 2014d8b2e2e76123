//! Slot indices and slot bitmasks.

use core::fmt;

/// Index of a mailbox queue slot, always `< N` for the queue it came from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Checked constructor for a queue of `N` slots.
    pub const fn new<const N: usize>(idx: usize) -> Option<Self> {
        if idx < N {
            Some(Self(idx as u8))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) const fn bit(self) -> u32 {
        1u32 << self.0
    }
}

impl fmt::Debug for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

/// Set of slots of an `N`-slot queue, one bit per slot.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotMask<const N: usize>(u32);

impl<const N: usize> SlotMask<N> {
    /// Masks are exchanged with the peer as one 32-bit word.
    pub(crate) const VALID: () = assert!(N >= 1 && N <= 32, "slot count must be 1..=32");

    const ALL: u32 = if N == 32 { u32::MAX } else { (1u32 << N) - 1 };

    pub const fn empty() -> Self {
        let () = Self::VALID;
        Self(0)
    }

    /// Every slot of the queue.
    pub const fn full() -> Self {
        let () = Self::VALID;
        Self(Self::ALL)
    }

    /// Build from a raw word; bits at or above `N` are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        let () = Self::VALID;
        Self(bits & Self::ALL)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, idx: SlotIndex) -> bool {
        self.0 & idx.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, idx: SlotIndex) {
        self.0 |= idx.bit();
    }

    #[inline]
    pub fn remove(&mut self, idx: SlotIndex) {
        self.0 &= !idx.bit();
    }

    /// Lowest-numbered member, if any.
    #[inline]
    pub const fn lowest(self) -> Option<SlotIndex> {
        if self.0 == 0 {
            None
        } else {
            Some(SlotIndex(self.0.trailing_zeros() as u8))
        }
    }

    #[inline]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Members in ascending order.
    pub fn iter(self) -> SlotMaskIter {
        SlotMaskIter(self.0)
    }
}

impl<const N: usize> fmt::Debug for SlotMask<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotMask({:#0width$b})", self.0, width = N + 2)
    }
}

pub struct SlotMaskIter(u32);

impl Iterator for SlotMaskIter {
    type Item = SlotIndex;

    fn next(&mut self) -> Option<SlotIndex> {
        if self.0 == 0 {
            return None;
        }
        let idx = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(SlotIndex(idx as u8))
    }
}
