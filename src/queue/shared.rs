//! Peer-visible memory.
//!
//! Everything in here may be read or written by the secure side on another
//! core whose caches are not coherent with ours. Accessors always bracket
//! the access with cache maintenance: invalidate before a read, clean after
//! a write. There is no way to reach the raw value without going through
//! them.
//!
//! Every shared object starts on its own cache line and is padded to a
//! whole number of lines. Cleaning or invalidating one of them can then
//! never write back or discard bytes owned by the other side.

use core::cell::UnsafeCell;
use core::mem::align_of;
use core::sync::atomic::{fence, AtomicU32, Ordering};

use super::mask::{SlotIndex, SlotMask};
use crate::hal::MailboxHal;
use crate::platform::CACHE_LINE_SIZE;

/// Alignment of every peer-visible object. Matches the `align` attributes
/// below.
pub const SHARED_ALIGN: usize = 64;

const _: () = assert!(SHARED_ALIGN % CACHE_LINE_SIZE == 0);
const _: () = assert!(align_of::<CrossDomain<u8>>() == SHARED_ALIGN);
const _: () = assert!(align_of::<SharedStatus<1>>() == SHARED_ALIGN);

/// A value living in memory shared with the peer, alone on its cache
/// line(s).
#[repr(C, align(64))]
pub struct CrossDomain<T: Copy> {
    value: UnsafeCell<T>,
}

// Access is serialized by the slot ownership protocol: a slot's fields are
// touched by its owner thread or, between pend and reply, by the peer.
unsafe impl<T: Copy + Send> Sync for CrossDomain<T> {}

impl<T: Copy> CrossDomain<T> {
    pub const fn new(value: T) -> Self {
        Self { value: UnsafeCell::new(value) }
    }

    #[inline]
    fn addr(&self) -> *const u8 {
        self.value.get() as *const u8
    }

    /// Invalidate, then read.
    pub fn read<H: MailboxHal>(&self, hal: &H) -> T {
        hal.invalidate_cache(self.addr(), core::mem::size_of::<T>());
        fence(Ordering::Acquire);
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write, then clean.
    pub fn write<H: MailboxHal>(&self, hal: &H, value: T) {
        unsafe { core::ptr::write_volatile(self.value.get(), value) };
        fence(Ordering::Release);
        hal.clean_cache(self.addr(), core::mem::size_of::<T>());
    }
}

/// The two status words shared with the peer.
///
/// `pend_slots`: set by us when a request is published, taken by the peer.
/// `replied_slots`: set by the peer when a reply is ready, cleared by us
/// once consumed. Only the named transitions below exist.
#[repr(C, align(64))]
pub struct SharedStatus<const N: usize> {
    pend_slots: AtomicU32,
    replied_slots: AtomicU32,
}

impl<const N: usize> SharedStatus<N> {
    pub const fn new() -> Self {
        Self {
            pend_slots: AtomicU32::new(0),
            replied_slots: AtomicU32::new(0),
        }
    }

    #[inline]
    fn addr(&self) -> *const u8 {
        self as *const Self as *const u8
    }

    #[inline]
    fn invalidate<H: MailboxHal>(&self, hal: &H) {
        hal.invalidate_cache(self.addr(), core::mem::size_of::<Self>());
    }

    #[inline]
    fn clean<H: MailboxHal>(&self, hal: &H) {
        hal.clean_cache(self.addr(), core::mem::size_of::<Self>());
    }

    /// Clear both words. Only valid before the queue is handed to the peer.
    pub(crate) fn reset<H: MailboxHal>(&self, hal: &H) {
        self.pend_slots.store(0, Ordering::Relaxed);
        self.replied_slots.store(0, Ordering::Release);
        self.clean(hal);
    }

    /// Publish `idx` as carrying a new request.
    pub fn mark_pending<H: MailboxHal>(&self, hal: &H, idx: SlotIndex) {
        self.invalidate(hal);
        self.pend_slots.fetch_or(idx.bit(), Ordering::Release);
        self.clean(hal);
    }

    /// Peer side: collect and clear every pending request.
    pub fn take_pending<H: MailboxHal>(&self, hal: &H) -> SlotMask<N> {
        self.invalidate(hal);
        let bits = self.pend_slots.swap(0, Ordering::AcqRel);
        self.clean(hal);
        SlotMask::from_bits(bits)
    }

    /// Peer side: announce that the reply for `idx` is written.
    pub fn mark_replied<H: MailboxHal>(&self, hal: &H, idx: SlotIndex) {
        self.invalidate(hal);
        self.replied_slots.fetch_or(idx.bit(), Ordering::Release);
        self.clean(hal);
    }

    /// If the peer has replied on `idx`, clear that bit and return true.
    pub fn take_replied<H: MailboxHal>(&self, hal: &H, idx: SlotIndex) -> bool {
        self.invalidate(hal);
        let bit = idx.bit();
        if self.replied_slots.load(Ordering::Acquire) & bit == 0 {
            return false;
        }
        self.replied_slots.fetch_and(!bit, Ordering::AcqRel);
        self.clean(hal);
        true
    }

    /// Collect and clear every replied slot.
    pub fn take_all_replied<H: MailboxHal>(&self, hal: &H) -> SlotMask<N> {
        self.invalidate(hal);
        let bits = self.replied_slots.swap(0, Ordering::AcqRel);
        self.clean(hal);
        SlotMask::from_bits(bits)
    }

    /// Snapshot of the pending word, for diagnostics.
    pub fn pending<H: MailboxHal>(&self, hal: &H) -> SlotMask<N> {
        self.invalidate(hal);
        SlotMask::from_bits(self.pend_slots.load(Ordering::Acquire))
    }

    /// Snapshot of the replied word, for diagnostics.
    pub fn replied<H: MailboxHal>(&self, hal: &H) -> SlotMask<N> {
        self.invalidate(hal);
        SlotMask::from_bits(self.replied_slots.load(Ordering::Acquire))
    }
}
