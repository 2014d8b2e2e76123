//! Call serialization lock.
//!
//! Caps how many `client_call`s may be in flight at once. Never more
//! holders than queue slots, otherwise slot allocation would keep failing
//! on a queue that is merely oversubscribed.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::MailboxError;

pub trait CallLock {
    /// Enter. Blocks or fails according to the implementation.
    fn acquire(&self) -> Result<(), MailboxError>;
    /// Leave. Fails if the lock was not held.
    fn release(&self) -> Result<(), MailboxError>;
}

/// One call in flight across the whole queue.
pub struct ExclusiveLock {
    held: AtomicBool,
}

impl ExclusiveLock {
    pub const fn new() -> Self {
        Self { held: AtomicBool::new(false) }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl Default for ExclusiveLock {
    fn default() -> Self {
        Self::new()
    }
}

impl CallLock for ExclusiveLock {
    fn acquire(&self) -> Result<(), MailboxError> {
        while self
            .held
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            core::hint::spin_loop();
        }
        Ok(())
    }

    fn release(&self) -> Result<(), MailboxError> {
        self.held
            .compare_exchange(true, false, Ordering::Release, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| MailboxError::LockRelease { reply: None })
    }
}

/// Up to `N` calls in flight, one per slot.
///
/// The blocking flavour spins until a permit frees up. The non-blocking
/// flavour fails `acquire` straight away, which `client_call` reports as
/// `QueueFull`.
pub struct SlotSemaphore<const N: usize> {
    permits: AtomicUsize,
    blocking: bool,
}

impl<const N: usize> SlotSemaphore<N> {
    pub const fn new() -> Self {
        Self { permits: AtomicUsize::new(N), blocking: true }
    }

    pub const fn non_blocking() -> Self {
        Self { permits: AtomicUsize::new(N), blocking: false }
    }

    /// Permits currently available.
    pub fn available(&self) -> usize {
        self.permits.load(Ordering::Acquire)
    }

    fn try_take(&self) -> bool {
        self.permits
            .fetch_update(Ordering::Acquire, Ordering::Relaxed, |p| p.checked_sub(1))
            .is_ok()
    }
}

impl<const N: usize> Default for SlotSemaphore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CallLock for SlotSemaphore<N> {
    fn acquire(&self) -> Result<(), MailboxError> {
        loop {
            if self.try_take() {
                return Ok(());
            }
            if !self.blocking {
                return Err(MailboxError::QueueFull);
            }
            core::hint::spin_loop();
        }
    }

    fn release(&self) -> Result<(), MailboxError> {
        self.permits
            .fetch_update(Ordering::Release, Ordering::Relaxed, |p| {
                if p < N {
                    Some(p + 1)
                } else {
                    None
                }
            })
            .map(|_| ())
            .map_err(|_| MailboxError::LockRelease { reply: None })
    }
}
