use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::hal::{CriticalState, MailboxHal};

pub struct SpinLock<T> {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Sync for SpinLock<T> {}
unsafe impl<T: Send> Send for SpinLock<T> {}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    ticket: u32,
}

impl<T> SpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }

    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        SpinLockGuard { lock: self, ticket: self.acquire_ticket() }
    }

    fn acquire_ticket(&self) -> u32 {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        while self.now_serving.load(Ordering::Acquire) != ticket {
            core::hint::spin_loop(); // WFE on ARM64
        }
        ticket
    }

    fn release_ticket(&self, ticket: u32) {
        self.now_serving
            .store(ticket.wrapping_add(1), Ordering::Release);
        // SEV wakes any cores spinning in WFE-based spin loops.
        #[cfg(target_arch = "aarch64")]
        unsafe { core::arch::asm!("sev", options(nostack, nomem)) };
    }
}

impl<T> core::ops::Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> core::ops::DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release_ticket(self.ticket);
    }
}

/// Spinlock that may be taken from both thread and interrupt context.
///
/// Interrupts are masked through the HAL before the ticket is taken and
/// restored after it is released, so an ISR on the same core can never
/// spin on a lock its own interrupted thread holds. Hold it for bit
/// operations only; never suspend while holding it.
pub struct IrqSpinLock<T> {
    inner: SpinLock<T>,
}

pub struct IrqSpinLockGuard<'a, T, H: MailboxHal> {
    lock: &'a SpinLock<T>,
    ticket: u32,
    hal: &'a H,
    state: CriticalState,
    isr: bool,
}

impl<T> IrqSpinLock<T> {
    pub const fn new(data: T) -> Self {
        Self { inner: SpinLock::new(data) }
    }

    /// Lock from thread context.
    pub fn lock<'a, H: MailboxHal>(&'a self, hal: &'a H) -> IrqSpinLockGuard<'a, T, H> {
        let state = hal.enter_critical();
        IrqSpinLockGuard {
            lock: &self.inner,
            ticket: self.inner.acquire_ticket(),
            hal,
            state,
            isr: false,
        }
    }

    /// Lock from interrupt context.
    pub fn lock_isr<'a, H: MailboxHal>(&'a self, hal: &'a H) -> IrqSpinLockGuard<'a, T, H> {
        let state = hal.enter_critical_isr();
        IrqSpinLockGuard {
            lock: &self.inner,
            ticket: self.inner.acquire_ticket(),
            hal,
            state,
            isr: true,
        }
    }
}

impl<T, H: MailboxHal> core::ops::Deref for IrqSpinLockGuard<'_, T, H> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, H: MailboxHal> core::ops::DerefMut for IrqSpinLockGuard<'_, T, H> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T, H: MailboxHal> Drop for IrqSpinLockGuard<'_, T, H> {
    fn drop(&mut self) {
        self.lock.release_ticket(self.ticket);
        if self.isr {
            self.hal.exit_critical_isr(self.state);
        } else {
            self.hal.exit_critical(self.state);
        }
    }
}
