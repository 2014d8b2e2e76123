//! Platform seam for the non-secure mailbox.
//!
//! The mailbox core never touches hardware directly. Interrupt masking,
//! cache maintenance on the shared queue and the doorbell to the peer all
//! go through this trait, so the same dispatcher runs on a Cortex-A core
//! (`arch::aarch64::Aarch64Hal`) or inside host tests.

use crate::error::MailboxError;

/// Saved interrupt state returned by `enter_critical*`.
pub type CriticalState = usize;

pub trait MailboxHal {
    /// Mask local interrupts, returning the previous state.
    fn enter_critical(&self) -> CriticalState;
    fn exit_critical(&self, state: CriticalState);

    /// Critical section entry from interrupt context.
    fn enter_critical_isr(&self) -> CriticalState {
        self.enter_critical()
    }
    fn exit_critical_isr(&self, state: CriticalState) {
        self.exit_critical(state)
    }

    /// Write back `len` bytes at `addr` so the peer observes them.
    fn clean_cache(&self, addr: *const u8, len: usize);
    /// Discard cached copies of `len` bytes at `addr` before reading
    /// data the peer may have written.
    fn invalidate_cache(&self, addr: *const u8, len: usize);

    /// One-way doorbell: tell the peer new work is pending.
    fn notify_peer(&self);

    /// Hand the queue location to the peer. Called once from `Mailbox::init`.
    fn init(&self, _queue_addr: usize, _queue_len: usize) -> Result<(), MailboxError> {
        Ok(())
    }
}
