//! Transmit statistics.
//!
//! Every published request bumps the transmit count and adds the number of
//! slots occupied at that moment, which gives the average queue pressure
//! seen by callers. Replies that arrive on a slot with no recorded owner
//! are counted too; the reply interrupt cannot log them.

use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

pub struct MailboxStats {
    nr_tx: AtomicU32,
    nr_used_slots: AtomicU64,
    nr_orphan_replies: AtomicU32,
}

/// Averages over the transmits recorded since the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub nr_tx: u32,
    /// Integer part of the average occupied-slot count.
    pub avg_nr_slots: u32,
    /// First decimal digit of the average occupied-slot count.
    pub avg_nr_slots_tenths: u32,
    /// Replies drained for a slot nobody was waiting on.
    pub nr_orphan_replies: u32,
}

impl MailboxStats {
    pub const fn new() -> Self {
        Self {
            nr_tx: AtomicU32::new(0),
            nr_used_slots: AtomicU64::new(0),
            nr_orphan_replies: AtomicU32::new(0),
        }
    }

    pub(crate) fn record_tx(&self, used_slots: usize) {
        self.nr_tx.fetch_add(1, Ordering::Relaxed);
        self.nr_used_slots.fetch_add(used_slots as u64, Ordering::Relaxed);
    }

    /// Safe to call from interrupt context.
    pub(crate) fn record_orphan_reply(&self) {
        self.nr_orphan_replies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.nr_tx.store(0, Ordering::Relaxed);
        self.nr_used_slots.store(0, Ordering::Relaxed);
        self.nr_orphan_replies.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let nr_tx = self.nr_tx.load(Ordering::Relaxed);
        let used = self.nr_used_slots.load(Ordering::Relaxed);
        let nr_orphan_replies = self.nr_orphan_replies.load(Ordering::Relaxed);
        if nr_tx == 0 {
            return StatsSnapshot { nr_orphan_replies, ..StatsSnapshot::default() };
        }
        let avg_x10 = used.saturating_mul(10) / nr_tx as u64;
        StatsSnapshot {
            nr_tx,
            avg_nr_slots: (avg_x10 / 10) as u32,
            avg_nr_slots_tenths: (avg_x10 % 10) as u32,
            nr_orphan_replies,
        }
    }
}

impl Default for MailboxStats {
    fn default() -> Self {
        Self::new()
    }
}
