//! Stub peer: simulates the secure side of the mailbox.
//!
//! Reads pending requests and posts replies through the same shared queue
//! the real peer would use, with the same cache discipline. Never touches
//! the non-secure slot table. Used by host tests and for board bring-up
//! before the secure firmware is available.

use log::trace;

use crate::hal::MailboxHal;
use crate::platform::NUM_MAILBOX_QUEUE_SLOT;
use crate::queue::{MailboxMsg, SharedQueue, SlotIndex, SlotMask};

pub struct StubPeer<'a, H: MailboxHal, const N: usize = NUM_MAILBOX_QUEUE_SLOT> {
    queue: &'a SharedQueue<N>,
    hal: &'a H,
}

impl<'a, H: MailboxHal, const N: usize> StubPeer<'a, H, N> {
    pub fn new(queue: &'a SharedQueue<N>, hal: &'a H) -> Self {
        Self { queue, hal }
    }

    /// Collect every pending request, clearing the pending word.
    pub fn take_pending(&self) -> SlotMask<N> {
        self.queue.status().take_pending(self.hal)
    }

    pub fn read_request(&self, idx: SlotIndex) -> MailboxMsg {
        self.queue.slot(idx).request(self.hal)
    }

    /// Store `value` as the reply for `idx`, then mark the slot replied.
    pub fn post_reply(&self, idx: SlotIndex, value: i32) {
        self.queue.slot(idx).set_reply(self.hal, value);
        self.queue.status().mark_replied(self.hal, idx);
        trace!("stub peer: replied {} on {:?}", value, idx);
    }

    /// Answer every currently pending request with `f`. Returns how many
    /// requests were served.
    pub fn serve(&self, mut f: impl FnMut(SlotIndex, &MailboxMsg) -> i32) -> usize {
        let pending = self.take_pending();
        for idx in pending.iter() {
            let msg = self.read_request(idx);
            let value = f(idx, &msg);
            self.post_reply(idx, value);
        }
        pending.count()
    }
}
