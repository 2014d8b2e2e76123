//! Mailbox queue: the shared slot array, its status words, and the
//! non-secure-only slot bookkeeping.
//!
//! ```text
//!   SharedQueue (peer-visible, cache maintained)      SlotTable (NS-local)
//!   ┌─────────────────────────────┐                   ┌──────────────────┐
//!   │ slots[N]: { msg, reply }    │                   │ empty_slots      │
//!   │ status: pend | replied      │                   │ meta[N]: owner,  │
//!   └─────────────────────────────┘                   │          woken   │
//!                                                     └──────────────────┘
//! ```

pub mod mask;
pub mod shared;
pub mod slots;

pub use mask::{SlotIndex, SlotMask};
pub use shared::{CrossDomain, SharedStatus, SHARED_ALIGN};
pub use slots::SlotTable;

use crate::hal::MailboxHal;
use crate::platform::{MAILBOX_PARAM_WORDS, NUM_MAILBOX_QUEUE_SLOT};

/// Opaque service-call parameter block. The mailbox never interprets it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientParams {
    pub args: [u64; MAILBOX_PARAM_WORDS],
}

impl ClientParams {
    pub const fn new(args: [u64; MAILBOX_PARAM_WORDS]) -> Self {
        Self { args }
    }
}

/// Request written by the caller.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxMsg {
    pub call_type: u32,
    pub params: ClientParams,
    pub client_id: i32,
}

/// Reply written by the peer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxReply {
    pub return_val: i32,
}

/// One request/reply unit of the queue. `msg` is written by us and `reply`
/// by the peer, so each has its own cache line.
#[repr(C)]
pub struct MailboxSlot {
    msg: CrossDomain<MailboxMsg>,
    reply: CrossDomain<MailboxReply>,
}

impl MailboxSlot {
    const EMPTY_MSG: MailboxMsg = MailboxMsg {
        call_type: 0,
        params: ClientParams { args: [0; MAILBOX_PARAM_WORDS] },
        client_id: 0,
    };

    pub const fn new() -> Self {
        Self {
            msg: CrossDomain::new(Self::EMPTY_MSG),
            reply: CrossDomain::new(MailboxReply { return_val: 0 }),
        }
    }

    /// Fill the request fields and write them back to memory.
    pub(crate) fn post<H: MailboxHal>(&self, hal: &H, msg: MailboxMsg) {
        self.msg.write(hal, msg);
    }

    pub(crate) fn reply<H: MailboxHal>(&self, hal: &H) -> i32 {
        self.reply.read(hal).return_val
    }

    /// Peer side: read the request.
    pub fn request<H: MailboxHal>(&self, hal: &H) -> MailboxMsg {
        self.msg.read(hal)
    }

    /// Peer side: store the result.
    pub fn set_reply<H: MailboxHal>(&self, hal: &H, return_val: i32) {
        self.reply.write(hal, MailboxReply { return_val });
    }

    fn reset<H: MailboxHal>(&self, hal: &H) {
        self.msg.write(hal, Self::EMPTY_MSG);
        self.reply.write(hal, MailboxReply::default());
    }
}

/// The queue placed in memory reachable from both domains.
///
/// Normally a `static` in a linker-placed section; bound to a `Mailbox`
/// once at start-up.
#[repr(C)]
pub struct SharedQueue<const N: usize = NUM_MAILBOX_QUEUE_SLOT> {
    slots: [MailboxSlot; N],
    status: SharedStatus<N>,
}

impl<const N: usize> SharedQueue<N> {
    pub const fn new() -> Self {
        let () = SlotMask::<N>::VALID;
        Self {
            slots: [const { MailboxSlot::new() }; N],
            status: SharedStatus::new(),
        }
    }

    #[inline]
    pub fn slot(&self, idx: SlotIndex) -> &MailboxSlot {
        &self.slots[idx.get()]
    }

    #[inline]
    pub fn status(&self) -> &SharedStatus<N> {
        &self.status
    }

    /// Zero every slot and both status words.
    pub(crate) fn reset<H: MailboxHal>(&self, hal: &H) {
        for slot in self.slots.iter() {
            slot.reset(hal);
        }
        self.status.reset(hal);
    }
}

impl<const N: usize> Default for SharedQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}
