//! Non-secure side of a multi-core PSA mailbox.
//!
//! Callers on the non-secure core issue service calls through a queue of
//! slots in memory shared with the secure core. See `mailbox` for the call
//! path, `wait` for the two ways a caller can wait for its reply, and
//! `stub_peer` for a simulated secure side.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod dtb;
pub mod error;
pub mod hal;
pub mod lock;
pub mod logging;
pub mod mailbox;
pub mod platform;
pub mod psa;
pub mod queue;
pub mod stats;
pub mod stub_peer;
pub mod sync;
pub mod uart;
pub mod wait;

pub use dtb::MailboxConfig;
pub use error::{DrainStatus, MailboxError};
pub use hal::{CriticalState, MailboxHal};
pub use lock::{CallLock, ExclusiveLock, SlotSemaphore};
pub use mailbox::Mailbox;
pub use queue::{ClientParams, MailboxMsg, MailboxReply, SharedQueue, SlotIndex, SlotMask};
pub use stats::StatsSnapshot;
pub use stub_peer::StubPeer;
pub use wait::{SchedulerWait, SpinWait, TaskScheduler, WaitBackend};
