//! Mailbox status codes.
//!
//! The integer values match the status words exchanged with C callers of
//! the non-secure mailbox, so `code()` can be handed straight back across
//! an FFI boundary.

use core::fmt;

pub const MAILBOX_SUCCESS: i32 = 0;
pub const MAILBOX_QUEUE_FULL: i32 = i32::MIN + 1;
pub const MAILBOX_INVAL_PARAMS: i32 = i32::MIN + 2;
pub const MAILBOX_NO_PEND_EVENT: i32 = i32::MIN + 4;
pub const MAILBOX_INIT_ERROR: i32 = i32::MIN + 7;
pub const MAILBOX_GENERIC_ERROR: i32 = i32::MIN + 8;

/// Failure of a mailbox operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    /// Call made before a queue was bound.
    NotInitialized,
    /// Missing parameter block.
    InvalidParams,
    /// No free slot, or the call serialization lock refused entry.
    QueueFull,
    /// Releasing the call serialization lock failed after the call.
    /// `reply` holds the peer's answer if one was received.
    LockRelease { reply: Option<i32> },
    /// Platform init (peer handshake) failed.
    InitError,
}

impl MailboxError {
    pub const fn code(self) -> i32 {
        match self {
            MailboxError::NotInitialized | MailboxError::InitError => MAILBOX_INIT_ERROR,
            MailboxError::InvalidParams => MAILBOX_INVAL_PARAMS,
            MailboxError::QueueFull => MAILBOX_QUEUE_FULL,
            MailboxError::LockRelease { .. } => MAILBOX_GENERIC_ERROR,
        }
    }
}

impl fmt::Display for MailboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailboxError::NotInitialized => f.write_str("mailbox queue not bound"),
            MailboxError::InvalidParams => f.write_str("invalid call parameters"),
            MailboxError::QueueFull => f.write_str("mailbox queue full"),
            MailboxError::LockRelease { reply: Some(r) } => {
                write!(f, "call lock release failed (reply {})", r)
            }
            MailboxError::LockRelease { reply: None } => f.write_str("call lock release failed"),
            MailboxError::InitError => f.write_str("mailbox platform init failed"),
        }
    }
}

/// Outcome of draining replied slots from interrupt context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// No reply was outstanding. Informational, not a fault.
    NoPendingEvent,
    /// This many owners were woken.
    Woken(usize),
}

impl DrainStatus {
    pub const fn code(self) -> i32 {
        match self {
            DrainStatus::NoPendingEvent => MAILBOX_NO_PEND_EVENT,
            DrainStatus::Woken(_) => MAILBOX_SUCCESS,
        }
    }
}
