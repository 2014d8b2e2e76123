//! Platform/Board Constants
//!
//! All board-specific addresses and sizes live here so they can be
//! changed in one place when targeting a different platform. Runtime
//! values discovered from the device tree (see `dtb.rs`) fall back to
//! these.

// ── Mailbox queue ────────────────────────────────────────────────────
/// Number of communication slots in the shared queue.
pub const NUM_MAILBOX_QUEUE_SLOT: usize = 4;
/// Opaque parameter block size, in 64-bit words.
pub const MAILBOX_PARAM_WORDS: usize = 6;

// ── Cache ────────────────────────────────────────────────────────────
/// Data cache line size used for maintenance by VA (Cortex-A class).
pub const CACHE_LINE_SIZE: usize = 64;

// ── Shared memory (QEMU virt, top of secure-visible RAM) ─────────────
pub const MAILBOX_QUEUE_BASE: usize = 0x0E00_0000;
pub const MAILBOX_QUEUE_SIZE: usize = 0x1000;

// ── Doorbell (GICv3 SGI to the peer core) ────────────────────────────
pub const DOORBELL_SGI: u8 = 8;
pub const PEER_CPU: u8 = 1;

// ── Console ──────────────────────────────────────────────────────────
pub const UART_BASE: usize = 0x0900_0000;
