//! Mailbox configuration from a flattened device tree.
//!
//! Board values default to the constants in `platform.rs`; a DTB node can
//! override them at runtime:
//!
//! ```text
//! mailbox@e000000 {
//!     compatible = "arm,ns-mailbox";
//!     reg = <0x0 0x0e000000 0x0 0x1000>;
//!     doorbell-sgi = <8>;
//!     peer-cpu = <1>;
//! };
//! ```
//!
//! The `fdt` crate parses in place, so this works before any allocator.

use log::{debug, warn};

use crate::platform;
use crate::queue::SharedQueue;

pub const MAILBOX_COMPATIBLE: &str = "arm,ns-mailbox";
pub const UART_COMPATIBLE: &str = "arm,pl011";

const FDT_MAGIC: u32 = 0xD00D_FEED;

/// Board configuration for the mailbox and its console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxConfig {
    /// Shared queue base address
    pub queue_base: usize,
    /// Shared queue region size in bytes
    pub queue_size: usize,
    /// SGI used as doorbell towards the peer
    pub doorbell_sgi: u8,
    /// Affinity-0 number of the peer core
    pub peer_cpu: u8,
    /// PL011 console base address
    pub uart_base: usize,
}

impl MailboxConfig {
    pub const fn new() -> Self {
        Self {
            queue_base: platform::MAILBOX_QUEUE_BASE,
            queue_size: platform::MAILBOX_QUEUE_SIZE,
            doorbell_sgi: platform::DOORBELL_SGI,
            peer_cpu: platform::PEER_CPU,
            uart_base: platform::UART_BASE,
        }
    }

    /// Parse a DTB blob. Properties that are absent keep their defaults;
    /// `None` only if the blob itself is unparsable.
    pub fn from_dtb(blob: &[u8]) -> Option<Self> {
        let fdt = fdt::Fdt::new(blob).ok()?;
        let mut config = Self::new();

        if let Some(node) = fdt.find_compatible(&[MAILBOX_COMPATIBLE]) {
            if let Some(reg) = node.reg().and_then(|mut regs| regs.next()) {
                config.queue_base = reg.starting_address as usize;
                if let Some(size) = reg.size {
                    config.queue_size = size;
                }
            }
            if let Some(sgi) = node.property("doorbell-sgi").and_then(|p| p.as_usize()) {
                match u8::try_from(sgi) {
                    Ok(sgi) if sgi < 16 => config.doorbell_sgi = sgi,
                    _ => warn!("dtb: doorbell-sgi {} out of range, keeping {}", sgi, config.doorbell_sgi),
                }
            }
            if let Some(cpu) = node.property("peer-cpu").and_then(|p| p.as_usize()) {
                match u8::try_from(cpu) {
                    Ok(cpu) => config.peer_cpu = cpu,
                    Err(_) => warn!("dtb: peer-cpu {} out of range", cpu),
                }
            }
        } else {
            debug!("dtb: no {} node, using defaults", MAILBOX_COMPATIBLE);
        }

        if let Some(reg) = fdt
            .find_compatible(&[UART_COMPATIBLE])
            .and_then(|node| node.reg())
            .and_then(|mut regs| regs.next())
        {
            config.uart_base = reg.starting_address as usize;
        }

        Some(config)
    }

    /// Parse the DTB at `addr`, as handed over by the boot loader.
    ///
    /// # Safety
    /// `addr` must be zero or point to readable memory holding at least a
    /// DTB header; if the magic matches, the whole blob must be readable.
    pub unsafe fn from_ptr(addr: usize) -> Option<Self> {
        if addr == 0 {
            return None;
        }
        let magic = core::ptr::read_volatile(addr as *const u32);
        if u32::from_be(magic) != FDT_MAGIC {
            return None;
        }
        let total = u32::from_be(core::ptr::read_volatile((addr + 4) as *const u32)) as usize;
        Self::from_dtb(core::slice::from_raw_parts(addr as *const u8, total))
    }

    /// Does the configured region hold a `SharedQueue<N>`?
    pub fn fits_queue<const N: usize>(&self) -> bool {
        core::mem::size_of::<SharedQueue<N>>() <= self.queue_size
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self::new()
    }
}
