//! Cortex-A implementation of `MailboxHal`.
//!
//! - critical sections mask IRQ and FIQ through DAIF
//! - cache maintenance by VA, one data cache line at a time, then `dsb ish`
//! - the doorbell is a GICv3 SGI sent through `ICC_SGI1R_EL1`

use core::arch::asm;

use crate::dtb::MailboxConfig;
use crate::hal::{CriticalState, MailboxHal};
use crate::platform::{CACHE_LINE_SIZE, DOORBELL_SGI, PEER_CPU};

pub struct Aarch64Hal {
    doorbell_sgi: u8,
    peer_cpu: u8,
}

impl Aarch64Hal {
    pub const fn new(doorbell_sgi: u8, peer_cpu: u8) -> Self {
        Self { doorbell_sgi, peer_cpu }
    }

    pub const fn from_config(config: &MailboxConfig) -> Self {
        Self::new(config.doorbell_sgi, config.peer_cpu)
    }

    /// ICC_SGI1R_EL1 value targeting the peer core.
    ///
    /// INTID in bits [27:24], Aff1 in [23:16], target list (Aff0) in [15:0].
    const fn sgi1r_value(&self) -> u64 {
        let intid = (self.doorbell_sgi as u64 & 0xF) << 24;
        let aff1 = ((self.peer_cpu as u64) >> 4) << 16;
        let target = 1u64 << (self.peer_cpu & 0xF);
        intid | aff1 | target
    }
}

impl Default for Aarch64Hal {
    fn default() -> Self {
        Self::new(DOORBELL_SGI, PEER_CPU)
    }
}

/// Visit every cache line overlapping `[addr, addr + len)`.
#[inline]
fn for_each_line(addr: *const u8, len: usize, mut op: impl FnMut(usize)) {
    if len == 0 {
        return;
    }
    let start = addr as usize & !(CACHE_LINE_SIZE - 1);
    let end = addr as usize + len;
    let mut line = start;
    while line < end {
        op(line);
        line += CACHE_LINE_SIZE;
    }
}

impl MailboxHal for Aarch64Hal {
    fn enter_critical(&self) -> CriticalState {
        let daif: u64;
        unsafe {
            asm!(
                "mrs {daif}, daif",
                // I and F
                "msr daifset, #3",
                daif = out(reg) daif,
                options(nostack),
            );
        }
        daif as CriticalState
    }

    fn exit_critical(&self, state: CriticalState) {
        unsafe {
            asm!(
                "msr daif, {daif}",
                daif = in(reg) state as u64,
                options(nostack),
            );
        }
    }

    fn clean_cache(&self, addr: *const u8, len: usize) {
        for_each_line(addr, len, |line| unsafe {
            asm!("dc cvac, {line}", line = in(reg) line, options(nostack));
        });
        unsafe { asm!("dsb ish", options(nostack)) };
    }

    fn invalidate_cache(&self, addr: *const u8, len: usize) {
        // Clean+invalidate: a plain invalidate could drop unrelated dirty
        // data sharing a line with the range.
        for_each_line(addr, len, |line| unsafe {
            asm!("dc civac, {line}", line = in(reg) line, options(nostack));
        });
        unsafe { asm!("dsb ish", options(nostack)) };
    }

    fn notify_peer(&self) {
        unsafe {
            asm!(
                "dsb ish",
                "msr ICC_SGI1R_EL1, {val}",
                "isb",
                val = in(reg) self.sgi1r_value(),
                options(nostack),
            );
        }
    }
}
