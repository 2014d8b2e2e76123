//! PL011 UART console
//!
//! Transmit-only. The base address is set at runtime (from `MailboxConfig`)
//! and stays zero until then; writes to an unconfigured console are
//! dropped, so logging is harmless before bring-up.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// PL011 register offsets
const UART_DR: usize = 0x00; // Data Register
const UART_FR: usize = 0x18; // Flag Register

/// Flag Register bits
const UART_FR_TXFF: u32 = 1 << 5; // Transmit FIFO full

static UART_BASE: AtomicUsize = AtomicUsize::new(0);

/// Point the console at the PL011 at `base`. Zero disables output.
pub fn init(base: usize) {
    UART_BASE.store(base, Ordering::Release);
}

pub fn base() -> usize {
    UART_BASE.load(Ordering::Acquire)
}

pub fn is_enabled() -> bool {
    base() != 0
}

/// PL011 transmitter at a fixed base
pub struct Uart {
    base: usize,
}

impl Uart {
    const fn new(base: usize) -> Self {
        Self { base }
    }

    /// Write a byte, waiting for FIFO space
    pub fn putc(&self, c: u8) {
        while self.read_reg(UART_FR) & UART_FR_TXFF != 0 {
            core::hint::spin_loop();
        }
        self.write_reg(UART_DR, c as u32);
    }

    pub fn puts(&self, s: &str) {
        for byte in s.bytes() {
            self.putc(byte);
        }
    }

    #[inline]
    fn read_reg(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    #[inline]
    fn write_reg(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }
}

/// Formatting sink for the configured console
pub fn writer() -> UartWriter {
    UartWriter
}

pub struct UartWriter;

impl fmt::Write for UartWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let base = base();
        if base != 0 {
            Uart::new(base).puts(s);
        }
        Ok(())
    }
}
