//! AArch64 support: the Cortex-A mailbox HAL.

pub mod hal;

pub use hal::Aarch64Hal;
