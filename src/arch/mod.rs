//! Architecture-specific code
//!
//! Only AArch64 is supported; host builds use the `MailboxHal` trait with
//! a test implementation instead.

#[cfg(target_arch = "aarch64")]
pub mod aarch64;

#[cfg(target_arch = "aarch64")]
pub use aarch64::*;
