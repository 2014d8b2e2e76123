//! PSA client API over the mailbox.
//!
//! Each PSA function becomes one `client_call`. Arguments are packed into
//! the opaque parameter words; I/O vectors are passed by address, so the
//! vector descriptors and the buffers they point at are cleaned before the
//! call. Afterwards the output descriptors are invalidated and read back,
//! since the service stores in each `len` how many bytes it wrote, and the
//! output buffers are invalidated.
//!
//! | word | framework_version | version | connect | call            | close  |
//! |------|-------------------|---------|---------|-----------------|--------|
//! | 0    | -                 | sid     | sid     | handle          | handle |
//! | 1    | -                 | -       | version | packed type/len | -      |
//! | 2    | -                 | -       | -       | in_vec address  | -      |
//! | 3    | -                 | -       | -       | out_vec address | -      |

use core::fmt;

use log::warn;

use crate::error::MailboxError;
use crate::hal::MailboxHal;
use crate::lock::CallLock;
use crate::mailbox::Mailbox;
use crate::platform::{MAILBOX_PARAM_WORDS, NUM_MAILBOX_QUEUE_SLOT};
use crate::queue::ClientParams;
use crate::wait::WaitBackend;

pub const PSA_IPC_FRAMEWORK_VERSION: u32 = 1;
pub const PSA_IPC_VERSION: u32 = 2;
pub const PSA_IPC_CONNECT: u32 = 3;
pub const PSA_IPC_CALL: u32 = 4;
pub const PSA_IPC_CLOSE: u32 = 5;

pub const PSA_MAX_IOVEC: usize = 4;
pub const PSA_CALL_TYPE_MIN: i32 = i16::MIN as i32;
pub const PSA_CALL_TYPE_MAX: i32 = i16::MAX as i32;

pub const PSA_SUCCESS: i32 = 0;
pub const PSA_ERROR_PROGRAMMER_ERROR: i32 = -129;
pub const PSA_ERROR_COMMUNICATION_FAILURE: i32 = -145;

pub type PsaHandle = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsaError {
    /// Arguments rejected before any mailbox traffic.
    ProgrammerError,
    /// The mailbox could not deliver the call.
    Communication(MailboxError),
}

impl PsaError {
    pub const fn code(self) -> i32 {
        match self {
            PsaError::ProgrammerError => PSA_ERROR_PROGRAMMER_ERROR,
            PsaError::Communication(_) => PSA_ERROR_COMMUNICATION_FAILURE,
        }
    }
}

impl From<MailboxError> for PsaError {
    fn from(e: MailboxError) -> Self {
        PsaError::Communication(e)
    }
}

impl fmt::Display for PsaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsaError::ProgrammerError => f.write_str("PSA programmer error"),
            PsaError::Communication(e) => write!(f, "PSA communication failure: {}", e),
        }
    }
}

/// Input vector descriptor as seen by the peer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PsaInvec {
    pub base: usize,
    pub len: usize,
}

/// Output vector descriptor as seen by the peer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PsaOutvec {
    pub base: usize,
    pub len: usize,
}

/// Result of `PsaClient::call`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PsaCallOutput {
    /// Status returned by the service.
    pub status: i32,
    /// Bytes written by the service into each output vector. Entries past
    /// the number of output vectors are zero.
    pub out_len: [usize; PSA_MAX_IOVEC],
}

/// Pack call type and vector counts into one word: type in bits 31..16,
/// input count in 15..8, output count in 7..0.
pub const fn pack_call_params(ty: i32, in_len: usize, out_len: usize) -> u64 {
    (((ty as u32) << 16) | (((in_len as u32) & 0xFF) << 8) | ((out_len as u32) & 0xFF)) as u64
}

/// Inverse of `pack_call_params`, for the serving side.
pub const fn unpack_call_params(word: u64) -> (i32, usize, usize) {
    let word = word as u32;
    (
        (word >> 16) as u16 as i16 as i32,
        ((word >> 8) & 0xFF) as usize,
        (word & 0xFF) as usize,
    )
}

/// PSA client bound to one caller identity.
pub struct PsaClient<'a, H, W, L, const N: usize = NUM_MAILBOX_QUEUE_SLOT>
where
    H: MailboxHal,
    W: WaitBackend,
    L: CallLock,
{
    mailbox: &'a Mailbox<H, W, L, N>,
    client_id: i32,
}

impl<'a, H, W, L, const N: usize> PsaClient<'a, H, W, L, N>
where
    H: MailboxHal,
    W: WaitBackend,
    L: CallLock,
{
    pub fn new(mailbox: &'a Mailbox<H, W, L, N>, client_id: i32) -> Self {
        Self { mailbox, client_id }
    }

    pub fn client_id(&self) -> i32 {
        self.client_id
    }

    fn dispatch(&self, call_type: u32, words: &[u64]) -> Result<i32, PsaError> {
        let mut args = [0u64; MAILBOX_PARAM_WORDS];
        args[..words.len()].copy_from_slice(words);
        let params = ClientParams::new(args);
        self.mailbox
            .client_call(call_type, Some(&params), self.client_id)
            .map_err(|e| {
                warn!("psa: call type {} failed: {}", call_type, e);
                PsaError::from(e)
            })
    }

    pub fn framework_version(&self) -> Result<u32, PsaError> {
        self.dispatch(PSA_IPC_FRAMEWORK_VERSION, &[]).map(|v| v as u32)
    }

    pub fn version(&self, sid: u32) -> Result<u32, PsaError> {
        self.dispatch(PSA_IPC_VERSION, &[sid as u64]).map(|v| v as u32)
    }

    pub fn connect(&self, sid: u32, version: u32) -> Result<PsaHandle, PsaError> {
        self.dispatch(PSA_IPC_CONNECT, &[sid as u64, version as u64])
    }

    /// `psa_call`. Validates `ty` and the vector counts first.
    ///
    /// A length reported by the service larger than the buffer it refers to
    /// is clamped to the buffer size.
    pub fn call(
        &self,
        handle: PsaHandle,
        ty: i32,
        in_vecs: &[&[u8]],
        out_vecs: &mut [&mut [u8]],
    ) -> Result<PsaCallOutput, PsaError> {
        if !(PSA_CALL_TYPE_MIN..=PSA_CALL_TYPE_MAX).contains(&ty)
            || in_vecs.len() > PSA_MAX_IOVEC
            || out_vecs.len() > PSA_MAX_IOVEC
        {
            return Err(PsaError::ProgrammerError);
        }

        let hal = self.mailbox.hal();
        let mut in_desc = [PsaInvec::default(); PSA_MAX_IOVEC];
        let mut out_desc = [PsaOutvec::default(); PSA_MAX_IOVEC];

        for (desc, buf) in in_desc.iter_mut().zip(in_vecs.iter()) {
            *desc = PsaInvec { base: buf.as_ptr() as usize, len: buf.len() };
            hal.clean_cache(buf.as_ptr(), buf.len());
        }
        for (desc, buf) in out_desc.iter_mut().zip(out_vecs.iter()) {
            *desc = PsaOutvec { base: buf.as_ptr() as usize, len: buf.len() };
            hal.clean_cache(buf.as_ptr(), buf.len());
        }
        hal.clean_cache(in_desc.as_ptr() as *const u8, core::mem::size_of_val(&in_desc));
        hal.clean_cache(out_desc.as_ptr() as *const u8, core::mem::size_of_val(&out_desc));

        let out_desc_ptr = out_desc.as_mut_ptr();
        let status = self.dispatch(
            PSA_IPC_CALL,
            &[
                handle as u32 as u64,
                pack_call_params(ty, in_vecs.len(), out_vecs.len()),
                in_desc.as_ptr() as usize as u64,
                out_desc_ptr as usize as u64,
            ],
        )?;

        hal.invalidate_cache(
            out_desc_ptr as *const u8,
            core::mem::size_of::<[PsaOutvec; PSA_MAX_IOVEC]>(),
        );
        let mut output = PsaCallOutput { status, out_len: [0; PSA_MAX_IOVEC] };
        for (i, buf) in out_vecs.iter().enumerate() {
            // Written by the peer through the address passed above.
            let desc = unsafe { core::ptr::read_volatile(out_desc_ptr.add(i)) };
            if desc.len > buf.len() {
                warn!("psa: out_vec[{}] length {} exceeds buffer of {}", i, desc.len, buf.len());
            }
            output.out_len[i] = desc.len.min(buf.len());
            hal.invalidate_cache(buf.as_ptr(), buf.len());
        }
        Ok(output)
    }

    pub fn close(&self, handle: PsaHandle) -> Result<(), PsaError> {
        self.dispatch(PSA_IPC_CLOSE, &[handle as u32 as u64]).map(|_| ())
    }
}
