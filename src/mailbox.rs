//! Non-secure mailbox dispatcher.
//!
//! Turns a PSA client call into a request on the shared queue and blocks
//! the caller until the peer answers. Any number of threads may call
//! concurrently; they share the N slots of the queue.
//!
//! Per call:
//! 1. take the call serialization lock
//! 2. claim a free slot (spinlock)
//! 3. write the request, clean it to memory, record the caller as owner
//! 4. mark the slot pending and ring the doorbell (critical section)
//! 5. wait on the configured backend until the slot is replied
//! 6. read the reply, release the slot, drop the serialization lock

use log::{debug, error, trace, warn};
use spin::Once;

use crate::error::{DrainStatus, MailboxError};
use crate::hal::MailboxHal;
use crate::lock::CallLock;
use crate::platform::NUM_MAILBOX_QUEUE_SLOT;
use crate::queue::{ClientParams, MailboxMsg, SharedQueue, SlotIndex, SlotTable};
use crate::stats::{MailboxStats, StatsSnapshot};
use crate::sync::IrqSpinLock;
use crate::wait::{ReplyView, SchedulerWait, TaskScheduler, WaitBackend};

/// Mailbox context: one per shared queue, normally a `static`.
pub struct Mailbox<H, W, L, const N: usize = NUM_MAILBOX_QUEUE_SLOT>
where
    H: MailboxHal,
    W: WaitBackend,
    L: CallLock,
{
    queue: Once<&'static SharedQueue<N>>,
    slots: IrqSpinLock<SlotTable<W::Handle, N>>,
    hal: H,
    wait: W,
    lock: L,
    stats: MailboxStats,
}

impl<H, W, L, const N: usize> Mailbox<H, W, L, N>
where
    H: MailboxHal,
    W: WaitBackend,
    L: CallLock,
{
    pub const fn new(hal: H, wait: W, lock: L) -> Self {
        Self {
            queue: Once::new(),
            slots: IrqSpinLock::new(SlotTable::new()),
            hal,
            wait,
            lock,
            stats: MailboxStats::new(),
        }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn wait_backend(&self) -> &W {
        &self.wait
    }

    pub fn call_lock(&self) -> &L {
        &self.lock
    }

    /// The bound queue, if any.
    pub fn queue(&self) -> Option<&'static SharedQueue<N>> {
        self.queue.get().copied()
    }

    pub fn is_bound(&self) -> bool {
        self.queue.is_completed()
    }

    /// Bind the shared queue. The first bind wins; later binds are ignored.
    /// Returns the queue actually bound.
    pub fn bind_queue(&self, queue: &'static SharedQueue<N>) -> &'static SharedQueue<N> {
        let bound = *self.queue.call_once(|| {
            debug!("mailbox: queue bound at {:p} ({} slots)", queue, N);
            queue
        });
        if !core::ptr::eq(bound, queue) {
            debug!("mailbox: ignoring rebind to {:p}", queue);
        }
        bound
    }

    /// Bind from a raw address. Null is ignored.
    ///
    /// # Safety
    /// A non-null `queue` must point to a `SharedQueue<N>` that stays valid
    /// and is not moved for the rest of the program.
    pub unsafe fn bind_queue_ptr(&self, queue: *mut SharedQueue<N>) {
        if let Some(queue) = queue.as_ref() {
            self.bind_queue(queue);
        }
    }

    /// Reset `queue`, hand it to the peer through the HAL and bind it.
    ///
    /// Does nothing if a queue is already bound. Concurrent callers are
    /// serialized on the bind: exactly one resets and hands over its queue,
    /// the others wait for it and return. A failed platform init leaves the
    /// context unbound.
    pub fn init(&self, queue: &'static SharedQueue<N>) -> Result<(), MailboxError> {
        let bound = *self.queue.try_call_once(|| {
            queue.reset(&self.hal);
            self.slots.lock(&self.hal).reset();

            self.hal
                .init(
                    queue as *const SharedQueue<N> as usize,
                    core::mem::size_of::<SharedQueue<N>>(),
                )
                .map_err(|e| {
                    error!("mailbox: platform init failed: {}", e);
                    MailboxError::InitError
                })?;

            debug!("mailbox: queue bound at {:p} ({} slots)", queue, N);
            Ok::<_, MailboxError>(queue)
        })?;

        if !core::ptr::eq(bound, queue) {
            debug!("mailbox: init skipped, queue already bound");
        }
        Ok(())
    }

    /// Issue one service call and wait for the peer's reply.
    ///
    /// Fails without touching the queue if no queue is bound
    /// (`NotInitialized`), `params` is missing (`InvalidParams`), or the
    /// serialization lock or slot pool has no room (`QueueFull`).
    pub fn client_call(
        &self,
        call_type: u32,
        params: Option<&ClientParams>,
        client_id: i32,
    ) -> Result<i32, MailboxError> {
        let queue = self.queue().ok_or(MailboxError::NotInitialized)?;
        let params = params.ok_or(MailboxError::InvalidParams)?;

        if self.lock.acquire().is_err() {
            return Err(MailboxError::QueueFull);
        }

        let result = self
            .tx_client_req(queue, call_type, params, client_id)
            .map(|idx| {
                self.wait_reply(queue, idx);
                self.rx_client_reply(queue, idx)
            });

        if let Err(e) = self.lock.release() {
            error!("mailbox: call lock release failed: {}", e);
            return Err(MailboxError::LockRelease { reply: result.ok() });
        }

        result
    }

    fn tx_client_req(
        &self,
        queue: &SharedQueue<N>,
        call_type: u32,
        params: &ClientParams,
        client_id: i32,
    ) -> Result<SlotIndex, MailboxError> {
        let (idx, used) = {
            let mut slots = self.slots.lock(&self.hal);
            let idx = slots.acquire_empty_slot();
            (idx, slots.used())
        };
        let Some(idx) = idx else {
            warn!("mailbox: no free slot for client {}", client_id);
            return Err(MailboxError::QueueFull);
        };
        self.stats.record_tx(used);

        queue.slot(idx).post(
            &self.hal,
            MailboxMsg {
                call_type,
                params: *params,
                client_id,
            },
        );

        // The owner must be recorded before the peer can possibly reply.
        let owner = self.wait.current_handle();
        self.slots.lock(&self.hal).set_owner(idx, owner);

        let cs = self.hal.enter_critical();
        queue.status().mark_pending(&self.hal, idx);
        self.hal.notify_peer();
        self.hal.exit_critical(cs);

        trace!("mailbox: {:?} pending, call_type {} client {}", idx, call_type, client_id);
        Ok(idx)
    }

    fn wait_reply(&self, queue: &SharedQueue<N>, idx: SlotIndex) {
        let view = ReplyView {
            hal: &self.hal,
            queue,
            slots: &self.slots,
        };
        self.wait.wait_reply(&view, idx);
    }

    fn rx_client_reply(&self, queue: &SharedQueue<N>, idx: SlotIndex) -> i32 {
        let reply = queue.slot(idx).reply(&self.hal);
        self.slots.lock(&self.hal).release_slot(idx);
        trace!("mailbox: {:?} released, reply {}", idx, reply);
        reply
    }

    /// Run `f` on the slot table under the slot spinlock.
    pub fn inspect_slots<R>(&self, f: impl FnOnce(&SlotTable<W::Handle, N>) -> R) -> R {
        let slots = self.slots.lock(&self.hal);
        f(&*slots)
    }

    /// Number of slots currently owned by callers.
    pub fn used_slots(&self) -> usize {
        self.inspect_slots(|slots| slots.used())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl<H, S, L, const N: usize> Mailbox<H, SchedulerWait<S>, L, N>
where
    H: MailboxHal,
    S: TaskScheduler,
    L: CallLock,
{
    /// Reply interrupt handler: wake the owner of every replied slot.
    ///
    /// Each replied bit is taken exactly once, so each reply wakes exactly
    /// one caller. Must be called from interrupt context (or with the
    /// equivalent guarantees on a host). Nothing on this path logs; a reply
    /// with no owner is only counted in the stats.
    pub fn wake_reply_owner_isr(&self) -> Result<DrainStatus, MailboxError> {
        let queue = self.queue().ok_or(MailboxError::NotInitialized)?;

        let cs = self.hal.enter_critical_isr();
        let replied = queue.status().take_all_replied(&self.hal);
        self.hal.exit_critical_isr(cs);

        if replied.is_empty() {
            return Ok(DrainStatus::NoPendingEvent);
        }

        let mut woken = 0;
        for idx in replied.iter() {
            let owner = {
                let mut slots = self.slots.lock_isr(&self.hal);
                let owner = slots.owner(idx).cloned();
                // A free slot must not carry a stale wake into its next call.
                if owner.is_some() {
                    slots.set_woken(idx);
                }
                owner
            };
            match owner {
                Some(task) => {
                    self.wait.scheduler().wake_task_isr(&task);
                    woken += 1;
                }
                None => self.stats.record_orphan_reply(),
            }
        }
        Ok(DrainStatus::Woken(woken))
    }
}
