//! Reply wait/wake backends.
//!
//! A slot goes `PENDING -> REPLIED -> CONSUMED`. Both backends observe the
//! same transitions and differ only in how the caller waits for REPLIED:
//!
//! - `SpinWait`: no scheduler. The caller polls `replied_slots` inside a
//!   short critical section; clearing its own bit is the acknowledgement.
//! - `SchedulerWait`: the caller sleeps on its scheduler. An interrupt
//!   handler (`Mailbox::wake_reply_owner_isr`) drains `replied_slots`, sets
//!   the slot's private woken flag and wakes the recorded owner. The caller
//!   re-checks the woken flag after every wakeup because the scheduler's
//!   wait primitive may be shared with unrelated events.

use crate::hal::MailboxHal;
use crate::queue::{SharedQueue, SlotIndex, SlotTable};
use crate::sync::IrqSpinLock;

/// What a waiting caller may look at while it waits on its own slot.
pub struct ReplyView<'a, H: MailboxHal, T, const N: usize> {
    pub(crate) hal: &'a H,
    pub(crate) queue: &'a SharedQueue<N>,
    pub(crate) slots: &'a IrqSpinLock<SlotTable<T, N>>,
}

impl<H: MailboxHal, T, const N: usize> ReplyView<'_, H, T, N> {
    /// Spin backend: has the peer replied on `idx`? Clears the bit if so.
    pub fn poll_replied(&self, idx: SlotIndex) -> bool {
        let cs = self.hal.enter_critical();
        let replied = self.queue.status().take_replied(self.hal, idx);
        self.hal.exit_critical(cs);
        replied
    }

    /// Scheduler backend: was the owner of `idx` woken for its reply?
    /// Clears the flag if so.
    pub fn take_woken(&self, idx: SlotIndex) -> bool {
        self.slots.lock(self.hal).take_woken(idx)
    }
}

pub trait WaitBackend {
    /// Identity recorded as slot owner, used to wake the caller.
    type Handle: Clone + Send;

    fn current_handle(&self) -> Self::Handle;

    /// Return once the reply on `idx` is ready to be read.
    fn wait_reply<H: MailboxHal, const N: usize>(
        &self,
        view: &ReplyView<'_, H, Self::Handle, N>,
        idx: SlotIndex,
    );
}

/// Pure polling backend for environments without a scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinWait;

impl WaitBackend for SpinWait {
    type Handle = ();

    fn current_handle(&self) -> Self::Handle {}

    fn wait_reply<H: MailboxHal, const N: usize>(
        &self,
        view: &ReplyView<'_, H, (), N>,
        idx: SlotIndex,
    ) {
        while !view.poll_replied(idx) {
            core::hint::spin_loop();
        }
    }
}

/// Host scheduler hooks needed by `SchedulerWait`.
pub trait TaskScheduler {
    type Task: Clone + Send;

    /// Handle of the calling thread.
    fn current_task(&self) -> Self::Task;
    /// Block the calling thread until woken. May return spuriously.
    fn wait_reply(&self);
    /// Wake `task`. Called from interrupt context.
    fn wake_task_isr(&self, task: &Self::Task);
}

/// Scheduler-integrated backend: sleep until the reply ISR wakes us.
pub struct SchedulerWait<S: TaskScheduler> {
    sched: S,
}

impl<S: TaskScheduler> SchedulerWait<S> {
    pub const fn new(sched: S) -> Self {
        Self { sched }
    }

    pub fn scheduler(&self) -> &S {
        &self.sched
    }
}

impl<S: TaskScheduler> WaitBackend for SchedulerWait<S> {
    type Handle = S::Task;

    fn current_handle(&self) -> S::Task {
        self.sched.current_task()
    }

    fn wait_reply<H: MailboxHal, const N: usize>(
        &self,
        view: &ReplyView<'_, H, S::Task, N>,
        idx: SlotIndex,
    ) {
        loop {
            self.sched.wait_reply();
            if view.take_woken(idx) {
                return;
            }
        }
    }
}
