//! Host-side fixtures shared by the integration tests.
//!
//! `HostHal` stands in for the Cortex-A HAL and can record every cache
//! operation and doorbell, `ThreadScheduler` maps the scheduler hooks onto
//! `std::thread` park/unpark, and `spawn_peer` runs a `StubPeer` loop.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread::{self, Thread};
use std::time::Duration;

use ns_mailbox::queue::SharedQueue;
use ns_mailbox::{CriticalState, MailboxError, MailboxHal, MailboxMsg, SlotIndex, StubPeer, TaskScheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalEvent {
    Clean { addr: usize, len: usize },
    Invalidate { addr: usize, len: usize },
    Doorbell,
}

/// Host HAL. Interrupts do not exist here, so critical sections only
/// track nesting depth.
pub struct HostHal {
    recording: AtomicBool,
    events: Mutex<Vec<HalEvent>>,
    doorbells: AtomicUsize,
    critical_depth: AtomicUsize,
    fail_init: bool,
    init_delay: Duration,
    init_calls: AtomicUsize,
    init_args: Mutex<Option<(usize, usize)>>,
}

impl HostHal {
    pub fn new() -> Self {
        Self {
            recording: AtomicBool::new(false),
            events: Mutex::new(Vec::new()),
            doorbells: AtomicUsize::new(0),
            critical_depth: AtomicUsize::new(0),
            fail_init: false,
            init_delay: Duration::ZERO,
            init_calls: AtomicUsize::new(0),
            init_args: Mutex::new(None),
        }
    }

    pub fn recording() -> Self {
        let hal = Self::new();
        hal.recording.store(true, Ordering::SeqCst);
        hal
    }

    pub fn failing_init() -> Self {
        Self { fail_init: true, ..Self::new() }
    }

    /// Platform init that takes `delay` before accepting the queue.
    pub fn slow_init(delay: Duration) -> Self {
        Self { init_delay: delay, ..Self::new() }
    }

    pub fn set_recording(&self, on: bool) {
        self.recording.store(on, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<HalEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn doorbells(&self) -> usize {
        self.doorbells.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn init_args(&self) -> Option<(usize, usize)> {
        *self.init_args.lock().unwrap()
    }

    fn record(&self, event: HalEvent) {
        if self.recording.load(Ordering::SeqCst) {
            self.events.lock().unwrap().push(event);
        }
    }
}

impl MailboxHal for HostHal {
    fn enter_critical(&self) -> CriticalState {
        self.critical_depth.fetch_add(1, Ordering::SeqCst)
    }

    fn exit_critical(&self, _state: CriticalState) {
        self.critical_depth.fetch_sub(1, Ordering::SeqCst);
    }

    fn clean_cache(&self, addr: *const u8, len: usize) {
        self.record(HalEvent::Clean { addr: addr as usize, len });
    }

    fn invalidate_cache(&self, addr: *const u8, len: usize) {
        self.record(HalEvent::Invalidate { addr: addr as usize, len });
    }

    fn notify_peer(&self) {
        self.doorbells.fetch_add(1, Ordering::SeqCst);
        self.record(HalEvent::Doorbell);
    }

    fn init(&self, queue_addr: usize, queue_len: usize) -> Result<(), MailboxError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.init_delay);
        if self.fail_init {
            return Err(MailboxError::InitError);
        }
        *self.init_args.lock().unwrap() = Some((queue_addr, queue_len));
        Ok(())
    }
}

/// `TaskScheduler` over OS threads.
pub struct ThreadScheduler {
    wakes: AtomicUsize,
}

impl ThreadScheduler {
    pub const fn new() -> Self {
        Self { wakes: AtomicUsize::new(0) }
    }

    pub fn wakes(&self) -> usize {
        self.wakes.load(Ordering::SeqCst)
    }
}

impl TaskScheduler for ThreadScheduler {
    type Task = Thread;

    fn current_task(&self) -> Thread {
        thread::current()
    }

    fn wait_reply(&self) {
        thread::park();
    }

    fn wake_task_isr(&self, task: &Thread) {
        self.wakes.fetch_add(1, Ordering::SeqCst);
        task.unpark();
    }
}

/// A fresh queue with static lifetime, as if placed by the linker.
pub fn leak_queue<const N: usize>() -> &'static SharedQueue<N> {
    Box::leak(Box::new(SharedQueue::new()))
}

pub fn params(first: u64) -> ns_mailbox::ClientParams {
    ns_mailbox::ClientParams::new([first, 0, 0, 0, 0, 0])
}

/// Serve `queue` with `f` until `stop` is set. `after_serve` runs after
/// every batch that answered at least one request (the reply interrupt).
pub fn run_peer<const N: usize>(
    queue: &SharedQueue<N>,
    stop: &AtomicBool,
    mut f: impl FnMut(SlotIndex, &MailboxMsg) -> i32,
    mut after_serve: impl FnMut(),
) {
    let hal = HostHal::new();
    let peer = StubPeer::new(queue, &hal);
    while !stop.load(Ordering::SeqCst) {
        if peer.serve(&mut f) > 0 {
            after_serve();
        } else {
            thread::yield_now();
        }
    }
}

/// Spin until `cond` holds.
pub fn wait_until(mut cond: impl FnMut() -> bool) {
    while !cond() {
        thread::yield_now();
    }
}
