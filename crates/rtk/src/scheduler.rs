//! The kernel scheduler singleton.
//!
//! Process-wide scheduling state: the thread registry, the ready queue
//! (priority descending, FIFO among equals), and the terminated-threads
//! list drained by the idle thread. All of it lives in critical-section
//! cells and is mutated only under a section, because interrupt handlers
//! reach into it through `wakeup` and `sig_raise`.
//!
//! On the hosted port the ready queue does not drive preemption - the OS
//! schedules the carrier threads - but it is maintained exactly as a
//! bare-metal port would, and [`SchedulerConfig`] controls the idle thread the same
//! way.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use critical_section::{CriticalSection as Token, Mutex};
use rtk_core::{Error, Priority, Result};

use crate::idle;
use crate::port;
use crate::thread::{self, Thread, ThreadInner};
use crate::trace::{self, records};

/// Whether the caller is executing in handler (interrupt) mode.
pub fn in_handler_mode() -> bool {
    port::in_handler_mode()
}

/// Scheduler start-up configuration.
///
/// ```
/// use rtk::scheduler;
///
/// scheduler::start(scheduler::SchedulerConfig::new().with_idle_stack_size(32 * 1024))
///     .expect("scheduler start");
/// ```
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Stack size for the idle thread, in bytes.
    pub idle_stack_size_bytes: usize,
    /// When set, the idle thread drops one step below [`Priority::IDLE`],
    /// so that application threads created at the idle level still outrank
    /// it.
    pub idle_priority_below_idle: bool,
}

impl SchedulerConfig {
    pub fn new() -> Self {
        Self {
            idle_stack_size_bytes: 16 * 1024,
            idle_priority_below_idle: false,
        }
    }

    pub fn with_idle_stack_size(mut self, bytes: usize) -> Self {
        self.idle_stack_size_bytes = bytes;
        self
    }

    pub fn with_idle_priority_below_idle(mut self, below: bool) -> Self {
        self.idle_priority_below_idle = below;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Ready threads ordered by priority descending, FIFO among equals.
///
/// The priority is captured at insertion time; a priority change is
/// observed at the next scheduling decision, not retroactively.
pub(crate) struct ReadyQueue {
    entries: Vec<(Priority, Arc<ThreadInner>)>,
}

impl ReadyQueue {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Enqueues a thread behind all entries of the same or higher priority.
    pub(crate) fn insert(&mut self, prio: Priority, thread: Arc<ThreadInner>) {
        if self.contains(&thread) {
            return;
        }
        let at = self
            .entries
            .iter()
            .position(|(p, _)| *p < prio)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, (prio, thread));
    }

    pub(crate) fn remove(&mut self, thread: &Arc<ThreadInner>) {
        self.entries.retain(|(_, t)| !Arc::ptr_eq(t, thread));
    }

    pub(crate) fn contains(&self, thread: &Arc<ThreadInner>) -> bool {
        self.entries.iter().any(|(_, t)| Arc::ptr_eq(t, thread))
    }

    /// The thread the scheduler would pick next.
    pub(crate) fn head(&self) -> Option<&Arc<ThreadInner>> {
        self.entries.first().map(|(_, t)| t)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

struct SchedulerInner {
    registry: Vec<Arc<ThreadInner>>,
    ready: ReadyQueue,
    terminated: VecDeque<Arc<ThreadInner>>,
    idle: Option<Arc<ThreadInner>>,
    started: bool,
}

static SCHEDULER: Mutex<RefCell<SchedulerInner>> = Mutex::new(RefCell::new(SchedulerInner {
    registry: Vec::new(),
    ready: ReadyQueue::new(),
    terminated: VecDeque::new(),
    idle: None,
    started: false,
}));

/// Starts the scheduler services: spawns the idle thread, which reaps
/// terminated threads and sleeps the CPU between cycles.
///
/// Idempotent; not callable from handler mode.
pub fn start(config: SchedulerConfig) -> Result<()> {
    if in_handler_mode() {
        return Err(Error::NotPermitted);
    }
    let already = critical_section::with(|cs| {
        let mut inner = SCHEDULER.borrow_ref_mut(cs);
        let already = inner.started;
        inner.started = true;
        already
    });
    if already {
        return Ok(());
    }

    let below = config.idle_priority_below_idle;
    // Created at the default priority; the idle entry drops itself to the
    // idle level (or one below) before entering its loop.
    let idle_thread = Thread::new(
        thread::ThreadAttributes::new("idle").with_stack_size(config.idle_stack_size_bytes),
        move || idle::run(below),
    );
    critical_section::with(|cs| {
        SCHEDULER.borrow_ref_mut(cs).idle = Some(idle_thread.inner().clone());
    });
    trace::emit(records::SCHED_START, b"idle");
    Ok(())
}

/// Whether [`start`] has been called.
pub fn is_started() -> bool {
    critical_section::with(|cs| SCHEDULER.borrow_ref(cs).started)
}

/// Number of registered threads (including adopted and idle threads).
pub fn thread_count() -> usize {
    critical_section::with(|cs| SCHEDULER.borrow_ref(cs).registry.len())
}

/// Number of threads currently on the ready queue.
pub fn ready_count() -> usize {
    critical_section::with(|cs| SCHEDULER.borrow_ref(cs).ready.len())
}

/// The ready thread the scheduler would dispatch next, if any.
pub fn next_ready() -> Option<Thread> {
    critical_section::with(|cs| {
        SCHEDULER
            .borrow_ref(cs)
            .ready
            .head()
            .cloned()
            .map(Thread::from_inner)
    })
}

pub(crate) fn register(cs: Token<'_>, thread: &Arc<ThreadInner>) {
    SCHEDULER.borrow_ref_mut(cs).registry.push(thread.clone());
}

pub(crate) fn unregister(cs: Token<'_>, thread: &Arc<ThreadInner>) {
    let mut inner = SCHEDULER.borrow_ref_mut(cs);
    inner.registry.retain(|t| !Arc::ptr_eq(t, thread));
    inner.ready.remove(thread);
}

pub(crate) fn ready_insert(cs: Token<'_>, prio: Priority, thread: Arc<ThreadInner>) {
    SCHEDULER.borrow_ref_mut(cs).ready.insert(prio, thread);
}

pub(crate) fn ready_remove(cs: Token<'_>, thread: &Arc<ThreadInner>) {
    SCHEDULER.borrow_ref_mut(cs).ready.remove(thread);
}

/// Appends a terminated thread to the reaper list and wakes the idle
/// thread, the hosted stand-in for the interrupt that would otherwise
/// resume it.
pub(crate) fn note_terminated(thread: Arc<ThreadInner>) {
    let idle = critical_section::with(|cs| {
        let mut inner = SCHEDULER.borrow_ref_mut(cs);
        inner.terminated.push_back(thread);
        inner.idle.clone()
    });
    if let Some(idle) = idle {
        idle.unpark();
    }
}

pub(crate) fn take_terminated() -> Option<Arc<ThreadInner>> {
    critical_section::with(|cs| SCHEDULER.borrow_ref_mut(cs).terminated.pop_front())
}
