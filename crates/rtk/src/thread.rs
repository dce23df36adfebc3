//! Threads: lifecycle, signal-flag mailbox, and the blocking verbs.
//!
//! A [`Thread`] is a cheaply cloneable handle to a kernel thread. The
//! lifecycle follows the classic state machine: created `Ready`, picked to
//! `Running`, parked to `Suspended` by the blocking verbs, woken back to
//! `Ready`, and finally `Terminated` when the entry function returns or the
//! thread exits - the two are indistinguishable because the entry runs
//! under a proxy that turns its return value into an exit. The idle thread
//! reaps `Terminated` threads into `Destroyed`.
//!
//! Every thread carries a signal-flag mailbox, the simplest wait
//! primitive: raisers OR bits in (ISR-safe), waiters AND bits out. All
//! blocking primitives reduce to `suspend` on the calling thread plus a
//! `wakeup` from another thread or an interrupt handler, with the wakeup
//! reason distinguishing completion, cancellation and timeout.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use critical_section::{CriticalSection as Token, Mutex};
use rtk_core::signal::{SIG_ERROR, SIG_NONE};
use rtk_core::{Error, Priority, Result, SigSet, ThreadState, Tick, WaitMode, WakeReason};

use crate::clock::{self, Deadline};
use crate::port::{self, Parker};
use crate::scheduler;
use crate::trace::{self, records};

/// Opaque thread exit value, delivered to the joiner.
pub type ExitValue = Box<dyn Any + Send>;

/// Default carrier stack size when the attributes do not specify one.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Panic payload used by [`this_thread::exit`] to unwind to the entry proxy.
struct ExitRequest(ExitValue);

/// Thread creation attributes: name, priority and stack size.
///
/// ```
/// use rtk::thread::ThreadAttributes;
/// use rtk::Priority;
///
/// let attr = ThreadAttributes::new("worker")
///     .with_priority(Priority::HIGH)
///     .with_stack_size(128 * 1024);
/// # let _ = attr;
/// ```
#[derive(Debug, Clone)]
pub struct ThreadAttributes {
    name: String,
    priority: Priority,
    stack_size_bytes: usize,
}

impl ThreadAttributes {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: Priority::NORMAL,
            stack_size_bytes: DEFAULT_STACK_SIZE,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size_bytes = bytes;
        self
    }
}

impl Default for ThreadAttributes {
    fn default() -> Self {
        Self::new("-")
    }
}

/// Mutable thread state; lives in a critical-section cell.
pub(crate) struct ThreadControl {
    state: ThreadState,
    prio: Priority,
    sig_mask: SigSet,
    wake_reason: WakeReason,
    interrupted: bool,
    exit_value: Option<ExitValue>,
    joiner: Option<Arc<ThreadInner>>,
    detached: bool,
    enrolled: bool,
}

/// The shared thread control block.
pub(crate) struct ThreadInner {
    name: String,
    pub(crate) parker: Parker,
    ctrl: Mutex<RefCell<ThreadControl>>,
}

impl ThreadInner {
    fn with_state(name: &str, prio: Priority, state: ThreadState) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            parker: Parker::new(),
            ctrl: Mutex::new(RefCell::new(ThreadControl {
                state,
                prio,
                sig_mask: SIG_NONE,
                wake_reason: WakeReason::Normal,
                interrupted: false,
                exit_value: None,
                joiner: None,
                detached: false,
                enrolled: false,
            })),
        })
    }

    /// A control block outside the registry; used for foreign-thread
    /// adoption and scheduler unit tests.
    pub(crate) fn bare(name: &str, prio: Priority) -> Arc<Self> {
        Self::with_state(name, prio, ThreadState::Running)
    }

    /// Registers the calling OS thread as a kernel thread.
    fn adopt() -> Arc<Self> {
        let os = std::thread::current();
        let inner = Self::bare(os.name().unwrap_or("-"), Priority::NORMAL);
        critical_section::with(|cs| scheduler::register(cs, &inner));
        inner
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn state(&self) -> ThreadState {
        critical_section::with(|cs| self.ctrl.borrow_ref(cs).state)
    }

    pub(crate) fn unpark(&self) {
        self.parker.unpark();
    }

    /// Marks the thread ready with the given reason and delivers the wakeup
    /// permit. The only path by which a suspended thread becomes ready.
    pub(crate) fn wake_locked(
        self: &Arc<Self>,
        cs: Token<'_>,
        ctrl: &mut ThreadControl,
        reason: WakeReason,
    ) {
        ctrl.wake_reason = reason;
        if ctrl.state == ThreadState::Suspended {
            ctrl.state = ThreadState::Ready;
            scheduler::ready_insert(cs, ctrl.prio, self.clone());
        }
        self.parker.unpark();
    }

    pub(crate) fn wake(self: &Arc<Self>, reason: WakeReason) {
        critical_section::with(|cs| {
            let mut ctrl = self.ctrl.borrow_ref_mut(cs);
            self.wake_locked(cs, &mut ctrl, reason);
        });
    }

    /// Suspends the calling thread until a wakeup arrives.
    pub(crate) fn suspend_current(self: &Arc<Self>) {
        debug_assert!(!port::in_handler_mode());
        critical_section::with(|cs| {
            let mut ctrl = self.ctrl.borrow_ref_mut(cs);
            ctrl.state = ThreadState::Suspended;
            scheduler::ready_remove(cs, self);
        });
        trace::emit(records::THREAD_SUSPEND, self.name.as_bytes());
        self.parker.park();
        self.resume_running();
    }

    /// Timed suspension; returns `true` if woken, `false` on timeout.
    pub(crate) fn suspend_timed(self: &Arc<Self>, timeout: Duration) -> bool {
        debug_assert!(!port::in_handler_mode());
        critical_section::with(|cs| {
            let mut ctrl = self.ctrl.borrow_ref_mut(cs);
            ctrl.state = ThreadState::Suspended;
            scheduler::ready_remove(cs, self);
        });
        let woken = self.parker.park_timeout(timeout);
        if !woken {
            critical_section::with(|cs| {
                self.ctrl.borrow_ref_mut(cs).wake_reason = WakeReason::TimedOut;
            });
        }
        self.resume_running();
        woken
    }

    /// The resumed carrier takes the CPU: ready (or still-suspended after a
    /// stale permit) becomes running. A killed thread stays inactive.
    fn resume_running(self: &Arc<Self>) {
        critical_section::with(|cs| {
            let mut ctrl = self.ctrl.borrow_ref_mut(cs);
            if matches!(ctrl.state, ThreadState::Suspended | ThreadState::Ready) {
                ctrl.state = ThreadState::Running;
            }
            scheduler::ready_remove(cs, self);
        });
    }

    /// Records enrollment on a wait list. A thread is on at most one list
    /// at any time.
    pub(crate) fn mark_enrolled(&self, cs: Token<'_>) {
        let mut ctrl = self.ctrl.borrow_ref_mut(cs);
        debug_assert!(!ctrl.enrolled, "thread enrolled on two wait lists");
        ctrl.enrolled = true;
    }

    /// Clears the enrollment mark, returning whether it was set.
    pub(crate) fn clear_enrolled(&self, cs: Token<'_>) -> bool {
        std::mem::take(&mut self.ctrl.borrow_ref_mut(cs).enrolled)
    }

    /// Dequeue-side wakeup: leaves the wait list and becomes ready with
    /// reason ok.
    pub(crate) fn wake_from_list(self: &Arc<Self>, cs: Token<'_>) {
        let mut ctrl = self.ctrl.borrow_ref_mut(cs);
        ctrl.enrolled = false;
        self.wake_locked(cs, &mut ctrl, WakeReason::Normal);
    }

    pub(crate) fn take_interrupted(&self) -> bool {
        critical_section::with(|cs| std::mem::take(&mut self.ctrl.borrow_ref_mut(cs).interrupted))
    }

    /// Terminates the thread: records the exit value, wakes the joiner and
    /// queues the thread for the reaper. Idempotent; a killed (inactive)
    /// thread is not resurrected when its carrier unwinds.
    fn finish(self: &Arc<Self>, value: ExitValue) {
        enum Outcome {
            AlreadyDone,
            Finished(Option<Arc<ThreadInner>>),
        }
        let outcome = critical_section::with(|cs| {
            let mut ctrl = self.ctrl.borrow_ref_mut(cs);
            if ctrl.state.is_terminated() || ctrl.state == ThreadState::Inactive {
                return Outcome::AlreadyDone;
            }
            ctrl.exit_value = Some(value);
            ctrl.state = ThreadState::Terminated;
            scheduler::ready_remove(cs, self);
            Outcome::Finished(ctrl.joiner.take())
        });
        if let Outcome::Finished(joiner) = outcome {
            if let Some(joiner) = joiner {
                joiner.wake(WakeReason::Normal);
            }
            trace::emit(records::THREAD_EXIT, self.name.as_bytes());
            scheduler::note_terminated(self.clone());
        }
    }

    /// Reaper-side destruction: unregister and mark destroyed.
    pub(crate) fn destroy(self: &Arc<Self>) {
        critical_section::with(|cs| {
            let mut ctrl = self.ctrl.borrow_ref_mut(cs);
            ctrl.state = ThreadState::Destroyed;
            if ctrl.detached {
                ctrl.exit_value = None;
            }
            scheduler::unregister(cs, self);
        });
        trace::emit(records::THREAD_DESTROY, self.name.as_bytes());
    }
}

/// Handle to a kernel thread.
#[derive(Clone)]
pub struct Thread {
    inner: Arc<ThreadInner>,
}

impl Thread {
    /// Creates a thread and starts it in state `Ready`.
    ///
    /// The entry function runs under a proxy that exits with its return
    /// value, so returning from `entry` and calling [`this_thread::exit`]
    /// are indistinguishable to a joiner.
    ///
    /// # Panics
    ///
    /// Panics when called from handler mode or when the priority is outside
    /// the normal range; these are contract violations, not runtime errors.
    pub fn new<F, T>(attributes: ThreadAttributes, entry: F) -> Thread
    where
        F: FnOnce() -> T + Send + 'static,
        T: Any + Send + 'static,
    {
        assert!(
            !port::in_handler_mode(),
            "threads cannot be created from handler mode"
        );
        assert!(
            attributes.priority.is_valid(),
            "thread priority must be in the normal range"
        );

        let inner = ThreadInner::with_state(&attributes.name, attributes.priority, ThreadState::Ready);
        critical_section::with(|cs| {
            scheduler::register(cs, &inner);
            scheduler::ready_insert(cs, attributes.priority, inner.clone());
        });
        trace::emit(records::THREAD_CREATE, inner.name.as_bytes());

        let carrier = inner.clone();
        let entry: Box<dyn FnOnce() -> ExitValue + Send> =
            Box::new(move || Box::new(entry()) as ExitValue);
        std::thread::Builder::new()
            .name(attributes.name)
            .stack_size(attributes.stack_size_bytes)
            .spawn(move || {
                this_thread::set_current(carrier.clone());
                carrier.resume_running();
                Thread::invoke_with_exit(&carrier, entry);
            })
            .expect("failed to spawn thread carrier");

        Thread { inner }
    }

    /// Runs the entry function and exits with its result.
    ///
    /// An explicit [`this_thread::exit`] unwinds to here and delivers its
    /// value the same way.
    fn invoke_with_exit(inner: &Arc<ThreadInner>, entry: Box<dyn FnOnce() -> ExitValue + Send>) {
        let value = match catch_unwind(AssertUnwindSafe(entry)) {
            Ok(value) => value,
            Err(payload) => match payload.downcast::<ExitRequest>() {
                Ok(request) => request.0,
                Err(payload) => resume_unwind(payload),
            },
        };
        inner.finish(value);
    }

    pub(crate) fn inner(&self) -> &Arc<ThreadInner> {
        &self.inner
    }

    pub(crate) fn from_inner(inner: Arc<ThreadInner>) -> Thread {
        Thread { inner }
    }

    /// The thread's name.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// The thread's current lifecycle state.
    pub fn state(&self) -> ThreadState {
        self.inner.state()
    }

    /// The scheduling priority, or [`Priority::ERROR`] from handler mode.
    pub fn priority(&self) -> Priority {
        if port::in_handler_mode() {
            return Priority::ERROR;
        }
        critical_section::with(|cs| self.inner.ctrl.borrow_ref(cs).prio)
    }

    /// Changes the scheduling priority.
    ///
    /// The change is observed at the next scheduling decision. The reserved
    /// `NONE` and `ERROR` levels are rejected; the idle levels are allowed
    /// (the idle thread uses them on itself).
    pub fn set_priority(&self, priority: Priority) -> Result<()> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        if priority == Priority::NONE || priority == Priority::ERROR {
            return Err(Error::InvalidArgument);
        }
        critical_section::with(|cs| {
            self.inner.ctrl.borrow_ref_mut(cs).prio = priority;
        });
        Ok(())
    }

    /// Blocks the caller until this thread terminates and yields its exit
    /// value.
    ///
    /// Joining self fails with `EDEADLK`. Joining a thread whose exit value
    /// was already collected fails with `ESRCH`. Multiple simultaneous
    /// joiners are undefined (debug-asserted). Join is not interruptible.
    pub fn join(&self) -> Result<ExitValue> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        let caller = this_thread::current_inner();
        if Arc::ptr_eq(&caller, &self.inner) {
            return Err(Error::Deadlock);
        }
        enum Poll {
            Terminated,
            Killed,
            Waiting,
        }
        loop {
            let poll = critical_section::with(|cs| {
                let mut ctrl = self.inner.ctrl.borrow_ref_mut(cs);
                if ctrl.state.is_terminated() {
                    return Poll::Terminated;
                }
                if ctrl.state == ThreadState::Inactive {
                    return Poll::Killed;
                }
                match &ctrl.joiner {
                    Some(existing) => debug_assert!(
                        Arc::ptr_eq(existing, &caller),
                        "multiple simultaneous joiners"
                    ),
                    None => ctrl.joiner = Some(caller.clone()),
                }
                let mut caller_ctrl = caller.ctrl.borrow_ref_mut(cs);
                caller_ctrl.state = ThreadState::Suspended;
                scheduler::ready_remove(cs, &caller);
                Poll::Waiting
            });
            match poll {
                Poll::Terminated => break,
                Poll::Killed => return Err(Error::NoSuchThread),
                Poll::Waiting => {
                    caller.parker.park();
                    caller.resume_running();
                    // Join does not surface EINTR; keep waiting.
                    let _ = caller.take_interrupted();
                }
            }
        }
        trace::emit(records::THREAD_JOIN, self.inner.name.as_bytes());
        critical_section::with(|cs| self.inner.ctrl.borrow_ref_mut(cs).exit_value.take())
            .ok_or(Error::NoSuchThread)
    }

    /// Marks the thread non-joinable; its record is reclaimed by the reaper
    /// as soon as it terminates, exit value included.
    pub fn detach(&self) -> Result<()> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        critical_section::with(|cs| {
            self.inner.ctrl.borrow_ref_mut(cs).detached = true;
        });
        Ok(())
    }

    /// Forcibly moves the thread to `Inactive` and interrupts any blocked
    /// wait. No cleanup of user resources is performed; a compute-bound
    /// thread must observe the interruption itself. A pending join on the
    /// killed thread fails with `ESRCH`.
    pub fn kill(&self) -> Result<()> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        let joiner = critical_section::with(|cs| {
            let mut ctrl = self.inner.ctrl.borrow_ref_mut(cs);
            if ctrl.state == ThreadState::Destroyed {
                return None;
            }
            ctrl.state = ThreadState::Inactive;
            ctrl.interrupted = true;
            ctrl.wake_reason = WakeReason::Interrupted;
            scheduler::ready_remove(cs, &self.inner);
            ctrl.joiner.take()
        });
        self.inner.unpark();
        if let Some(joiner) = joiner {
            joiner.wake(WakeReason::Normal);
        }
        Ok(())
    }

    /// Cancels the thread's current blocking call: the blocked operation
    /// returns `EINTR` without partial effect.
    pub fn cancel(&self) -> Result<()> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        critical_section::with(|cs| {
            let mut ctrl = self.inner.ctrl.borrow_ref_mut(cs);
            ctrl.interrupted = true;
            self.inner.wake_locked(cs, &mut ctrl, WakeReason::Interrupted);
        });
        Ok(())
    }

    /// Whether the last wakeup was an interruption. Consumes the flag.
    pub fn interrupted(&self) -> bool {
        self.inner.take_interrupted()
    }

    /// Why the thread last became ready.
    pub fn wakeup_reason(&self) -> WakeReason {
        critical_section::with(|cs| self.inner.ctrl.borrow_ref(cs).wake_reason)
    }

    /// Suspends the thread until a wakeup arrives. Only the thread itself
    /// may suspend; not callable from handler mode.
    pub fn suspend(&self) {
        assert!(
            !port::in_handler_mode(),
            "suspend is not callable from handler mode"
        );
        debug_assert!(
            Arc::ptr_eq(&this_thread::current_inner(), &self.inner),
            "a thread can only suspend itself"
        );
        self.inner.suspend_current();
    }

    /// Makes a suspended thread ready again, with reason ok.
    ///
    /// Callable from handler mode.
    pub fn wakeup(&self) {
        self.inner.wake(WakeReason::Normal);
        trace::emit(records::THREAD_WAKEUP, self.inner.name.as_bytes());
    }

    /// Raises signal flags (bitwise OR) and wakes the thread to evaluate
    /// them. Returns the pre-raise flags.
    ///
    /// Callable from handler mode. An empty mask fails with `EINVAL`.
    pub fn sig_raise(&self, mask: SigSet) -> Result<SigSet> {
        if mask == 0 {
            return Err(Error::InvalidArgument);
        }
        let old = critical_section::with(|cs| {
            let mut ctrl = self.inner.ctrl.borrow_ref_mut(cs);
            let old = ctrl.sig_mask;
            ctrl.sig_mask |= mask;
            self.inner.wake_locked(cs, &mut ctrl, WakeReason::Normal);
            old
        });
        trace::emit(records::SIG_RAISE, self.inner.name.as_bytes());
        Ok(old)
    }

    /// Clears the selected signal flags, returning the pre-clear flags.
    ///
    /// Not callable from handler mode. An empty mask fails with `EINVAL`.
    pub fn sig_clear(&self, mask: SigSet) -> Result<SigSet> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        if mask == 0 {
            return Err(Error::InvalidArgument);
        }
        critical_section::with(|cs| {
            let mut ctrl = self.inner.ctrl.borrow_ref_mut(cs);
            let old = ctrl.sig_mask;
            ctrl.sig_mask &= !mask;
            Ok(old)
        })
    }

    /// Returns the selected signal flags; with an empty mask, the whole
    /// set (never cleared). When `clear` is set the selected bits are
    /// cleared after being read.
    ///
    /// From handler mode returns the [`SIG_ERROR`] sentinel.
    pub fn sig_get(&self, mask: SigSet, clear: bool) -> SigSet {
        if port::in_handler_mode() {
            return SIG_ERROR;
        }
        critical_section::with(|cs| {
            let mut ctrl = self.inner.ctrl.borrow_ref_mut(cs);
            if mask == 0 {
                return ctrl.sig_mask;
            }
            let selected = ctrl.sig_mask & mask;
            if clear {
                ctrl.sig_mask &= !mask;
            }
            selected
        })
    }

    /// Waits until the mailbox satisfies `mask`/`mode`: all bits of the
    /// mask, at least one bit, or - with an empty mask - any raised bit.
    ///
    /// On success returns the pre-clear snapshot of the flags and clears
    /// the matched bits. Returns `EINTR` when cancelled.
    ///
    /// Not callable from handler mode; waits on the calling thread's
    /// mailbox.
    pub fn sig_wait(&self, mask: SigSet, mode: WaitMode) -> Result<SigSet> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        let current = this_thread::current_inner();
        debug_assert!(
            Arc::ptr_eq(&current, &self.inner),
            "sig_wait blocks on the calling thread's own mailbox"
        );
        loop {
            if let Some(snapshot) = self.sig_try_take(mask, mode) {
                return Ok(snapshot);
            }
            current.suspend_current();
            if current.take_interrupted() {
                return Err(Error::Interrupted);
            }
        }
    }

    /// Non-blocking [`Thread::sig_wait`]; fails with `EAGAIN` when the
    /// condition does not hold.
    pub fn try_sig_wait(&self, mask: SigSet, mode: WaitMode) -> Result<SigSet> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        self.sig_try_take(mask, mode).ok_or(Error::Again)
    }

    /// [`Thread::sig_wait`] bounded by `ticks` (zero rounds up to one);
    /// fails with `ETIMEDOUT` when the deadline elapses first. Never times
    /// out if the flags are already raised.
    pub fn timed_sig_wait(&self, mask: SigSet, mode: WaitMode, ticks: Tick) -> Result<SigSet> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        let current = this_thread::current_inner();
        debug_assert!(
            Arc::ptr_eq(&current, &self.inner),
            "sig_wait blocks on the calling thread's own mailbox"
        );
        let deadline = Deadline::after(ticks);
        loop {
            if let Some(snapshot) = self.sig_try_take(mask, mode) {
                return Ok(snapshot);
            }
            if deadline.expired() {
                return Err(Error::TimedOut);
            }
            current.suspend_timed(clock::ticks_to_duration(deadline.remaining()));
            if current.take_interrupted() {
                return Err(Error::Interrupted);
            }
        }
    }

    /// Single evaluation of the wait predicate; clears matched bits on
    /// success and returns the pre-clear snapshot.
    fn sig_try_take(&self, mask: SigSet, mode: WaitMode) -> Option<SigSet> {
        critical_section::with(|cs| {
            let mut ctrl = self.inner.ctrl.borrow_ref_mut(cs);
            if mask == 0 {
                if ctrl.sig_mask != 0 {
                    let snapshot = ctrl.sig_mask;
                    ctrl.sig_mask = SIG_NONE;
                    return Some(snapshot);
                }
                return None;
            }
            let matched = ctrl.sig_mask & mask;
            let satisfied = match mode {
                WaitMode::All => matched == mask,
                WaitMode::Any => matched != 0,
            };
            if satisfied {
                let snapshot = ctrl.sig_mask;
                ctrl.sig_mask &= !mask;
                Some(snapshot)
            } else {
                None
            }
        })
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}

/// Operations on the calling thread.
pub mod this_thread {
    use super::*;

    thread_local! {
        static CURRENT: RefCell<Option<Arc<ThreadInner>>> = const { RefCell::new(None) };
    }

    pub(crate) fn set_current(inner: Arc<ThreadInner>) {
        CURRENT.with(|slot| *slot.borrow_mut() = Some(inner));
    }

    /// The calling thread's control block, adopting a foreign OS thread on
    /// first use.
    pub(crate) fn current_inner() -> Arc<ThreadInner> {
        CURRENT.with(|slot| {
            if let Some(inner) = slot.borrow().as_ref() {
                return inner.clone();
            }
            let adopted = ThreadInner::adopt();
            *slot.borrow_mut() = Some(adopted.clone());
            adopted
        })
    }

    /// A handle to the calling thread.
    ///
    /// A thread not created through [`Thread::new`] (the test harness main
    /// thread, say) is adopted into the registry at normal priority on the
    /// first call.
    ///
    /// Not callable from handler mode.
    pub fn current() -> Thread {
        assert!(
            !port::in_handler_mode(),
            "there is no current thread in handler mode"
        );
        Thread::from_inner(current_inner())
    }

    /// Passes control to the next ready thread.
    pub fn yield_now() {
        std::thread::yield_now();
    }

    /// Suspends the calling thread until a wakeup arrives.
    pub fn suspend() {
        assert!(
            !port::in_handler_mode(),
            "suspend is not callable from handler mode"
        );
        current_inner().suspend_current();
    }

    /// Terminates the calling thread with the given exit value.
    ///
    /// Unwinds to the entry proxy, which records the value, wakes the
    /// joiner and queues the thread for the reaper; a plain return from the
    /// entry function takes exactly the same path. Only meaningful on
    /// threads created with [`Thread::new`].
    pub fn exit(value: ExitValue) -> ! {
        assert!(
            !port::in_handler_mode(),
            "exit is not callable from handler mode"
        );
        std::panic::panic_any(ExitRequest(value))
    }
}
