//! The hosted port layer.
//!
//! Everything the portable kernel needs from a platform is collected here:
//! suspending and waking a thread, detecting handler (interrupt) mode, and
//! the idle thread's wait-for-interrupt. On a microcontroller these map to
//! the context-switch and interrupt machinery; on the hosted port each
//! kernel thread is carried by an OS thread and suspension is parking.
//!
//! The parker is permit-based: a wakeup delivered while the target is not
//! parked leaves a permit behind, and the next park consumes it instead of
//! sleeping. Wait loops tolerate the resulting spurious resumes by
//! re-evaluating their condition, so a wakeup can never be lost in the
//! window between "condition checked" and "thread parked".

use std::cell::Cell;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Permit-based parking for one carrier thread.
pub(crate) struct Parker {
    permit: Mutex<bool>,
    cv: Condvar,
}

impl Parker {
    pub(crate) const fn new() -> Self {
        Self {
            permit: Mutex::new(false),
            cv: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, then consumes it.
    pub(crate) fn park(&self) {
        let mut permit = self.permit.lock().expect("parker poisoned");
        while !*permit {
            permit = self.cv.wait(permit).expect("parker poisoned");
        }
        *permit = false;
    }

    /// Blocks until a permit is available or `timeout` elapses.
    ///
    /// Returns `true` if a permit was consumed, `false` on timeout.
    pub(crate) fn park_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let mut permit = self.permit.lock().expect("parker poisoned");
        while !*permit {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .cv
                .wait_timeout(permit, deadline - now)
                .expect("parker poisoned");
            permit = guard;
        }
        *permit = false;
        true
    }

    /// Deposits a permit, waking the parked thread if there is one.
    pub(crate) fn unpark(&self) {
        let mut permit = self.permit.lock().expect("parker poisoned");
        *permit = true;
        self.cv.notify_one();
    }
}

thread_local! {
    static HANDLER_MODE: Cell<bool> = const { Cell::new(false) };
}

/// Whether the caller is executing in handler (interrupt) mode.
///
/// Most kernel entry points are forbidden in handler mode and fail with
/// `EPERM`; the ISR-safe set is `wakeup`, `sig_raise`, `try_send` and
/// `try_receive`.
pub fn in_handler_mode() -> bool {
    HANDLER_MODE.with(Cell::get)
}

/// Runs `f` as if from an interrupt service routine.
///
/// The hosted stand-in for real interrupt entry: `in_handler_mode()` is
/// true for the duration of `f`. Used to exercise the ISR-safe API subset
/// and the `EPERM` gates.
pub fn interrupt_context<R>(f: impl FnOnce() -> R) -> R {
    HANDLER_MODE.with(|flag| {
        let prior = flag.replace(true);
        let result = f();
        flag.set(prior);
        result
    })
}

/// Sleeps the CPU until "an interrupt" arrives.
///
/// Called by the idle thread between reaping cycles. On the hosted port the
/// interrupt is a wakeup directed at the idle thread (the scheduler issues
/// one whenever a thread terminates).
pub(crate) fn wait_for_interrupt() {
    crate::thread::this_thread::current_inner().parker.park();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn permit_deposited_before_park_is_consumed() {
        let parker = Parker::new();
        parker.unpark();
        // Must return immediately.
        parker.park();
    }

    #[test]
    fn park_timeout_expires_without_permit() {
        let parker = Parker::new();
        let start = Instant::now();
        assert!(!parker.park_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn unpark_wakes_parked_thread() {
        let parker = Arc::new(Parker::new());
        let other = Arc::clone(&parker);
        let handle = std::thread::spawn(move || other.park());
        std::thread::sleep(Duration::from_millis(10));
        parker.unpark();
        handle.join().expect("park thread");
    }

    #[test]
    fn handler_mode_is_scoped() {
        assert!(!in_handler_mode());
        interrupt_context(|| {
            assert!(in_handler_mode());
            interrupt_context(|| assert!(in_handler_mode()));
            assert!(in_handler_mode());
        });
        assert!(!in_handler_mode());
    }
}
