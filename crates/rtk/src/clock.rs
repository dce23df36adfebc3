//! The system tick clock.
//!
//! Ticks are a monotonic unsigned counter; subtraction is modular, so
//! durations stay correct across counter wrap. The hosted port runs the
//! clock at 1 kHz off the process monotonic clock.
//!
//! Sleeping is a timed suspension: the thread parks for the requested
//! number of ticks and resumes early if a wakeup arrives. A request for
//! zero ticks is treated as one, guaranteeing at least one tick of real
//! sleep. Timed waits recompute their remaining budget each loop iteration
//! through [`Deadline`].

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use rtk_core::time::elapsed;
use rtk_core::{Error, Result, Tick};

use crate::scheduler;
use crate::thread::this_thread;

/// Tick frequency of the hosted port.
pub const FREQUENCY_HZ: u32 = 1_000;

static EPOCH: OnceLock<Instant> = OnceLock::new();

fn epoch() -> Instant {
    *EPOCH.get_or_init(Instant::now)
}

pub(crate) fn ticks_to_duration(ticks: Tick) -> Duration {
    Duration::from_micros(ticks as u64 * 1_000_000 / FREQUENCY_HZ as u64)
}

/// The current tick count.
pub fn now() -> Tick {
    let elapsed = epoch().elapsed();
    (elapsed.as_micros() as u64 * FREQUENCY_HZ as u64 / 1_000_000) as Tick
}

/// Suspends the calling thread for `ticks` ticks.
///
/// Returns early if a wakeup arrives; callers that need the full duration
/// re-issue the sleep with the remaining budget. `ticks == 0` sleeps for
/// one tick.
///
/// Not callable from handler mode.
pub fn sleep_for(ticks: Tick) -> Result<()> {
    suspend_for(ticks)
}

/// Timed suspension of the calling thread: wakes on any wakeup directed at
/// it, or after `ticks` ticks.
///
/// This is the suspension used by the timed blocking calls; it is
/// behaviourally the relative sleep with wakeup semantics spelled out.
/// `ticks == 0` waits for one tick.
///
/// Not callable from handler mode.
pub fn wait_for(ticks: Tick) -> Result<()> {
    suspend_for(ticks)
}

fn suspend_for(ticks: Tick) -> Result<()> {
    if scheduler::in_handler_mode() {
        return Err(Error::NotPermitted);
    }
    let ticks = ticks.max(1);
    let current = this_thread::current_inner();
    current.suspend_timed(ticks_to_duration(ticks));
    Ok(())
}

/// A relative timeout budget for timed blocking loops.
///
/// Captures the start tick once; each loop iteration asks for the
/// remaining budget, so time spent on failed attempts and spurious
/// wakeups is charged against the deadline.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Tick,
    budget: Tick,
}

impl Deadline {
    /// Starts a deadline `ticks` from now. A zero budget becomes one tick.
    pub fn after(ticks: Tick) -> Self {
        Self {
            start: now(),
            budget: ticks.max(1),
        }
    }

    /// Ticks slept so far.
    pub fn elapsed(&self) -> Tick {
        elapsed(self.start, now())
    }

    /// Whether the budget is exhausted.
    pub fn expired(&self) -> bool {
        self.elapsed() >= self.budget
    }

    /// Remaining budget, zero once expired.
    pub fn remaining(&self) -> Tick {
        self.budget.saturating_sub(self.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_monotonic() {
        let a = now();
        std::thread::sleep(Duration::from_millis(5));
        let b = now();
        assert!(b >= a + 5);
    }

    #[test]
    fn sleep_for_takes_at_least_the_requested_ticks() {
        let start = now();
        sleep_for(10).expect("sleep");
        assert!(elapsed(start, now()) >= 10);
    }

    #[test]
    fn zero_ticks_still_sleeps_one() {
        let start = now();
        sleep_for(0).expect("sleep");
        assert!(elapsed(start, now()) >= 1);
    }

    #[test]
    fn deadline_expires_after_budget() {
        let deadline = Deadline::after(5);
        assert!(!deadline.expired());
        assert!(deadline.remaining() <= 5);
        std::thread::sleep(ticks_to_duration(7));
        assert!(deadline.expired());
        assert_eq!(deadline.remaining(), 0);
    }

    #[test]
    fn sleep_is_forbidden_in_handler_mode() {
        let result = crate::port::interrupt_context(|| sleep_for(1));
        assert_eq!(result, Err(Error::NotPermitted));
    }
}
