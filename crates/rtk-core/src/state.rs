//! Thread lifecycle states and wakeup reasons.

/// Scheduler-visible thread state.
///
/// A thread is created `Ready`, alternates between `Ready`, `Running` and
/// `Suspended` while alive, becomes `Terminated` when its entry function
/// returns or it exits, and `Destroyed` once the reaper has reclaimed it.
/// `kill()` forces any non-destroyed thread back to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    /// Not registered with the scheduler (killed or not yet started).
    Inactive,
    /// Eligible to run, waiting to be picked.
    Ready,
    /// Currently executing.
    Running,
    /// Blocked; only a wakeup makes it ready again.
    Suspended,
    /// Finished executing; awaiting the reaper.
    Terminated,
    /// Reclaimed by the reaper. Terminal.
    Destroyed,
}

impl ThreadState {
    /// Whether the thread is eligible to run.
    pub fn is_ready(self) -> bool {
        self == ThreadState::Ready
    }

    /// Whether the thread is blocked.
    pub fn is_suspended(self) -> bool {
        self == ThreadState::Suspended
    }

    /// Whether the thread has finished executing.
    pub fn is_terminated(self) -> bool {
        matches!(self, ThreadState::Terminated | ThreadState::Destroyed)
    }
}

/// Why a suspended thread was made ready again.
///
/// Recorded by the wakeup side and consumed by the blocking call when it
/// resumes, so that interruption and timeouts surface as `EINTR` and
/// `ETIMEDOUT` instead of being retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Regular wakeup; the blocked condition may now hold.
    Normal,
    /// The wait was cancelled.
    Interrupted,
    /// The wait's deadline elapsed.
    TimedOut,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ThreadState {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ThreadState::Inactive => defmt::write!(fmt, "Inactive"),
            ThreadState::Ready => defmt::write!(fmt, "Ready"),
            ThreadState::Running => defmt::write!(fmt, "Running"),
            ThreadState::Suspended => defmt::write!(fmt, "Suspended"),
            ThreadState::Terminated => defmt::write!(fmt, "Terminated"),
            ThreadState::Destroyed => defmt::write!(fmt, "Destroyed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_predicates() {
        assert!(ThreadState::Ready.is_ready());
        assert!(!ThreadState::Running.is_ready());
        assert!(ThreadState::Suspended.is_suspended());
        assert!(ThreadState::Terminated.is_terminated());
        assert!(ThreadState::Destroyed.is_terminated());
        assert!(!ThreadState::Inactive.is_terminated());
    }
}
