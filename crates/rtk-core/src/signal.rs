//! Signal-flag sets: the per-thread mailbox vocabulary.
//!
//! Signal flags are a cumulative bitset: raisers OR bits in, waiters AND
//! bits out. Multiple raises of the same bit coalesce, so events may be
//! lost as counts but never as bits. They are deliberately not a counting
//! semaphore.

/// A set of signal flags. Bit `n` set means signal `n` is raised.
pub type SigSet = u32;

/// The empty signal set.
pub const SIG_NONE: SigSet = 0;

/// Sentinel returned by signal getters that fail (e.g. from handler mode).
pub const SIG_ERROR: SigSet = SigSet::MAX;

/// Selects how a signal wait matches the requested mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Every bit of the requested mask must be raised.
    All,
    /// At least one bit of the requested mask must be raised. With an empty
    /// mask, any raised bit satisfies the wait.
    Any,
}

#[cfg(feature = "defmt")]
impl defmt::Format for WaitMode {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            WaitMode::All => defmt::write!(fmt, "All"),
            WaitMode::Any => defmt::write!(fmt, "Any"),
        }
    }
}
