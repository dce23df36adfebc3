//! Critical sections: scoped interrupt-masked regions.
//!
//! Every mutation of kernel state - the ready queue, wait lists, a thread's
//! state or signal mask, a queue's ring and free list - happens inside a
//! critical section. On a bare-metal port the section masks interrupts; on
//! the hosted port the `critical-section` crate's built-in `std`
//! implementation provides a process-wide lock with the same
//! acquire/restore contract, so sections nest by saving and restoring the
//! prior state.
//!
//! Two forms are available:
//!
//! - [`with`], the closure form. Kernel code uses this one: the closure
//!   receives the section token that unlocks the `Mutex<RefCell<_>>` cells
//!   holding kernel state.
//! - [`CriticalSection`], a scoped guard for callers that need an exclusion
//!   region spanning a lexical scope rather than a closure.
//!
//! No code may block while a section is held; blocking calls enroll on a
//! wait list inside a section, leave it, and only then suspend.

use critical_section::RestoreState;

/// Executes `f` inside a critical section.
///
/// Re-exported from the `critical-section` crate; the token passed to the
/// closure grants access to the kernel's state cells.
pub use critical_section::with;

/// A scoped critical section.
///
/// Entering disables interrupts (hosted: takes the global kernel lock) and
/// records the prior state; dropping restores it, on every exit path
/// including unwinding. Sections nest.
pub struct CriticalSection {
    restore: RestoreState,
}

impl CriticalSection {
    /// Enters a critical section.
    pub fn enter() -> Self {
        // SAFETY: the restore token is released exactly once, in Drop.
        let restore = unsafe { critical_section::acquire() };
        Self { restore }
    }
}

impl Drop for CriticalSection {
    fn drop(&mut self) {
        // SAFETY: pairs with the acquire in `enter`.
        unsafe { critical_section::release(self.restore) };
    }
}
