#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

//! # rtk-core
//!
//! Core types, constants and error taxonomy for the rtk real-time kernel.
//! This crate carries everything the kernel and its synchronization
//! primitives share: the POSIX-flavoured error values, scheduling
//! priorities with their reserved sentinels, thread lifecycle states and
//! the signal-flag set types.
//!
//! The crate is `no_std` so that alternative ports can reuse the same
//! vocabulary without pulling in the hosted kernel.

use core::fmt;

pub mod priority;
pub mod signal;
pub mod state;
pub mod time;

pub use priority::Priority;
pub use signal::{SigSet, WaitMode, SIG_ERROR, SIG_NONE};
pub use state::{ThreadState, WakeReason};
pub use time::Tick;

/// rtk version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the kernel.
pub type Result<T> = core::result::Result<T, Error>;

/// Kernel error values surfaced to callers.
///
/// The variants map one-to-one onto POSIX `errno` values (see [`Error::errno`]).
/// Errors are values: blocking calls retry internally across spurious
/// wakeups and surface only interruption, timeout and precondition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Operation not permitted in the current context (`EPERM`), typically
    /// an ISR-forbidden call made from handler mode.
    NotPermitted,
    /// An argument failed validation (`EINVAL`).
    InvalidArgument,
    /// Message or buffer length does not fit the queue geometry (`EMSGSIZE`).
    MessageSize,
    /// The resource is momentarily unavailable (`EAGAIN`); returned only by
    /// the non-blocking `try_*` variants.
    Again,
    /// A blocking call was cancelled before completion (`EINTR`).
    Interrupted,
    /// A timed blocking call elapsed before completion (`ETIMEDOUT`).
    TimedOut,
    /// The operation would deadlock the caller (`EDEADLK`), e.g. self-join.
    Deadlock,
    /// The referenced thread no longer exists (`ESRCH`).
    NoSuchThread,
    /// Escape from a loop that must not terminate (`ENOTRECOVERABLE`);
    /// indicates a kernel bug.
    Unrecoverable,
}

impl Error {
    /// The corresponding POSIX `errno` value (Linux numbering).
    pub const fn errno(self) -> i32 {
        match self {
            Error::NotPermitted => 1,
            Error::InvalidArgument => 22,
            Error::MessageSize => 90,
            Error::Again => 11,
            Error::Interrupted => 4,
            Error::TimedOut => 110,
            Error::Deadlock => 35,
            Error::NoSuchThread => 3,
            Error::Unrecoverable => 131,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotPermitted => write!(f, "operation not permitted"),
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::MessageSize => write!(f, "message too long"),
            Error::Again => write!(f, "resource temporarily unavailable"),
            Error::Interrupted => write!(f, "interrupted"),
            Error::TimedOut => write!(f, "operation timed out"),
            Error::Deadlock => write!(f, "resource deadlock would occur"),
            Error::NoSuchThread => write!(f, "no such thread"),
            Error::Unrecoverable => write!(f, "state not recoverable"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Error::NotPermitted => defmt::write!(fmt, "NotPermitted"),
            Error::InvalidArgument => defmt::write!(fmt, "InvalidArgument"),
            Error::MessageSize => defmt::write!(fmt, "MessageSize"),
            Error::Again => defmt::write!(fmt, "Again"),
            Error::Interrupted => defmt::write!(fmt, "Interrupted"),
            Error::TimedOut => defmt::write!(fmt, "TimedOut"),
            Error::Deadlock => defmt::write!(fmt, "Deadlock"),
            Error::NoSuchThread => defmt::write!(fmt, "NoSuchThread"),
            Error::Unrecoverable => defmt::write!(fmt, "Unrecoverable"),
        }
    }
}
