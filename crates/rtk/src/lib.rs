//! # rtk - a POSIX-inspired real-time kernel
//!
//! rtk provides preemptive-kernel concurrency primitives with POSIX-flavoured
//! semantics: threads with a lifecycle state machine and a per-thread
//! signal-flag mailbox, a priority-ordered bounded message queue, and the
//! wait/wake protocol every blocking primitive is built on.
//!
//! The kernel logic is written against a small set of port verbs (critical
//! sections, suspend/wakeup, handler-mode detection, idle wait). This crate
//! ships the hosted port, which carries kernel threads on OS threads the way
//! the synthetic POSIX platforms of embedded RTOSes do, so the full API can
//! be exercised and tested on a workstation.
//!
//! ## Module Overview
//!
//! - [`critical`] - scoped interrupt-masking critical sections
//! - [`clock`] - the system tick clock: `now`, `sleep_for`, `wait_for`
//! - [`waitlist`] - FIFO lists of blocked threads with scoped enrollment
//! - [`thread`] - thread lifecycle, signal flags, join/detach/exit/kill
//! - [`scheduler`] - the kernel singleton: registry, ready queue, reaper list
//! - [`mqueue`] - priority-ordered bounded message queues
//! - [`trace`] - diagnostic trace hooks
//! - [`port`] - the hosted port layer

pub mod clock;
pub mod critical;
mod idle;
pub mod mqueue;
pub mod port;
pub mod scheduler;
pub mod thread;
pub mod trace;
pub mod waitlist;

pub use rtk_core::time;
pub use rtk_core::{Error, Priority, Result, SigSet, ThreadState, Tick, WaitMode, WakeReason};

pub use mqueue::{MessageQueue, MsgPriority};
pub use thread::{this_thread, ExitValue, Thread};
