//! The idle thread: reaper of terminated threads.
//!
//! Runs below every application priority. Each cycle drains the
//! scheduler's terminated list, destroying one thread at a time and
//! yielding between destructions; with nothing left to reap it sleeps the
//! CPU until the next interrupt (on the hosted port, until the scheduler
//! wakes it for a newly terminated thread).

use rtk_core::Priority;

use crate::port;
use crate::scheduler;
use crate::thread::this_thread;

/// Idle thread entry. Never returns.
pub(crate) fn run(below_idle: bool) {
    // Created at the default priority; drop to the idle level before
    // entering the loop. One step further down keeps the idle thread below
    // application threads created at `Priority::IDLE`.
    let target = if below_idle {
        Priority::IDLE.one_below()
    } else {
        Priority::IDLE
    };
    this_thread::current()
        .set_priority(target)
        .expect("idle priority");

    loop {
        while let Some(thread) = scheduler::take_terminated() {
            thread.destroy();
            this_thread::yield_now();
        }
        port::wait_for_interrupt();
        this_thread::yield_now();
    }
}
