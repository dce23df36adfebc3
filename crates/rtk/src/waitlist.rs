//! Wait lists: FIFO queues of blocked threads.
//!
//! A blocking call that finds its condition unsatisfied enrolls the calling
//! thread on the primitive's wait list and suspends. The wake side detaches
//! the oldest waiter and makes it ready with reason ok. Wakeups are FIFO
//! within one list, and a thread is enrolled on at most one list at any
//! time.
//!
//! Enrollment is scoped: the [`WaiterNode`] lives on the blocking call's
//! stack frame and the [`WaitGuard`] detaches it on every exit path. A
//! thread woken by timeout, cancellation or a stray signal unwinds out of
//! the enrollment scope while still linked; the guard keeps the list
//! consistent regardless of which side removed the node first.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use critical_section::{CriticalSection as Token, Mutex};

use crate::thread::{this_thread, ThreadInner};

/// Links one blocked thread to one wait list.
///
/// Created on the stack of the blocking call, before the retry loop, and
/// borrowed into the list by a [`WaitGuard`] for each suspension.
pub struct WaiterNode {
    thread: Arc<ThreadInner>,
}

impl WaiterNode {
    /// A node for the calling thread.
    pub fn current() -> Self {
        Self {
            thread: this_thread::current_inner(),
        }
    }
}

/// FIFO list of threads blocked on one condition.
pub struct WaitList {
    waiters: Mutex<RefCell<VecDeque<Arc<ThreadInner>>>>,
}

impl WaitList {
    pub const fn new() -> Self {
        Self {
            waiters: Mutex::new(RefCell::new(VecDeque::new())),
        }
    }

    /// Whether no thread is enrolled.
    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.waiters.borrow_ref(cs).is_empty())
    }

    /// Number of enrolled threads.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.waiters.borrow_ref(cs).len())
    }

    fn enqueue(&self, cs: Token<'_>, node: &WaiterNode) {
        node.thread.mark_enrolled(cs);
        self.waiters.borrow_ref_mut(cs).push_back(node.thread.clone());
    }

    fn remove(&self, cs: Token<'_>, node: &WaiterNode) {
        if node.thread.clear_enrolled(cs) {
            self.waiters
                .borrow_ref_mut(cs)
                .retain(|t| !Arc::ptr_eq(t, &node.thread));
        }
    }

    /// Detaches the oldest waiter and makes it ready with reason ok.
    ///
    /// Returns whether a thread was woken.
    pub fn wakeup_one(&self) -> bool {
        critical_section::with(|cs| {
            let woken = self.waiters.borrow_ref_mut(cs).pop_front();
            match woken {
                Some(thread) => {
                    thread.wake_from_list(cs);
                    true
                }
                None => false,
            }
        })
    }

    /// Drains the list, waking every enrolled thread with reason ok.
    pub fn wakeup_all(&self) {
        critical_section::with(|cs| self.wakeup_all_locked(cs));
    }

    pub(crate) fn wakeup_all_locked(&self, cs: Token<'_>) {
        loop {
            let woken = self.waiters.borrow_ref_mut(cs).pop_front();
            match woken {
                Some(thread) => thread.wake_from_list(cs),
                None => break,
            }
        }
    }

    /// Empties the list without waking anyone.
    pub fn clear(&self) {
        critical_section::with(|cs| {
            let mut waiters = self.waiters.borrow_ref_mut(cs);
            while let Some(thread) = waiters.pop_front() {
                thread.clear_enrolled(cs);
            }
        });
    }
}

impl Default for WaitList {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped enrollment of one waiter on one list.
///
/// Enqueues on construction, and on drop detaches the node if it is still
/// linked - the blocked thread may unwind while enrolled (timeout,
/// cancellation), or may already have been detached by a wakeup.
pub struct WaitGuard<'a> {
    list: &'a WaitList,
    node: &'a WaiterNode,
}

impl<'a> WaitGuard<'a> {
    pub fn enroll(list: &'a WaitList, node: &'a WaiterNode) -> Self {
        critical_section::with(|cs| list.enqueue(cs, node));
        Self { list, node }
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        critical_section::with(|cs| self.list.remove(cs, self.node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtk_core::Priority;

    fn node(name: &str) -> WaiterNode {
        WaiterNode {
            thread: ThreadInner::bare(name, Priority::NORMAL),
        }
    }

    #[test]
    fn guard_enrolls_and_detaches() {
        let list = WaitList::new();
        let waiter = node("w");
        {
            let _guard = WaitGuard::enroll(&list, &waiter);
            assert_eq!(list.len(), 1);
        }
        assert!(list.is_empty());
    }

    #[test]
    fn wakeup_one_is_fifo() {
        let list = WaitList::new();
        let first = node("first");
        let second = node("second");
        let _g1 = WaitGuard::enroll(&list, &first);
        let _g2 = WaitGuard::enroll(&list, &second);

        assert!(list.wakeup_one());
        // The oldest waiter left the list; its guard drop is now a no-op.
        assert_eq!(list.len(), 1);
        assert!(list.wakeup_one());
        assert!(!list.wakeup_one());
    }

    #[test]
    fn wakeup_all_drains() {
        let list = WaitList::new();
        let a = node("a");
        let b = node("b");
        let _ga = WaitGuard::enroll(&list, &a);
        let _gb = WaitGuard::enroll(&list, &b);

        list.wakeup_all();
        assert!(list.is_empty());
    }

    #[test]
    fn guard_drop_after_wakeup_keeps_list_consistent() {
        let list = WaitList::new();
        let a = node("a");
        let b = node("b");
        let ga = WaitGuard::enroll(&list, &a);
        let _gb = WaitGuard::enroll(&list, &b);

        assert!(list.wakeup_one()); // detaches `a`
        drop(ga); // must not disturb `b`
        assert_eq!(list.len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "two wait lists")]
    fn double_enrollment_is_detected() {
        let list_a = WaitList::new();
        let list_b = WaitList::new();
        let waiter = node("w");
        let _ga = WaitGuard::enroll(&list_a, &waiter);
        let _gb = WaitGuard::enroll(&list_b, &waiter);
    }
}
