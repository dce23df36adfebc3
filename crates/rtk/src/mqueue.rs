//! Priority-ordered bounded message queues.
//!
//! A queue holds up to `N` fixed-size messages of `M` bytes each. Messages
//! carry a priority; receivers always get the oldest of the
//! highest-priority messages. Internally the enqueued messages form a
//! circular doubly-linked ring over three parallel arrays (`prev`, `next`,
//! `prio`), kept weakly sorted by priority descending with FIFO among
//! equals. Free slots form an intrusive singly-linked LIFO threaded
//! through the `next` array. Insertion walks from the tail and is O(N)
//! worst case, which is intentional for small N; head removal is O(1).
//!
//! Senders blocked on a full queue and receivers blocked on an empty one
//! wait on two FIFO wait lists; every slot transition wakes exactly one
//! waiter from the opposite side.

use std::cell::RefCell;
use std::fmt;

use critical_section::Mutex;
use rtk_core::{Error, Result, Tick};

use crate::clock::{self, Deadline};
use crate::port;
use crate::thread::this_thread;
use crate::trace::{self, records};
use crate::waitlist::{WaitGuard, WaitList, WaiterNode};

/// Message priority; larger values are delivered first.
pub type MsgPriority = u8;

/// Priority for senders that do not care about ordering.
pub const DEFAULT_PRIORITY: MsgPriority = 0;

type SlotIndex = u16;

const NO_SLOT: SlotIndex = SlotIndex::MAX;

/// Message queue creation attributes: a name and, optionally, a
/// caller-provided payload storage region.
pub struct QueueAttributes {
    name: String,
    storage: Option<&'static mut [u8]>,
}

impl QueueAttributes {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: None,
        }
    }

    /// Uses `storage` for the message payloads instead of allocating. The
    /// region must hold at least `msgs * msg_size` bytes.
    pub fn with_storage(mut self, storage: &'static mut [u8]) -> Self {
        self.storage = Some(storage);
        self
    }
}

impl Default for QueueAttributes {
    fn default() -> Self {
        Self::new("-")
    }
}

/// Payload storage, either allocated by the queue or provided by the
/// caller. The destructor releases only owned storage.
enum Storage {
    Owned(Box<[u8]>),
    Provided(&'static mut [u8]),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Owned(b) => b,
            Storage::Provided(b) => b,
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::Owned(b) => b,
            Storage::Provided(b) => b,
        }
    }
}

/// Ring state; lives in a critical-section cell.
struct QueueInner {
    storage: Storage,
    prev: Box<[SlotIndex]>,
    next: Box<[SlotIndex]>,
    prio: Box<[MsgPriority]>,
    /// Oldest of the highest-priority messages; `NO_SLOT` when empty.
    head: SlotIndex,
    /// Head of the free-slot LIFO, linked through `next`; `NO_SLOT` when full.
    first_free: SlotIndex,
    count: usize,
    msg_size: usize,
}

impl QueueInner {
    /// Threads all slots onto the free list and empties the ring.
    fn init(&mut self) {
        let n = self.prio.len();
        for i in 0..n - 1 {
            self.next[i] = (i + 1) as SlotIndex;
        }
        self.next[n - 1] = NO_SLOT;
        self.first_free = 0;
        self.head = NO_SLOT;
        self.count = 0;
    }

    fn pop_free(&mut self) -> Option<usize> {
        if self.first_free == NO_SLOT {
            return None;
        }
        let slot = self.first_free as usize;
        self.first_free = self.next[slot];
        Some(slot)
    }

    fn push_free(&mut self, slot: usize) {
        self.next[slot] = self.first_free;
        self.first_free = slot as SlotIndex;
    }

    /// Splices `slot` into the ring keeping it sorted by priority
    /// descending, behind all messages of the same priority.
    fn link_sorted(&mut self, slot: usize, prio: MsgPriority) {
        self.prio[slot] = prio;
        if self.head == NO_SLOT {
            self.head = slot as SlotIndex;
            self.prev[slot] = slot as SlotIndex;
            self.next[slot] = slot as SlotIndex;
            return;
        }
        let head = self.head as usize;
        // Start at the tail and walk backwards past lower-priority
        // messages; equal priority stops the walk, so the new message
        // lands behind the last of its class.
        let mut ix = self.prev[head] as usize;
        if prio > self.prio[head] {
            self.head = slot as SlotIndex;
        } else {
            while prio > self.prio[ix] {
                ix = self.prev[ix] as usize;
            }
        }
        self.prev[slot] = ix as SlotIndex;
        self.next[slot] = self.next[ix];
        let after = self.next[ix] as usize;
        self.next[ix] = slot as SlotIndex;
        self.prev[after] = slot as SlotIndex;
    }

    /// Unsplices the head slot and returns it to the free list.
    fn unlink_head(&mut self) -> usize {
        let slot = self.head as usize;
        if self.count > 1 {
            let next = self.next[slot];
            let prev = self.prev[slot];
            self.prev[next as usize] = prev;
            self.next[prev as usize] = next;
            self.head = next;
        } else {
            self.head = NO_SLOT;
        }
        self.push_free(slot);
        slot
    }

    fn payload(&self, slot: usize) -> &[u8] {
        &self.storage.bytes()[slot * self.msg_size..(slot + 1) * self.msg_size]
    }

    fn payload_mut(&mut self, slot: usize) -> &mut [u8] {
        let size = self.msg_size;
        &mut self.storage.bytes_mut()[slot * size..(slot + 1) * size]
    }

    #[cfg(test)]
    fn free_len(&self) -> usize {
        let mut n = 0;
        let mut ix = self.first_free;
        while ix != NO_SLOT {
            n += 1;
            ix = self.next[ix as usize];
        }
        n
    }
}

/// A bounded queue of fixed-size, priority-ordered messages.
///
/// ```
/// use rtk::mqueue::{self, MessageQueue};
///
/// let queue = MessageQueue::new(4, 8);
/// queue.try_send(b"ping", mqueue::DEFAULT_PRIORITY).expect("send");
///
/// let mut buf = [0u8; 8];
/// let prio = queue.try_receive(&mut buf).expect("receive");
/// assert_eq!(&buf[..4], b"ping");
/// assert_eq!(prio, mqueue::DEFAULT_PRIORITY);
/// ```
pub struct MessageQueue {
    name: String,
    msgs: usize,
    msg_size: usize,
    inner: Mutex<RefCell<QueueInner>>,
    senders: WaitList,
    receivers: WaitList,
}

impl MessageQueue {
    /// Creates a queue of `msgs` messages of `msg_size` bytes each, with
    /// storage allocated by the queue.
    ///
    /// # Panics
    ///
    /// Panics when called from handler mode or when a dimension is zero.
    pub fn new(msgs: usize, msg_size: usize) -> Self {
        Self::with_attributes(QueueAttributes::default(), msgs, msg_size)
    }

    /// Creates a queue with the given attributes.
    ///
    /// # Panics
    ///
    /// Panics when called from handler mode, when a dimension is zero or
    /// out of range, or when provided storage is smaller than
    /// `msgs * msg_size` bytes.
    pub fn with_attributes(attributes: QueueAttributes, msgs: usize, msg_size: usize) -> Self {
        assert!(
            !port::in_handler_mode(),
            "message queues cannot be created from handler mode"
        );
        assert!(msgs > 0, "queue capacity must be at least one message");
        assert!(msg_size > 0, "message size must be at least one byte");
        assert!(msgs < NO_SLOT as usize, "queue capacity out of range");

        let storage = match attributes.storage {
            Some(region) => {
                assert!(
                    region.len() >= msgs * msg_size,
                    "provided storage holds less than msgs * msg_size bytes"
                );
                Storage::Provided(region)
            }
            None => Storage::Owned(vec![0u8; msgs * msg_size].into_boxed_slice()),
        };

        let mut inner = QueueInner {
            storage,
            prev: vec![NO_SLOT; msgs].into_boxed_slice(),
            next: vec![NO_SLOT; msgs].into_boxed_slice(),
            prio: vec![0; msgs].into_boxed_slice(),
            head: NO_SLOT,
            first_free: NO_SLOT,
            count: 0,
            msg_size,
        };
        inner.init();

        Self {
            name: attributes.name,
            msgs,
            msg_size,
            inner: Mutex::new(RefCell::new(inner)),
            senders: WaitList::new(),
            receivers: WaitList::new(),
        }
    }

    /// The queue's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of messages currently enqueued.
    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.inner.borrow_ref(cs).count)
    }

    /// Maximum number of messages.
    pub fn capacity(&self) -> usize {
        self.msgs
    }

    /// Size of one message, in bytes.
    pub fn msg_size(&self) -> usize {
        self.msg_size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.msgs
    }

    /// Whether the queue allocated its own payload storage.
    pub fn owns_storage(&self) -> bool {
        critical_section::with(|cs| {
            matches!(self.inner.borrow_ref(cs).storage, Storage::Owned(_))
        })
    }

    fn check_send(&self, msg: &[u8]) -> Result<()> {
        if msg.len() > self.msg_size {
            return Err(Error::MessageSize);
        }
        Ok(())
    }

    fn check_receive(&self, buf: &[u8]) -> Result<()> {
        if buf.len() < self.msg_size {
            return Err(Error::MessageSize);
        }
        Ok(())
    }

    /// Single send attempt: pops a free slot, splices it into the ring,
    /// copies the payload (zero-filling the tail) and wakes one receiver.
    fn try_push(&self, msg: &[u8], prio: MsgPriority) -> bool {
        let inserted = critical_section::with(|cs| {
            let mut q = self.inner.borrow_ref_mut(cs);
            let Some(slot) = q.pop_free() else {
                return false;
            };
            q.link_sorted(slot, prio);
            q.count += 1;
            let payload = q.payload_mut(slot);
            payload[..msg.len()].copy_from_slice(msg);
            payload[msg.len()..].fill(0);
            true
        });
        if inserted {
            self.receivers.wakeup_one();
        }
        inserted
    }

    /// Single receive attempt: copies the head payload out, unsplices the
    /// slot onto the free list and wakes one sender.
    fn try_pop(&self, buf: &mut [u8]) -> Option<MsgPriority> {
        let received = critical_section::with(|cs| {
            let mut q = self.inner.borrow_ref_mut(cs);
            if q.head == NO_SLOT {
                return None;
            }
            let slot = q.head as usize;
            let prio = q.prio[slot];
            buf[..self.msg_size].copy_from_slice(q.payload(slot));
            q.unlink_head();
            q.count -= 1;
            Some(prio)
        });
        if received.is_some() {
            self.senders.wakeup_one();
        }
        received
    }

    /// Enqueues `msg` with priority `prio`, blocking while the queue is
    /// full.
    ///
    /// Messages shorter than the queue's message size are zero-filled.
    /// Returns `EINTR` if the wait is cancelled, `EMSGSIZE` if the message
    /// does not fit.
    ///
    /// Not callable from handler mode.
    pub fn send(&self, msg: &[u8], prio: MsgPriority) -> Result<()> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        self.check_send(msg)?;

        let current = this_thread::current();
        let node = WaiterNode::current();
        loop {
            if self.try_push(msg, prio) {
                trace::emit(records::MQ_SEND, self.name.as_bytes());
                return Ok(());
            }
            {
                let _enrolled = WaitGuard::enroll(&self.senders, &node);
                // A slot may have freed between the failed attempt and the
                // enrollment; that wakeup targeted an empty list, so probe
                // again before suspending.
                if self.try_push(msg, prio) {
                    trace::emit(records::MQ_SEND, self.name.as_bytes());
                    return Ok(());
                }
                current.suspend();
            }
            if current.interrupted() {
                return Err(Error::Interrupted);
            }
        }
    }

    /// Non-blocking [`MessageQueue::send`]; fails with `EAGAIN` when the
    /// queue is full.
    ///
    /// Callable from handler mode.
    pub fn try_send(&self, msg: &[u8], prio: MsgPriority) -> Result<()> {
        self.check_send(msg)?;
        if self.try_push(msg, prio) {
            trace::emit(records::MQ_SEND, self.name.as_bytes());
            Ok(())
        } else {
            Err(Error::Again)
        }
    }

    /// [`MessageQueue::send`] bounded by `timeout` ticks (zero rounds up
    /// to one); fails with `ETIMEDOUT` when the budget elapses first.
    /// Never times out if the queue has room immediately.
    ///
    /// Not callable from handler mode.
    pub fn timed_send(&self, msg: &[u8], prio: MsgPriority, timeout: Tick) -> Result<()> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        self.check_send(msg)?;

        let current = this_thread::current();
        let node = WaiterNode::current();
        let deadline = Deadline::after(timeout);
        loop {
            if self.try_push(msg, prio) {
                trace::emit(records::MQ_SEND, self.name.as_bytes());
                return Ok(());
            }
            if deadline.expired() {
                return Err(Error::TimedOut);
            }
            {
                let _enrolled = WaitGuard::enroll(&self.senders, &node);
                if self.try_push(msg, prio) {
                    trace::emit(records::MQ_SEND, self.name.as_bytes());
                    return Ok(());
                }
                clock::wait_for(deadline.remaining())?;
            }
            if current.interrupted() {
                return Err(Error::Interrupted);
            }
        }
    }

    /// Dequeues the oldest of the highest-priority messages into `buf`,
    /// blocking while the queue is empty. Returns the message's priority.
    ///
    /// `buf` must hold at least one full message; exactly
    /// [`MessageQueue::msg_size`] bytes are written. Returns `EINTR` if
    /// the wait is cancelled.
    ///
    /// Not callable from handler mode.
    pub fn receive(&self, buf: &mut [u8]) -> Result<MsgPriority> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        self.check_receive(buf)?;

        let current = this_thread::current();
        let node = WaiterNode::current();
        loop {
            if let Some(prio) = self.try_pop(buf) {
                trace::emit(records::MQ_RECEIVE, self.name.as_bytes());
                return Ok(prio);
            }
            {
                let _enrolled = WaitGuard::enroll(&self.receivers, &node);
                if let Some(prio) = self.try_pop(buf) {
                    trace::emit(records::MQ_RECEIVE, self.name.as_bytes());
                    return Ok(prio);
                }
                current.suspend();
            }
            if current.interrupted() {
                return Err(Error::Interrupted);
            }
        }
    }

    /// Non-blocking [`MessageQueue::receive`]; fails with `EAGAIN` when
    /// the queue is empty.
    ///
    /// Callable from handler mode.
    pub fn try_receive(&self, buf: &mut [u8]) -> Result<MsgPriority> {
        self.check_receive(buf)?;
        match self.try_pop(buf) {
            Some(prio) => {
                trace::emit(records::MQ_RECEIVE, self.name.as_bytes());
                Ok(prio)
            }
            None => Err(Error::Again),
        }
    }

    /// [`MessageQueue::receive`] bounded by `timeout` ticks (zero rounds
    /// up to one); fails with `ETIMEDOUT` when the budget elapses first.
    /// Never times out if a message is available immediately.
    ///
    /// Not callable from handler mode.
    pub fn timed_receive(&self, buf: &mut [u8], timeout: Tick) -> Result<MsgPriority> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        self.check_receive(buf)?;

        let current = this_thread::current();
        let node = WaiterNode::current();
        let deadline = Deadline::after(timeout);
        loop {
            if let Some(prio) = self.try_pop(buf) {
                trace::emit(records::MQ_RECEIVE, self.name.as_bytes());
                return Ok(prio);
            }
            if deadline.expired() {
                return Err(Error::TimedOut);
            }
            {
                let _enrolled = WaitGuard::enroll(&self.receivers, &node);
                if let Some(prio) = self.try_pop(buf) {
                    trace::emit(records::MQ_RECEIVE, self.name.as_bytes());
                    return Ok(prio);
                }
                clock::wait_for(deadline.remaining())?;
            }
            if current.interrupted() {
                return Err(Error::Interrupted);
            }
        }
    }

    /// Discards all messages, rethreads every slot onto the free list and
    /// wakes all blocked senders and receivers. The woken threads re-enter
    /// their retry loops: a sender re-sends, a receiver observes the empty
    /// queue and blocks again or times out.
    ///
    /// Not callable from handler mode.
    pub fn reset(&self) -> Result<()> {
        if port::in_handler_mode() {
            return Err(Error::NotPermitted);
        }
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).init();
            self.senders.wakeup_all_locked(cs);
            self.receivers.wakeup_all_locked(cs);
        });
        trace::emit(records::MQ_RESET, self.name.as_bytes());
        Ok(())
    }
}

impl Drop for MessageQueue {
    fn drop(&mut self) {
        // Destroying a queue with blocked threads is undefined; owned
        // storage is released by the Storage drop.
        debug_assert!(self.senders.is_empty(), "queue dropped with blocked senders");
        debug_assert!(
            self.receivers.is_empty(),
            "queue dropped with blocked receivers"
        );
    }
}

impl fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("name", &self.name)
            .field("msgs", &self.msgs)
            .field("msg_size", &self.msg_size)
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recv(queue: &MessageQueue) -> (Vec<u8>, MsgPriority) {
        let mut buf = vec![0u8; queue.msg_size()];
        let prio = queue.try_receive(&mut buf).expect("receive");
        (buf, prio)
    }

    #[test]
    fn fifo_among_equal_priorities() {
        let queue = MessageQueue::new(4, 4);
        queue.try_send(b"aaaa", 3).expect("send a");
        queue.try_send(b"bbbb", 3).expect("send b");
        queue.try_send(b"cccc", 3).expect("send c");

        assert_eq!(recv(&queue).0, b"aaaa");
        assert_eq!(recv(&queue).0, b"bbbb");
        assert_eq!(recv(&queue).0, b"cccc");
    }

    #[test]
    fn higher_priority_is_delivered_first() {
        let queue = MessageQueue::new(4, 4);
        queue.try_send(b"low1", 1).expect("send");
        queue.try_send(b"high", 9).expect("send");
        queue.try_send(b"low2", 1).expect("send");
        queue.try_send(b"mid1", 5).expect("send");

        assert_eq!(recv(&queue), (b"high".to_vec(), 9));
        assert_eq!(recv(&queue), (b"mid1".to_vec(), 5));
        assert_eq!(recv(&queue), (b"low1".to_vec(), 1));
        assert_eq!(recv(&queue), (b"low2".to_vec(), 1));
    }

    #[test]
    fn full_queue_rejects_try_send() {
        let queue = MessageQueue::new(2, 1);
        queue.try_send(b"a", 0).expect("send");
        queue.try_send(b"b", 0).expect("send");
        assert!(queue.is_full());
        assert_eq!(queue.try_send(b"c", 0), Err(Error::Again));
    }

    #[test]
    fn empty_queue_rejects_try_receive() {
        let queue = MessageQueue::new(2, 1);
        let mut buf = [0u8; 1];
        assert_eq!(queue.try_receive(&mut buf), Err(Error::Again));
    }

    #[test]
    fn short_messages_are_zero_filled() {
        let queue = MessageQueue::new(1, 8);
        queue.try_send(b"xy", 0).expect("send");
        let mut buf = [0xffu8; 8];
        queue.try_receive(&mut buf).expect("receive");
        assert_eq!(&buf, b"xy\0\0\0\0\0\0");
    }

    #[test]
    fn oversized_message_fails() {
        let queue = MessageQueue::new(1, 4);
        assert_eq!(queue.try_send(b"12345", 0), Err(Error::MessageSize));
        let mut small = [0u8; 3];
        assert_eq!(queue.try_receive(&mut small), Err(Error::MessageSize));
    }

    #[test]
    fn slot_conservation_across_operations() {
        let queue = MessageQueue::new(3, 2);
        let check = |q: &MessageQueue| {
            critical_section::with(|cs| {
                let inner = q.inner.borrow_ref(cs);
                assert_eq!(inner.count + inner.free_len(), q.capacity());
            });
        };

        check(&queue);
        queue.try_send(b"aa", 2).expect("send");
        check(&queue);
        queue.try_send(b"bb", 7).expect("send");
        check(&queue);
        let mut buf = [0u8; 2];
        queue.try_receive(&mut buf).expect("receive");
        check(&queue);
        queue.try_send(b"cc", 1).expect("send");
        queue.try_send(b"dd", 1).expect("send");
        check(&queue);
        queue.reset().expect("reset");
        check(&queue);
        assert!(queue.is_empty());
    }

    #[test]
    fn capacity_sends_from_empty_never_block(){
        let queue = MessageQueue::new(8, 2);
        for i in 0..8u8 {
            queue.try_send(&[i, i], 0).expect("send within capacity");
        }
        assert!(queue.is_full());
    }

    #[test]
    fn reset_rethreads_all_slots() {
        let queue = MessageQueue::new(3, 2);
        queue.try_send(b"aa", 1).expect("send");
        queue.try_send(b"bb", 2).expect("send");
        queue.reset().expect("reset");
        assert_eq!(queue.len(), 0);
        // All three slots are usable again.
        for _ in 0..3 {
            queue.try_send(b"zz", 0).expect("send after reset");
        }
    }

    #[test]
    fn try_variants_are_isr_safe() {
        let queue = MessageQueue::new(1, 2);
        crate::port::interrupt_context(|| {
            queue.try_send(b"ab", 0).expect("try_send from handler");
            let mut buf = [0u8; 2];
            queue.try_receive(&mut buf).expect("try_receive from handler");
            assert_eq!(&buf, b"ab");
        });
    }

    #[test]
    fn blocking_variants_are_isr_forbidden() {
        let queue = MessageQueue::new(1, 2);
        let mut buf = [0u8; 2];
        crate::port::interrupt_context(|| {
            assert_eq!(queue.send(b"ab", 0), Err(Error::NotPermitted));
            assert_eq!(queue.receive(&mut buf).err(), Some(Error::NotPermitted));
            assert_eq!(queue.timed_send(b"ab", 0, 1), Err(Error::NotPermitted));
            assert_eq!(queue.timed_receive(&mut buf, 1).err(), Some(Error::NotPermitted));
            assert_eq!(queue.reset(), Err(Error::NotPermitted));
        });
    }

    #[test]
    fn storage_ownership_is_reported() {
        let owned = MessageQueue::new(1, 1);
        assert!(owned.owns_storage());

        let region = Box::leak(vec![0u8; 8].into_boxed_slice());
        let provided =
            MessageQueue::with_attributes(QueueAttributes::new("static").with_storage(region), 4, 2);
        assert!(!provided.owns_storage());
        assert_eq!(provided.name(), "static");
    }

    #[test]
    #[should_panic(expected = "capacity must be at least one")]
    fn zero_capacity_is_rejected() {
        let _ = MessageQueue::new(0, 4);
    }

    #[test]
    #[should_panic(expected = "message size must be at least one")]
    fn zero_message_size_is_rejected() {
        let _ = MessageQueue::new(4, 0);
    }

    #[test]
    #[should_panic(expected = "less than msgs * msg_size")]
    fn undersized_storage_is_rejected() {
        let region = Box::leak(vec![0u8; 4].into_boxed_slice());
        let _ = MessageQueue::with_attributes(QueueAttributes::new("small").with_storage(region), 4, 2);
    }
}
