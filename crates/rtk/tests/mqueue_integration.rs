//! Integration tests for message queues with blocking threads.

use std::sync::Arc;
use std::time::Duration;

use rtk::mqueue::MessageQueue;
use rtk::thread::ThreadAttributes;
use rtk::{clock, Error, Thread, ThreadState};

fn msg(id: u8) -> [u8; 4] {
    [id, 0, 0, 0]
}

#[test]
fn receives_follow_priority_then_fifo() {
    let queue = MessageQueue::new(3, 4);
    queue.try_send(&msg(1), 5).expect("send id 1");
    queue.try_send(&msg(2), 9).expect("send id 2");
    queue.try_send(&msg(3), 5).expect("send id 3");

    let mut buf = [0u8; 4];
    assert_eq!(queue.receive(&mut buf).expect("receive"), 9);
    assert_eq!(buf, msg(2));
    assert_eq!(queue.receive(&mut buf).expect("receive"), 5);
    assert_eq!(buf, msg(1));
    assert_eq!(queue.receive(&mut buf).expect("receive"), 5);
    assert_eq!(buf, msg(3));

    assert_eq!(queue.try_receive(&mut buf), Err(Error::Again));
}

#[test]
fn blocked_sender_wakes_on_receive() {
    let queue = Arc::new(MessageQueue::new(1, 4));
    queue.try_send(&msg(1), 0).expect("fill queue");

    let sender_queue = Arc::clone(&queue);
    let sender = Thread::new(ThreadAttributes::new("blocked-sender"), move || {
        sender_queue.send(&msg(2), 0).expect("blocking send")
    });

    // Give the sender time to block on the full queue.
    std::thread::sleep(Duration::from_millis(50));
    assert!(!sender.state().is_terminated());

    let mut buf = [0u8; 4];
    queue.receive(&mut buf).expect("receive");
    assert_eq!(buf, msg(1));

    sender.join().expect("sender finished ok");
    // The sender's message is the one left behind.
    assert_eq!(queue.len(), 1);
    queue.try_receive(&mut buf).expect("receive");
    assert_eq!(buf, msg(2));
}

#[test]
fn timed_receive_times_out_on_empty_queue() {
    let queue = MessageQueue::new(2, 4);
    let mut buf = [0u8; 4];

    let start = clock::now();
    assert_eq!(queue.timed_receive(&mut buf, 5), Err(Error::TimedOut));
    let elapsed = rtk::time::elapsed(start, clock::now());
    assert!(elapsed >= 5, "timed out after only {elapsed} ticks");
    // Generous upper bound: host scheduling jitter.
    assert!(elapsed < 500, "timed out after {elapsed} ticks");
}

#[test]
fn timed_send_times_out_on_full_queue() {
    let queue = MessageQueue::new(1, 4);
    queue.try_send(&msg(1), 0).expect("fill queue");

    let start = clock::now();
    assert_eq!(queue.timed_send(&msg(2), 0, 5), Err(Error::TimedOut));
    assert!(rtk::time::elapsed(start, clock::now()) >= 5);
    // The failed send had no partial effect.
    assert_eq!(queue.len(), 1);
}

#[test]
fn cancel_interrupts_blocked_receiver() {
    let queue = Arc::new(MessageQueue::new(2, 4));

    let receiver_queue = Arc::clone(&queue);
    let receiver = Thread::new(ThreadAttributes::new("cancelled-receiver"), move || {
        let mut buf = [0u8; 4];
        receiver_queue.receive(&mut buf)
    });

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(receiver.state(), ThreadState::Suspended);

    receiver.cancel().expect("cancel");
    let result = receiver.join().expect("join");
    let result = result
        .downcast::<rtk::Result<rtk::MsgPriority>>()
        .expect("receive result");
    assert_eq!(*result, Err(Error::Interrupted));

    // No partial effect on the queue.
    assert!(queue.is_empty());
    queue.try_send(&msg(7), 1).expect("queue still works");
}

#[test]
fn reset_wakes_blocked_receivers_without_delivering() {
    let queue = Arc::new(MessageQueue::new(3, 4));

    // Two receivers block on the empty queue with a long budget.
    let spawn_receiver = |name: &str| {
        let q = Arc::clone(&queue);
        Thread::new(ThreadAttributes::new(name), move || {
            let mut buf = [0u8; 4];
            q.timed_receive(&mut buf, 2_000).map(|prio| (buf, prio))
        })
    };
    let first = spawn_receiver("reset-rx-1");
    let second = spawn_receiver("reset-rx-2");

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(first.state(), ThreadState::Suspended);
    assert_eq!(second.state(), ThreadState::Suspended);

    queue.reset().expect("reset");
    // The woken receivers observe the still-empty queue and block again;
    // no message was delivered and every slot is free.
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(queue.len(), 0);
    assert!(!first.state().is_terminated());
    assert!(!second.state().is_terminated());

    // Both receivers complete once real messages arrive.
    queue.try_send(&msg(1), 1).expect("send");
    queue.try_send(&msg(2), 1).expect("send");

    for receiver in [first, second] {
        let result = receiver.join().expect("join");
        let result = result
            .downcast::<rtk::Result<([u8; 4], rtk::MsgPriority)>>()
            .expect("receive result");
        let (buf, prio) = result.expect("woken receiver got a message");
        assert_eq!(prio, 1);
        assert!(buf == msg(1) || buf == msg(2));
    }
}

#[test]
fn reset_rethreads_slots_of_a_loaded_queue() {
    let queue = MessageQueue::new(3, 4);
    queue.try_send(&msg(1), 3).expect("send");
    queue.try_send(&msg(2), 2).expect("send");
    queue.try_send(&msg(3), 1).expect("send");

    queue.reset().expect("reset");
    assert_eq!(queue.len(), 0);
    // All slots are back on the free list: a full round of sends succeeds.
    for id in 4..7u8 {
        queue.try_send(&msg(id), 0).expect("send after reset");
    }
    assert!(queue.is_full());
}

#[test]
fn blocked_senders_wake_fifo() {
    let queue = Arc::new(MessageQueue::new(1, 4));
    queue.try_send(&msg(0), 0).expect("fill");

    let log = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut senders = Vec::new();
    for id in 1..4u8 {
        let q = Arc::clone(&queue);
        let log = Arc::clone(&log);
        senders.push(Thread::new(
            ThreadAttributes::new(format!("fifo-sender-{id}")),
            move || {
                q.send(&msg(id), 0).expect("send");
                log.lock().unwrap().push(id);
            },
        ));
        // Stagger enrollment so the wait-list order is deterministic.
        std::thread::sleep(Duration::from_millis(30));
    }

    let mut buf = [0u8; 4];
    for _ in 0..3 {
        queue.receive(&mut buf).expect("receive");
        std::thread::sleep(Duration::from_millis(30));
    }
    for sender in senders {
        sender.join().expect("join");
    }

    // The oldest blocked sender got each freed slot.
    assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
    assert_eq!(queue.len(), 1);
}
