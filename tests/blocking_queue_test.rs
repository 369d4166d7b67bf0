//! Blocking queue behaviour under concurrent producers

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use traffic_gate::simulation::{BlockingQueue, QueueOrder};

#[test]
fn test_fifo_order_by_default() {
    let queue = BlockingQueue::new();
    assert_eq!(queue.order(), QueueOrder::Fifo);

    for i in 0..5 {
        queue.push(i);
    }
    assert_eq!(queue.len(), 5);

    let popped: Vec<i32> = (0..5).map(|_| queue.pop()).collect();
    assert_eq!(popped, vec![0, 1, 2, 3, 4]);
    assert!(queue.is_empty());
}

#[test]
fn test_lifo_order_takes_most_recent() {
    let queue = BlockingQueue::with_order(QueueOrder::Lifo);
    for i in 0..5 {
        queue.push(i);
    }

    let popped: Vec<i32> = (0..5).map(|_| queue.pop()).collect();
    assert_eq!(popped, vec![4, 3, 2, 1, 0]);
}

#[test]
fn test_try_pop_and_timeout_on_empty_queue() {
    let queue: BlockingQueue<u8> = BlockingQueue::new();
    assert_eq!(queue.try_pop(), None);
    assert_eq!(queue.pop_timeout(Duration::from_millis(20)), None);

    queue.push(7);
    assert_eq!(queue.pop_timeout(Duration::from_millis(20)), Some(7));
}

/// A pop on an empty queue must block until someone pushes
#[test]
fn test_pop_blocks_until_push() {
    let queue = Arc::new(BlockingQueue::new());
    let popped = Arc::new(AtomicBool::new(false));

    let consumer = {
        let queue = queue.clone();
        let popped = popped.clone();
        thread::spawn(move || {
            let value = queue.pop();
            popped.store(true, Ordering::SeqCst);
            value
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!popped.load(Ordering::SeqCst), "pop returned on an empty queue");

    queue.push("hello");
    assert_eq!(consumer.join().unwrap(), "hello");
    assert!(popped.load(Ordering::SeqCst));
}

/// Many producers, one consumer: nothing lost, nothing delivered twice
#[test]
fn test_concurrent_producers_single_consumer() {
    const PRODUCERS: usize = 8;
    const PER_PRODUCER: usize = 250;

    let queue = Arc::new(BlockingQueue::new());
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.push(p * PER_PRODUCER + i);
                }
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let item = queue
            .pop_timeout(Duration::from_secs(5))
            .expect("producer items should arrive");
        assert!(seen.insert(item), "item {} delivered twice", item);
    }

    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    assert!(queue.is_empty());
}

/// Each producer's own items come out in the order it pushed them
#[test]
fn test_fifo_preserves_per_producer_order() {
    let queue = Arc::new(BlockingQueue::new());
    let producers: Vec<_> = (0..4usize)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..100u32 {
                    queue.push((p, i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let mut last = [None; 4];
    while let Some((p, i)) = queue.try_pop() {
        if let Some(prev) = last[p] {
            assert!(i > prev, "producer {} items out of order", p);
        }
        last[p] = Some(i);
    }
    assert!(last.iter().all(|l| *l == Some(99)));
}
