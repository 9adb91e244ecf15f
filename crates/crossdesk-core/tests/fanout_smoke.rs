//! Fan-out smoke test: a producer pushes a large packet stream through a
//! queue with two subscribed consumers, and both must observe every packet
//! exactly once.
//!
//! This exercises the no-drop-under-backpressure guarantee end to end: the
//! consumer queues are bounded at 100 packets, so the producer is forced to
//! suspend on the slower consumer throughout the run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossdesk_core::protocol::message::{Message, MessageType};
use crossdesk_core::{PacketConsumer, PacketProducer};
use tokio_util::sync::CancellationToken;

const MESSAGE_COUNT: usize = 1_000_000;

fn counting_consumer() -> (Arc<PacketConsumer<Message>>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let count_cb = Arc::clone(&count);
    let consumer = PacketConsumer::new(move |_packet: Message| {
        let count = Arc::clone(&count_cb);
        async move {
            count.fetch_add(1, Ordering::Relaxed);
        }
    });
    (consumer, count)
}

async fn wait_for_count(count: &AtomicUsize, expected: usize, deadline: Instant) {
    while count.load(Ordering::Relaxed) < expected {
        assert!(
            Instant::now() < deadline,
            "only {} of {expected} packets delivered before the deadline",
            count.load(Ordering::Relaxed)
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn delivers_one_million_packets_to_both_consumers_exactly_once() {
    let producer = PacketProducer::new();

    let (consumer1, count1) = counting_consumer();
    let (consumer2, count2) = counting_consumer();
    producer.queue().subscribe(Arc::clone(&consumer1));
    producer.queue().subscribe(Arc::clone(&consumer2));

    let cancel = CancellationToken::new();
    let task1 = consumer1.start(cancel.clone());
    let task2 = consumer2.start(cancel.clone());

    let started = Instant::now();
    for i in 0..MESSAGE_COUNT {
        producer
            .write(Message::new(i as i32, MessageType::Heartbeat))
            .await;
    }

    // Both consumers must catch up, then drain must observe empty queues.
    let deadline = Instant::now() + Duration::from_secs(300);
    wait_for_count(&count1, MESSAGE_COUNT, deadline).await;
    wait_for_count(&count2, MESSAGE_COUNT, deadline).await;
    consumer1.drain().await;
    consumer2.drain().await;

    println!(
        "{MESSAGE_COUNT} packets fanned out to 2 consumers in {:?}",
        started.elapsed()
    );

    // Exactly once each: no loss, no duplication.
    assert_eq!(count1.load(Ordering::Relaxed), MESSAGE_COUNT);
    assert_eq!(count2.load(Ordering::Relaxed), MESSAGE_COUNT);

    consumer1.complete();
    consumer2.complete();
    cancel.cancel();
    task1.await.expect("consumer 1 task");
    task2.await.expect("consumer 2 task");
}

/// Unsubscribing one consumer while a broadcast stream is in flight must not
/// corrupt delivery to the remaining consumer.  Only B's outcome is part of
/// the contract: A may or may not see packets that were mid-broadcast.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unsubscribe_during_broadcast_does_not_corrupt_other_consumer() {
    let producer = Arc::new(PacketProducer::new());
    let (a, _count_a) = counting_consumer();
    let (b, count_b) = counting_consumer();
    producer.queue().subscribe(Arc::clone(&a));
    producer.queue().subscribe(Arc::clone(&b));

    let cancel = CancellationToken::new();
    let a_task = a.start(cancel.clone());
    let b_task = b.start(cancel.clone());

    let total = 10_000usize;
    let writer = {
        let producer = Arc::clone(&producer);
        tokio::spawn(async move {
            for i in 0..total {
                producer
                    .write(Message::new(i as i32, MessageType::Heartbeat))
                    .await;
            }
        })
    };

    // Pull A out somewhere in the middle of the stream.
    tokio::time::sleep(Duration::from_millis(5)).await;
    producer.queue().unsubscribe(&a);

    writer.await.expect("writer task");
    let deadline = Instant::now() + Duration::from_secs(60);
    wait_for_count(&count_b, total, deadline).await;
    assert_eq!(count_b.load(Ordering::Relaxed), total);

    cancel.cancel();
    a_task.await.expect("consumer A task");
    b_task.await.expect("consumer B task");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_consumer_backpressure_does_not_drop_for_fast_consumer() {
    let producer = PacketProducer::new();

    let (fast, fast_count) = counting_consumer();

    // The slow consumer sleeps on every packet, forcing the producer to
    // suspend once the slow queue fills.
    let slow_count = Arc::new(AtomicUsize::new(0));
    let slow_count_cb = Arc::clone(&slow_count);
    let slow = PacketConsumer::new(move |_packet: Message| {
        let count = Arc::clone(&slow_count_cb);
        async move {
            tokio::time::sleep(Duration::from_micros(50)).await;
            count.fetch_add(1, Ordering::Relaxed);
        }
    });

    producer.queue().subscribe(Arc::clone(&fast));
    producer.queue().subscribe(Arc::clone(&slow));
    let cancel = CancellationToken::new();
    let fast_task = fast.start(cancel.clone());
    let slow_task = slow.start(cancel.clone());

    let total = 2_000usize;
    for i in 0..total {
        producer
            .write(Message::new(i as i32, MessageType::Heartbeat))
            .await;
    }

    let deadline = Instant::now() + Duration::from_secs(60);
    wait_for_count(&fast_count, total, deadline).await;
    wait_for_count(&slow_count, total, deadline).await;

    assert_eq!(fast_count.load(Ordering::Relaxed), total);
    assert_eq!(slow_count.load(Ordering::Relaxed), total);

    fast.complete();
    slow.complete();
    fast_task.await.expect("fast task");
    slow_task.await.expect("slow task");
}
