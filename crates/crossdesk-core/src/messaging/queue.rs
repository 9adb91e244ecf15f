//! The fan-out hub: broadcasts every packet to all subscribed consumers.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::messaging::consumer::PacketConsumer;

/// A fan-out hub delivering every written packet to every subscribed
/// [`PacketConsumer`].
///
/// Subscribe and unsubscribe are mutually exclusive, but a broadcast iterates
/// a snapshot of the subscriber set taken without holding the lock for the
/// duration of delivery.  A consumer added or removed while a broadcast is in
/// flight may or may not receive that packet — best effort by design, so that
/// structural changes never stall delivery to the other consumers.
pub struct PacketQueue<T> {
    // Copy-on-write: mutation replaces the Arc'd vector, broadcast clones it.
    consumers: Mutex<Arc<Vec<Arc<PacketConsumer<T>>>>>,
}

impl<T: Clone + Send + 'static> PacketQueue<T> {
    /// Creates an empty queue with no subscribers.
    pub fn new() -> Self {
        Self {
            consumers: Mutex::new(Arc::new(Vec::new())),
        }
    }

    /// Adds a consumer to the subscriber set.
    ///
    /// Duplicate subscriptions are not rejected; a consumer subscribed twice
    /// receives every packet twice.
    pub fn subscribe(&self, consumer: Arc<PacketConsumer<T>>) {
        let mut guard = self.consumers.lock();
        let mut next = Vec::with_capacity(guard.len() + 1);
        next.extend(guard.iter().cloned());
        next.push(consumer);
        *guard = Arc::new(next);
    }

    /// Removes a consumer (matched by identity) from the subscriber set.
    ///
    /// Removing a consumer that was never subscribed is a no-op.
    pub fn unsubscribe(&self, consumer: &Arc<PacketConsumer<T>>) {
        let mut guard = self.consumers.lock();
        let next: Vec<_> = guard
            .iter()
            .filter(|entry| !Arc::ptr_eq(entry, consumer))
            .cloned()
            .collect();
        *guard = Arc::new(next);
    }

    /// Number of currently subscribed consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumers.lock().len()
    }

    /// Broadcasts a packet to every subscribed consumer, suspending on each
    /// full consumer queue.
    ///
    /// The slowest consumer gates the whole broadcast: no packet is dropped,
    /// at the price of shared throughput.  Consumers whose queue has been
    /// completed are skipped so that one finished subscriber cannot block
    /// delivery to the rest.
    pub async fn write(&self, packet: T) {
        let snapshot = self.snapshot();
        for consumer in snapshot.iter() {
            if consumer.write(packet.clone()).await.is_err() {
                debug!("skipping completed consumer during broadcast");
            }
        }
    }

    /// Attempts to broadcast without suspending.
    ///
    /// Returns `true` only if every subscribed consumer accepted the packet.
    /// On `false`, delivery may have been partial — some consumers received
    /// the packet and others did not — and the caller must tolerate that.
    pub fn try_write(&self, packet: T) -> bool {
        let snapshot = self.snapshot();
        let mut delivered_to_all = true;
        for consumer in snapshot.iter() {
            delivered_to_all &= consumer.try_write(packet.clone());
        }
        delivered_to_all
    }

    /// Takes a point-in-time snapshot of the subscriber set.
    ///
    /// Broadcast sees a recent-but-possibly-stale view; the lock is held only
    /// long enough to clone the Arc.
    fn snapshot(&self) -> Arc<Vec<Arc<PacketConsumer<T>>>> {
        self.consumers.lock().clone()
    }
}

impl<T: Clone + Send + 'static> Default for PacketQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::consumer::CONSUMER_QUEUE_CAPACITY;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    fn counting_consumer() -> (Arc<PacketConsumer<u32>>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = Arc::clone(&count);
        let consumer = PacketConsumer::new(move |_: u32| {
            let count = Arc::clone(&count_cb);
            async move {
                count.fetch_add(1, Ordering::Relaxed);
            }
        });
        (consumer, count)
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !condition() {
            assert!(Instant::now() < deadline, "condition not met within 10s");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscribed_consumer() {
        let queue = PacketQueue::new();
        let (a, count_a) = counting_consumer();
        let (b, count_b) = counting_consumer();
        queue.subscribe(Arc::clone(&a));
        queue.subscribe(Arc::clone(&b));
        let cancel = CancellationToken::new();
        a.start(cancel.clone());
        b.start(cancel.clone());

        for i in 0..25 {
            queue.write(i).await;
        }

        wait_for(|| {
            count_a.load(Ordering::Relaxed) == 25 && count_b.load(Ordering::Relaxed) == 25
        })
        .await;
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_unsubscribed_consumer_stops_receiving_but_others_continue() {
        let queue = PacketQueue::new();
        let (a, count_a) = counting_consumer();
        let (b, count_b) = counting_consumer();
        queue.subscribe(Arc::clone(&a));
        queue.subscribe(Arc::clone(&b));
        let cancel = CancellationToken::new();
        a.start(cancel.clone());
        b.start(cancel.clone());

        queue.write(1).await;
        wait_for(|| count_a.load(Ordering::Relaxed) == 1 && count_b.load(Ordering::Relaxed) == 1)
            .await;

        queue.unsubscribe(&a);
        assert_eq!(queue.consumer_count(), 1);

        queue.write(2).await;
        wait_for(|| count_b.load(Ordering::Relaxed) == 2).await;
        // Only B's outcome is part of the contract; A must simply have
        // stopped growing once the unsubscribe completed.
        assert_eq!(count_a.load(Ordering::Relaxed), 1);
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_unsubscribe_of_unknown_consumer_is_noop() {
        let queue = PacketQueue::new();
        let (a, _) = counting_consumer();
        let (stranger, _) = counting_consumer();
        queue.subscribe(Arc::clone(&a));

        queue.unsubscribe(&stranger);
        assert_eq!(queue.consumer_count(), 1);
    }

    #[tokio::test]
    async fn test_try_write_reports_partial_delivery() {
        let queue = PacketQueue::new();
        let (full, _) = counting_consumer();
        let (empty, _) = counting_consumer();
        queue.subscribe(Arc::clone(&full));
        queue.subscribe(Arc::clone(&empty));

        // Fill one consumer to capacity without starting it.
        for _ in 0..CONSUMER_QUEUE_CAPACITY {
            assert!(full.try_write(0));
        }

        // The full consumer refuses, the other accepts: partial delivery.
        assert!(!queue.try_write(7));
        assert_eq!(full.len(), CONSUMER_QUEUE_CAPACITY);
        assert_eq!(empty.len(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_skips_completed_consumer() {
        let queue = PacketQueue::new();
        let (done, _) = counting_consumer();
        let (live, count_live) = counting_consumer();
        queue.subscribe(Arc::clone(&done));
        queue.subscribe(Arc::clone(&live));
        let cancel = CancellationToken::new();
        live.start(cancel.clone());

        done.complete();
        queue.write(3).await;

        wait_for(|| count_live.load(Ordering::Relaxed) == 1).await;
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_duplicate_subscription_delivers_twice() {
        let queue = PacketQueue::new();
        let (a, count_a) = counting_consumer();
        queue.subscribe(Arc::clone(&a));
        queue.subscribe(Arc::clone(&a));
        let cancel = CancellationToken::new();
        a.start(cancel.clone());

        queue.write(1).await;
        wait_for(|| count_a.load(Ordering::Relaxed) == 2).await;
        cancel.cancel();
    }
}
