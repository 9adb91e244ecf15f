//! The packet producer: the single logical writer into one fan-out queue.

use std::sync::Arc;

use crate::messaging::queue::PacketQueue;

/// Owner of exactly one [`PacketQueue`].
///
/// Writes are forwarded verbatim to the queue's broadcast operation; the
/// producer exists so that the writing side and the subscribing side of a
/// fan-out can be handed to different owners.
pub struct PacketProducer<T> {
    queue: Arc<PacketQueue<T>>,
}

impl<T: Clone + Send + 'static> PacketProducer<T> {
    /// Creates a producer together with its (initially subscriber-less) queue.
    pub fn new() -> Self {
        Self {
            queue: Arc::new(PacketQueue::new()),
        }
    }

    /// The queue this producer writes into; subscribe consumers here.
    pub fn queue(&self) -> &Arc<PacketQueue<T>> {
        &self.queue
    }

    /// Broadcasts a packet, suspending on full consumer queues.
    pub async fn write(&self, packet: T) {
        self.queue.write(packet).await;
    }

    /// Broadcasts without suspending; `true` only when every consumer
    /// accepted the packet.
    pub fn try_write(&self, packet: T) -> bool {
        self.queue.try_write(packet)
    }
}

impl<T: Clone + Send + 'static> Default for PacketProducer<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::consumer::PacketConsumer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_producer_forwards_writes_to_its_queue() {
        let producer = PacketProducer::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_cb = Arc::clone(&count);
        let consumer = PacketConsumer::new(move |_: u8| {
            let count = Arc::clone(&count_cb);
            async move {
                count.fetch_add(1, Ordering::Relaxed);
            }
        });
        producer.queue().subscribe(Arc::clone(&consumer));
        let cancel = CancellationToken::new();
        consumer.start(cancel.clone());

        producer.write(1).await;
        assert!(producer.try_write(2));

        let deadline = Instant::now() + Duration::from_secs(10);
        while count.load(Ordering::Relaxed) < 2 {
            assert!(Instant::now() < deadline, "packets not delivered within 10s");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        cancel.cancel();
    }

    #[tokio::test]
    async fn test_producer_with_no_subscribers_accepts_writes() {
        let producer: PacketProducer<u8> = PacketProducer::new();
        producer.write(1).await;
        assert!(producer.try_write(2));
        assert_eq!(producer.queue().consumer_count(), 0);
    }
}
