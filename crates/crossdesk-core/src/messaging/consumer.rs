//! A packet consumer: a private bounded queue plus a sequential delivery task.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Capacity of each consumer's private queue.
///
/// Writers suspend once a consumer falls this far behind, which is what gives
/// the fan-out layer its no-drop guarantee.
pub const CONSUMER_QUEUE_CAPACITY: usize = 100;

/// How often [`PacketConsumer::drain`] re-checks the queue length.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Error returned when writing to a consumer whose queue has been completed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("consumer queue has been completed")]
pub struct ConsumerCompleted;

type PacketCallback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

/// A subscriber in the packet fan-out layer.
///
/// Each consumer owns a private copy of every packet broadcast on the queues
/// it subscribes to, buffered in a bounded channel of
/// [`CONSUMER_QUEUE_CAPACITY`] packets.  A single delivery task (spawned by
/// [`start`](Self::start)) dequeues in FIFO order and invokes the processing
/// callback one packet at a time — never reentrantly, never in parallel.
///
/// A new consumer is subscribed to nothing; it becomes useful once subscribed
/// to a [`PacketQueue`](crate::messaging::PacketQueue) and started.
pub struct PacketConsumer<T> {
    tx: async_channel::Sender<T>,
    rx: async_channel::Receiver<T>,
    callback: PacketCallback<T>,
}

impl<T: Send + 'static> PacketConsumer<T> {
    /// Creates a consumer that processes each packet with `callback`.
    ///
    /// The callback runs on the consumer's delivery task; a panic inside it
    /// ends that task only, leaving other consumers untouched.  Callers that
    /// need to survive their own failures must guard their own callbacks.
    pub fn new<F, Fut>(callback: F) -> Arc<Self>
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = async_channel::bounded(CONSUMER_QUEUE_CAPACITY);
        Arc::new(Self {
            tx,
            rx,
            callback: Arc::new(move |packet| callback(packet).boxed()),
        })
    }

    /// Number of packets currently buffered and not yet delivered.
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the private queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Enqueues a packet, suspending while the private queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerCompleted`] once [`complete`](Self::complete) has
    /// been called.
    pub async fn write(&self, packet: T) -> Result<(), ConsumerCompleted> {
        self.tx.send(packet).await.map_err(|_| ConsumerCompleted)
    }

    /// Enqueues a packet without suspending.
    ///
    /// Returns `false` when the queue is full or completed.
    pub fn try_write(&self, packet: T) -> bool {
        self.tx.try_send(packet).is_ok()
    }

    /// Spawns the delivery task: dequeue one packet, invoke the callback,
    /// repeat until cancelled or completed-and-drained.
    ///
    /// Call once per consumer; the sequential-delivery contract assumes a
    /// single delivery task.
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let rx = self.rx.clone();
        let callback = Arc::clone(&self.callback);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        trace!("packet consumer cancelled");
                        break;
                    }
                    packet = rx.recv() => match packet {
                        Ok(packet) => callback(packet).await,
                        // Completed and fully drained.
                        Err(_) => break,
                    }
                }
            }
        })
    }

    /// Waits until the private queue is observed empty.
    ///
    /// Packets that arrive while draining are waited for as well, so this is
    /// "wait for quiescence", not "wait for delivery of call N": the callback
    /// for the final dequeued packet may still be running when drain returns.
    pub async fn drain(&self) {
        while !self.tx.is_empty() {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    /// Closes the private queue.
    ///
    /// Subsequent writes fail with [`ConsumerCompleted`]; the delivery task
    /// processes whatever is already buffered and then stops.
    pub fn complete(&self) {
        self.tx.close();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
