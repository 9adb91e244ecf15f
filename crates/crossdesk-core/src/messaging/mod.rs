//! In-process packet fan-out: one producer, one queue, N consumers.
//!
//! A [`PacketProducer`] owns exactly one [`PacketQueue`].  Any number of
//! [`PacketConsumer`]s subscribe to the queue; every packet written to the
//! queue is copied into each subscribed consumer's private bounded queue, and
//! each consumer's own delivery task invokes its callback sequentially.
//!
//! Delivery favours correctness over isolation: a broadcast suspends on each
//! full consumer queue, so the slowest consumer sets the throughput ceiling
//! for the whole queue, and no packet is ever dropped.  The non-suspending
//! [`PacketQueue::try_write`] variant exists for callers that prefer partial
//! delivery to waiting.

pub mod consumer;
pub mod producer;
pub mod queue;

pub use consumer::{ConsumerCompleted, PacketConsumer, CONSUMER_QUEUE_CAPACITY};
pub use producer::PacketProducer;
pub use queue::PacketQueue;
