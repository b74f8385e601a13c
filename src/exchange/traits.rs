//! The exchange capability

use crate::exchange::error::ExchangeResult;
use crate::exchange::message::Message;
use async_trait::async_trait;
use serde_json::Value;

/// Lease-based message storage keyed by queue name
///
/// Implementations provide at-least-once delivery: a leased message is
/// hidden until its visibility timeout elapses and reappears unless it is
/// deleted first. Queues are created implicitly on first use.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Store `message` on `queue` and return its new transport id
    async fn enqueue(&self, queue: &str, message: Message) -> ExchangeResult<String>;

    /// Store a bare payload as a fresh message with an empty path
    async fn enqueue_payload(&self, queue: &str, payload: Value) -> ExchangeResult<String> {
        self.enqueue(queue, Message::from_payload(payload)).await
    }

    /// Lease one message, waiting until one becomes available
    ///
    /// Dropping the returned future abandons the wait without taking a
    /// lease.
    async fn lease(&self, queue: &str) -> ExchangeResult<Message>;

    /// Remove a message for good
    async fn delete(&self, queue: &str, transport_id: &str) -> ExchangeResult<()>;

    /// Messages on `queue` that a `lease` call could grant right now
    async fn leasable(&self, queue: &str) -> ExchangeResult<Vec<Message>>;
}
