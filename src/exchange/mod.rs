//! Lease-based message exchange
//!
//! An [`Exchange`](api::Exchange) stores [`Message`](api::Message)s per
//! named queue with at-least-once delivery:
//!
//! - `enqueue` mints a fresh transport id and creates the queue on first use
//! - `lease` hides one message for the visibility timeout and hands it out
//! - `delete` removes it for good; an undeleted lease simply expires and the
//!   message becomes leasable again
//!
//! [`MemoryExchange`](api::MemoryExchange) is the in-process implementation,
//! with a background sweeper enforcing the retention period.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use queuehop::exchange::api::{Exchange, ExchangeConfig, MemoryExchange};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exchange = MemoryExchange::create(ExchangeConfig::default()).await;
//!
//! exchange.enqueue_payload("ingest", json!({"name": "x"})).await?;
//! let message = exchange.lease("ingest").await?;
//!
//! let transport_id = message.transport_id.as_deref().unwrap_or_default();
//! exchange.delete("ingest", transport_id).await?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod memory;
pub(crate) mod message;
pub(crate) mod traits;

pub mod api;

#[cfg(test)]
mod tests;
