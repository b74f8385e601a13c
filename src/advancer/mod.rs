//! Queue-to-queue advancement
//!
//! An [`Advancer`](api::Advancer) drives the hop cycle of one or more
//! source queues:
//!
//! ```text
//!   lease ──▶ worker ──▶ path += "<queue>:<resolution>" ──▶ route
//!                                                            │
//!        delete source ◀── post to every destination ◀───────┘
//! ```
//!
//! Unmapped resolutions go to the dead-letter queue `"<queue>/<resolution>"`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use queuehop::advancer::api::{worker, Advancer, Destinations, RoutingTable};
//! use queuehop::exchange::api::{Exchange, ExchangeConfig, MemoryExchange};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let exchange = MemoryExchange::create(ExchangeConfig::default()).await;
//!
//! let mut routes = RoutingTable::new();
//! routes.add_route(
//!     "validate",
//!     [("success", Destinations::from(["persist", "audit"]))],
//!     worker::direct(|payload| Ok(payload)),
//! );
//!
//! let advancer = Arc::new(Advancer::new(exchange.clone(), routes));
//! exchange.enqueue_payload("validate", json!({"name": "x"})).await?;
//!
//! let summary = advancer.run("validate").await?;
//! assert_eq!(summary.destination_queues, ["persist", "audit"]);
//!
//! let handle = advancer.run_forever("validate")?;
//! handle.stop_and_join().await;
//! # Ok(())
//! # }
//! ```

pub(crate) mod error;
pub(crate) mod hop;
pub(crate) mod routing;
pub(crate) mod runner;
pub(crate) mod worker;

pub mod api;

#[cfg(test)]
mod tests;
