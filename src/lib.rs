//! Queue-to-queue message advancement
//!
//! `queuehop` moves a unit of work through a graph of named queues. At each
//! queue a worker processes the payload and picks a *resolution*; the
//! routing table maps that resolution to the next queue(s).
//!
//! - [`exchange`] stores messages per queue with lease ("visibility timeout")
//!   semantics; [`exchange::api::MemoryExchange`] is the in-memory backend.
//! - [`advancer`] drives one queue's lease, process, route, delete cycle.
//! - [`notifications`] carries lifecycle events to observers.
//! - [`core`] holds logging, configuration and other shared plumbing.

pub mod advancer;
pub mod core;
pub mod exchange;
pub mod notifications;
