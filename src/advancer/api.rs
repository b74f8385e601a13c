//! Public API for the advancer
//!
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::advancer::error::{AdvancerError, AdvancerResult};
pub use crate::advancer::hop::{Advancer, HopSummary};
pub use crate::advancer::routing::{dead_letter_queue, Destinations, RouteLookup, RoutingTable};
pub use crate::advancer::runner::{RunHandle, RunnerConfig};
pub use crate::advancer::worker::{
    invoke, normalize_value, Completion, Worker, WorkerError, WorkerOutcome, WorkerReturn,
    SUCCESS_RESOLUTION,
};

/// Worker adapter constructors
pub mod worker {
    pub use crate::advancer::worker::{callback, direct, future};
}
