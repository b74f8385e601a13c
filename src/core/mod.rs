//! Core services and infrastructure shared by the exchange and the advancer

pub mod config;
pub mod error_handling;
pub mod logging;
pub mod shutdown;
pub mod sync;
pub mod time;
pub mod validation;
pub mod version;
