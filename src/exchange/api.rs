//! Public API for the exchange
//!
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::exchange::config::ExchangeConfig;
pub use crate::exchange::error::{ExchangeError, ExchangeResult};
pub use crate::exchange::memory::MemoryExchange;
pub use crate::exchange::message::{hop_tag, Message, ERR_RESOLUTION};
pub use crate::exchange::traits::Exchange;
