//! Test modules for the exchange
//!
//! Most tests drive a `MemoryExchange` with a `MockTimeProvider` so that
//! visibility timeouts and retention periods can be crossed without
//! sleeping.


use crate::core::time::MockTimeProvider;
use crate::exchange::api::{ExchangeConfig, MemoryExchange};
use std::sync::Arc;
use std::time::Duration;

fn mock_exchange(visibility_secs: u64, retention_secs: u64) -> (MemoryExchange, MockTimeProvider) {
    let clock = MockTimeProvider::new();
    let config = ExchangeConfig::default()
        .with_visibility_timeout(Duration::from_secs(visibility_secs))
        .with_retention_period(Duration::from_secs(retention_secs))
        .with_poll_interval(Duration::from_millis(5));
    let exchange = MemoryExchange::new(config).with_clock(Arc::new(clock.clone()));
    (exchange, clock)
}
