//! Pipeline Integration Test Modules
//!
//! Scenario modules plus the helpers they share. Everything here goes
//! through the public `api` modules only.

pub mod fan_out;
pub mod multi_stage;

use queuehop::exchange::api::{ExchangeConfig, MemoryExchange};
use std::sync::Arc;
use std::time::Duration;

/// Exchange with short polling so scenarios finish quickly
pub fn quick_exchange() -> Arc<MemoryExchange> {
    Arc::new(MemoryExchange::new(
        ExchangeConfig::default().with_poll_interval(Duration::from_millis(5)),
    ))
}

/// Poll `check` until it holds, failing the test after about two seconds
pub async fn wait_for(what: &str, mut check: impl FnMut() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("Timed out waiting for {what}");
}
