//! Continuous per-queue execution

use crate::advancer::error::AdvancerResult;
use crate::advancer::hop::Advancer;
use crate::core::error_handling::log_error_with_context;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::validation::{duration_millis, positive_integer, ValidationError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const DEFAULT_RUNNER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Options for [`Advancer::run_forever_with`]
#[derive(Debug, Clone, PartialEq)]
pub struct RunnerConfig {
    /// Minimum spacing between hop attempts of one slot
    pub poll_interval: Duration,
    /// Number of independent hop slots on the queue
    pub concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_RUNNER_POLL_INTERVAL,
            concurrency: 1,
        }
    }
}

impl RunnerConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Apply `[runner]` values on top of the current settings
    pub fn apply_toml_values(&mut self, config: &toml::Table) -> Result<(), ValidationError> {
        if let Some(interval) = duration_millis(config, &["poll-interval-ms", "pollIntervalMs"])? {
            self.poll_interval = interval;
        }
        if let Some(concurrency) = positive_integer(config, &["concurrency"])? {
            self.concurrency = usize::try_from(concurrency)
                .map_err(|_| ValidationError::new("'concurrency' is too large"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RunStats {
    hops_completed: AtomicU64,
    errors: AtomicU64,
}

/// Control handle of a running loop
///
/// Dropping the handle detaches the loop; call [`stop`](Self::stop) to end
/// it.
#[derive(Debug)]
pub struct RunHandle {
    queue: String,
    shutdown: ShutdownCoordinator,
    slots: Vec<JoinHandle<()>>,
    stats: Arc<RunStats>,
}

impl RunHandle {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Stop starting new hops
    ///
    /// Slots waiting for a lease give up immediately. A hop that already
    /// leased its message finishes first.
    pub fn stop(&self) {
        if !self.shutdown.is_shutdown_requested() {
            log::info!("Stopping run-loop on '{}'", self.queue);
        }
        self.shutdown.trigger_shutdown();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_shutdown_requested()
    }

    /// Wait until every slot has exited
    pub async fn join(self) {
        for slot in self.slots {
            if let Err(e) = slot.await {
                log::error!("Run-loop slot on '{}' ended abnormally: {e}", self.queue);
            }
        }
    }

    pub async fn stop_and_join(self) {
        self.stop();
        self.join().await;
    }

    pub fn hops_completed(&self) -> u64 {
        self.stats.hops_completed.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.stats.errors.load(Ordering::Relaxed)
    }
}

impl Advancer {
    /// Keep advancing `queue` with one slot until stopped
    pub fn run_forever(self: &Arc<Self>, queue: &str) -> AdvancerResult<RunHandle> {
        self.run_forever_with(queue, RunnerConfig::default())
    }

    /// Keep advancing `queue` with `config.concurrency` independent slots
    ///
    /// Each slot runs its hops one after another, so a slot never overlaps
    /// with itself. Hop errors are published as error events and counted;
    /// they never end the loop.
    pub fn run_forever_with(
        self: &Arc<Self>,
        queue: &str,
        config: RunnerConfig,
    ) -> AdvancerResult<RunHandle> {
        self.worker_for(queue)?;

        let shutdown = ShutdownCoordinator::new();
        let stats = Arc::new(RunStats::default());
        let concurrency = config.concurrency.max(1);
        let poll_interval = config.poll_interval.max(Duration::from_millis(1));

        log::info!("Starting run-loop on '{queue}' with {concurrency} slot(s)");
        let slots = (0..concurrency)
            .map(|slot| {
                tokio::spawn(run_slot(
                    Arc::clone(self),
                    queue.to_string(),
                    slot,
                    poll_interval,
                    shutdown.clone(),
                    Arc::clone(&stats),
                ))
            })
            .collect();

        Ok(RunHandle {
            queue: queue.to_string(),
            shutdown,
            slots,
            stats,
        })
    }
}

async fn run_slot(
    advancer: Arc<Advancer>,
    queue: String,
    slot: usize,
    poll_interval: Duration,
    shutdown: ShutdownCoordinator,
    stats: Arc<RunStats>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }

        match advancer.run_until_stopped(&queue, &shutdown).await {
            Ok(Some(summary)) => {
                stats.hops_completed.fetch_add(1, Ordering::Relaxed);
                log::trace!(
                    "Slot {slot} on '{queue}' advanced to {:?}",
                    summary.destination_queues
                );
            }
            Ok(None) => break,
            Err(e) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                log_error_with_context(&e, &format!("Hop on '{queue}' failed"));
            }
        }
    }

    log::trace!("Slot {slot} on '{queue}' stopped");
}
