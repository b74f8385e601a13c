//! In-memory reference exchange
//!
//! Reproduces the visibility-timeout delivery model of hosted queue
//! services in process memory. Each queue is a `VecDeque` of lease records
//! behind its own mutex, so lease grants, enqueues and deletes on one queue
//! are atomic with respect to each other without serialising unrelated
//! queues. A background task removes records older than the retention
//! period.

use crate::core::error_handling::log_error_with_context;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::exchange::config::ExchangeConfig;
use crate::exchange::error::{ExchangeError, ExchangeResult};
use crate::exchange::message::Message;
use crate::exchange::traits::Exchange;
use crate::notifications::api::{Event, ExchangeEvent, ExchangeEventType, NotificationManager};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type QueueSlot = Arc<Mutex<VecDeque<LeaseRecord>>>;

#[derive(Debug)]
struct LeaseRecord {
    transport_id: String,
    /// `None` until the first lease grant
    last_collected_at: Option<Instant>,
    created_at: Instant,
    message: Message,
}

impl LeaseRecord {
    fn is_leasable(&self, now: Instant, visibility_timeout: Duration) -> bool {
        match self.last_collected_at {
            None => true,
            Some(collected) => now.saturating_duration_since(collected) >= visibility_timeout,
        }
    }

    fn is_expired(&self, now: Instant, retention_period: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= retention_period
    }
}

fn lock_queue(slot: &QueueSlot) -> ExchangeResult<MutexGuard<'_, VecDeque<LeaseRecord>>> {
    handle_mutex_poison(slot.lock(), |message| ExchangeError::OperationFailed { message })
}

/// State shared between the exchange and its sweeper task
#[derive(Clone)]
struct Storage {
    queues: Arc<RwLock<HashMap<String, QueueSlot>>>,
    clock: Arc<dyn TimeProvider>,
    notifications: Option<Arc<NotificationManager>>,
}

impl Storage {
    fn notify(&self, event: ExchangeEvent) {
        if let Some(notifications) = &self.notifications {
            if let Err(e) = notifications.publish(&Event::Exchange(event)) {
                log::debug!("Exchange event not fully delivered: {e}");
            }
        }
    }

    fn existing(&self, queue: &str) -> ExchangeResult<Option<QueueSlot>> {
        let queues = handle_rwlock_read(self.queues.read(), |message| {
            ExchangeError::OperationFailed { message }
        })?;
        Ok(queues.get(queue).cloned())
    }

    fn ensure_queue(&self, queue: &str) -> ExchangeResult<QueueSlot> {
        if let Some(slot) = self.existing(queue)? {
            return Ok(slot);
        }

        let slot = {
            let mut queues = handle_rwlock_write(self.queues.write(), |message| {
                ExchangeError::OperationFailed { message }
            })?;
            match queues.entry(queue.to_string()) {
                // created by someone else between the two locks
                Entry::Occupied(entry) => return Ok(Arc::clone(entry.get())),
                Entry::Vacant(entry) => Arc::clone(entry.insert(Arc::default())),
            }
        };

        log::info!("Created queue '{queue}'");
        self.notify(ExchangeEvent::new(ExchangeEventType::QueueCreated, queue));
        Ok(slot)
    }

    fn all_queues(&self) -> ExchangeResult<Vec<(String, QueueSlot)>> {
        let queues = handle_rwlock_read(self.queues.read(), |message| {
            ExchangeError::OperationFailed { message }
        })?;
        Ok(queues
            .iter()
            .map(|(name, slot)| (name.clone(), Arc::clone(slot)))
            .collect())
    }

    fn sweep(&self, retention_period: Duration) -> ExchangeResult<usize> {
        let now = self.clock.now();
        let mut removed = 0;

        for (queue, slot) in self.all_queues()? {
            let mut expired = Vec::new();
            lock_queue(&slot)?.retain(|record| {
                if record.is_expired(now, retention_period) {
                    expired.push(record.transport_id.clone());
                    false
                } else {
                    true
                }
            });

            for transport_id in &expired {
                log::warn!("Retention expired {transport_id} on '{queue}'");
                self.notify(ExchangeEvent::with_transport_id(
                    ExchangeEventType::MessageExpired,
                    &queue,
                    transport_id,
                ));
            }
            removed += expired.len();
        }

        Ok(removed)
    }
}

/// Process-local [`Exchange`] with lease and retention semantics
pub struct MemoryExchange {
    storage: Storage,
    config: ExchangeConfig,
    sequence: AtomicU64,
    shutdown: ShutdownCoordinator,
    sweeper: OnceLock<JoinHandle<()>>,
}

impl std::fmt::Debug for MemoryExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryExchange")
            .field("config", &self.config)
            .field("queues", &self.queue_names())
            .finish()
    }
}

impl MemoryExchange {
    /// Create an exchange without the background retention sweeper
    ///
    /// Retention can still be enforced by calling [`sweep_expired`](Self::sweep_expired).
    pub fn new(config: ExchangeConfig) -> Self {
        Self {
            storage: Storage {
                queues: Arc::default(),
                clock: Arc::new(SystemTimeProvider),
                notifications: None,
            },
            config,
            sequence: AtomicU64::new(0),
            shutdown: ShutdownCoordinator::new(),
            sweeper: OnceLock::new(),
        }
    }

    /// Create an exchange and start its retention sweeper
    pub async fn create(config: ExchangeConfig) -> Arc<Self> {
        let exchange = Self::new(config);
        exchange.start_sweeper();
        Arc::new(exchange)
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.storage.clock = clock;
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<NotificationManager>) -> Self {
        self.storage.notifications = Some(notifications);
        self
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Spawn the retention sweeper; later calls are no-ops
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_sweeper(&self) {
        self.sweeper.get_or_init(|| {
            let storage = self.storage.clone();
            let shutdown = self.shutdown.clone();
            let retention_period = self.config.retention_period;
            let period = self.config.sweep_interval.max(Duration::from_millis(1));

            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = shutdown.wait() => break,
                        _ = ticker.tick() => {
                            if let Err(e) = storage.sweep(retention_period) {
                                log_error_with_context(&e, "Retention sweep failed");
                            }
                        }
                    }
                }
                log::trace!("Retention sweeper stopped");
            })
        });
    }

    /// Stop the retention sweeper
    pub fn shutdown(&self) {
        if !self.shutdown.is_shutdown_requested() {
            log::debug!("Shutting down in-memory exchange");
        }
        self.shutdown.trigger_shutdown();
    }

    /// Run one retention pass and return how many messages it removed
    pub fn sweep_expired(&self) -> ExchangeResult<usize> {
        self.storage.sweep(self.config.retention_period)
    }

    /// Grant a lease on the first leasable message, without waiting
    pub fn try_lease(&self, queue: &str) -> ExchangeResult<Option<Message>> {
        let slot = self.storage.ensure_queue(queue)?;
        let now = self.storage.clock.now();
        let visibility_timeout = self.config.visibility_timeout;
        let retention_period = self.config.retention_period;

        let leased = {
            let mut records = lock_queue(&slot)?;
            records
                .iter_mut()
                .find(|record| {
                    !record.is_expired(now, retention_period)
                        && record.is_leasable(now, visibility_timeout)
                })
                .map(|record| {
                    record.last_collected_at = Some(now);
                    record.message.clone()
                })
        };

        if let Some(message) = &leased {
            let transport_id = message.transport_id.as_deref().unwrap_or_default();
            log::trace!("Leased {transport_id} from '{queue}'");
            self.storage.notify(ExchangeEvent::with_transport_id(
                ExchangeEventType::MessageLeased,
                queue,
                transport_id,
            ));
        }
        Ok(leased)
    }

    /// Names of every queue seen so far, sorted
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self.storage.queues.read() {
            Ok(queues) => queues.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        names.sort();
        names
    }

    /// Number of stored messages on `queue`, leased or not
    pub fn queue_len(&self, queue: &str) -> usize {
        match self.storage.existing(queue) {
            Ok(Some(slot)) => slot.lock().map(|records| records.len()).unwrap_or(0),
            _ => 0,
        }
    }

    /// Copy of every stored message, grouped by queue
    pub fn snapshot(&self) -> ExchangeResult<BTreeMap<String, Vec<Message>>> {
        let mut snapshot = BTreeMap::new();
        for (queue, slot) in self.storage.all_queues()? {
            let messages = lock_queue(&slot)?
                .iter()
                .map(|record| record.message.clone())
                .collect();
            snapshot.insert(queue, messages);
        }
        Ok(snapshot)
    }

    fn mint_transport_id(&self, queue: &str) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{queue}#{sequence}")
    }
}

impl Drop for MemoryExchange {
    fn drop(&mut self) {
        self.shutdown.trigger_shutdown();
    }
}

#[async_trait]
impl Exchange for MemoryExchange {
    async fn enqueue(&self, queue: &str, mut message: Message) -> ExchangeResult<String> {
        let slot = self.storage.ensure_queue(queue)?;
        let transport_id = self.mint_transport_id(queue);
        message.transport_id = Some(transport_id.clone());

        let record = LeaseRecord {
            transport_id: transport_id.clone(),
            last_collected_at: None,
            created_at: self.storage.clock.now(),
            message,
        };
        lock_queue(&slot)?.push_back(record);

        log::trace!("Enqueued {transport_id} on '{queue}'");
        self.storage.notify(ExchangeEvent::with_transport_id(
            ExchangeEventType::MessageEnqueued,
            queue,
            &transport_id,
        ));
        Ok(transport_id)
    }

    async fn lease(&self, queue: &str) -> ExchangeResult<Message> {
        loop {
            if let Some(message) = self.try_lease(queue)? {
                return Ok(message);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn delete(&self, queue: &str, transport_id: &str) -> ExchangeResult<()> {
        let removed = match self.storage.existing(queue)? {
            Some(slot) => {
                let mut records = lock_queue(&slot)?;
                records
                    .iter()
                    .position(|record| record.transport_id == transport_id)
                    .and_then(|index| records.remove(index))
            }
            None => None,
        };

        match removed {
            Some(_) => {
                log::trace!("Deleted {transport_id} from '{queue}'");
                self.storage.notify(ExchangeEvent::with_transport_id(
                    ExchangeEventType::MessageDeleted,
                    queue,
                    transport_id,
                ));
            }
            None => log::debug!("Delete of unknown {transport_id} on '{queue}' ignored"),
        }
        Ok(())
    }

    async fn leasable(&self, queue: &str) -> ExchangeResult<Vec<Message>> {
        let Some(slot) = self.storage.existing(queue)? else {
            return Ok(Vec::new());
        };
        let now = self.storage.clock.now();
        let records = lock_queue(&slot)?;
        Ok(records
            .iter()
            .filter(|record| {
                !record.is_expired(now, self.config.retention_period)
                    && record.is_leasable(now, self.config.visibility_timeout)
            })
            .map(|record| record.message.clone())
            .collect())
    }
}
