//! NotificationManager implementation

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::notifications::error::{NotificationError, NotificationResult};
use crate::notifications::event::{Event, EventFilter};
use crate::notifications::traits::{Subscriber, SubscriberStatistics};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

// Auto-management thresholds
const HIGH_WATER_MARK: usize = 10000;
const STALE_SUBSCRIBER_TIMEOUT: Duration = Duration::from_secs(300);

struct SubscriberInfo {
    filter: EventFilter,
    source: String,
    sender: UnboundedSender<Event>,
    statistics: Arc<SubscriberStatistics>,
}

/// Receiving end of a subscription
///
/// Dropping it ends the subscription; the manager notices on the next
/// publish and removes the entry.
pub struct EventReceiver {
    receiver: UnboundedReceiver<Event>,
    statistics: Arc<SubscriberStatistics>,
}

impl EventReceiver {
    /// Wait for the next event, or `None` once the manager is gone
    pub async fn recv(&mut self) -> Option<Event> {
        let event = self.receiver.recv().await?;
        self.record_received();
        Some(event)
    }

    /// Take an already queued event without waiting
    pub fn try_recv(&mut self) -> Option<Event> {
        let event = self.receiver.try_recv().ok()?;
        self.record_received();
        Some(event)
    }

    pub fn statistics(&self) -> &SubscriberStatistics {
        &self.statistics
    }

    fn record_received(&self) {
        self.statistics.decrement_queue_size();
        self.statistics.record_message_processed();
    }
}

/// Fan-out of lifecycle events to any number of subscribers
///
/// Publishing never blocks: every subscriber owns an unbounded channel, so
/// a slow observer only grows its own queue.
pub struct NotificationManager {
    subscribers: RwLock<HashMap<String, SubscriberInfo>>,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NotificationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationManager")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(
        &self,
        subscriber_id: impl Into<String>,
        filter: EventFilter,
        source: impl Into<String>,
    ) -> NotificationResult<EventReceiver> {
        let subscriber_id = subscriber_id.into();
        let source = source.into();
        let (sender, receiver) = unbounded_channel();
        let statistics = Arc::new(SubscriberStatistics::new());

        let subscriber_info = SubscriberInfo {
            filter,
            source: source.clone(),
            sender,
            statistics: Arc::clone(&statistics),
        };

        let mut subscribers = handle_rwlock_write(self.subscribers.write(), |message| {
            NotificationError::OperationFailed { message }
        })?;
        if let Some(existing) = subscribers.insert(subscriber_id.clone(), subscriber_info) {
            log::warn!(
                "Subscriber '{}' replaced existing subscription (source: {} -> {})",
                subscriber_id,
                existing.source,
                source
            );
        }

        Ok(EventReceiver {
            receiver,
            statistics,
        })
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, subscriber_id: &str) -> bool {
        match self.subscribers.write() {
            Ok(mut subscribers) => subscribers.remove(subscriber_id).is_some(),
            Err(_) => false,
        }
    }

    /// Run `subscriber` on every accepted event in a background task
    ///
    /// The task ends when the subscription is removed or the manager is
    /// dropped. Handler errors are counted and logged, never propagated.
    pub fn attach(
        &self,
        subscriber: Arc<dyn Subscriber>,
        filter: EventFilter,
    ) -> NotificationResult<JoinHandle<()>> {
        let mut receiver = self.subscribe(subscriber.subscriber_id(), filter, subscriber.source())?;

        Ok(tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Err(e) = subscriber.handle_event(event).await {
                    receiver.statistics().record_error();
                    log::warn!(
                        "Subscriber '{}' failed to handle event: {}",
                        subscriber.subscriber_id(),
                        e
                    );
                }
            }
            log::trace!("Subscriber '{}' detached", subscriber.subscriber_id());
        }))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn has_subscriber(&self, subscriber_id: &str) -> bool {
        self.subscribers
            .read()
            .map(|s| s.contains_key(subscriber_id))
            .unwrap_or(false)
    }

    pub fn subscriber_statistics(&self, subscriber_id: &str) -> Option<Arc<SubscriberStatistics>> {
        let subscribers = self.subscribers.read().ok()?;
        subscribers
            .get(subscriber_id)
            .map(|info| Arc::clone(&info.statistics))
    }

    /// Subscribers whose undelivered backlog reached the high-water mark
    pub fn check_high_water_marks(&self) -> Vec<String> {
        let Ok(subscribers) = self.subscribers.read() else {
            return Vec::new();
        };
        subscribers
            .iter()
            .filter(|(_, info)| info.statistics.queue_size() >= HIGH_WATER_MARK)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Subscribers with a full backlog that stopped consuming
    pub fn check_stale_subscribers(&self) -> Vec<String> {
        let Ok(subscribers) = self.subscribers.read() else {
            return Vec::new();
        };
        let now = Instant::now();
        subscribers
            .iter()
            .filter(|(_, info)| {
                if info.statistics.queue_size() < HIGH_WATER_MARK {
                    return false;
                }
                match info.statistics.last_message_time() {
                    Some(last) => now.duration_since(last) > STALE_SUBSCRIBER_TIMEOUT,
                    // never consumed anything
                    None => true,
                }
            })
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn auto_unsubscribe_stale(&self) -> Vec<String> {
        let stale_subscribers = self.check_stale_subscribers();

        if let Ok(mut subscribers) = self.subscribers.write() {
            for subscriber_id in &stale_subscribers {
                if let Some(info) = subscribers.remove(subscriber_id) {
                    log::warn!(
                        "Removed stale subscriber '{}' (source: {}, queued: {})",
                        subscriber_id,
                        info.source,
                        info.statistics.queue_size()
                    );
                }
            }
        }

        stale_subscribers
    }

    /// Deliver an event to every subscriber whose filter accepts it
    ///
    /// Subscribers whose receiver was dropped are removed and reported in
    /// [`NotificationError::PublishFailed`]; delivery to the others still
    /// happens.
    pub fn publish(&self, event: &Event) -> NotificationResult<()> {
        let mut failed_subscribers = Vec::new();

        {
            let subscribers = handle_rwlock_read(self.subscribers.read(), |message| {
                NotificationError::OperationFailed { message }
            })?;

            for (subscriber_id, subscriber_info) in subscribers.iter() {
                if !subscriber_info.filter.accepts(event) {
                    continue;
                }
                subscriber_info.statistics.increment_queue_size();
                if subscriber_info.sender.send(event.clone()).is_err() {
                    subscriber_info.statistics.decrement_queue_size();
                    failed_subscribers.push(subscriber_id.clone());
                }
            }
        }

        if failed_subscribers.is_empty() {
            return Ok(());
        }

        let mut subscribers = handle_rwlock_write(self.subscribers.write(), |message| {
            NotificationError::OperationFailed { message }
        })?;
        for subscriber_id in &failed_subscribers {
            subscribers.remove(subscriber_id);
        }

        Err(NotificationError::PublishFailed {
            event_type: event.category().to_string(),
            failed_subscribers,
        })
    }
}
