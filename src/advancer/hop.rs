//! Single-hop orchestration
//!
//! One hop leases a message from a source queue, runs the queue's worker,
//! records the result in the message path and posts the result to every
//! destination in parallel. The source message is deleted only after every
//! post succeeded; a failed post leaves it leased so that it reappears once
//! the visibility timeout runs out and the whole hop is retried.

use crate::advancer::error::{AdvancerError, AdvancerResult};
use crate::advancer::routing::RoutingTable;
use crate::advancer::worker::{invoke, Worker, WorkerOutcome};
use crate::core::shutdown::ShutdownCoordinator;
use crate::exchange::api::{Exchange, Message, ERR_RESOLUTION};
use crate::notifications::api::{
    AdvancerEvent, Event, EventFilter, EventReceiver, NotificationManager, NotificationResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// What one completed hop did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HopSummary {
    pub source_queue: String,
    pub destination_queues: Vec<String>,
    /// The leased message, after missing fields were filled in
    pub source_message: Message,
    /// The message as posted to each destination
    pub result_message: Message,
}

impl HopSummary {
    pub fn resolution(&self) -> Option<&str> {
        self.result_message.resolution()
    }
}

/// Moves messages between queues according to a [`RoutingTable`]
pub struct Advancer {
    exchange: Arc<dyn Exchange>,
    routes: Arc<RoutingTable>,
    notifications: Arc<NotificationManager>,
    process_sequence: AtomicU64,
}

impl std::fmt::Debug for Advancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Advancer")
            .field("routes", &self.routes)
            .field("notifications", &self.notifications)
            .finish()
    }
}

impl Advancer {
    pub fn new(exchange: Arc<dyn Exchange>, routes: RoutingTable) -> Self {
        Self {
            exchange,
            routes: Arc::new(routes),
            notifications: Arc::new(NotificationManager::new()),
            process_sequence: AtomicU64::new(0),
        }
    }

    /// Publish lifecycle events on a shared manager instead of a private one
    pub fn with_notifications(mut self, notifications: Arc<NotificationManager>) -> Self {
        self.notifications = notifications;
        self
    }

    pub fn notifications(&self) -> &Arc<NotificationManager> {
        &self.notifications
    }

    pub fn routes(&self) -> &RoutingTable {
        &self.routes
    }

    /// Receive this advancer's lifecycle events
    pub fn subscribe(&self, subscriber_id: &str) -> NotificationResult<EventReceiver> {
        self.notifications
            .subscribe(subscriber_id, EventFilter::AdvancerOnly, "advancer")
    }

    /// Perform one hop on `queue`, waiting for a message if none is leasable
    ///
    /// Fails only on infrastructure errors; a worker failure is a normal
    /// hop to the `err` resolution.
    pub async fn run(&self, queue: &str) -> AdvancerResult<HopSummary> {
        let worker = self.worker_for(queue)?;
        let process_id = self.mint_process_id();
        self.emit(AdvancerEvent::loading(&process_id, queue));

        let result = match self.exchange.lease(queue).await {
            Ok(source) => self.advance(&process_id, queue, worker, source).await,
            Err(source) => Err(AdvancerError::Lease {
                queue: queue.to_string(),
                source,
            }),
        };
        self.report_failure(&process_id, queue, result)
    }

    /// Like [`run`](Self::run), but give up the lease wait once `stop` fires
    ///
    /// Returns `Ok(None)` when stopped before a message was leased. A hop
    /// that already holds a message always runs to completion.
    pub(crate) async fn run_until_stopped(
        &self,
        queue: &str,
        stop: &ShutdownCoordinator,
    ) -> AdvancerResult<Option<HopSummary>> {
        let worker = self.worker_for(queue)?;
        let process_id = self.mint_process_id();
        self.emit(AdvancerEvent::loading(&process_id, queue));

        let leased = tokio::select! {
            _ = stop.wait() => return Ok(None),
            leased = self.exchange.lease(queue) => leased,
        };

        let result = match leased {
            Ok(source) => self.advance(&process_id, queue, worker, source).await,
            Err(source) => Err(AdvancerError::Lease {
                queue: queue.to_string(),
                source,
            }),
        };
        self.report_failure(&process_id, queue, result).map(Some)
    }

    pub(crate) fn worker_for(&self, queue: &str) -> AdvancerResult<Arc<dyn Worker>> {
        self.routes.worker(queue).ok_or_else(|| AdvancerError::NoWorker {
            queue: queue.to_string(),
        })
    }

    async fn advance(
        &self,
        process_id: &str,
        queue: &str,
        worker: Arc<dyn Worker>,
        mut source: Message,
    ) -> AdvancerResult<HopSummary> {
        source.prepare_for_hop();
        let source = Arc::new(source);
        self.emit(AdvancerEvent::loaded(process_id, queue, Arc::clone(&source)));

        let payload = source
            .payload
            .clone()
            .unwrap_or_else(|| Value::Object(Map::new()));
        let mut result = Message {
            init_id: source.init_id.clone(),
            path: source.path.clone(),
            payload: source.payload.clone(),
            ..Message::default()
        };
        let resolution = match invoke(worker.as_ref(), payload).await {
            WorkerOutcome::Success {
                resolution,
                payload,
            } => {
                result.record_success(queue, &resolution, payload);
                resolution
            }
            WorkerOutcome::Failure(err) => {
                log::debug!("[{process_id}] worker for '{queue}' failed: {err}");
                result.record_failure(queue, err.to_value());
                ERR_RESOLUTION.to_string()
            }
        };

        let route = self.routes.lookup(queue, &resolution);
        log::debug!(
            "[{process_id}] '{queue}' resolved '{resolution}' -> {:?}",
            route.destinations
        );
        if !route.explicit {
            self.emit(AdvancerEvent::no_route(process_id, queue, &resolution));
        }

        let result = Arc::new(result);
        self.post_result(process_id, queue, &route.destinations, &result)
            .await?;

        self.emit(AdvancerEvent::removing(process_id, queue, Arc::clone(&source)));
        let transport_id = source.transport_id.as_deref().unwrap_or_default();
        self.exchange
            .delete(queue, transport_id)
            .await
            .map_err(|source| AdvancerError::Remove {
                queue: queue.to_string(),
                source,
            })?;
        self.emit(AdvancerEvent::removed(process_id, queue, Arc::clone(&source)));

        let summary = Arc::new(HopSummary {
            source_queue: queue.to_string(),
            destination_queues: route.destinations,
            source_message: (*source).clone(),
            result_message: (*result).clone(),
        });
        self.emit(AdvancerEvent::hop_completed(process_id, Arc::clone(&summary)));
        Ok((*summary).clone())
    }

    /// Post `result` to every destination concurrently
    ///
    /// Every `posting` event is emitted before the first post starts; each
    /// `posted` event follows its own post.
    async fn post_result(
        &self,
        process_id: &str,
        queue: &str,
        destinations: &[String],
        result: &Arc<Message>,
    ) -> AdvancerResult<()> {
        for destination in destinations {
            self.emit(AdvancerEvent::posting(
                process_id,
                queue,
                destination,
                Arc::clone(result),
            ));
        }

        let posts = destinations.iter().map(|destination| async move {
            self.exchange
                .enqueue(destination, (**result).clone())
                .await
                .map_err(|source| AdvancerError::Post {
                    queue: destination.clone(),
                    source,
                })?;
            self.emit(AdvancerEvent::posted(
                process_id,
                queue,
                destination,
                Arc::clone(result),
            ));
            Ok::<(), AdvancerError>(())
        });
        futures::future::try_join_all(posts).await?;
        Ok(())
    }

    fn report_failure(
        &self,
        process_id: &str,
        queue: &str,
        result: AdvancerResult<HopSummary>,
    ) -> AdvancerResult<HopSummary> {
        if let Err(e) = &result {
            self.emit(AdvancerEvent::error(Some(process_id), queue, e.to_string()));
        }
        result
    }

    pub(crate) fn emit(&self, event: AdvancerEvent) {
        if let Err(e) = self.notifications.publish(&Event::Advancer(event)) {
            log::trace!("Advancer event not fully delivered: {e}");
        }
    }

    /// Time-ordered id: milliseconds since the epoch, then a sequence number
    fn mint_process_id(&self) -> String {
        let sequence = self.process_sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{:x}-{:04x}",
            chrono::Utc::now().timestamp_millis(),
            sequence & 0xffff
        )
    }
}
