//! Built-in subscribers

use crate::notifications::event::{AdvancerEvent, AdvancerEventType, Event, ExchangeEvent};
use crate::notifications::traits::Subscriber;
use async_trait::async_trait;

/// Writes lifecycle events to the `log` facade
///
/// Hop milestones go to `debug`, completed hops to `info`, and errors to
/// `warn`. Exchange events are `trace` only.
#[derive(Debug, Clone)]
pub struct LogSubscriber {
    id: String,
}

impl LogSubscriber {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// One-line rendering used for the log record
    pub fn describe(event: &Event) -> String {
        match event {
            Event::Advancer(event) => describe_advancer(event),
            Event::Exchange(event) => describe_exchange(event),
        }
    }
}

impl Default for LogSubscriber {
    fn default() -> Self {
        Self::new("log")
    }
}

fn describe_advancer(event: &AdvancerEvent) -> String {
    let process = event.process_id.as_deref().unwrap_or("-");
    let queue = &event.queue;
    match event.event_type {
        AdvancerEventType::LoadingMessage => format!("[{process}] leasing from '{queue}'"),
        AdvancerEventType::LoadedMessage => {
            let id = event
                .message
                .as_ref()
                .and_then(|m| m.transport_id.as_deref())
                .unwrap_or("?");
            format!("[{process}] leased {id} from '{queue}'")
        }
        AdvancerEventType::NoRoute => format!(
            "[{process}] no route for '{}' on '{queue}', dead-lettering",
            event.resolution.as_deref().unwrap_or("")
        ),
        AdvancerEventType::PostingResult => format!(
            "[{process}] posting to '{}'",
            event.destination.as_deref().unwrap_or("")
        ),
        AdvancerEventType::PostedResult => format!(
            "[{process}] posted to '{}'",
            event.destination.as_deref().unwrap_or("")
        ),
        AdvancerEventType::RemovingInput => format!("[{process}] removing input from '{queue}'"),
        AdvancerEventType::RemovedInput => format!("[{process}] removed input from '{queue}'"),
        AdvancerEventType::HopCompleted => match &event.summary {
            Some(summary) => format!(
                "[{process}] hop '{queue}' -> [{}] resolved '{}'",
                summary.destination_queues.join(", "),
                summary.result_message.resolution().unwrap_or("")
            ),
            None => format!("[{process}] hop from '{queue}' completed"),
        },
        AdvancerEventType::Error => format!(
            "[{process}] error on '{queue}': {}",
            event.error.as_deref().unwrap_or("unknown")
        ),
    }
}

fn describe_exchange(event: &ExchangeEvent) -> String {
    match &event.transport_id {
        Some(id) => format!("{:?} {} on '{}'", event.event_type, id, event.queue),
        None => format!("{:?} on '{}'", event.event_type, event.queue),
    }
}

#[async_trait]
impl Subscriber for LogSubscriber {
    async fn handle_event(&self, event: Event) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let line = Self::describe(&event);
        match &event {
            Event::Advancer(e) if e.event_type == AdvancerEventType::Error => log::warn!("{line}"),
            Event::Advancer(e) if e.event_type == AdvancerEventType::HopCompleted => {
                log::info!("{line}")
            }
            Event::Advancer(_) => log::debug!("{line}"),
            Event::Exchange(_) => log::trace!("{line}"),
        }
        Ok(())
    }

    fn subscriber_id(&self) -> &str {
        &self.id
    }

    fn source(&self) -> &str {
        "notifications:log"
    }
}
