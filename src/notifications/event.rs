//! Event types for the notification system

use std::sync::Arc;
use std::time::SystemTime;

use crate::advancer::api::HopSummary;
use crate::exchange::api::Message;

/// Lifecycle points of a single hop, in the order they normally occur
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AdvancerEventType {
    LoadingMessage,
    LoadedMessage,
    NoRoute,
    PostingResult,
    PostedResult,
    RemovingInput,
    RemovedInput,
    HopCompleted,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExchangeEventType {
    QueueCreated,
    MessageEnqueued,
    MessageLeased,
    MessageDeleted,
    MessageExpired,
}

/// A lifecycle event emitted by the advancer
///
/// Which optional fields are set depends on `event_type`; the constructors
/// below are the only supported way to build one.
#[derive(Clone, Debug)]
pub struct AdvancerEvent {
    pub event_type: AdvancerEventType,
    pub timestamp: SystemTime,
    /// Correlation id of the hop attempt, absent for run-loop level errors
    pub process_id: Option<String>,
    /// Source queue of the hop
    pub queue: String,
    pub destination: Option<String>,
    pub resolution: Option<String>,
    pub message: Option<Arc<Message>>,
    pub summary: Option<Arc<HopSummary>>,
    pub error: Option<String>,
}

impl AdvancerEvent {
    fn base(event_type: AdvancerEventType, process_id: Option<&str>, queue: &str) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            process_id: process_id.map(str::to_string),
            queue: queue.to_string(),
            destination: None,
            resolution: None,
            message: None,
            summary: None,
            error: None,
        }
    }

    pub fn loading(process_id: &str, queue: &str) -> Self {
        Self::base(AdvancerEventType::LoadingMessage, Some(process_id), queue)
    }

    pub fn loaded(process_id: &str, queue: &str, message: Arc<Message>) -> Self {
        Self {
            message: Some(message),
            ..Self::base(AdvancerEventType::LoadedMessage, Some(process_id), queue)
        }
    }

    pub fn no_route(process_id: &str, queue: &str, resolution: &str) -> Self {
        Self {
            resolution: Some(resolution.to_string()),
            ..Self::base(AdvancerEventType::NoRoute, Some(process_id), queue)
        }
    }

    pub fn posting(process_id: &str, queue: &str, destination: &str, message: Arc<Message>) -> Self {
        Self {
            destination: Some(destination.to_string()),
            message: Some(message),
            ..Self::base(AdvancerEventType::PostingResult, Some(process_id), queue)
        }
    }

    pub fn posted(process_id: &str, queue: &str, destination: &str, message: Arc<Message>) -> Self {
        Self {
            destination: Some(destination.to_string()),
            message: Some(message),
            ..Self::base(AdvancerEventType::PostedResult, Some(process_id), queue)
        }
    }

    pub fn removing(process_id: &str, queue: &str, message: Arc<Message>) -> Self {
        Self {
            message: Some(message),
            ..Self::base(AdvancerEventType::RemovingInput, Some(process_id), queue)
        }
    }

    pub fn removed(process_id: &str, queue: &str, message: Arc<Message>) -> Self {
        Self {
            message: Some(message),
            ..Self::base(AdvancerEventType::RemovedInput, Some(process_id), queue)
        }
    }

    pub fn hop_completed(process_id: &str, summary: Arc<HopSummary>) -> Self {
        Self {
            summary: Some(Arc::clone(&summary)),
            ..Self::base(
                AdvancerEventType::HopCompleted,
                Some(process_id),
                &summary.source_queue,
            )
        }
    }

    pub fn error(process_id: Option<&str>, queue: &str, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::base(AdvancerEventType::Error, process_id, queue)
        }
    }
}

/// A storage-level event emitted by an exchange
#[derive(Clone, Debug)]
pub struct ExchangeEvent {
    pub event_type: ExchangeEventType,
    pub timestamp: SystemTime,
    pub queue: String,
    pub transport_id: Option<String>,
}

impl ExchangeEvent {
    pub fn new(event_type: ExchangeEventType, queue: &str) -> Self {
        Self {
            event_type,
            timestamp: SystemTime::now(),
            queue: queue.to_string(),
            transport_id: None,
        }
    }

    pub fn with_transport_id(event_type: ExchangeEventType, queue: &str, transport_id: &str) -> Self {
        Self {
            transport_id: Some(transport_id.to_string()),
            ..Self::new(event_type, queue)
        }
    }
}

/// Unified event enum that encompasses all event types
#[derive(Clone, Debug)]
pub enum Event {
    Advancer(AdvancerEvent),
    Exchange(ExchangeEvent),
}

impl Event {
    /// Short category name used in logs and errors
    pub fn category(&self) -> &'static str {
        match self {
            Event::Advancer(_) => "Advancer",
            Event::Exchange(_) => "Exchange",
        }
    }

    /// The queue the event is about
    pub fn queue(&self) -> &str {
        match self {
            Event::Advancer(event) => &event.queue,
            Event::Exchange(event) => &event.queue,
        }
    }
}

/// Event filtering options for subscribers
#[derive(Clone, Debug, PartialEq)]
pub enum EventFilter {
    AdvancerOnly,
    ExchangeOnly,
    /// Every event whose queue matches exactly
    Queue(String),
    All,
}

impl EventFilter {
    /// Check if an event should be accepted by this filter
    pub fn accepts(&self, event: &Event) -> bool {
        match (self, event) {
            (EventFilter::All, _) => true,
            (EventFilter::AdvancerOnly, Event::Advancer(_)) => true,
            (EventFilter::ExchangeOnly, Event::Exchange(_)) => true,
            (EventFilter::Queue(queue), event) => event.queue() == queue,
            _ => false,
        }
    }
}
