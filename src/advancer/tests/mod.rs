//! Test modules for the advancer
//!
//! Tests are organized by functional area: single hops, worker result
//! conventions, infrastructure failures and the run-loop.


use crate::advancer::api::{Advancer, RoutingTable};
use crate::exchange::api::{
    Exchange, ExchangeConfig, ExchangeError, ExchangeResult, MemoryExchange, Message,
};
use crate::notifications::api::{AdvancerEventType, Event, EventReceiver};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn fast_exchange() -> Arc<MemoryExchange> {
    Arc::new(MemoryExchange::new(
        ExchangeConfig::default().with_poll_interval(Duration::from_millis(5)),
    ))
}

fn advancer_on(exchange: &Arc<MemoryExchange>, routes: RoutingTable) -> Advancer {
    let exchange: Arc<dyn Exchange> = exchange.clone();
    Advancer::new(exchange, routes)
}

/// Drain the advancer events queued so far
fn drain_events(receiver: &mut EventReceiver) -> Vec<(AdvancerEventType, Option<String>)> {
    let mut events = Vec::new();
    while let Some(event) = receiver.try_recv() {
        if let Event::Advancer(event) = event {
            events.push((event.event_type, event.process_id));
        }
    }
    events
}

/// Exchange wrapper that fails selected operations
///
/// Enqueues to queues in `failing_queues` and deletes while
/// `fail_deletes` is set return `Unavailable`; everything else is passed
/// through to the wrapped exchange.
struct FlakyExchange {
    inner: Arc<MemoryExchange>,
    failing_queues: Mutex<HashSet<String>>,
    fail_deletes: Mutex<bool>,
    fail_leases: Mutex<bool>,
}

impl FlakyExchange {
    fn new(inner: Arc<MemoryExchange>) -> Self {
        Self {
            inner,
            failing_queues: Mutex::new(HashSet::new()),
            fail_deletes: Mutex::new(false),
            fail_leases: Mutex::new(false),
        }
    }

    fn fail_enqueue_to(&self, queue: &str) {
        self.failing_queues.lock().unwrap().insert(queue.to_string());
    }

    fn heal(&self) {
        self.failing_queues.lock().unwrap().clear();
        *self.fail_deletes.lock().unwrap() = false;
        *self.fail_leases.lock().unwrap() = false;
    }

    fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    fn fail_leases(&self) {
        *self.fail_leases.lock().unwrap() = true;
    }

    fn unavailable(queue: &str) -> ExchangeError {
        ExchangeError::Unavailable {
            queue: queue.to_string(),
            message: "backend offline".to_string(),
        }
    }
}

#[async_trait]
impl Exchange for FlakyExchange {
    async fn enqueue(&self, queue: &str, message: Message) -> ExchangeResult<String> {
        let failing = self.failing_queues.lock().unwrap().contains(queue);
        if failing {
            return Err(Self::unavailable(queue));
        }
        self.inner.enqueue(queue, message).await
    }

    async fn lease(&self, queue: &str) -> ExchangeResult<Message> {
        let failing = *self.fail_leases.lock().unwrap();
        if failing {
            tokio::time::sleep(Duration::from_millis(5)).await;
            return Err(Self::unavailable(queue));
        }
        self.inner.lease(queue).await
    }

    async fn delete(&self, queue: &str, transport_id: &str) -> ExchangeResult<()> {
        let failing = *self.fail_deletes.lock().unwrap();
        if failing {
            return Err(Self::unavailable(queue));
        }
        self.inner.delete(queue, transport_id).await
    }

    async fn leasable(&self, queue: &str) -> ExchangeResult<Vec<Message>> {
        self.inner.leasable(queue).await
    }
}
