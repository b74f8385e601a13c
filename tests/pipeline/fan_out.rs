//! Fan-out and observation tests
//!
//! One stage posting to several queues, watched through a notification
//! manager shared by the exchange and the advancer.

use super::{quick_exchange, wait_for};
use queuehop::advancer::api::{worker, Advancer, Destinations, RoutingTable, WorkerError};
use queuehop::exchange::api::{Exchange, ExchangeConfig, MemoryExchange};
use queuehop::notifications::api::{
    AdvancerEventType, Event, EventFilter, ExchangeEventType, LogSubscriber, NotificationManager,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn splitter() -> RoutingTable {
    let mut routes = RoutingTable::new();
    routes.add_route(
        "split",
        [("success", Destinations::from(["left", "middle", "right"]))],
        worker::direct(|payload: Value| Ok::<_, WorkerError>(json!({"copy": payload}))),
    );
    routes
}

#[tokio::test]
async fn test_fan_out_reaches_every_destination() {
    let exchange = quick_exchange();
    let advancer = Advancer::new(exchange.clone(), splitter());

    exchange.enqueue_payload("split", json!(42)).await.unwrap();
    let summary = advancer.run("split").await.unwrap();
    assert_eq!(summary.destination_queues, ["left", "middle", "right"]);

    for queue in ["left", "middle", "right"] {
        let copies = exchange.leasable(queue).await.unwrap();
        assert_eq!(copies.len(), 1, "queue {queue}");
        assert_eq!(copies[0].payload, Some(json!({"copy": 42})));
        assert_eq!(copies[0].path, ["split:success"]);
    }
    assert_eq!(exchange.queue_len("split"), 0);
}

#[tokio::test]
async fn test_shared_notifications_see_both_layers() {
    let notifications = Arc::new(NotificationManager::new());
    let exchange = Arc::new(
        MemoryExchange::new(ExchangeConfig::default().with_poll_interval(Duration::from_millis(5)))
            .with_notifications(Arc::clone(&notifications)),
    );
    let advancer = Advancer::new(exchange.clone(), splitter())
        .with_notifications(Arc::clone(&notifications));

    let mut all = notifications
        .subscribe("all", EventFilter::All, "test")
        .unwrap();
    let mut split_only = notifications
        .subscribe("split-only", EventFilter::Queue("split".to_string()), "test")
        .unwrap();
    let logger = notifications
        .attach(Arc::new(LogSubscriber::default()), EventFilter::All)
        .unwrap();

    exchange.enqueue_payload("split", json!({})).await.unwrap();
    advancer.run("split").await.unwrap();

    let mut advancer_kinds = Vec::new();
    let mut exchange_kinds = Vec::new();
    while let Some(event) = all.try_recv() {
        match event {
            Event::Advancer(event) => advancer_kinds.push(event.event_type),
            Event::Exchange(event) => exchange_kinds.push(event.event_type),
        }
    }
    assert_eq!(advancer_kinds.first(), Some(&AdvancerEventType::LoadingMessage));
    assert_eq!(advancer_kinds.last(), Some(&AdvancerEventType::HopCompleted));
    assert!(exchange_kinds.contains(&ExchangeEventType::QueueCreated));
    assert!(exchange_kinds.contains(&ExchangeEventType::MessageLeased));
    assert!(exchange_kinds.contains(&ExchangeEventType::MessageDeleted));
    assert_eq!(
        exchange_kinds
            .iter()
            .filter(|kind| **kind == ExchangeEventType::MessageEnqueued)
            .count(),
        4
    );

    while let Some(event) = split_only.try_recv() {
        assert_eq!(event.queue(), "split");
    }

    wait_for("log subscriber to catch up", || {
        notifications
            .subscriber_statistics("log")
            .map(|stats| stats.queue_size() == 0)
            .unwrap_or(false)
    })
    .await;
    assert!(notifications.unsubscribe("log"));
    tokio::time::timeout(Duration::from_secs(1), logger)
        .await
        .expect("log subscriber task should end")
        .unwrap();
}
