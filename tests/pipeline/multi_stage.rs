//! Multi-stage pipeline tests
//!
//! A validate stage feeds a greet stage which fans out to two unconsumed
//! queues. Both stages run continuously.

use super::{quick_exchange, wait_for};
use queuehop::advancer::api::{
    worker, Advancer, Completion, Destinations, RoutingTable, RunnerConfig, WorkerError,
};
use queuehop::exchange::api::Exchange;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn greeting_routes() -> RoutingTable {
    let mut routes = RoutingTable::new();
    routes
        .add_route(
            "validate",
            [
                ("success", Destinations::from("greet")),
                ("short", Destinations::none()),
            ],
            worker::callback(|payload: Value, completion: Completion| {
                match payload.get("name").and_then(Value::as_str) {
                    Some(name) if name.len() >= 5 => completion.complete(payload.clone()),
                    Some(_) => completion.complete(json!({"_resolution": "short"})),
                    None => completion.fail("missing name"),
                };
            }),
        )
        .add_route(
            "greet",
            [("success", Destinations::from(["archive", "audit"]))],
            worker::future(|payload: Value| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                let name = payload.get("name").and_then(Value::as_str).unwrap_or("stranger");
                Ok::<_, WorkerError>(json!({"greeting": format!("Hello, {name}")}))
            }),
        );
    routes
}

#[tokio::test]
async fn test_two_stage_pipeline() {
    let exchange = quick_exchange();
    let advancer = Arc::new(Advancer::new(exchange.clone(), greeting_routes()));
    let config = RunnerConfig::default().with_poll_interval(Duration::from_millis(5));

    let mut first_ids = Vec::new();
    for name in ["Alexandra", "Bob", "Catherine"] {
        let id = exchange
            .enqueue_payload("validate", json!({"name": name}))
            .await
            .unwrap();
        first_ids.push(id);
    }
    exchange.enqueue_payload("validate", json!({})).await.unwrap();

    let validate = advancer.run_forever_with("validate", config.clone()).unwrap();
    let greet = advancer.run_forever_with("greet", config).unwrap();

    wait_for("two greetings on each sink", || {
        exchange.queue_len("archive") == 2 && exchange.queue_len("audit") == 2
    })
    .await;
    wait_for("validate to finish", || validate.hops_completed() == 4).await;

    validate.stop_and_join().await;
    greet.stop_and_join().await;

    let snapshot = exchange.snapshot().unwrap();
    assert!(snapshot["validate"].is_empty());
    assert!(snapshot["greet"].is_empty());
    assert_eq!(snapshot["validate/err"].len(), 1);

    let mut greetings: Vec<String> = snapshot["archive"]
        .iter()
        .map(|message| {
            assert_eq!(message.path, ["validate:success", "greet:success"]);
            let init_id = message.init_id.clone().unwrap();
            assert!(first_ids.contains(&init_id));
            message.payload.as_ref().unwrap()["greeting"]
                .as_str()
                .unwrap()
                .to_string()
        })
        .collect();
    greetings.sort();
    assert_eq!(greetings, ["Hello, Alexandra", "Hello, Catherine"]);

    let failed = &snapshot["validate/err"][0];
    assert_eq!(failed.path, ["validate:err"]);
    assert_eq!(failed.old_payload, Some(json!({})));
    assert_eq!(failed.err, Some(json!({"message": "missing name"})));
    println!("✓ Two-stage pipeline delivered every message");
}

#[tokio::test]
async fn test_single_hops_can_replay_a_pipeline_by_hand() {
    let exchange = quick_exchange();
    let advancer = Advancer::new(exchange.clone(), greeting_routes());

    exchange
        .enqueue_payload("validate", json!({"name": "Dorothea"}))
        .await
        .unwrap();

    let first = advancer.run("validate").await.unwrap();
    assert_eq!(first.destination_queues, ["greet"]);
    let second = advancer.run("greet").await.unwrap();
    assert_eq!(second.destination_queues, ["archive", "audit"]);

    assert_eq!(second.source_message.path, ["validate:success"]);
    assert_eq!(
        second.result_message.payload,
        Some(json!({"greeting": "Hello, Dorothea"}))
    );
    assert_eq!(first.result_message.init_id, second.result_message.init_id);
}
