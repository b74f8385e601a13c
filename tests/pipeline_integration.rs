//! Pipeline integration tests
//!
//! Configuration-driven setup is tested here. Scenario tests live in
//! focused modules under tests/pipeline/.

mod pipeline;

use pipeline::wait_for;
use queuehop::advancer::api::{worker, Advancer, Destinations, RoutingTable, WorkerError};
use queuehop::core::config::{ConfigError, Settings};
use queuehop::exchange::api::{Exchange, MemoryExchange};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Duration;

#[tokio::test]
async fn test_pipeline_from_configuration_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[exchange]
visibility-timeout-seconds = 2
poll-interval-ms = 5
sweep-interval-ms = 20

[runner]
pollIntervalMs = 5
concurrency = 2
"#
    )
    .unwrap();

    let settings = Settings::load(file.path()).await.unwrap();
    assert_eq!(settings.exchange.visibility_timeout, Duration::from_secs(2));
    assert_eq!(settings.runner.concurrency, 2);

    let exchange = MemoryExchange::create(settings.exchange.clone()).await;
    let mut routes = RoutingTable::new();
    routes.add_route(
        "count",
        [("success", Destinations::from("counted"))],
        worker::direct(|payload: Value| {
            let n = payload["n"].as_i64().unwrap_or(0);
            Ok::<_, WorkerError>(json!({"n": n + 1}))
        }),
    );
    let advancer = std::sync::Arc::new(Advancer::new(exchange.clone(), routes));

    for n in 0..5 {
        exchange.enqueue_payload("count", json!({"n": n})).await.unwrap();
    }
    let handle = advancer
        .run_forever_with("count", settings.runner.clone())
        .unwrap();
    wait_for("five hops", || handle.hops_completed() == 5).await;
    handle.stop_and_join().await;
    exchange.shutdown();

    let mut counted: Vec<i64> = exchange
        .leasable("counted")
        .await
        .unwrap()
        .iter()
        .filter_map(|message| message.payload.as_ref()?["n"].as_i64())
        .collect();
    counted.sort();
    assert_eq!(counted, [1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_missing_configuration_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = Settings::load(dir.path().join("absent.toml")).await;

    match result {
        Err(ConfigError::Read { path, .. }) => assert!(path.ends_with("absent.toml")),
        other => panic!("Expected ConfigError::Read, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let result = Settings::from_toml_str("[runner]\nconcurrency = 0\n");
    assert!(matches!(result, Err(ConfigError::Validation(_))));

    let result = Settings::from_toml_str("[logging]\nformat = \"xml\"\n");
    assert!(matches!(result, Err(ConfigError::Validation(_))));
}
