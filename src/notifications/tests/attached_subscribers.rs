//! Tests for subscribers driven by NotificationManager::attach

#[cfg(test)]
mod tests {
    use crate::notifications::api::{
        AdvancerEvent, Event, EventFilter, LogSubscriber, NotificationManager, Subscriber,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tokio::time::{timeout, Duration};

    struct Recorder {
        id: String,
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl Recorder {
        fn new(id: &str, fail_on: Option<&str>) -> Self {
            Self {
                id: id.to_string(),
                seen: Mutex::new(Vec::new()),
                fail_on: fail_on.map(str::to_string),
            }
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Subscriber for Recorder {
        async fn handle_event(
            &self,
            event: Event,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let queue = event.queue().to_string();
            self.seen.lock().unwrap().push(queue.clone());
            if self.fail_on.as_deref() == Some(queue.as_str()) {
                return Err(format!("refusing events for '{queue}'").into());
            }
            Ok(())
        }

        fn subscriber_id(&self) -> &str {
            &self.id
        }

        fn source(&self) -> &str {
            "test:recorder"
        }
    }

    async fn wait_for(recorder: &Recorder, count: usize) {
        timeout(Duration::from_secs(1), async {
            while recorder.seen().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscriber did not receive events in time");
    }

    #[tokio::test]
    async fn test_attached_subscriber_receives_events_in_order() {
        let manager = NotificationManager::new();
        let recorder = Arc::new(Recorder::new("recorder", None));
        let _task = manager
            .attach(recorder.clone(), EventFilter::AdvancerOnly)
            .unwrap();

        for queue in ["a", "b", "c"] {
            manager
                .publish(&Event::Advancer(AdvancerEvent::loading("p1", queue)))
                .unwrap();
        }

        wait_for(&recorder, 3).await;
        assert_eq!(recorder.seen(), vec!["a", "b", "c"]);
        println!("✓ Attached subscriber saw events in publish order");
    }

    #[tokio::test]
    async fn test_handler_errors_are_counted_not_fatal() {
        let manager = NotificationManager::new();
        let recorder = Arc::new(Recorder::new("picky", Some("bad")));
        let _task = manager.attach(recorder.clone(), EventFilter::All).unwrap();

        for queue in ["bad", "good"] {
            manager
                .publish(&Event::Advancer(AdvancerEvent::loading("p1", queue)))
                .unwrap();
        }

        wait_for(&recorder, 2).await;
        let stats = manager.subscriber_statistics("picky").unwrap();
        assert_eq!(stats.error_count(), 1);
        assert_eq!(stats.messages_processed(), 2);
    }

    #[tokio::test]
    async fn test_attach_task_ends_on_unsubscribe() {
        let manager = NotificationManager::new();
        let task = manager
            .attach(Arc::new(LogSubscriber::default()), EventFilter::All)
            .unwrap();

        assert!(manager.unsubscribe("log"));
        timeout(Duration::from_secs(1), task)
            .await
            .expect("attach task should finish once unsubscribed")
            .unwrap();
    }
}
