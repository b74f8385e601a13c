//! Worker invocation and result normalization
//!
//! A worker can report its result in several equivalent ways:
//!
//! - through its [`Completion`] handle, with an explicit resolution
//!   ([`Completion::resolve`]), a value to inspect ([`Completion::complete`])
//!   or an error ([`Completion::fail`])
//! - by returning a value, outcome or error from `process`
//! - any mix of the above, in which case the first commit wins
//!
//! Values are inspected by [`normalize_value`]: an object carrying a string
//! `resolution` field yields that resolution and its `payload` field, an
//! object carrying a string `_resolution` field yields that resolution and
//! the rest of the object, anything else is a `success` payload.

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Resolution given to untagged successful results
pub const SUCCESS_RESOLUTION: &str = "success";

/// A failure declared by a worker
///
/// This is routed to the `err` resolution like any other result; it never
/// surfaces as an [`AdvancerError`](crate::advancer::api::AdvancerError).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct WorkerError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl WorkerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Form stored in a message's `err` field
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::String(self.message.clone()))
    }
}

impl From<&str> for WorkerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for WorkerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Canonical result of one worker invocation
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutcome {
    Success { resolution: String, payload: Value },
    Failure(WorkerError),
}

impl WorkerOutcome {
    pub fn success(resolution: impl Into<String>, payload: Value) -> Self {
        WorkerOutcome::Success {
            resolution: resolution.into(),
            payload,
        }
    }
}

/// Interpret a worker's value, honouring `resolution` and `_resolution` tags
pub fn normalize_value(value: Value) -> WorkerOutcome {
    let Value::Object(mut object) = value else {
        return WorkerOutcome::success(SUCCESS_RESOLUTION, value);
    };

    if let Some(Value::String(resolution)) = object.get("resolution") {
        let resolution = resolution.clone();
        let payload = object
            .remove("payload")
            .unwrap_or_else(|| Value::Object(Map::new()));
        return WorkerOutcome::success(resolution, payload);
    }

    if let Some(Value::String(resolution)) = object.get("_resolution") {
        let resolution = resolution.clone();
        object.remove("_resolution");
        return WorkerOutcome::success(resolution, Value::Object(object));
    }

    WorkerOutcome::success(SUCCESS_RESOLUTION, Value::Object(object))
}

/// What `Worker::process` hands back
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReturn {
    /// The result is, or will be, committed through the `Completion`
    Pending,
    /// A value for [`normalize_value`]
    Value(Value),
    Outcome(WorkerOutcome),
    Failed(WorkerError),
}

impl From<Result<Value, WorkerError>> for WorkerReturn {
    fn from(result: Result<Value, WorkerError>) -> Self {
        match result {
            Ok(value) => WorkerReturn::Value(value),
            Err(err) => WorkerReturn::Failed(err),
        }
    }
}

/// Single-assignment result slot shared with a worker
///
/// Clones share the slot. The first commit wins; later ones are ignored
/// and return `false`.
#[derive(Clone)]
pub struct Completion {
    slot: Arc<Mutex<Option<oneshot::Sender<WorkerOutcome>>>>,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("committed", &self.is_committed())
            .finish()
    }
}

impl Completion {
    fn channel() -> (Self, oneshot::Receiver<WorkerOutcome>) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                slot: Arc::new(Mutex::new(Some(sender))),
            },
            receiver,
        )
    }

    /// Commit an outcome if nothing was committed yet
    pub fn commit(&self, outcome: WorkerOutcome) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            // a closed receiver still counts as the first commit
            Some(sender) => {
                let _ = sender.send(outcome);
                true
            }
            None => {
                log::trace!("Ignored repeated worker completion");
                false
            }
        }
    }

    /// Succeed with an explicit resolution
    pub fn resolve(&self, resolution: impl Into<String>, payload: Value) -> bool {
        self.commit(WorkerOutcome::success(resolution, payload))
    }

    /// Succeed with a value, inspecting it for resolution tags
    pub fn complete(&self, value: Value) -> bool {
        self.commit(normalize_value(value))
    }

    pub fn fail(&self, err: impl Into<WorkerError>) -> bool {
        self.commit(WorkerOutcome::Failure(err.into()))
    }

    /// Commit a `Result`, the shape most fallible code produces
    pub fn finish(&self, result: Result<Value, WorkerError>) -> bool {
        match result {
            Ok(value) => self.complete(value),
            Err(err) => self.fail(err),
        }
    }

    pub fn is_committed(&self) -> bool {
        match self.slot.lock() {
            Ok(slot) => slot.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

/// The processing step registered for a queue
#[async_trait]
pub trait Worker: Send + Sync {
    async fn process(&self, payload: Value, completion: Completion) -> WorkerReturn;
}

/// Run a worker and reduce whatever it reports to one outcome
///
/// A panicking worker and a worker that returns [`WorkerReturn::Pending`]
/// but lets every `Completion` go without committing both count as
/// failures.
pub async fn invoke(worker: &dyn Worker, payload: Value) -> WorkerOutcome {
    let (completion, receiver) = Completion::channel();

    let returned = AssertUnwindSafe(worker.process(payload, completion.clone()))
        .catch_unwind()
        .await;

    match returned {
        Ok(WorkerReturn::Pending) => {}
        Ok(WorkerReturn::Value(value)) => {
            completion.complete(value);
        }
        Ok(WorkerReturn::Outcome(outcome)) => {
            completion.commit(outcome);
        }
        Ok(WorkerReturn::Failed(err)) => {
            completion.fail(err);
        }
        Err(panic) => {
            completion.fail(WorkerError::new(format!(
                "worker panicked: {}",
                panic_message(panic.as_ref())
            )));
        }
    }
    drop(completion);

    receiver
        .await
        .unwrap_or_else(|_| WorkerOutcome::Failure(WorkerError::new("worker finished without completing")))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

struct CallbackWorker<F>(F);

#[async_trait]
impl<F> Worker for CallbackWorker<F>
where
    F: Fn(Value, Completion) + Send + Sync + 'static,
{
    async fn process(&self, payload: Value, completion: Completion) -> WorkerReturn {
        (self.0)(payload, completion);
        WorkerReturn::Pending
    }
}

/// Worker that reports only through its `Completion`
///
/// The closure may commit synchronously or hand the completion to a task
/// that commits later.
pub fn callback<F>(f: F) -> Arc<dyn Worker>
where
    F: Fn(Value, Completion) + Send + Sync + 'static,
{
    Arc::new(CallbackWorker(f))
}

struct FutureWorker<F>(F);

#[async_trait]
impl<F, Fut> Worker for FutureWorker<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, WorkerError>> + Send + 'static,
{
    async fn process(&self, payload: Value, _completion: Completion) -> WorkerReturn {
        (self.0)(payload).await.into()
    }
}

/// Worker backed by an async function
///
/// `Ok` values go through [`normalize_value`]; `Err` is a failure.
pub fn future<F, Fut>(f: F) -> Arc<dyn Worker>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, WorkerError>> + Send + 'static,
{
    Arc::new(FutureWorker(f))
}

struct DirectWorker<F>(F);

#[async_trait]
impl<F> Worker for DirectWorker<F>
where
    F: Fn(Value) -> Result<Value, WorkerError> + Send + Sync + 'static,
{
    async fn process(&self, payload: Value, _completion: Completion) -> WorkerReturn {
        (self.0)(payload).into()
    }
}

/// Worker backed by a plain function
pub fn direct<F>(f: F) -> Arc<dyn Worker>
where
    F: Fn(Value) -> Result<Value, WorkerError> + Send + Sync + 'static,
{
    Arc::new(DirectWorker(f))
}
