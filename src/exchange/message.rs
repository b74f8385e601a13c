//! The unit of work moving between queues

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A work item as stored on, and leased from, an exchange
///
/// Every field is optional on input so that messages produced by other
/// systems can be posted as-is; [`Message::prepare_for_hop`] fills in the
/// gaps before a worker sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Assigned by the exchange on every enqueue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_id: Option<String>,

    /// Stable id of the logical work item, carried across hops
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_id: Option<String>,

    /// `"<queue>:<resolution>"` tags, one per hop, append-only
    #[serde(default)]
    pub path: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Failure detail of the last hop, if it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<Value>,

    /// Payload as it was before the failed hop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_payload: Option<Value>,
}

impl Message {
    /// Wrap a bare payload in a fresh message with an empty path
    pub fn from_payload(payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// Resolution label of the most recent hop
    pub fn resolution(&self) -> Option<&str> {
        let last = self.path.last()?;
        last.rsplit_once(':').map(|(_, resolution)| resolution)
    }

    pub fn is_failed(&self) -> bool {
        self.err.is_some()
    }

    /// Fill in fields a leased message may be missing
    ///
    /// A missing payload becomes an empty object and a missing `init_id`
    /// is taken from the transport id of this delivery.
    pub fn prepare_for_hop(&mut self) {
        if self.payload.is_none() {
            self.payload = Some(Value::Object(Map::new()));
        }
        if self.init_id.is_none() {
            self.init_id = self.transport_id.clone();
        }
    }

    /// Record a successful hop
    pub fn record_success(&mut self, queue: &str, resolution: &str, payload: Value) {
        self.path.push(hop_tag(queue, resolution));
        self.payload = Some(payload);
        self.err = None;
        self.old_payload = None;
    }

    /// Record a failed hop, keeping the previous payload for diagnostics
    pub fn record_failure(&mut self, queue: &str, err: Value) {
        self.path.push(hop_tag(queue, ERR_RESOLUTION));
        self.old_payload = self.payload.take();
        self.err = Some(err);
    }
}

/// Resolution recorded for a failed hop
pub const ERR_RESOLUTION: &str = "err";

pub fn hop_tag(queue: &str, resolution: &str) -> String {
    format!("{queue}:{resolution}")
}
