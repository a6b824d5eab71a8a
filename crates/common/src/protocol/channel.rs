// Event envelope shared by the dev-server channel and its WebSocket transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names carried on the dev-server channel.
pub mod events {
    /// Browser -> server: persist control values into a story file.
    pub const SAVE_STORY_REQUEST: &str = "saveStoryRequest";
    /// Server -> browser: outcome of a `saveStoryRequest`, correlated by story id.
    pub const SAVE_STORY_RESULT: &str = "saveStoryResult";
}

/// A single channel event: `{ "type": ..., "args": [...] }`.
///
/// Events sent by browser clients may also carry a `from` field naming the
/// sending channel; it is kept so the envelope survives a decode/encode pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl ChannelEvent {
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self { event_type: event_type.into(), args: vec![payload], from: None }
    }

    /// First argument of the event, which carries the payload for every
    /// event this server understands.
    pub fn payload(&self) -> Option<&Value> {
        self.args.first()
    }

    pub fn is(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}
