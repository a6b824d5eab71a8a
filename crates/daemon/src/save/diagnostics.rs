// Failure reporting: full detail to the operator, a fixed message to the client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storysave_common::protocol::story::SaveStoryResponse;
use tokio::sync::broadcast;
use tracing::error;

use crate::save::fault::{FaultKind, SaveFault};

/// Structured record of one failed save, for telemetry listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultReport {
    pub story_id: String,
    pub kind: FaultKind,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    telemetry: Option<broadcast::Sender<FaultReport>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a telemetry channel; every reported fault is also sent there.
    pub fn with_telemetry(mut self, sender: broadcast::Sender<FaultReport>) -> Self {
        self.telemetry = Some(sender);
        self
    }

    /// Log `fault` and build the failure response for `story_id`.
    pub fn report(&self, story_id: &str, fault: &SaveFault) -> SaveStoryResponse {
        let kind = fault.kind();
        let detail = fault.detail();
        error!(story_id, kind = kind.as_str(), detail = %detail, "failed to save story");

        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.send(FaultReport {
                story_id: story_id.to_string(),
                kind,
                detail,
                occurred_at: Utc::now(),
            });
        }

        SaveStoryResponse::failed(story_id)
    }
}
