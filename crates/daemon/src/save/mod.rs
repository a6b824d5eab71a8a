// Save-from-controls: turns `saveStoryRequest` events into story file edits
// and answers each with a `saveStoryResult`.

pub mod diagnostics;
pub mod fault;
pub mod locator;
pub mod orchestrator;
pub mod planner;

use std::sync::Arc;

use serde_json::Value;
use storysave_common::protocol::channel::{events, ChannelEvent};
use storysave_common::protocol::story::{SaveStoryPayload, SaveStoryResponse};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::channel::EventBus;
use crate::store::StoryStore;

pub use diagnostics::{Diagnostics, FaultReport};
pub use fault::{FaultKind, SaveFault};
pub use orchestrator::{SaveOrchestrator, SavedStory};
pub use planner::EditPlan;

/// Running save handler bound to an [`EventBus`].
pub struct SaveFromControls {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SaveFromControls {
    /// Subscribe to `bus` and handle save requests until [`stop`](Self::stop).
    pub fn start<S: StoryStore>(bus: EventBus, orchestrator: Arc<SaveOrchestrator<S>>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let requests = bus.subscribe();
        let task = tokio::spawn(listen(bus, orchestrator, requests, stop_rx));
        info!("save-from-controls handler started");
        Self { stop_tx, task: Some(task) }
    }

    /// Stop accepting requests. Requests already queued or in flight still
    /// complete and respond.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop, then wait until every accepted request has responded.
    pub async fn wait(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SaveFromControls {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn listen<S: StoryStore>(
    bus: EventBus,
    orchestrator: Arc<SaveOrchestrator<S>>,
    mut requests: mpsc::Receiver<ChannelEvent>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut in_flight = JoinSet::new();
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            received = requests.recv() => {
                match received {
                    Some(event) => accept(&bus, &orchestrator, event, &mut in_flight),
                    None => break,
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                log_join(joined);
            }
        }
    }

    requests.close();
    while let Some(event) = requests.recv().await {
        accept(&bus, &orchestrator, event, &mut in_flight);
    }
    if !in_flight.is_empty() {
        info!(pending = in_flight.len(), "waiting for in-flight saves");
    }
    while let Some(joined) = in_flight.join_next().await {
        log_join(joined);
    }
    info!("save-from-controls handler stopped");
}

fn accept<S: StoryStore>(
    bus: &EventBus,
    orchestrator: &Arc<SaveOrchestrator<S>>,
    event: ChannelEvent,
    in_flight: &mut JoinSet<()>,
) {
    if event.is(events::SAVE_STORY_REQUEST) {
        dispatch(bus, orchestrator, event, in_flight);
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(error) = joined {
        warn!(%error, "save task ended abnormally");
    }
}

/// Handle one request in its own task so a slow file never holds up others.
fn dispatch<S: StoryStore>(
    bus: &EventBus,
    orchestrator: &Arc<SaveOrchestrator<S>>,
    event: ChannelEvent,
    in_flight: &mut JoinSet<()>,
) {
    let raw = event.payload().cloned().unwrap_or(Value::Null);
    let payload = match serde_json::from_value::<SaveStoryPayload>(raw.clone()) {
        Ok(payload) => payload,
        Err(error) => {
            match request_id(&raw) {
                Some(id) => {
                    let response =
                        orchestrator.diagnostics().report(&id, &SaveFault::InvalidRequest(error));
                    emit_result(bus, &response);
                }
                None => warn!(%error, "dropping save request without a story id"),
            }
            return;
        }
    };

    debug!(story_id = %payload.id, import_path = %payload.import_path, "save request received");
    let bus = bus.clone();
    let orchestrator = Arc::clone(orchestrator);
    in_flight.spawn(async move {
        let response = orchestrator.handle(&payload).await;
        emit_result(&bus, &response);
    });
}

fn request_id(raw: &Value) -> Option<String> {
    raw.get("id").and_then(Value::as_str).map(str::to_string)
}

fn emit_result(bus: &EventBus, response: &SaveStoryResponse) {
    match serde_json::to_value(response) {
        Ok(payload) => {
            bus.emit(ChannelEvent::new(events::SAVE_STORY_RESULT, payload));
        }
        Err(error) => warn!(%error, story_id = %response.id, "failed to encode save result"),
    }
}
