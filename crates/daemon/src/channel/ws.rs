use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use storysave_common::protocol::channel::ChannelEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::channel::EventBus;

pub fn router(bus: EventBus, channel_path: &str) -> Router {
    Router::new().route(channel_path, get(channel_ws_route)).with_state(bus)
}

async fn channel_ws_route(ws: WebSocketUpgrade, State(bus): State<EventBus>) -> impl IntoResponse {
    // Subscribe before the handshake completes so a client never misses
    // events emitted right after it connects.
    let outgoing_rx = bus.subscribe_outgoing();
    ws.on_upgrade(move |socket| handle_socket(socket, bus, outgoing_rx))
}

async fn handle_socket(
    mut socket: WebSocket,
    bus: EventBus,
    mut outgoing_rx: mpsc::UnboundedReceiver<ChannelEvent>,
) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(message)) = incoming else {
                    break;
                };

                match message {
                    WsMessage::Text(payload) => deliver_frame(payload.as_bytes(), &bus).await,
                    WsMessage::Binary(payload) => deliver_frame(payload.as_ref(), &bus).await,
                    WsMessage::Ping(payload) => {
                        if socket.send(WsMessage::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Pong(_) => {}
                    WsMessage::Close(_) => break,
                }
            }
            outbound = outgoing_rx.recv() => {
                match outbound {
                    Some(event) => {
                        let encoded = match serde_json::to_string(&event) {
                            Ok(encoded) => encoded,
                            Err(error) => {
                                warn!(?error, event_type = %event.event_type, "failed to encode channel event");
                                continue;
                            }
                        };
                        if socket.send(WsMessage::Text(encoded.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

async fn deliver_frame(raw: &[u8], bus: &EventBus) {
    match serde_json::from_slice::<ChannelEvent>(raw) {
        Ok(event) => {
            debug!(event_type = %event.event_type, "channel event received");
            bus.deliver(event).await;
        }
        Err(error) => warn!(%error, "dropping undecodable channel frame"),
    }
}
