//! WebSocket handler for the avatar session channel
//!
//! Every connection receives the full outbound event stream; inbound
//! control events are dispatched to the orchestrator. Connecting is the
//! protocol's `connect` — there is no separate handshake event.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::ApiState;
use crate::session::ClientEvent;

/// Build the WebSocket router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}

/// Handle WebSocket upgrade request
async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let conn_id = uuid::Uuid::new_v4();
    tracing::info!(%conn_id, "client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.orchestrator.subscribe();

    // Forward orchestrator events to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Ok(text) = serde_json::to_string(&event) else {
                        continue;
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(%conn_id, skipped, "slow client, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Dispatch inbound control events
    let dispatch_state = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => dispatch(&dispatch_state, event),
                    Err(e) => {
                        tracing::warn!(%conn_id, error = %e, "unrecognized client event");
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(%conn_id, "client disconnected");
}

/// Route one control event to the orchestrator
///
/// Stop runs on its own task so the farewell's pacing never blocks this
/// connection's inbound events (the `speak-done` ack arrives here too).
fn dispatch(state: &Arc<ApiState>, event: ClientEvent) {
    match event {
        ClientEvent::StartFace => {
            tracing::info!("start-face received");
            state.orchestrator.start();
        }
        ClientEvent::StopFace => {
            tracing::info!("stop-face received");
            let orchestrator = Arc::clone(&state.orchestrator);
            tokio::spawn(async move {
                orchestrator.stop().await;
            });
        }
        ClientEvent::SpeakDone => {
            tracing::debug!("speak-done received");
            state.orchestrator.control().ack_playback();
        }
    }
}
