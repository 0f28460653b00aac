//! WebSocket renderer feed: a snapshot on connect, then every wizard event.
//! Clients may also answer and reset over the same socket.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::routes::AppState;
use crate::wizard::{WizardEvent, WizardSession};

/// Actions a WebSocket client can send.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    Answer { text: String },
    Reset,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state.session))
}

async fn handle_socket(mut socket: WebSocket, session: Arc<WizardSession>) {
    info!("WebSocket client connected");

    // Subscribe before the initial sync so nothing falls between the two.
    let mut rx = session.subscribe();

    if !send_event(&mut socket, &sync_event(&session).await).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind broadcast");
                        if !send_event(&mut socket, &sync_event(&session).await).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }

            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &session);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

async fn sync_event(session: &WizardSession) -> WizardEvent {
    WizardEvent::Sync {
        snapshot: session.snapshot().await,
    }
}

/// Serialize and send one event. Returns false once the client is gone.
async fn send_event(socket: &mut WebSocket, event: &WizardEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize wizard event");
            true
        }
    }
}

/// Run the requested action in the background; its effects reach every
/// client through the broadcast.
fn handle_client_message(text: &str, session: &Arc<WizardSession>) {
    match serde_json::from_str::<ClientAction>(text) {
        Ok(ClientAction::Answer { text }) => {
            let session = Arc::clone(session);
            tokio::spawn(async move {
                let outcome = session.submit(&text).await;
                debug!(?outcome, "Answer via WS");
            });
        }
        Ok(ClientAction::Reset) => {
            let session = Arc::clone(session);
            tokio::spawn(async move { session.restart().await });
        }
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_actions_deserialize() {
        let answer: ClientAction =
            serde_json::from_str(r#"{"action": "answer", "text": "Maruti"}"#).unwrap();
        assert!(matches!(answer, ClientAction::Answer { text } if text == "Maruti"));

        let reset: ClientAction = serde_json::from_str(r#"{"action": "reset"}"#).unwrap();
        assert!(matches!(reset, ClientAction::Reset));

        assert!(serde_json::from_str::<ClientAction>(r#"{"action": "approve"}"#).is_err());
    }
}
