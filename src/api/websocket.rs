//! Robot event gateway
//!
//! `GET /ws` streams every [`RobotEvent`] to the browser and accepts control
//! messages back. Connecting wakes an idle robot into listening.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};

use super::ApiState;
use crate::language::Language;
use crate::robot::RobotEvent;

/// Client → server control message
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    StartListening,
    StopListening,
    /// Ask for a random idle phrase in a language tag ("es", "en", "en-US")
    IdleSpeak {
        #[serde(default)]
        language: Option<String>,
    },
    Ping,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new().route("/ws", get(ws_upgrade)).with_state(state)
}

async fn ws_upgrade(State(state): State<Arc<ApiState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ApiState>) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    // subscribe before announcing so the connect transition is delivered
    let mut events = state.runtime.events().subscribe();

    let connected = RobotEvent::Connected {
        connection_id: connection_id.clone(),
    };
    if let Ok(msg) = serde_json::to_string(&connected) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            return;
        }
    }

    tracing::info!(connection_id = %connection_id, "front end connected");
    state.runtime.client_connected();

    // Replies meant for this connection only
    let (tx, mut rx) = mpsc::channel::<RobotEvent>(32);

    let send_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                direct = rx.recv() => match direct {
                    Some(event) => event,
                    None => break,
                },
                broadcast = events.recv() => match broadcast {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(connection_id = %send_id, skipped, "client lagging, events dropped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };

            if let Ok(text) = serde_json::to_string(&event) {
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    let recv_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Some(reply) = handle_message(&text, &state) {
                        if tx.send(reply).await.is_err() {
                            break;
                        }
                    }
                }
                Message::Close(_) => {
                    tracing::info!(connection_id = %recv_id, "WebSocket closed by client");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::info!(connection_id = %connection_id, "front end disconnected");
}

/// Apply one control message, returning a reply for this client if any
fn handle_message(text: &str, state: &ApiState) -> Option<RobotEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, "unrecognized client message");
            return Some(RobotEvent::Error {
                message: format!("unrecognized message: {e}"),
            });
        }
    };

    tracing::debug!(?event, "client event");

    match event {
        ClientEvent::StartListening => state.runtime.start_listening(),
        ClientEvent::StopListening => state.runtime.stop_listening(),
        ClientEvent::IdleSpeak { language } => {
            let language = language.as_deref().map(Language::from_tag).unwrap_or_default();
            state.runtime.idle_speak(language);
        }
        ClientEvent::Ping => return Some(RobotEvent::Pong),
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_parse() {
        assert_eq!(
            serde_json::from_str::<ClientEvent>(r#"{"type":"start_listening"}"#).unwrap(),
            ClientEvent::StartListening
        );
        assert_eq!(
            serde_json::from_str::<ClientEvent>(r#"{"type":"idle_speak","language":"en-US"}"#)
                .unwrap(),
            ClientEvent::IdleSpeak {
                language: Some("en-US".to_string())
            }
        );
        assert_eq!(
            serde_json::from_str::<ClientEvent>(r#"{"type":"idle_speak"}"#).unwrap(),
            ClientEvent::IdleSpeak { language: None }
        );
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"dance"}"#).is_err());
    }
}
