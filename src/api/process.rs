//! Text submission endpoint
//!
//! `POST /procesar` with `{"texto": "..."}` answers
//! `{"mensaje", "gesto", "idioma"}`. Always 200; failures come back as the
//! apology envelope. Robot state, busy flag and speech queue are untouched.

use std::sync::Arc;

use axum::{Json, Router, body::Bytes, extract::State, routing::post};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::gesture::{Gesture, ResponseEnvelope};
use crate::language::Language;

#[derive(Debug, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub texto: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessResponse {
    pub mensaje: String,
    pub gesto: Gesture,
    pub idioma: Language,
}

impl From<ResponseEnvelope> for ProcessResponse {
    fn from(envelope: ResponseEnvelope) -> Self {
        Self {
            mensaje: envelope.message,
            gesto: envelope.gesture,
            idioma: envelope.language,
        }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/procesar", post(process))
        .with_state(state)
}

async fn process(State(state): State<Arc<ApiState>>, body: Bytes) -> Json<ProcessResponse> {
    // a malformed body is treated as empty text rather than a 4xx
    let request: ProcessRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "unreadable request body");
        ProcessRequest::default()
    });

    tracing::info!(texto = %request.texto, "text submitted");
    let envelope = state.responder.generate(&request.texto).await;

    Json(envelope.into())
}
