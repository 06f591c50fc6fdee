//! Health and status endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::robot::RobotState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Snapshot of the robot
#[derive(Debug, Serialize, Deserialize)]
pub struct StateResponse {
    pub state: RobotState,
    pub busy: bool,
    pub voice_enabled: bool,
    /// Connected front ends
    pub clients: usize,
}

/// Liveness probe
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn robot_state(State(state): State<Arc<ApiState>>) -> Json<StateResponse> {
    Json(StateResponse {
        state: state.runtime.state.get(),
        busy: state.runtime.busy.is_set(),
        voice_enabled: state.voice_enabled,
        clients: state.runtime.events().subscriber_count(),
    })
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/state", get(robot_state))
        .with_state(state)
}
