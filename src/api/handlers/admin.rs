use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::JSend;
use crate::config::DeploymentMode;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub mode: String,
    pub home_assistant: bool,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    let mode = match state.config.mode {
        DeploymentMode::Addon => "addon",
        DeploymentMode::Local => "local",
    };

    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: state.config.version.value.clone(),
        mode: mode.to_string(),
        home_assistant: state.states.is_configured(),
    })
}
