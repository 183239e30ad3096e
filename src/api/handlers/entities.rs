use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::state_error;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::states::{EntityCheck, EntitySummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EntityRequest {
    #[serde(default)]
    pub entity: String,
}

#[derive(Debug, Serialize)]
pub struct EntityListResponse {
    pub entities: Vec<EntitySummary>,
}

pub async fn validate_entity(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<EntityRequest>,
) -> Result<Json<JSend<EntityCheck>>, ApiError> {
    let check = state
        .states
        .validate_entity(req.entity.trim())
        .await
        .map_err(state_error)?;
    Ok(JSend::success(check))
}

pub async fn list_entities(
    State(state): State<Arc<AppState>>,
    Path(domain): Path<String>,
) -> Result<Json<JSend<EntityListResponse>>, ApiError> {
    let entities = state
        .states
        .list_entities(&domain)
        .await
        .map_err(state_error)?;
    Ok(JSend::success(EntityListResponse { entities }))
}
