use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{named_slot, store_error};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::schema::{self, Verdict};
use crate::storage::{ConfigDocument, LiveSource, Slot, SlotInfo};
use crate::AppState;

/// Where the panels fetch the live file from (Home Assistant serves `www/` as `/local/`)
const LIVE_URL: &str = "/local/panel_widgets/site_settings.json";

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    /// Named staging slot; the default slot when absent
    #[serde(rename = "_filename", default)]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub document: ConfigDocument,
}

#[derive(Debug, Deserialize)]
pub struct MakeLiveParams {
    #[serde(default)]
    pub slot: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LiveConfigResponse {
    pub config: ConfigDocument,
    pub source: LiveSource,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub filename: String,
    pub message: String,
    pub staging_file: String,
}

#[derive(Debug, Serialize)]
pub struct LiveResponse {
    pub live_path: String,
    pub message: String,
    pub staging_file: Option<String>,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct StagingListResponse {
    pub files: Vec<SlotInfo>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub config: ConfigDocument,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<LiveConfigResponse>>, ApiError> {
    let live = state.store.get_live().map_err(store_error)?;
    Ok(JSend::success(LiveConfigResponse {
        config: live.document,
        source: live.source,
    }))
}

pub async fn save_config(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SaveRequest>,
) -> Result<Json<JSend<SaveResponse>>, ApiError> {
    let slot = match req.filename.as_deref() {
        Some(name) => named_slot(name)?,
        None => Slot::Default,
    };

    let saved = state
        .store
        .save(req.document, &slot)
        .map_err(store_error)?;

    Ok(JSend::success(SaveResponse {
        filename: saved.name,
        message: "Configuration saved to staging".to_string(),
        staging_file: saved.path.display().to_string(),
    }))
}

pub async fn save_and_make_live(
    State(state): State<Arc<AppState>>,
    AppJson(document): AppJson<ConfigDocument>,
) -> Result<Json<JSend<LiveResponse>>, ApiError> {
    let promotion = state
        .store
        .save_and_promote(document)
        .map_err(store_error)?;

    Ok(JSend::success(LiveResponse {
        live_path: promotion.live_path.display().to_string(),
        message: "Configuration saved and is now live".to_string(),
        staging_file: Some(promotion.staging.path.display().to_string()),
        url: LIVE_URL.to_string(),
    }))
}

pub async fn make_live(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<MakeLiveParams>,
) -> Result<Json<JSend<LiveResponse>>, ApiError> {
    let slot = match params.slot.as_deref() {
        Some(name) => named_slot(name)?,
        None => Slot::Default,
    };

    let live_path = state.store.promote(&slot).map_err(store_error)?;

    Ok(JSend::success(LiveResponse {
        live_path: live_path.display().to_string(),
        message: "Configuration is now live".to_string(),
        staging_file: None,
        url: LIVE_URL.to_string(),
    }))
}

pub async fn list_staging(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<StagingListResponse>>, ApiError> {
    let files = state.store.list().map_err(store_error)?;
    Ok(JSend::success(StagingListResponse { files }))
}

pub async fn load_staging(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<JSend<ConfigDocument>>, ApiError> {
    let slot = named_slot(&name)?;
    let document = state.store.load(&slot).map_err(store_error)?;
    Ok(JSend::success(document))
}

pub async fn delete_staging(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<JSend<MessageResponse>>, ApiError> {
    let slot = named_slot(&name)?;
    state.store.delete(&slot).map_err(store_error)?;
    Ok(JSend::success(MessageResponse {
        message: format!("Deleted {slot}"),
    }))
}

pub async fn import_config(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<ImportResponse>>, ApiError> {
    let mut contents = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if field.file_name().is_some_and(str::is_empty) {
            return Err(ApiError::bad_request("No file selected"));
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;
        contents = Some(data);
    }

    let contents = contents.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let summary = state.store.import(&contents).map_err(store_error)?;

    Ok(JSend::success(ImportResponse {
        message: format!(
            "Imported {} devices to staging",
            summary.document.device_count()
        ),
        config: summary.document,
    }))
}

/// Copy the default slot to a named slot and download it.
pub async fn export_config(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let slot = named_slot(&name)?;
    state.store.export(&slot).map_err(store_error)?;
    let document = state.store.load(&slot).map_err(store_error)?;
    let body =
        serde_json::to_vec_pretty(&document).map_err(|e| ApiError::internal(e.to_string()))?;

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    let disposition = format!("attachment; filename=\"{slot}\"");
    if let Ok(value) = header::HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

pub async fn validate_config(
    AppJson(document): AppJson<ConfigDocument>,
) -> Json<JSend<Verdict>> {
    JSend::success(schema::check_document(&document))
}
