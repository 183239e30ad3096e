use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::asset_error;
use crate::api::response::{ApiError, AppQuery, JSend};
use crate::assets::{AssetEntry, ImageAsset};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListAssetsParams {
    pub directory: String,
}

#[derive(Debug, Serialize)]
pub struct AssetListResponse {
    pub directory: String,
    pub files: Vec<AssetEntry>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Multipart upload with a `directory` text field and a `file` part.
pub async fn upload_asset(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<JSend<ImageAsset>>, ApiError> {
    let mut directory: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                if file_name.is_empty() {
                    return Err(ApiError::bad_request("No file selected"));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                file = Some((file_name, data));
            }
            "directory" => {
                directory = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid directory: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let (file_name, data) = file.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let directory = directory
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("directory field is required"))?;

    let asset = state
        .assets
        .admit(directory.trim(), &file_name, data)
        .await
        .map_err(asset_error)?;

    Ok(JSend::success(asset))
}

pub async fn list_assets(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListAssetsParams>,
) -> Result<Json<JSend<AssetListResponse>>, ApiError> {
    let files = state
        .assets
        .list(&params.directory)
        .await
        .map_err(asset_error)?;

    Ok(JSend::success(AssetListResponse {
        directory: params.directory,
        files,
    }))
}
