use axum::extract::Path;
use axum::Json;
use serde::Serialize;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::schema::{self, Schema, Verdict};

#[derive(Debug, Serialize)]
pub struct SchemaListResponse {
    pub widgets: Vec<&'static str>,
}

pub async fn list_schemas() -> Json<JSend<SchemaListResponse>> {
    JSend::success(SchemaListResponse {
        widgets: schema::widget_schema_names(),
    })
}

pub async fn get_schema(
    Path(widget): Path<String>,
) -> Result<Json<JSend<&'static Schema>>, ApiError> {
    let schema = lookup(&widget)?;
    Ok(JSend::success(schema))
}

/// Check a single widget or device fragment against its schema.
pub async fn validate_fragment(
    Path(widget): Path<String>,
    AppJson(fragment): AppJson<serde_json::Value>,
) -> Result<Json<JSend<Verdict>>, ApiError> {
    let schema = lookup(&widget)?;
    Ok(JSend::success(schema.validate(&fragment)))
}

fn lookup(widget: &str) -> Result<&'static Schema, ApiError> {
    schema::schema_for(widget)
        .ok_or_else(|| ApiError::not_found(format!("Unknown widget type: {widget}")))
}
