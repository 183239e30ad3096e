mod admin;
mod assets;
mod config;
mod entities;
mod schema;

use crate::api::response::ApiError;
use crate::assets::AssetError;
use crate::error::ErrorKind;
use crate::states::StateError;
use crate::storage::{Slot, StoreError};

pub use admin::health;
pub use assets::{list_assets, upload_asset};
pub use config::{
    delete_staging, export_config, get_config, import_config, list_staging, load_staging,
    make_live, save_and_make_live, save_config, validate_config,
};
pub use entities::{list_entities, validate_entity};
pub use schema::{get_schema, list_schemas, validate_fragment};

/// Map a component error to an ApiError, logging anything the client cannot fix
fn component_error(kind: ErrorKind, e: impl std::fmt::Display) -> ApiError {
    if kind == ErrorKind::Fatal {
        tracing::error!(error = %e, "Request failed");
    }
    ApiError::from_kind(kind, e.to_string())
}

fn store_error(e: StoreError) -> ApiError {
    component_error(e.kind(), e)
}

fn asset_error(e: AssetError) -> ApiError {
    component_error(e.kind(), e)
}

fn state_error(e: StateError) -> ApiError {
    component_error(e.kind(), e)
}

/// Resolve a client-supplied slot name
fn named_slot(name: &str) -> Result<Slot, ApiError> {
    Slot::named(name).ok_or_else(|| store_error(StoreError::InvalidSlotName(name.to_string())))
}
