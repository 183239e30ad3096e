//! Client for the Home Assistant state API.
//!
//! Used only to give feedback while editing (does this entity exist, which
//! lights are there). Nothing in the config store or asset pipeline depends
//! on it, and without credentials it answers with simulated results instead
//! of failing.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::HomeAssistantConfig;
use crate::error::ErrorKind;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Cannot connect to Home Assistant API: {0}")]
    Unavailable(String),
    #[error("Home Assistant API returned {0}")]
    Upstream(StatusCode),
    #[error("Invalid response from Home Assistant API: {0}")]
    InvalidResponse(String),
}

impl StateError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::UpstreamUnavailable
    }
}

/// Outcome of an entity lookup. Invalid entities are a normal answer, not an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub simulated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EntityCheck {
    fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub entity_id: String,
    pub name: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
struct EntityState {
    entity_id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    attributes: Map<String, Value>,
}

struct Endpoint {
    base_url: String,
    token: String,
}

pub struct StateProvider {
    client: Client,
    endpoint: Option<Endpoint>,
}

impl StateProvider {
    pub fn new(config: &HomeAssistantConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        let endpoint = match (&config.api_url, &config.token) {
            (Some(base_url), Some(token)) => Some(Endpoint {
                base_url: base_url.trim_end_matches('/').to_string(),
                token: token.clone(),
            }),
            _ => None,
        };

        Ok(Self { client, endpoint })
    }

    /// Whether real lookups are made (as opposed to simulated answers).
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Check that `entity_id` exists, relaying its state and attributes.
    pub async fn validate_entity(&self, entity_id: &str) -> Result<EntityCheck, StateError> {
        if entity_id.is_empty() {
            return Ok(EntityCheck::invalid("Empty entity_id"));
        }

        let Some((domain, object_id)) = entity_id.split_once('.') else {
            return Ok(EntityCheck::invalid(
                "Invalid format, must be 'domain.entity'",
            ));
        };
        if domain.is_empty() || object_id.is_empty() || !is_entity_id(entity_id) {
            return Ok(EntityCheck::invalid(
                "Invalid format, must be 'domain.entity'",
            ));
        }

        let Some(endpoint) = &self.endpoint else {
            return Ok(EntityCheck {
                valid: true,
                domain: Some(domain.to_string()),
                state: Some("unavailable".to_string()),
                attributes: Some(Map::new()),
                simulated: true,
                error: None,
            });
        };

        let resp = self
            .client
            .get(format!("{}/states/{entity_id}", endpoint.base_url))
            .bearer_auth(&endpoint.token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(entity_id, error = %e, "Failed to validate entity");
                StateError::Unavailable(e.to_string())
            })?;

        match resp.status() {
            StatusCode::OK => {
                let state: EntityState = resp
                    .json()
                    .await
                    .map_err(|e| StateError::InvalidResponse(e.to_string()))?;
                Ok(EntityCheck {
                    valid: true,
                    domain: Some(domain.to_string()),
                    state: Some(state.state),
                    attributes: Some(state.attributes),
                    simulated: false,
                    error: None,
                })
            }
            StatusCode::NOT_FOUND => Ok(EntityCheck::invalid(format!(
                "Entity '{entity_id}' not found in Home Assistant"
            ))),
            status => Ok(EntityCheck::invalid(format!("HA API error: {}", status.as_u16()))),
        }
    }

    /// All entities whose id starts with `{domain}.`.
    pub async fn list_entities(&self, domain: &str) -> Result<Vec<EntitySummary>, StateError> {
        let Some(endpoint) = &self.endpoint else {
            tracing::warn!("No Home Assistant credentials, returning empty entity list");
            return Ok(Vec::new());
        };

        let resp = self
            .client
            .get(format!("{}/states", endpoint.base_url))
            .bearer_auth(&endpoint.token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to fetch entities");
                StateError::Unavailable(e.to_string())
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "HA API error");
            return Err(StateError::Upstream(status));
        }

        let states: Vec<EntityState> = resp
            .json()
            .await
            .map_err(|e| StateError::InvalidResponse(e.to_string()))?;
        tracing::debug!(count = states.len(), "Fetched states from Home Assistant");

        let prefix = format!("{domain}.");
        let entities: Vec<EntitySummary> = states
            .into_iter()
            .filter(|s| s.entity_id.starts_with(&prefix))
            .map(|s| EntitySummary {
                name: s
                    .attributes
                    .get("friendly_name")
                    .and_then(Value::as_str)
                    .unwrap_or(&s.entity_id)
                    .to_string(),
                entity_id: s.entity_id,
                state: s.state,
            })
            .collect();

        tracing::info!(domain, count = entities.len(), "Listed entities");
        Ok(entities)
    }
}

/// Entity ids are `domain.object_id` made of ASCII letters, digits and `_`;
/// anything else could steer the request to a different API path.
fn is_entity_id(entity_id: &str) -> bool {
    entity_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}
