//! Built-in widget and device schemas.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde_json::{json, Value};

use super::Schema;

const IPV4_PATTERN: &str =
    r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$";

fn definitions() -> Vec<(&'static str, Value)> {
    vec![
        (
            "light",
            json!({
                "type": "object",
                "properties": {
                    "entity": {"type": "string", "pattern": r"^light\."},
                    "name": {"type": "string", "minLength": 1},
                    "type": {"type": "string", "enum": ["p", "ph", "phb", "phc", "phbc"]},
                    "icon_id": {
                        "type": "string",
                        "enum": ["downlight", "pendant", "wardrobe", "lamp", "spot", "strip"]
                    }
                },
                "required": ["entity", "name", "type"]
            }),
        ),
        (
            "cover",
            json!({
                "type": "object",
                "properties": {
                    "entity": {"type": "string", "pattern": r"^cover\."},
                    "name": {"type": "string", "minLength": 1},
                    "type": {"type": "string", "enum": ["blind", "single_curtain", "double_curtain"]},
                    "up_time_msecs": {"type": "integer", "minimum": 1000, "maximum": 60000},
                    "down_time_msecs": {"type": "integer", "minimum": 1000, "maximum": 60000}
                },
                "required": ["entity", "name", "type"]
            }),
        ),
        (
            "climate",
            json!({
                "type": "object",
                "properties": {
                    "entity": {"type": "string", "pattern": r"^climate\."},
                    "name": {"type": "string", "minLength": 1},
                    "use_presence_for_deactivation": {"type": "boolean"},
                    "use_presence_for_activation": {"type": "boolean"},
                    "presence_deactivation_time": {"type": "integer", "minimum": 0},
                    "default_fan_speed": {"type": "string", "enum": ["auto", "low", "medium", "high"]},
                    "default_low_setpoint": {"type": "number", "minimum": 5, "maximum": 35},
                    "default_high_setpoint": {"type": "number", "minimum": 5, "maximum": 35},
                    "auto_dehumidify_setpoint": {"type": "integer", "minimum": 0, "maximum": 100},
                    "use_simple_ui": {"type": "boolean"}
                },
                "required": ["entity", "name"],
                "conditions": [
                    {
                        "if": {"field": "use_presence_for_deactivation", "equals": true},
                        "required": ["presence_deactivation_time"]
                    }
                ]
            }),
        ),
        (
            "device",
            json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "minLength": 1},
                    "name": {"type": "string", "minLength": 1},
                    "ip": {"type": "string", "pattern": IPV4_PATTERN},
                    "presence_entity": {"type": "string", "pattern": r"^binary_sensor\."},
                    "voice_assistant_enabled": {"type": "boolean"},
                    "use_presence_for_screen": {"type": "boolean"},
                    "screen_timeout": {"type": "integer", "minimum": 0},
                    "screen_brightness": {"type": "integer", "minimum": 0, "maximum": 100},
                    "volume": {"type": "integer", "minimum": 0, "maximum": 100},
                    "widgets": {"type": "object"}
                },
                "required": ["id", "name", "ip"],
                "conditions": [
                    {
                        "if": {"field": "use_presence_for_screen", "equals": true},
                        "required": ["presence_entity"]
                    }
                ]
            }),
        ),
    ]
}

fn catalog() -> &'static BTreeMap<&'static str, Schema> {
    static CATALOG: OnceLock<BTreeMap<&'static str, Schema>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        definitions()
            .into_iter()
            .filter_map(|(name, definition)| match serde_json::from_value(definition) {
                Ok(schema) => Some((name, schema)),
                Err(e) => {
                    tracing::error!(schema = name, error = %e, "Built-in schema is malformed");
                    None
                }
            })
            .collect()
    })
}

/// Look up a built-in schema (`light`, `cover`, `climate`, `device`).
pub fn schema_for(name: &str) -> Option<&'static Schema> {
    catalog().get(name)
}

pub fn widget_schema_names() -> Vec<&'static str> {
    catalog().keys().copied().collect()
}
