use std::collections::HashMap;

use serde_json::Value;

use super::{schema_for, RuleKind, Verdict, Violation};
use crate::storage::ConfigDocument;

/// Widget list key inside `device.widgets`, and the schema its items follow.
const WIDGET_LISTS: [(&str, &str); 3] = [
    ("lights", "light"),
    ("covers", "cover"),
    ("climate", "climate"),
];

/// Check every device of a document against the `device` schema, every
/// known widget list against its widget schema, and device IPs for
/// duplicates. Field paths are rooted at the document
/// (`devices[0].widgets.lights[1].entity`).
pub fn check_document(document: &ConfigDocument) -> Verdict {
    let mut violations = Vec::new();
    let mut seen_ips: HashMap<&str, &str> = HashMap::new();

    for (index, device) in document
        .devices
        .as_deref()
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        let prefix = format!("devices[{index}]");
        if let Some(schema) = schema_for("device") {
            violations.extend(
                schema
                    .validate(device)
                    .violations
                    .into_iter()
                    .map(|v| v.nested(&prefix)),
            );
        }

        let name = device
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("unnamed device");
        let ip = device
            .get("ip")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = ip {
            if let Some(other) = seen_ips.get(ip) {
                violations.push(Violation::new(
                    RuleKind::Unique,
                    format!("{prefix}.ip"),
                    format!("Duplicate IP: \"{name}\" and \"{other}\" both use {ip}"),
                ));
            } else {
                seen_ips.insert(ip, name);
            }
        }

        let Some(widgets) = device.get("widgets").and_then(Value::as_object) else {
            continue;
        };
        for (list, schema_name) in WIDGET_LISTS {
            let (Some(items), Some(schema)) = (
                widgets.get(list).and_then(Value::as_array),
                schema_for(schema_name),
            ) else {
                continue;
            };
            for (position, widget) in items.iter().enumerate() {
                let widget_prefix = format!("{prefix}.widgets.{list}[{position}]");
                violations.extend(
                    schema
                        .validate(widget)
                        .violations
                        .into_iter()
                        .map(|v| v.nested(&widget_prefix)),
                );
            }
        }
    }

    Verdict::from_violations(violations)
}
