//! Declarative shape checks for configuration fragments.
//!
//! A [`Schema`] is plain data (deserializable from JSON) describing required
//! fields, per-property rules and conditional requirements keyed on a
//! discriminator field. Evaluation is pure and reports every violated rule.

mod catalog;
mod document;

pub use catalog::{schema_for, widget_schema_names};
pub use document::check_document;

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Array,
    Boolean,
    Integer,
    Number,
    Object,
    String,
}

impl ValueType {
    fn matches(self, value: &Value) -> bool {
        match self {
            ValueType::Array => value.is_array(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Number => value.is_number(),
            ValueType::Object => value.is_object(),
            ValueType::String => value.is_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyRule>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRule {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
}

/// "If `when.field` equals `when.equals`, then `required` must be present."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "if")]
    pub when: Discriminator,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discriminator {
    pub field: String,
    pub equals: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Conditional,
    Enum,
    Maximum,
    MinLength,
    Minimum,
    Pattern,
    Required,
    Type,
    Unique,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub rule: RuleKind,
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(rule: RuleKind, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Re-root the violation under `prefix` (e.g. `devices[2]`).
    fn nested(mut self, prefix: &str) -> Self {
        self.field = if self.field.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.field)
        };
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Verdict {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl Verdict {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }
}

impl Schema {
    pub fn validate(&self, fragment: &Value) -> Verdict {
        Verdict::from_violations(self.violations(fragment))
    }

    fn violations(&self, fragment: &Value) -> Vec<Violation> {
        if let Some(expected) = self.value_type {
            if !expected.matches(fragment) {
                return vec![type_violation("", expected)];
            }
        }

        let Some(object) = fragment.as_object() else {
            if self.properties.is_empty() && self.required.is_empty() {
                return Vec::new();
            }
            return vec![type_violation("", ValueType::Object)];
        };

        let mut violations = Vec::new();

        for field in &self.required {
            if !is_present(object, field) {
                violations.push(Violation::new(
                    RuleKind::Required,
                    field,
                    format!("{field} is required"),
                ));
            }
        }

        for (field, rule) in &self.properties {
            if let Some(value) = object.get(field).filter(|v| !v.is_null()) {
                rule.check(field, value, &mut violations);
            }
        }

        for condition in &self.conditions {
            let Discriminator { field, equals } = &condition.when;
            if object.get(field) != Some(equals) {
                continue;
            }
            for dependent in &condition.required {
                if !is_present(object, dependent) {
                    violations.push(Violation::new(
                        RuleKind::Conditional,
                        dependent,
                        format!("{dependent} is required when {field} is {equals}"),
                    ));
                }
            }
        }

        violations
    }
}

impl PropertyRule {
    fn check(&self, field: &str, value: &Value, violations: &mut Vec<Violation>) {
        if let Some(expected) = self.value_type {
            if !expected.matches(value) {
                violations.push(type_violation(field, expected));
                return;
            }
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(display_value).collect();
                violations.push(Violation::new(
                    RuleKind::Enum,
                    field,
                    format!("{field} must be one of: {}", options.join(", ")),
                ));
            }
        }

        if let Some(text) = value.as_str() {
            if let Some(pattern) = &self.pattern {
                match Regex::new(pattern) {
                    Ok(re) if re.is_match(text) => {}
                    Ok(_) => violations.push(Violation::new(
                        RuleKind::Pattern,
                        field,
                        format!("{field} must match {pattern}"),
                    )),
                    Err(e) => violations.push(Violation::new(
                        RuleKind::Pattern,
                        field,
                        format!("schema pattern for {field} is invalid: {e}"),
                    )),
                }
            }

            if let Some(min) = self.min_length {
                if text.chars().count() < min {
                    violations.push(Violation::new(
                        RuleKind::MinLength,
                        field,
                        format!("{field} must be at least {min} characters"),
                    ));
                }
            }
        }

        if let Some(number) = value.as_f64() {
            if let Some(min) = self.minimum {
                if number < min {
                    violations.push(Violation::new(
                        RuleKind::Minimum,
                        field,
                        format!("{field} must be at least {min}"),
                    ));
                }
            }
            if let Some(max) = self.maximum {
                if number > max {
                    violations.push(Violation::new(
                        RuleKind::Maximum,
                        field,
                        format!("{field} must be at most {max}"),
                    ));
                }
            }
        }
    }
}

fn is_present(object: &Map<String, Value>, field: &str) -> bool {
    object.get(field).is_some_and(|v| !v.is_null())
}

fn type_violation(field: &str, expected: ValueType) -> Violation {
    let expected = serde_json::to_value(expected)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let subject = if field.is_empty() { "value" } else { field };
    Violation::new(
        RuleKind::Type,
        field,
        format!("{subject} must be of type {expected}"),
    )
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
