//! Structured-response reconciliation
//!
//! Analysis endpoints are backed by a text generator. When it produces
//! well-formed output the response already carries the expected fields.
//! When it does not, the backend answers with something like
//! `{"error": "parse_failed", "raw_strategy": "...```json {...}```..."}` and
//! the structured data is buried in free text.
//!
//! [`reconcile`] turns either shape into a [`NormalizedResult`] the UI can
//! always render. It never fails: anything it cannot recover degrades to a
//! raw-text fallback.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Field that carries the upstream failure reason on degraded responses.
pub const ERROR_FIELD: &str = "error";

/// Prefix of text fields that may hold generator output.
const RAW_FIELD_PREFIX: &str = "raw_";

/// `source_field` of a block recovered from a bare string response.
pub const RESPONSE_SOURCE: &str = "response";

/// Descriptor of a response the UI knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub name: &'static str,
    /// Fields the UI renders. Decoded keys outside this set are dropped.
    pub fields: &'static [&'static str],
    /// Text fields searched first for an embedded block.
    pub text_fields: &'static [&'static str],
}

impl Shape {
    pub const fn new(
        name: &'static str,
        fields: &'static [&'static str],
        text_fields: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            fields,
            text_fields,
        }
    }

    pub fn knows(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    /// Number of known fields present (and non-null) in `object`.
    fn present_in(&self, object: &Map<String, Value>) -> usize {
        self.fields
            .iter()
            .filter(|f| object.get(**f).is_some_and(|v| !v.is_null()))
            .count()
    }

    /// "All or most" of the known fields: at least half, and at least one.
    fn is_satisfied_by(&self, object: &Map<String, Value>) -> bool {
        let present = self.present_in(object);
        present > 0 && present * 2 >= self.fields.len()
    }
}

/// Outcome of reconciling one response.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// The response already had the expected fields and is returned as-is.
    Direct(Value),
    /// Fields were decoded from a fenced block in `source_field` and merged
    /// over the original response.
    Recovered { value: Value, source_field: String },
    /// Nothing could be recovered. `value` is the original response.
    Fallback {
        value: Value,
        raw_text: Option<String>,
        error: Option<String>,
    },
}

/// A normalized result decoded into a concrete type at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Typed<T> {
    Ok(T),
    Fallback {
        raw_text: Option<String>,
        error: Option<String>,
    },
}

impl NormalizedResult {
    pub fn value(&self) -> &Value {
        match self {
            NormalizedResult::Direct(value)
            | NormalizedResult::Recovered { value, .. }
            | NormalizedResult::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            NormalizedResult::Direct(value)
            | NormalizedResult::Recovered { value, .. }
            | NormalizedResult::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, NormalizedResult::Fallback { .. })
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value().get(name)
    }

    /// Raw text to show when structured rendering is not possible.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            NormalizedResult::Fallback { raw_text, .. } => raw_text.as_deref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            NormalizedResult::Fallback { error, .. } => error.as_deref(),
            _ => self.field(ERROR_FIELD).and_then(Value::as_str),
        }
    }

    /// Short label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            NormalizedResult::Direct(_) => "structured",
            NormalizedResult::Recovered { .. } => "recovered",
            NormalizedResult::Fallback { .. } => "raw text",
        }
    }

    /// Decode into `T`. A structured value that still does not fit `T`
    /// degrades to the fallback variant instead of failing.
    pub fn into_typed<T: DeserializeOwned>(self) -> Typed<T> {
        match self {
            NormalizedResult::Fallback {
                raw_text, error, ..
            } => Typed::Fallback { raw_text, error },
            other => {
                let error = other.error().map(str::to_string);
                let raw_text = first_text_field(other.value());
                match serde_json::from_value::<T>(other.into_value()) {
                    Ok(parsed) => Typed::Ok(parsed),
                    Err(e) => {
                        tracing::debug!("structured value did not decode: {}", e);
                        Typed::Fallback {
                            raw_text,
                            error: error.or_else(|| Some(e.to_string())),
                        }
                    }
                }
            }
        }
    }
}

/// Normalize `response` against `shape`. Never fails.
pub fn reconcile(response: Value, shape: &Shape) -> NormalizedResult {
    match response {
        Value::Object(object) => reconcile_object(object, shape),
        Value::String(text) => reconcile_text(text, shape),
        other => NormalizedResult::Fallback {
            value: other,
            raw_text: None,
            error: None,
        },
    }
}

fn reconcile_object(mut object: Map<String, Value>, shape: &Shape) -> NormalizedResult {
    if shape.is_satisfied_by(&object) {
        return NormalizedResult::Direct(Value::Object(object));
    }

    let candidates = candidate_text_fields(&object, shape);
    for field in &candidates {
        let Some(text) = object.get(field).and_then(Value::as_str) else {
            continue;
        };
        let Some(decoded) = decode_fenced_object(text) else {
            continue;
        };
        let mut merged = 0usize;
        for (key, value) in decoded {
            if shape.knows(&key) {
                object.insert(key, value);
                merged += 1;
            }
        }
        if merged == 0 {
            tracing::debug!(
                shape = shape.name,
                field = field.as_str(),
                "fenced block held no known fields"
            );
            continue;
        }
        tracing::debug!(shape = shape.name, field = field.as_str(), merged, "recovered fields");
        return NormalizedResult::Recovered {
            value: Value::Object(object),
            source_field: field.clone(),
        };
    }

    let raw_text = candidates
        .iter()
        .find_map(|f| object.get(f).and_then(Value::as_str))
        .map(str::to_string);
    let error = object
        .get(ERROR_FIELD)
        .and_then(|e| match e {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });
    NormalizedResult::Fallback {
        value: Value::Object(object),
        raw_text,
        error,
    }
}

fn reconcile_text(text: String, shape: &Shape) -> NormalizedResult {
    if let Some(decoded) = decode_fenced_object(&text) {
        let fields: Map<String, Value> = decoded
            .into_iter()
            .filter(|(key, _)| shape.knows(key))
            .collect();
        if !fields.is_empty() {
            return NormalizedResult::Recovered {
                value: Value::Object(fields),
                source_field: RESPONSE_SOURCE.to_string(),
            };
        }
    }
    NormalizedResult::Fallback {
        raw_text: Some(text.clone()),
        value: Value::String(text),
        error: None,
    }
}

/// Declared text fields first, then other `raw_*` string fields in key order.
fn candidate_text_fields(object: &Map<String, Value>, shape: &Shape) -> Vec<String> {
    let mut fields: Vec<String> = shape
        .text_fields
        .iter()
        .filter(|f| object.get(**f).is_some_and(Value::is_string))
        .map(|f| f.to_string())
        .collect();
    for (key, value) in object {
        if key.starts_with(RAW_FIELD_PREFIX) && value.is_string() && !fields.contains(key) {
            fields.push(key.clone());
        }
    }
    fields
}

fn first_text_field(value: &Value) -> Option<String> {
    value.as_object().and_then(|object| {
        object
            .iter()
            .find(|(key, v)| key.starts_with(RAW_FIELD_PREFIX) && v.is_string())
            .and_then(|(_, v)| v.as_str().map(str::to_string))
    })
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?is)```[ \t]*json\b[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Content of the first ```json fenced block. The first closing fence ends
/// the match, so nested fences are not supported.
pub fn extract_fenced_block(text: &str) -> Option<&str> {
    let captures = fence_pattern()?.captures(text)?;
    captures.get(1).map(|m| m.as_str().trim())
}

/// Decode the first fenced block as a JSON object, repairing common
/// generator slips once if the plain decode fails.
fn decode_fenced_object(text: &str) -> Option<Map<String, Value>> {
    let block = extract_fenced_block(text)?;
    let parsed = match serde_json::from_str::<Value>(block) {
        Ok(value) => value,
        Err(first) => {
            let repaired = repair_json(block);
            if repaired == block {
                tracing::debug!("fenced block is not valid JSON: {}", first);
                return None;
            }
            match serde_json::from_str::<Value>(&repaired) {
                Ok(value) => value,
                Err(second) => {
                    tracing::debug!(
                        "fenced block is not valid JSON ({}), repair failed: {}",
                        first,
                        second
                    );
                    return None;
                }
            }
        }
    };
    match parsed {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Fix the slips text generators commonly make in JSON output.
fn repair_json(json: &str) -> String {
    let mut fixed = json.to_string();

    // Trailing commas before ] or }
    for (from, to) in [(",]", "]"), (",}", "}"), (",\n]", "\n]"), (",\n}", "\n}")] {
        fixed = fixed.replace(from, to);
    }

    // Typographic quotes
    fixed = fixed.replace(['\u{201C}', '\u{201D}'], "\"");
    fixed = fixed.replace(['\u{2018}', '\u{2019}'], "'");

    fixed
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}
