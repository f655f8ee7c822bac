//! Wire shape of an exported design document.
//!
//! Every field is optional on the way in (older exports and hand-edited
//! files omit keys) and always present on the way out.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Schema version written by this crate.
pub const CURRENT_VERSION: u64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(default = "legacy_version")]
    pub version: u64,
    pub global: GlobalDoc,
    pub nodes: Vec<NodeDoc>,
}

fn legacy_version() -> u64 {
    1
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalDoc {
    #[serde(default, deserialize_with = "lenient_string")]
    pub bg: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bg_image_data_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub padding: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub layout: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub columns: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub grid: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub grid_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDoc {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub meta: MetaDoc,
    #[serde(default)]
    pub pos: Option<PosDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaDoc {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub placeholder: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub required: Option<bool>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub width_pct: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub font: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub font_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub label_size: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bg_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub border_color: Option<String>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub radius: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub padding: Option<f64>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub col_span: Option<f64>,
    /// Legacy name of `colSpan`, written alongside it for older readers
    #[serde(default, deserialize_with = "lenient_number", serialize_with = "compact_number")]
    pub span: Option<f64>,
    #[serde(default)]
    pub binding: Option<BindingDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BindingDoc {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub listen: bool,
}

/// Absolute position as CSS lengths (`"40px"`), `null` when unplaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosDoc {
    #[serde(default)]
    pub left: Option<Value>,
    #[serde(default)]
    pub top: Option<Value>,
}

impl PosDoc {
    pub fn from_pixels(x: i32, y: i32) -> Self {
        Self {
            left: Some(Value::String(format!("{}px", x))),
            top: Some(Value::String(format!("{}px", y))),
        }
    }

    pub fn unplaced() -> Self {
        Self {
            left: None,
            top: None,
        }
    }
}

/// Parse a CSS pixel length or bare number: `"40px"`, `"40"`, `40`.
pub fn parse_pixels(value: &Value) -> Option<i32> {
    match value {
        Value::Number(n) => n.as_f64().map(|v| v.round() as i32),
        Value::String(s) => {
            let s = s.trim();
            let s = s.strip_suffix("px").unwrap_or(s).trim();
            s.parse::<f64>().ok().map(|v| v.round() as i32)
        }
        _ => None,
    }
}

/// Whole numbers are written as integers so exports read `14`, not `14.0`.
fn compact_number<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            serializer.serialize_i64(*v as i64)
        }
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            s.strip_suffix("px").unwrap_or(s).trim().parse::<f64>().ok()
        }
        Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
        _ => None,
    }))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false",
        _ => false,
    }))
}
