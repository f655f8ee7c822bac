//! Schema migration applied once, on the raw JSON tree, before a document
//! is parsed into typed form.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::document_model::CURRENT_VERSION;
use crate::error::DesignerError;

type Step = fn(&mut Map<String, Value>);

/// `(from_version, step)`: each step upgrades a document from `from_version`
/// to `from_version + 1`.
const STEPS: &[(u64, Step)] = &[(1, span_to_col_span as Step)];

/// Check the document skeleton and bring it up to [`CURRENT_VERSION`].
///
/// Returns the version the document was written with.
pub fn migrate(root: &mut Value) -> Result<u64, DesignerError> {
    let doc = root
        .as_object_mut()
        .ok_or_else(|| DesignerError::malformed("document is not a JSON object"))?;

    if !doc.get("global").is_some_and(Value::is_object) {
        return Err(DesignerError::malformed("missing 'global' settings object"));
    }
    if !doc.get("nodes").is_some_and(Value::is_array) {
        return Err(DesignerError::malformed("missing 'nodes' array"));
    }

    let written = match doc.get("version") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| DesignerError::malformed(format!("invalid version {}", v)))?,
    };

    if written > CURRENT_VERSION {
        warn!(
            version = written,
            "document was written by a newer schema; reading best-effort"
        );
        return Ok(written);
    }

    let mut version = written;
    for (from, step) in STEPS {
        if version == *from {
            debug!(from = *from, "migrating document schema");
            step(doc);
            version += 1;
        }
    }
    doc.insert("version".to_string(), Value::from(CURRENT_VERSION));

    Ok(written)
}

/// v1 -> v2: `span` was renamed to `colSpan`. Copy a truthy legacy value
/// into a missing or falsy `colSpan`.
fn span_to_col_span(doc: &mut Map<String, Value>) {
    let Some(Value::Array(nodes)) = doc.get_mut("nodes") else {
        return;
    };

    for node in nodes {
        let Some(meta) = node.get_mut("meta").and_then(Value::as_object_mut) else {
            continue;
        };
        let legacy = meta.get("span").filter(|v| is_truthy(v)).cloned();
        let current_set = meta.get("colSpan").is_some_and(is_truthy);
        if let (Some(span), false) = (legacy, current_set) {
            meta.insert("colSpan".to_string(), span);
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
