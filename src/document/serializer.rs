use std::collections::HashSet;

use serde_json::Value;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::design::design_model::{
    DEFAULT_GRID_SIZE, DEFAULT_PADDING, DEFAULT_WIDTH, FormDesign, GlobalSettings, LayoutMode,
};
use crate::document::document_model::{
    BindingDoc, CURRENT_VERSION, DesignDocument, GlobalDoc, MetaDoc, NodeDoc, PosDoc, parse_pixels,
};
use crate::document::migrate::migrate;
use crate::error::DesignerError;
use crate::field::field_model::{
    Binding, FieldDescriptor, FieldKind, Position, clamp_span, generate_field_id,
};

// ============================================================================
// Export
// ============================================================================

/// Serialize a design to the pretty-printed document format.
pub fn serialize(design: &FormDesign) -> Result<String, DesignerError> {
    let document = to_document(design);
    serde_json::to_string_pretty(&document)
        .map_err(|e| DesignerError::PersistenceFailed(format!("serialize design: {}", e)))
}

pub fn to_document(design: &FormDesign) -> DesignDocument {
    let g = &design.global;
    let global = GlobalDoc {
        bg: Some(g.background_color.clone()),
        bg_image_data_url: Some(g.background_image.clone()),
        width: Some(g.width as f64),
        padding: Some(g.padding as f64),
        layout: Some(g.layout.as_str().to_string()),
        columns: Some(g.columns as f64),
        grid: Some(g.show_grid),
        grid_size: Some(g.grid_size as f64),
    };

    let nodes = design.fields.iter().map(node_from_field).collect();

    DesignDocument {
        version: CURRENT_VERSION,
        global,
        nodes,
    }
}

fn node_from_field(field: &FieldDescriptor) -> NodeDoc {
    let span = field.layout.col_span as f64;
    let binding = field.binding.clone().unwrap_or_else(|| Binding::new("", false));

    let meta = MetaDoc {
        id: Some(field.id.clone()),
        label: Some(field.label.clone()),
        placeholder: Some(field.placeholder.clone()),
        required: Some(field.required),
        width_pct: Some(field.layout.width_pct as f64),
        height: Some(field.layout.height.unwrap_or(0) as f64),
        font: Some(field.style.font.clone()),
        font_size: Some(field.style.font_size as f64),
        label_size: Some(field.style.label_size as f64),
        text_color: Some(field.style.text_color.clone()),
        bg_color: Some(field.style.bg_color.clone()),
        border_color: Some(field.style.border_color.clone()),
        radius: Some(field.style.radius as f64),
        padding: Some(field.style.padding as f64),
        options: Some(field.options.clone()),
        // both names, so older and newer readers agree
        col_span: Some(span),
        span: Some(span),
        binding: Some(BindingDoc {
            address: binding.address,
            listen: binding.listen,
        }),
        src: field.image_src.clone(),
    };

    let pos = match field.layout.position {
        Some(p) => PosDoc::from_pixels(p.x, p.y),
        None => PosDoc::unplaced(),
    };

    NodeDoc {
        kind: field.kind.as_str().to_string(),
        meta,
        pos: Some(pos),
    }
}

// ============================================================================
// Import
// ============================================================================

/// Parse a document into a fresh design.
///
/// Fails with `MalformedDocument` on invalid JSON, a missing `global` object
/// or `nodes` array, an unknown field type or a repeated field id. Never
/// merges into an existing design.
pub fn deserialize(text: &str) -> Result<FormDesign, DesignerError> {
    let mut root: Value = serde_json::from_str(text)
        .map_err(|e| DesignerError::malformed(format!("invalid JSON: {}", e)))?;

    let written = migrate(&mut root)?;
    debug!(version = written, "parsing design document");

    let document: DesignDocument = serde_json::from_value(root)
        .map_err(|e| DesignerError::malformed(format!("schema mismatch: {}", e)))?;

    from_document(document)
}

pub fn from_document(document: DesignDocument) -> Result<FormDesign, DesignerError> {
    let global = global_from_doc(&document.global);

    let mut fields = Vec::with_capacity(document.nodes.len());
    let mut seen = HashSet::new();
    for (index, node) in document.nodes.into_iter().enumerate() {
        let field = field_from_node(node, &global, index)?;
        if !seen.insert(field.id.clone()) {
            return Err(DesignerError::malformed(format!(
                "node {}: duplicate field id '{}'",
                index, field.id
            )));
        }
        fields.push(field);
    }

    Ok(FormDesign { global, fields })
}

fn global_from_doc(doc: &GlobalDoc) -> GlobalSettings {
    GlobalSettings {
        background_color: doc.bg.clone().unwrap_or_default(),
        background_image: doc.bg_image_data_url.clone().unwrap_or_default(),
        width: to_u32(doc.width).unwrap_or(DEFAULT_WIDTH),
        padding: to_u32(doc.padding).unwrap_or(DEFAULT_PADDING),
        layout: doc
            .layout
            .as_deref()
            .map(LayoutMode::parse)
            .unwrap_or_default(),
        columns: to_u32(doc.columns).unwrap_or(1).max(1),
        show_grid: doc.grid.unwrap_or(false),
        grid_size: to_u32(doc.grid_size)
            .filter(|g| *g > 0)
            .unwrap_or(DEFAULT_GRID_SIZE),
    }
}

fn field_from_node(
    node: NodeDoc,
    global: &GlobalSettings,
    index: usize,
) -> Result<FieldDescriptor, DesignerError> {
    let kind = FieldKind::parse(&node.kind).ok_or_else(|| {
        DesignerError::malformed(format!("node {}: unknown field type '{}'", index, node.kind))
    })?;

    let meta = node.meta;
    let id = meta
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| generate_field_id(kind));

    let mut field = FieldDescriptor::new(kind, id);

    if let Some(label) = meta.label {
        field.label = label;
    }
    if let Some(placeholder) = meta.placeholder {
        field.placeholder = placeholder;
    }
    field.required = meta.required.unwrap_or(false);

    if let Some(width) = to_u32(meta.width_pct).filter(|w| *w > 0) {
        field.layout.width_pct = width;
    }
    field.layout.height = to_u32(meta.height).filter(|h| *h > 0);

    let span = to_u32(meta.col_span.or(meta.span)).unwrap_or(1);
    field.layout.col_span = clamp_span(span, global.columns);

    let style = &mut field.style;
    if let Some(font) = meta.font {
        style.font = font;
    }
    if let Some(v) = to_u32(meta.font_size) {
        style.font_size = v;
    }
    if let Some(v) = to_u32(meta.label_size) {
        style.label_size = v;
    }
    if let Some(c) = meta.text_color {
        style.text_color = c;
    }
    if let Some(c) = meta.bg_color {
        style.bg_color = c;
    }
    if let Some(c) = meta.border_color {
        style.border_color = c;
    }
    if let Some(v) = to_u32(meta.radius) {
        style.radius = v;
    }
    if let Some(v) = to_u32(meta.padding) {
        style.padding = v;
    }

    if let Some(options) = meta.options {
        field.options = options;
    }

    field.binding = meta
        .binding
        .filter(|b| !b.address.is_empty())
        .map(|b| Binding::new(b.address, b.listen));
    field.image_src = meta.src;

    // positions only mean something in free layout; flow derives placement
    // from order and span
    if global.layout == LayoutMode::Free {
        field.layout.position = node.pos.and_then(position_from_doc);
    }

    Ok(field)
}

/// A node is placed when either coordinate is present; the missing one
/// is 0.
fn position_from_doc(pos: PosDoc) -> Option<Position> {
    let x = pos.left.as_ref().and_then(parse_pixels);
    let y = pos.top.as_ref().and_then(parse_pixels);
    if x.is_none() && y.is_none() {
        return None;
    }
    Some(Position::new(x.unwrap_or(0), y.unwrap_or(0)))
}

fn to_u32(value: Option<f64>) -> Option<u32> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32)
}

/// SHA-1 of a serialized document, used to identify persisted revisions.
pub fn document_fingerprint(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
