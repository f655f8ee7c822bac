use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::field::control::CommitEvent;

/// Closed set of widgets a form can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Email,
    Password,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Button,
    Heading,
    Image,
    Date,
    File,
    Color,
    Range,
}

impl FieldKind {
    pub const ALL: [FieldKind; 15] = [
        FieldKind::Text,
        FieldKind::Number,
        FieldKind::Email,
        FieldKind::Password,
        FieldKind::Textarea,
        FieldKind::Select,
        FieldKind::Radio,
        FieldKind::Checkbox,
        FieldKind::Button,
        FieldKind::Heading,
        FieldKind::Image,
        FieldKind::Date,
        FieldKind::File,
        FieldKind::Color,
        FieldKind::Range,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Number => "number",
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Textarea => "textarea",
            FieldKind::Select => "select",
            FieldKind::Radio => "radio",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Button => "button",
            FieldKind::Heading => "heading",
            FieldKind::Image => "image",
            FieldKind::Date => "date",
            FieldKind::File => "file",
            FieldKind::Color => "color",
            FieldKind::Range => "range",
        }
    }

    /// Parse a document `type` string. `dropdown` is the legacy name of `select`.
    pub fn parse(s: &str) -> Option<FieldKind> {
        if s == "dropdown" {
            return Some(FieldKind::Select);
        }
        FieldKind::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Kinds whose `options` list is meaningful.
    pub fn has_options(&self) -> bool {
        matches!(self, FieldKind::Select | FieldKind::Radio)
    }

    /// Free-text inputs committed on every keystroke.
    pub fn is_text_like(&self) -> bool {
        matches!(
            self,
            FieldKind::Text
                | FieldKind::Number
                | FieldKind::Email
                | FieldKind::Password
                | FieldKind::Textarea
                | FieldKind::Date
                | FieldKind::Color
                | FieldKind::Range
        )
    }

    /// Event that commits a local edit, or `None` for display-only widgets.
    pub fn commit_event(&self) -> Option<CommitEvent> {
        match self {
            FieldKind::Text
            | FieldKind::Number
            | FieldKind::Email
            | FieldKind::Password
            | FieldKind::Textarea => Some(CommitEvent::Input),
            FieldKind::Select
            | FieldKind::Radio
            | FieldKind::Checkbox
            | FieldKind::Date
            | FieldKind::Color
            | FieldKind::Range
            | FieldKind::File => Some(CommitEvent::Change),
            FieldKind::Button | FieldKind::Heading | FieldKind::Image => None,
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            FieldKind::Heading => "Heading",
            FieldKind::Button => "Button",
            _ => "Label",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Absolute placement in free layout mode, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldLayout {
    pub width_pct: u32,
    /// Explicit control height in px; `None` means natural height
    pub height: Option<u32>,
    pub col_span: u32,
    pub position: Option<Position>,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            width_pct: 100,
            height: None,
            col_span: 1,
            position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldStyle {
    pub font: String,
    pub font_size: u32,
    pub label_size: u32,
    pub text_color: String,
    pub bg_color: String,
    pub border_color: String,
    pub radius: u32,
    pub padding: u32,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            font: "Arial".to_string(),
            font_size: 14,
            label_size: 14,
            text_color: "#111111".to_string(),
            bg_color: "#ffffff".to_string(),
            border_color: "#e6e6ef".to_string(),
            radius: 6,
            padding: 8,
        }
    }
}

/// Association between a field and an external-store location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub address: String,
    /// Pull external changes into the control
    pub listen: bool,
}

impl Binding {
    pub fn new(address: impl Into<String>, listen: bool) -> Self {
        Self {
            address: address.into(),
            listen,
        }
    }
}

/// Complete design-time state of one form control.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub id: String,
    pub kind: FieldKind,
    pub label: String,
    pub placeholder: String,
    pub required: bool,
    pub layout: FieldLayout,
    pub style: FieldStyle,
    pub options: Vec<String>,
    pub binding: Option<Binding>,
    /// Image payload (data URL or link); only meaningful for `image`
    pub image_src: Option<String>,
}

impl FieldDescriptor {
    /// New field with the defaults a freshly dropped widget gets.
    pub fn new(kind: FieldKind, id: impl Into<String>) -> Self {
        let options = if kind.has_options() {
            vec!["Option 1".to_string(), "Option 2".to_string()]
        } else {
            vec![]
        };

        Self {
            id: id.into(),
            kind,
            label: kind.default_label().to_string(),
            placeholder: String::new(),
            required: false,
            layout: FieldLayout::default(),
            style: FieldStyle::default(),
            options,
            binding: None,
            image_src: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_col_span(mut self, span: u32) -> Self {
        self.layout.col_span = span;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_binding(mut self, address: impl Into<String>, listen: bool) -> Self {
        self.binding = Some(Binding::new(address, listen));
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.layout.position = Some(position);
        self
    }

    /// Bound address, if the field has a non-empty one.
    pub fn bound_address(&self) -> Option<&str> {
        self.binding
            .as_ref()
            .map(|b| b.address.as_str())
            .filter(|a| !a.is_empty())
    }

    /// Re-establish the column-span invariant for `columns` columns.
    pub fn clamp_span(&mut self, columns: u32) {
        self.layout.col_span = clamp_span(self.layout.col_span, columns);
    }
}

/// Effective span for an assigned span `span` in a `columns`-wide grid.
pub fn clamp_span(span: u32, columns: u32) -> u32 {
    span.max(1).min(columns.max(1))
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Fresh field id: `<kind>_<base36 millis>_<counter>`.
pub fn generate_field_id(kind: FieldKind) -> String {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    format!("{}_{}_{}", kind.as_str(), to_base36(millis), counter)
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
