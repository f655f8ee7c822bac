//! Conversion between control values and the scalar strings the external
//! store holds.

use crate::error::DesignerError;
use crate::field::control::{Control, ControlValue};
use crate::field::field_model::FieldKind;

pub const TRUE_SCALAR: &str = "TRUE";
pub const FALSE_SCALAR: &str = "FALSE";

/// Outcome of decoding a store value into a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Control state now reflects the store value
    Updated,
    /// Kind is read-only from the store side (button, heading, file)
    ReadOnly,
    /// Radio value matched none of the option labels; nothing changed
    NoMatch,
}

/// Encode the current value of a `kind` control as a store scalar.
pub fn encode(kind: FieldKind, value: &ControlValue) -> Result<String, DesignerError> {
    if kind == FieldKind::Image {
        return Err(DesignerError::UnsupportedKind(kind));
    }
    if !value.fits(kind) {
        return Err(DesignerError::ValueKindMismatch(kind));
    }

    let scalar = match value {
        ControlValue::Text(text) => text.clone(),
        ControlValue::Checked(true) => TRUE_SCALAR.to_string(),
        ControlValue::Checked(false) => FALSE_SCALAR.to_string(),
        ControlValue::Choice(selected) => {
            let selected = selected.as_deref().unwrap_or_default();
            if kind == FieldKind::Radio {
                selected.trim().to_string()
            } else {
                selected.to_string()
            }
        }
        ControlValue::File(name) => name.clone().unwrap_or_default(),
        ControlValue::Label(label) => label.clone(),
        ControlValue::None => return Err(DesignerError::UnsupportedKind(kind)),
    };
    Ok(scalar)
}

/// Decode `scalar` into `control`, mutating its state directly.
///
/// This never synthesizes a commit event; callers on the external path rely
/// on that to avoid echoing the value back to the store.
pub fn decode_into(
    kind: FieldKind,
    scalar: &str,
    control: &mut Control,
) -> Result<Applied, DesignerError> {
    if control.kind != kind {
        return Err(DesignerError::ValueKindMismatch(kind));
    }

    match kind {
        FieldKind::Image => Err(DesignerError::UnsupportedKind(kind)),
        FieldKind::Button | FieldKind::Heading | FieldKind::File => Ok(Applied::ReadOnly),
        FieldKind::Checkbox => {
            control.value = ControlValue::Checked(is_truthy(scalar));
            Ok(Applied::Updated)
        }
        FieldKind::Select => {
            if scalar.is_empty() && !control.options.iter().any(|o| o.is_empty()) {
                control.value = ControlValue::Choice(None);
                return Ok(Applied::Updated);
            }
            if !control.options.iter().any(|o| o == scalar) {
                control.options.push(scalar.to_string());
            }
            control.value = ControlValue::Choice(Some(scalar.to_string()));
            Ok(Applied::Updated)
        }
        FieldKind::Radio => {
            let want = scalar.trim();
            match control.options.iter().find(|o| o.trim() == want) {
                Some(option) => {
                    control.value = ControlValue::Choice(Some(option.clone()));
                    Ok(Applied::Updated)
                }
                None => Ok(Applied::NoMatch),
            }
        }
        FieldKind::Text
        | FieldKind::Number
        | FieldKind::Email
        | FieldKind::Password
        | FieldKind::Textarea
        | FieldKind::Date
        | FieldKind::Color
        | FieldKind::Range => {
            control.value = ControlValue::Text(scalar.to_string());
            Ok(Applied::Updated)
        }
    }
}

/// Checkbox truthiness of a store value.
pub fn is_truthy(scalar: &str) -> bool {
    matches!(
        scalar.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}
