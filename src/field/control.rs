use crate::field::field_model::{FieldDescriptor, FieldKind};

/// Which widget event commits a user edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitEvent {
    /// Fires on every value edit (text-like inputs)
    Input,
    /// Fires once a selection is committed
    Change,
}

/// UI-level value held by a live control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Text(String),
    Checked(bool),
    /// Selected option text for select and radio controls
    Choice(Option<String>),
    /// Display name of the picked file
    File(Option<String>),
    /// Read-only caption of buttons and headings
    Label(String),
    /// Controls without a value (images)
    None,
}

impl ControlValue {
    /// Whether this value variant belongs to a `kind` control.
    pub fn fits(&self, kind: FieldKind) -> bool {
        match self {
            ControlValue::Text(_) => kind.is_text_like(),
            ControlValue::Checked(_) => kind == FieldKind::Checkbox,
            ControlValue::Choice(_) => kind.has_options(),
            ControlValue::File(_) => kind == FieldKind::File,
            ControlValue::Label(_) => matches!(kind, FieldKind::Button | FieldKind::Heading),
            ControlValue::None => kind == FieldKind::Image,
        }
    }
}

/// Live widget state for one field: what the user currently sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub kind: FieldKind,
    /// Displayed options in order; may outgrow the descriptor's list when
    /// the store supplies a value that is not an option yet
    pub options: Vec<String>,
    pub value: ControlValue,
}

impl Control {
    pub fn new(kind: FieldKind, options: Vec<String>, value: ControlValue) -> Self {
        Self {
            kind,
            options,
            value,
        }
    }

    /// Control as it looks right after the field is rendered.
    pub fn for_field(field: &FieldDescriptor) -> Self {
        let value = match field.kind {
            FieldKind::Checkbox => ControlValue::Checked(false),
            // a rendered select shows its first option
            FieldKind::Select => ControlValue::Choice(field.options.first().cloned()),
            FieldKind::Radio => ControlValue::Choice(None),
            FieldKind::File => ControlValue::File(None),
            FieldKind::Button | FieldKind::Heading => ControlValue::Label(field.label.clone()),
            FieldKind::Image => ControlValue::None,
            _ => ControlValue::Text(String::new()),
        };

        Self {
            kind: field.kind,
            options: if field.kind.has_options() {
                field.options.clone()
            } else {
                vec![]
            },
            value,
        }
    }

    /// Re-render after the descriptor changed: options are rebuilt and
    /// captions follow the label.
    pub fn refresh_from(&mut self, field: &FieldDescriptor) {
        if field.kind != self.kind {
            *self = Control::for_field(field);
            return;
        }

        match self.kind {
            FieldKind::Select => {
                self.options = field.options.clone();
                let keep = matches!(&self.value, ControlValue::Choice(Some(v)) if self.options.contains(v));
                if !keep {
                    self.value = ControlValue::Choice(self.options.first().cloned());
                }
            }
            FieldKind::Radio => {
                // rebuilt radio groups come back unchecked
                self.options = field.options.clone();
                self.value = ControlValue::Choice(None);
            }
            FieldKind::Button | FieldKind::Heading => {
                self.value = ControlValue::Label(field.label.clone());
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_starts_on_first_option() {
        let field = FieldDescriptor::new(FieldKind::Select, "s1").with_options(["A", "B"]);
        let control = Control::for_field(&field);
        assert_eq!(control.value, ControlValue::Choice(Some("A".into())));
    }

    #[test]
    fn refresh_keeps_selection_still_offered() {
        let field = FieldDescriptor::new(FieldKind::Select, "s1").with_options(["A", "B"]);
        let mut control = Control::for_field(&field);
        control.value = ControlValue::Choice(Some("B".into()));

        let field = field.with_options(["B", "C"]);
        control.refresh_from(&field);
        assert_eq!(control.value, ControlValue::Choice(Some("B".into())));

        let field = field.with_options(["C"]);
        control.refresh_from(&field);
        assert_eq!(control.value, ControlValue::Choice(Some("C".into())));
    }

    #[test]
    fn value_fits_only_its_kind() {
        assert!(ControlValue::Text("x".into()).fits(FieldKind::Date));
        assert!(!ControlValue::Text("x".into()).fits(FieldKind::Checkbox));
        assert!(ControlValue::Choice(None).fits(FieldKind::Radio));
        assert!(!ControlValue::Label("x".into()).fits(FieldKind::Image));
    }
}
