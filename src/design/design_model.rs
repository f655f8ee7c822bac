use crate::design::placement::{flow_placement, grid_cell_origin};
use crate::field::field_model::{FieldDescriptor, FieldKind, Position, generate_field_id};

pub const DEFAULT_WIDTH: u32 = 900;
pub const DEFAULT_PADDING: u32 = 16;
pub const DEFAULT_GRID_SIZE: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Grid auto-placement by column count and per-field span
    #[default]
    Flow,
    /// Absolute pixel placement per field
    Free,
}

impl LayoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutMode::Flow => "flow",
            LayoutMode::Free => "free",
        }
    }

    /// Anything other than `"free"` is flow.
    pub fn parse(s: &str) -> LayoutMode {
        if s.trim().eq_ignore_ascii_case("free") {
            LayoutMode::Free
        } else {
            LayoutMode::Flow
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSettings {
    pub background_color: String,
    /// Background image as a data URL; empty when unset
    pub background_image: String,
    pub width: u32,
    pub padding: u32,
    pub layout: LayoutMode,
    pub columns: u32,
    pub show_grid: bool,
    pub grid_size: u32,
}

impl GlobalSettings {
    /// Bring a field in line with these settings: span clamped to the
    /// column count, and no absolute position outside free layout.
    pub fn conform(&self, field: &mut FieldDescriptor) {
        field.clamp_span(self.columns);
        if self.layout == LayoutMode::Flow {
            field.layout.position = None;
        }
    }
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            background_color: String::new(),
            background_image: String::new(),
            width: DEFAULT_WIDTH,
            padding: DEFAULT_PADDING,
            layout: LayoutMode::Flow,
            columns: 1,
            show_grid: false,
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

/// The whole editable form: global settings plus fields in display order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormDesign {
    pub global: GlobalSettings,
    pub fields: Vec<FieldDescriptor>,
}

impl FormDesign {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starter form shown to a new user.
    pub fn starter(columns: u32) -> Self {
        let mut design = FormDesign::new();
        design.global.columns = columns.max(1);
        design.fields = vec![
            FieldDescriptor::new(FieldKind::Heading, generate_field_id(FieldKind::Heading))
                .with_label("Customer Signup")
                .with_col_span(design.global.columns),
            FieldDescriptor::new(FieldKind::Text, generate_field_id(FieldKind::Text))
                .with_label("Full name")
                .with_placeholder("Jane Doe"),
            FieldDescriptor::new(FieldKind::Email, generate_field_id(FieldKind::Email))
                .with_label("Email address")
                .with_placeholder("name@example.com"),
        ];
        design.clamp_spans();
        design
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_mut(&mut self, id: &str) -> Option<&mut FieldDescriptor> {
        self.fields.iter_mut().find(|f| f.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == id)
    }

    /// Re-establish `1 <= colSpan <= columns` on every field.
    pub fn clamp_spans(&mut self) {
        let columns = self.global.columns;
        for field in &mut self.fields {
            field.clamp_span(columns);
        }
    }

    pub fn set_columns(&mut self, columns: u32) {
        self.global.columns = columns.max(1);
        self.clamp_spans();
    }

    /// Switch layout mode.
    ///
    /// Flow drops absolute positions. Free keeps known positions and gives
    /// every other field the origin of its current grid cell.
    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        self.global.layout = mode;
        match mode {
            LayoutMode::Flow => {
                for field in &mut self.fields {
                    field.layout.position = None;
                }
                self.clamp_spans();
            }
            LayoutMode::Free => {
                let cells = flow_placement(&self.fields, self.global.columns);
                for (field, cell) in self.fields.iter_mut().zip(cells) {
                    if field.layout.position.is_none() {
                        field.layout.position = Some(grid_cell_origin(&self.global, &cell));
                    }
                }
            }
        }
    }

    /// Move a field to `index` in display order (flow reordering).
    pub fn move_field(&mut self, id: &str, index: usize) -> bool {
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let field = self.fields.remove(from);
        let to = index.min(self.fields.len());
        self.fields.insert(to, field);
        true
    }

    pub fn remove_field(&mut self, id: &str) -> Option<FieldDescriptor> {
        let index = self.index_of(id)?;
        Some(self.fields.remove(index))
    }

    /// Place a field at `position`. Flow layout ignores the position but
    /// still reports whether the field exists.
    pub fn set_position(&mut self, id: &str, position: Position) -> bool {
        let free = self.global.layout == LayoutMode::Free;
        match self.field_mut(id) {
            Some(field) => {
                if free {
                    field.layout.position = Some(position);
                }
                true
            }
            None => false,
        }
    }
}
