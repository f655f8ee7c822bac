use std::collections::HashMap;

use crate::design::design_model::FormDesign;
use crate::field::control::Control;

/// Design plus the live controls rendered from it, shared between the
/// editing session and its binding channels.
///
/// Channels only ever touch the control of their own field.
#[derive(Debug, Default)]
pub struct Workspace {
    pub design: FormDesign,
    pub controls: HashMap<String, Control>,
}

impl Workspace {
    pub fn new(design: FormDesign) -> Self {
        let mut workspace = Self {
            design,
            controls: HashMap::new(),
        };
        workspace.rebuild_controls();
        workspace
    }

    /// Render every field from scratch; prior control state is discarded.
    pub fn rebuild_controls(&mut self) {
        self.controls = self
            .design
            .fields
            .iter()
            .map(|f| (f.id.clone(), Control::for_field(f)))
            .collect();
    }

    /// Re-render one field after its descriptor changed.
    pub fn refresh_control(&mut self, field_id: &str) {
        let Some(field) = self.design.field(field_id) else {
            self.controls.remove(field_id);
            return;
        };
        match self.controls.get_mut(field_id) {
            Some(control) => control.refresh_from(field),
            None => {
                self.controls
                    .insert(field_id.to_string(), Control::for_field(field));
            }
        }
    }
}
