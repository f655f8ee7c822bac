use crate::design::design_model::GlobalSettings;
use crate::field::field_model::{FieldDescriptor, Position, clamp_span};

/// Nominal row height used when flow cells are turned into pixel positions.
pub const FLOW_ROW_HEIGHT: u32 = 64;

/// Grid cell a field occupies in flow layout (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    pub row: u32,
    pub column: u32,
    pub span: u32,
}

/// Sequential grid auto-placement: fields fill rows left to right and wrap
/// when their span no longer fits in the current row.
pub fn flow_placement(fields: &[FieldDescriptor], columns: u32) -> Vec<GridCell> {
    let columns = columns.max(1);
    let mut row = 0;
    let mut column = 0;
    let mut cells = Vec::with_capacity(fields.len());

    for field in fields {
        let span = clamp_span(field.layout.col_span, columns);
        if column + span > columns {
            row += 1;
            column = 0;
        }

        cells.push(GridCell { row, column, span });

        column += span;
        if column == columns {
            row += 1;
            column = 0;
        }
    }

    cells
}

/// Pixel origin of a grid cell inside the form.
pub fn grid_cell_origin(global: &GlobalSettings, cell: &GridCell) -> Position {
    let columns = global.columns.max(1);
    let inner = global.width.saturating_sub(global.padding * 2);
    let cell_width = inner / columns;
    Position::new(
        (global.padding + cell.column * cell_width) as i32,
        (global.padding + cell.row * FLOW_ROW_HEIGHT) as i32,
    )
}

/// Round a position to the nearest multiple of `grid_size`.
pub fn snap_to_grid(position: Position, grid_size: u32) -> Position {
    if grid_size == 0 {
        return position;
    }
    let g = grid_size as f64;
    let snap = |v: i32| ((v as f64 / g).round() * g) as i32;
    Position::new(snap(position.x), snap(position.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::field_model::FieldKind;

    fn field(span: u32) -> FieldDescriptor {
        FieldDescriptor::new(FieldKind::Text, format!("f{span}")).with_col_span(span)
    }

    #[test]
    fn wide_field_wraps_to_next_row() {
        let cells = flow_placement(&[field(1), field(2), field(1)], 2);
        assert_eq!(cells[0], GridCell { row: 0, column: 0, span: 1 });
        assert_eq!(cells[1], GridCell { row: 1, column: 0, span: 2 });
        assert_eq!(cells[2], GridCell { row: 2, column: 0, span: 1 });
    }

    #[test]
    fn oversized_span_is_clamped() {
        let cells = flow_placement(&[field(5)], 3);
        assert_eq!(cells[0].span, 3);
    }

    #[test]
    fn snapping_rounds_to_nearest_line() {
        assert_eq!(snap_to_grid(Position::new(17, 5), 12), Position::new(12, 0));
        assert_eq!(snap_to_grid(Position::new(19, 30), 12), Position::new(24, 36));
        assert_eq!(snap_to_grid(Position::new(19, 30), 0), Position::new(19, 30));
    }
}
