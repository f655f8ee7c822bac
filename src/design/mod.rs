pub mod design_model;
pub mod placement;
