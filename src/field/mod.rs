pub mod codec;
pub mod control;
pub mod field_model;
