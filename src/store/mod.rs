pub mod adapter;
pub mod file_store;
pub mod memory;
pub mod null;
