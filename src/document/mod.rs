pub mod document_model;
pub mod migrate;
pub mod serializer;
