//! Form designer core: field model, design documents, value codec,
//! spreadsheet-style bindings and debounced persistence.
//!
//! Everything runs on one thread. Background work (binding channels and the
//! autosave task) is spawned with `tokio::task::spawn_local`, so sessions
//! must be driven inside a `tokio::task::LocalSet`.

pub mod autosave;
pub mod binding;
pub mod cli;
pub mod design;
pub mod document;
pub mod error;
pub mod field;
pub mod session;
pub mod store;
pub mod trace;

pub use error::{DesignerError, StoreError};
