use thiserror::Error;

use crate::field::field_model::FieldKind;

/// Failure reported by an external store transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No external store is connected
    #[error("external store is not available")]
    Unavailable,

    /// The store refused the request (bad address, locked range, ...)
    #[error("store rejected request: {0}")]
    Rejected(String),

    /// Local I/O backing the store failed
    #[error("store I/O failed: {0}")]
    Io(String),
}

#[derive(Debug, Error)]
pub enum DesignerError {
    /// Value codec has no mapping for this field kind
    #[error("field kind '{0}' has no value mapping")]
    UnsupportedKind(FieldKind),

    /// Control value variant does not belong to the field kind
    #[error("value does not fit a '{0}' control")]
    ValueKindMismatch(FieldKind),

    #[error("binding write to '{address}' failed: {source}")]
    BindingWriteFailed {
        address: String,
        #[source]
        source: StoreError,
    },

    #[error("binding read from '{address}' failed: {source}")]
    BindingReadFailed {
        address: String,
        #[source]
        source: StoreError,
    },

    /// Import or store load produced unparsable or schema-invalid content
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// Autosave or explicit save could not reach the store
    #[error("persisting the design failed: {0}")]
    PersistenceFailed(String),

    #[error("no field with id '{0}'")]
    UnknownField(String),

    #[error("field '{0}' has no binding address")]
    NoBindingAddress(String),

    /// Address points into the reserved persistence location
    #[error("address '{0}' is reserved for design persistence")]
    ReservedAddress(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl DesignerError {
    pub fn malformed(reason: impl ToString) -> Self {
        DesignerError::MalformedDocument(reason.to_string())
    }
}
