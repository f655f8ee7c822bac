use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::binding::registry::BindingId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Control -> store
    Push,
    /// Store -> control
    Pull,
    /// Design -> persistence location
    Save,
    /// Persistence location -> design
    Load,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncEvent {
    pub timestamp_ms: u128,
    pub direction: SyncDirection,

    pub field_id: Option<String>,
    pub binding_id: Option<String>,
    pub address: Option<String>,

    pub ok: bool,
    pub detail: Option<String>,
}

impl SyncEvent {
    pub fn now(direction: SyncDirection) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            direction,
            field_id: None,
            binding_id: None,
            address: None,
            ok: true,
            detail: None,
        }
    }

    pub fn with_field(mut self, field_id: &str) -> Self {
        self.field_id = Some(field_id.to_string());
        self
    }

    pub fn with_binding(mut self, binding_id: &BindingId) -> Self {
        self.binding_id = Some(binding_id.to_string());
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Some(address.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn failed(mut self, reason: impl ToString) -> Self {
        self.ok = false;
        self.detail = Some(reason.to_string());
        self
    }
}
