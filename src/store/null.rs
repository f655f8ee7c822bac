use crate::binding::registry::BindingId;
use crate::error::StoreError;
use crate::store::adapter::{ChangeHandler, StoreAdapter};

/// Stand-in used when no external store is connected: every call succeeds
/// and does nothing, reads come back empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl StoreAdapter for NullStore {
    fn is_ready(&self) -> bool {
        false
    }

    async fn write(&self, _address: &str, _value: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn read(&self, _address: &str) -> Result<String, StoreError> {
        Ok(String::new())
    }

    async fn ensure_binding(
        &self,
        _address: &str,
        requested: &BindingId,
    ) -> Result<BindingId, StoreError> {
        Ok(requested.clone())
    }

    fn subscribe(
        &self,
        _binding_id: &BindingId,
        _on_change: ChangeHandler,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    fn unsubscribe(&self, _binding_id: &BindingId) {}
}
