use std::rc::Rc;

use crate::binding::registry::BindingId;
use crate::error::StoreError;

/// Sheet holding the persisted design. Field bindings may not point here.
pub const PERSISTENCE_SHEET: &str = "_FormDesignerMeta";

/// Default cell holding the serialized design document.
pub const PERSISTENCE_ADDRESS: &str = "_FormDesignerMeta!A1";

/// Callback fired by the store when a bound location changes.
pub type ChangeHandler = Rc<dyn Fn(&BindingId)>;

/// Transport to the external tabular store.
///
/// Implementations own no design state. Calls suspend only on transport
/// I/O; failures are reported as `StoreError` and never panic.
#[allow(async_fn_in_trait)]
pub trait StoreAdapter {
    /// Whether live change notifications can be used.
    fn is_ready(&self) -> bool;

    /// Best-effort write of a scalar to `address`.
    async fn write(&self, address: &str, value: &str) -> Result<(), StoreError>;

    /// Scalar at `address`; empty string when nothing is stored there.
    async fn read(&self, address: &str) -> Result<String, StoreError>;

    /// Create the named binding for `address` if absent and return its id.
    /// `requested` is the id the caller would like the binding to carry.
    async fn ensure_binding(
        &self,
        address: &str,
        requested: &BindingId,
    ) -> Result<BindingId, StoreError>;

    /// Register the change handler for a binding, replacing any previous one.
    fn subscribe(&self, binding_id: &BindingId, on_change: ChangeHandler)
    -> Result<(), StoreError>;

    /// Drop the change handler for a binding. No-op when none is registered.
    fn unsubscribe(&self, binding_id: &BindingId);
}
