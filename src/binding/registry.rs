use std::collections::HashMap;
use std::fmt;

/// Identifier of a named binding in the external store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub String);

impl BindingId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const DEFAULT_BINDING_PREFIX: &str = "bind_";

/// Which control talks to which external binding, for one editing session.
///
/// Holds identifiers only, never field state.
#[derive(Debug, Clone)]
pub struct BindingRegistry {
    prefix: String,
    by_control: HashMap<String, BindingId>,
}

impl Default for BindingRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BINDING_PREFIX)
    }
}

impl BindingRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            by_control: HashMap::new(),
        }
    }

    /// Binding id a control would get, without registering it.
    pub fn derive(&self, control_id: &str) -> BindingId {
        BindingId(format!("{}{}", self.prefix, control_id))
    }

    /// Map `control_id` to its derived binding id, replacing any prior entry.
    pub fn register(&mut self, control_id: &str) -> BindingId {
        let id = self.derive(control_id);
        self.by_control.insert(control_id.to_string(), id.clone());
        id
    }

    /// Record a binding id the store chose for a control.
    pub fn assign(&mut self, control_id: &str, binding_id: BindingId) {
        self.by_control.insert(control_id.to_string(), binding_id);
    }

    pub fn lookup(&self, control_id: &str) -> Option<&BindingId> {
        self.by_control.get(control_id)
    }

    pub fn reverse_lookup(&self, binding_id: &BindingId) -> Option<&str> {
        self.by_control
            .iter()
            .find(|(_, id)| *id == binding_id)
            .map(|(control, _)| control.as_str())
    }

    pub fn remove(&mut self, control_id: &str) -> Option<BindingId> {
        self.by_control.remove(control_id)
    }

    pub fn clear(&mut self) {
        self.by_control.clear();
    }

    pub fn len(&self) -> usize {
        self.by_control.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_control.is_empty()
    }
}
