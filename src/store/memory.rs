use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use tokio::time::Instant;

use crate::binding::registry::BindingId;
use crate::error::StoreError;
use crate::store::adapter::{ChangeHandler, StoreAdapter};

/// One recorded `write` call.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub address: String,
    pub value: String,
    pub at: Instant,
}

/// In-process store: a map of address -> scalar with live notifications.
///
/// Records every call so embedders and tests can observe the transport,
/// and can be told to fail reads or writes.
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
    bindings: RefCell<HashMap<BindingId, String>>,
    handlers: RefCell<HashMap<BindingId, ChangeHandler>>,
    writes: RefCell<Vec<WriteRecord>>,
    reads: RefCell<Vec<String>>,
    failing_writes: RefCell<HashSet<String>>,
    fail_all_writes: Cell<bool>,
    fail_reads: Cell<bool>,
    ready: Cell<bool>,
    delivered: Cell<usize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: RefCell::new(HashMap::new()),
            bindings: RefCell::new(HashMap::new()),
            handlers: RefCell::new(HashMap::new()),
            writes: RefCell::new(Vec::new()),
            reads: RefCell::new(Vec::new()),
            failing_writes: RefCell::new(HashSet::new()),
            fail_all_writes: Cell::new(false),
            fail_reads: Cell::new(false),
            ready: Cell::new(true),
            delivered: Cell::new(0),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.set(ready);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_all_writes.set(fail);
    }

    pub fn fail_writes_to(&self, address: &str) {
        self.failing_writes.borrow_mut().insert(address.to_string());
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Seed a value without notifying anyone.
    pub fn insert(&self, address: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(address.to_string(), value.to_string());
    }

    pub fn value(&self, address: &str) -> Option<String> {
        self.values.borrow().get(address).cloned()
    }

    /// Simulate a user editing the store: update the value and notify every
    /// subscribed binding on `address`. Returns how many handlers ran.
    pub fn set_external(&self, address: &str, value: &str) -> usize {
        self.insert(address, value);

        let targets: Vec<(BindingId, ChangeHandler)> = {
            let bindings = self.bindings.borrow();
            let handlers = self.handlers.borrow();
            bindings
                .iter()
                .filter(|(_, a)| a.as_str() == address)
                .filter_map(|(id, _)| handlers.get(id).map(|h| (id.clone(), h.clone())))
                .collect()
        };

        for (id, handler) in &targets {
            handler(id);
        }
        self.delivered.set(self.delivered.get() + targets.len());
        targets.len()
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes.borrow().clone()
    }

    pub fn writes_to(&self, address: &str) -> Vec<WriteRecord> {
        self.writes
            .borrow()
            .iter()
            .filter(|w| w.address == address)
            .cloned()
            .collect()
    }

    pub fn reads_of(&self, address: &str) -> usize {
        self.reads.borrow().iter().filter(|a| *a == address).count()
    }

    pub fn is_subscribed(&self, binding_id: &BindingId) -> bool {
        self.handlers.borrow().contains_key(binding_id)
    }

    pub fn subscription_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Total change notifications delivered to handlers so far.
    pub fn delivered_notifications(&self) -> usize {
        self.delivered.get()
    }

    pub fn binding_address(&self, binding_id: &BindingId) -> Option<String> {
        self.bindings.borrow().get(binding_id).cloned()
    }
}

impl StoreAdapter for MemoryStore {
    fn is_ready(&self) -> bool {
        self.ready.get()
    }

    async fn write(&self, address: &str, value: &str) -> Result<(), StoreError> {
        self.writes.borrow_mut().push(WriteRecord {
            address: address.to_string(),
            value: value.to_string(),
            at: Instant::now(),
        });

        if self.fail_all_writes.get() || self.failing_writes.borrow().contains(address) {
            return Err(StoreError::Rejected(format!("write to {} refused", address)));
        }

        self.insert(address, value);
        Ok(())
    }

    async fn read(&self, address: &str) -> Result<String, StoreError> {
        self.reads.borrow_mut().push(address.to_string());

        if self.fail_reads.get() {
            return Err(StoreError::Rejected(format!("read of {} refused", address)));
        }
        Ok(self.value(address).unwrap_or_default())
    }

    async fn ensure_binding(
        &self,
        address: &str,
        requested: &BindingId,
    ) -> Result<BindingId, StoreError> {
        self.bindings
            .borrow_mut()
            .insert(requested.clone(), address.to_string());
        Ok(requested.clone())
    }

    fn subscribe(
        &self,
        binding_id: &BindingId,
        on_change: ChangeHandler,
    ) -> Result<(), StoreError> {
        if !self.bindings.borrow().contains_key(binding_id) {
            return Err(StoreError::Rejected(format!(
                "no binding named {}",
                binding_id
            )));
        }
        self.handlers
            .borrow_mut()
            .insert(binding_id.clone(), on_change);
        Ok(())
    }

    fn unsubscribe(&self, binding_id: &BindingId) {
        self.handlers.borrow_mut().remove(binding_id);
    }
}
