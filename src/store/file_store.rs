use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::binding::registry::BindingId;
use crate::error::StoreError;
use crate::store::adapter::{ChangeHandler, StoreAdapter};

/// Store backed by a JSON object file mapping address -> scalar.
///
/// Used by the command-line tools. It has no change notifications, so it
/// never reports ready and listening bindings degrade to write-only.
pub struct FileStore {
    path: PathBuf,
    bindings: RefCell<HashMap<BindingId, String>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            bindings: RefCell::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored values; a missing file is an empty store.
    pub fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(StoreError::Io(format!("{}: {}", self.path.display(), e))),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            StoreError::Io(format!("{}: invalid store file: {}", self.path.display(), e))
        })
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| StoreError::Io(format!("serialize store: {}", e)))?;
        std::fs::write(&self.path, json)
            .map_err(|e| StoreError::Io(format!("{}: {}", self.path.display(), e)))
    }
}

impl StoreAdapter for FileStore {
    fn is_ready(&self) -> bool {
        false
    }

    async fn write(&self, address: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.load()?;
        values.insert(address.to_string(), value.to_string());
        self.save(&values)?;
        debug!(address, path = %self.path.display(), "wrote store value");
        Ok(())
    }

    async fn read(&self, address: &str) -> Result<String, StoreError> {
        Ok(self.load()?.remove(address).unwrap_or_default())
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
        _binding_id: &BindingId,
        _on_change: ChangeHandler,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    fn unsubscribe(&self, _binding_id: &BindingId) {}
}
