use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::backend::DetectionAdapter;

/// Shared handle to a registered adapter.
pub type SharedAdapter = Arc<Mutex<dyn DetectionAdapter>>;

/// Thread-safe registry of detection adapters.
///
/// Adapters are wrapped in `Mutex` because `DetectionAdapter::detect` takes `&mut self`.
pub struct AdapterRegistry {
    adapters: HashMap<String, SharedAdapter>,
    default_name: Option<String>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            default_name: None,
        }
    }

    /// Registry pre-populated with the built-in adapters. `motion` is the default.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(super::MotionAdapter::new());
        registry.register(super::StubAdapter::new());
        registry
    }

    /// Register an adapter. The first registered adapter becomes the default.
    pub fn register<A: DetectionAdapter + 'static>(&mut self, adapter: A) {
        let name = adapter.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.adapters.insert(name, Arc::new(Mutex::new(adapter)));
    }

    /// Set default adapter by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.adapters.contains_key(name) {
            return Err(anyhow!("detection adapter '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get adapter by name.
    pub fn get(&self, name: &str) -> Option<SharedAdapter> {
        self.adapters.get(name).cloned()
    }

    /// Get default adapter.
    pub fn default_adapter(&self) -> Option<SharedAdapter> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    /// Resolve an adapter by name and run its warm-up hook.
    pub fn select(&self, name: &str) -> Result<SharedAdapter> {
        let adapter = self.get(name).ok_or_else(|| {
            anyhow!(
                "detection adapter '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        adapter
            .lock()
            .map_err(|_| anyhow!("adapter lock poisoned"))?
            .warm_up()?;
        Ok(adapter)
    }

    /// List registered adapters, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.adapters.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
