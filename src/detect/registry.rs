use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::result::DetectionResult;

use super::backend::DetectorBackend;

/// Registry of detector backends, selected by name.
///
/// Backends are wrapped in `Mutex` because `DetectorBackend::detect` takes `&mut self`;
/// concurrent callers serialize on the lock.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<Mutex<dyn DetectorBackend>>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Arc::new(Mutex::new(backend)));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            ));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    /// Get backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.backends.get(name).cloned()
    }

    /// Get default backend.
    pub fn default_backend(&self) -> Option<Arc<Mutex<dyn DetectorBackend>>> {
        self.default_name.as_ref().and_then(|name| self.get(name))
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// List registered backends, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Run detection on the default backend.
    pub fn detect(&self, pixels: &[u8], width: u32, height: u32) -> Result<DetectionResult> {
        let backend = self
            .default_backend()
            .ok_or_else(|| anyhow!("no detector backend registered"))?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.detect(pixels, width, height)
    }

    /// Warm up the default backend.
    pub fn warm_up(&self) -> Result<()> {
        let Some(backend) = self.default_backend() else {
            return Ok(());
        };
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.warm_up()
    }
}

// Backends are trait objects; list them by name.
impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.list())
            .field("default", &self.default_name)
            .finish()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::{ScriptedBackend, StubBackend};
    use crate::detect::Detection;
    use crate::geometry::BoundingBox;

    #[test]
    fn first_registered_is_default() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(ScriptedBackend::new(vec![]));
        assert_eq!(registry.default_name(), Some("stub"));
        assert_eq!(registry.list(), vec!["scripted", "stub"]);
    }

    #[test]
    fn set_default_switches_backend() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        registry.register(ScriptedBackend::new(vec![vec![Detection::new(
            "train",
            0.9,
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        )]]));
        registry.set_default("scripted").unwrap();

        let result = registry.detect(&[0u8; 3], 1, 1).unwrap();
        assert_eq!(result.detections.len(), 1);
        assert!(registry.set_default("missing").is_err());
    }

    #[test]
    fn debug_lists_backend_names() {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new());
        let rendered = format!("{:?}", registry);
        assert!(rendered.contains("\"stub\""));
        assert!(rendered.contains("default: Some(\"stub\")"));
    }

    #[test]
    fn empty_registry_errors() {
        let registry = BackendRegistry::new();
        assert!(registry.detect(&[], 0, 0).is_err());
        assert!(registry.warm_up().is_ok());
    }
}
