use crate::{ResourceError, ResourceLoader, SharedResourceData};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A loader over resources added up front. Works in any environment,
/// including wasm32.
#[derive(Debug, Default)]
pub struct InMemoryResourceLoader {
    resources: RwLock<HashMap<String, SharedResourceData>>,
}

fn poisoned(path: &str) -> ResourceError {
    ResourceError::LoadFailed {
        path: path.to_string(),
        message: "resource store lock poisoned".to_string(),
    }
}

impl InMemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `data` under `path`, replacing any previous value.
    pub fn add(&self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<(), ResourceError> {
        let path = path.into();
        let mut resources = self.resources.write().map_err(|_| poisoned(&path))?;
        resources.insert(path, Arc::new(data.into()));
        Ok(())
    }

    /// Builder-style [`add`](Self::add) for fixtures.
    pub fn with(self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Result<Self, ResourceError> {
        self.add(path, data)?;
        Ok(self)
    }

    pub fn remove(&self, path: &str) -> Option<SharedResourceData> {
        self.resources.write().ok()?.remove(path)
    }

    pub fn clear(&self) {
        if let Ok(mut resources) = self.resources.write() {
            resources.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.resources.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResourceLoader for InMemoryResourceLoader {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let resources = self.resources.read().map_err(|_| poisoned(path))?;
        resources
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resources
            .read()
            .map(|r| r.contains_key(path))
            .unwrap_or(false)
    }

    fn name(&self) -> &'static str {
        "InMemoryResourceLoader"
    }
}
