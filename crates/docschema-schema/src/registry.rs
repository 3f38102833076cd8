//! Shared cache of loaded schema models

use crate::model::SchemaModel;
use crate::Result;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe registry of loaded models, keyed by schema set name.
///
/// Models are immutable once built, so handing out `Arc` clones lets any
/// number of validations and completions share one load.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    models: DashMap<String, Arc<SchemaModel>>,
}

impl SchemaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model, replacing any previous one under the same key
    pub fn register(&self, key: impl Into<String>, model: SchemaModel) -> Arc<SchemaModel> {
        let key = key.into();
        let model = Arc::new(model);
        debug!("Registering schema model '{}' ({} types)", key, model.len());
        self.models.insert(key, Arc::clone(&model));
        model
    }

    /// Get a model by key
    pub fn get(&self, key: &str) -> Option<Arc<SchemaModel>> {
        self.models.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Return the cached model for `key`, loading it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; nothing is cached in that case.
    pub fn get_or_load<F>(&self, key: &str, load: F) -> Result<Arc<SchemaModel>>
    where
        F: FnOnce() -> Result<SchemaModel>,
    {
        match self.models.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                debug!("Schema model cache hit: {}", key);
                Ok(Arc::clone(entry.get()))
            }
            Entry::Vacant(entry) => {
                debug!("Schema model cache miss: {}", key);
                let model = Arc::new(load()?);
                entry.insert(Arc::clone(&model));
                Ok(model)
            }
        }
    }

    /// Check if a model exists
    pub fn contains(&self, key: &str) -> bool {
        self.models.contains_key(key)
    }

    /// Drop a model, e.g. after its schema files changed
    pub fn remove(&self, key: &str) -> Option<Arc<SchemaModel>> {
        self.models.remove(key).map(|(_, model)| model)
    }

    /// Number of cached models
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
