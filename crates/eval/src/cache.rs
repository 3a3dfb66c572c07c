//! Compiled models shared across sessions, keyed by script digest.
//!
//! The cache holds at most `capacity` models. Inserting past that bound
//! evicts the model that was compiled first.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use stepwise_core::{compile, CompileError, Model};

use crate::config::EngineConfig;

type Key = [u8; 32];

#[derive(Debug, Default)]
struct Models {
    by_key: HashMap<Key, Arc<Model>>,
    /// Keys in insertion order.
    order: VecDeque<Key>,
}

#[derive(Debug)]
pub struct ModelCache {
    models: Mutex<Models>,
    capacity: usize,
}

impl Default for ModelCache {
    fn default() -> Self {
        ModelCache::with_capacity(EngineConfig::DEFAULT_MODEL_CACHE_CAPACITY)
    }
}

impl ModelCache {
    pub fn new() -> Self {
        ModelCache::default()
    }

    /// A cache holding at most `capacity` models. Zero disables caching.
    pub fn with_capacity(capacity: usize) -> Self {
        ModelCache {
            models: Mutex::new(Models::default()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The model compiled from `script`, compiling it on first use.
    /// Compile errors are not cached.
    pub fn get_or_compile(&self, script: &str) -> Result<Arc<Model>, CompileError> {
        let key: Key = Sha256::digest(script.as_bytes()).into();
        if let Some(model) = self.lock().by_key.get(&key) {
            tracing::debug!("model cache hit");
            return Ok(Arc::clone(model));
        }
        // Compile outside the lock; a concurrent compile of the same script
        // yields an identical model.
        let model = Arc::new(compile(script)?);
        if self.capacity == 0 {
            return Ok(model);
        }
        let mut models = self.lock();
        if let Some(existing) = models.by_key.get(&key) {
            return Ok(Arc::clone(existing));
        }
        while models.by_key.len() >= self.capacity {
            let Some(oldest) = models.order.pop_front() else {
                break;
            };
            models.by_key.remove(&oldest);
            tracing::debug!(capacity = self.capacity, "model cache evicted oldest model");
        }
        models.order.push_back(key);
        models.by_key.insert(key, Arc::clone(&model));
        Ok(model)
    }

    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().by_key.is_empty()
    }

    /// Drop every cached model. Models already handed out stay alive.
    pub fn clear(&self) {
        let mut models = self.lock();
        models.by_key.clear();
        models.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Models> {
        self.models.lock().unwrap_or_else(|e| e.into_inner())
    }
}
