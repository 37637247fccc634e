//! In-memory keyed entity store
//!
//! Maps entity id to the entity behind a per-entity lock. Handlers that
//! mutate an entity take its write lock for the whole mutation, so two
//! handlers never interleave inside one entity while distinct entities
//! mutate fully concurrently. No global lock is held across a mutation.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

/// Keyed store with per-entity locking
pub struct MemStore<T> {
    entries: RwLock<HashMap<Uuid, Arc<RwLock<T>>>>,
}

impl<T> MemStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace an entity, returning its lock handle
    pub async fn upsert(&self, id: Uuid, value: T) -> Arc<RwLock<T>> {
        let entry = Arc::new(RwLock::new(value));
        let mut entries = self.entries.write().await;
        entries.insert(id, Arc::clone(&entry));
        entry
    }

    /// Get the lock handle for an entity, if present.
    ///
    /// The outer map lock is released before the handle is returned; callers
    /// lock the entity itself for as long as their mutation needs.
    pub async fn entry(&self, id: &Uuid) -> Option<Arc<RwLock<T>>> {
        let entries = self.entries.read().await;
        entries.get(id).cloned()
    }

    /// Remove an entity; returns true if it existed
    pub async fn remove(&self, id: &Uuid) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(id).is_some()
    }

    pub async fn contains(&self, id: &Uuid) -> bool {
        let entries = self.entries.read().await;
        entries.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<T: Clone> MemStore<T> {
    /// Clone an entity's current state, if present
    pub async fn snapshot(&self, id: &Uuid) -> Option<T> {
        let entry = self.entry(id).await?;
        let value = entry.read().await;
        Some(value.clone())
    }

    /// Clone every entity matching the filter.
    ///
    /// Handles are collected under the map lock, then each entity is read
    /// individually so a slow reader never blocks the whole store.
    pub async fn list<F>(&self, filter: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let handles: Vec<Arc<RwLock<T>>> = {
            let entries = self.entries.read().await;
            entries.values().cloned().collect()
        };

        let mut out = Vec::new();
        for handle in handles {
            let value = handle.read().await;
            if filter(&value) {
                out.push(value.clone());
            }
        }
        out
    }
}

impl<T> Default for MemStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
