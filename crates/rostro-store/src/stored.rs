//! Typed JSON value persisted under a single key.
//!
//! Writes are optimistic: the in-memory value changes before the store is
//! touched and is never rolled back. A generation counter records which
//! write the store last acknowledged, so a failed persist leaves the value
//! dirty and [`StoredValue::sync`] can replay it later.

use crate::backend::{KeyValueStore, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Whether the backing store accepted the most recent read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StoreHealth {
    Healthy,
    Degraded { reason: String },
}

impl StoreHealth {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StoreHealth::Degraded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    Write,
    Remove,
}

pub struct StoredValue<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    default: T,
    value: T,
    loading: bool,
    generation: u64,
    synced_generation: u64,
    pending: PendingOp,
    health: StoreHealth,
}

impl<T> StoredValue<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Create an adapter holding `default` with `loading` still set.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, default: T) -> Self {
        Self {
            store,
            key: key.into(),
            value: default.clone(),
            default,
            loading: true,
            generation: 0,
            synced_generation: 0,
            pending: PendingOp::Write,
            health: StoreHealth::Healthy,
        }
    }

    /// Create an adapter and run its initial load.
    pub async fn open(store: Arc<dyn KeyValueStore>, key: impl Into<String>, default: T) -> Self {
        let mut stored = Self::new(store, key, default);
        stored.load().await;
        stored
    }

    /// Read and decode the persisted value, keeping the default on any
    /// failure. Runs at most once per adapter.
    pub async fn load(&mut self) {
        if !self.loading {
            tracing::debug!(key = %self.key, "value already loaded");
            return;
        }

        match self.store.get(&self.key).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.value = value;
                    tracing::debug!(key = %self.key, "loaded stored value");
                }
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "stored value is not valid JSON; using default");
                }
            },
            Ok(None) => {
                tracing::debug!(key = %self.key, "no stored value; using default");
            }
            Err(e) => {
                tracing::error!(key = %self.key, error = %e, "failed to read stored value; using default");
                self.health = StoreHealth::Degraded {
                    reason: e.to_string(),
                };
            }
        }

        self.loading = false;
    }

    /// Replace the value. The new value is visible immediately; a failed
    /// persist is logged and leaves the adapter dirty and degraded.
    pub async fn save(&mut self, value: T) {
        self.value = value;
        self.generation += 1;
        self.pending = PendingOp::Write;
        let _ = self.persist().await;
    }

    /// Reset to the default and delete the persisted entry.
    pub async fn remove(&mut self) {
        self.value = self.default.clone();
        self.generation += 1;
        self.pending = PendingOp::Remove;
        let _ = self.persist().await;
    }

    /// Replay the latest unacknowledged write or removal, if any.
    pub async fn sync(&mut self) -> Result<(), StoreError> {
        if !self.is_dirty() {
            return Ok(());
        }
        tracing::info!(key = %self.key, generation = self.generation, "retrying unsynced value");
        self.persist().await
    }

    async fn persist(&mut self) -> Result<(), StoreError> {
        let generation = self.generation;
        let result = match self.pending {
            PendingOp::Write => match serde_json::to_string(&self.value) {
                Ok(raw) => self.store.set(&self.key, &raw).await,
                Err(source) => Err(StoreError::Encode {
                    key: self.key.clone(),
                    source,
                }),
            },
            PendingOp::Remove => self.store.delete(&self.key).await,
        };

        match result {
            Ok(()) => {
                self.synced_generation = generation;
                self.health = StoreHealth::Healthy;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    key = %self.key,
                    generation,
                    error = %e,
                    "failed to persist value; keeping in-memory copy"
                );
                self.health = StoreHealth::Degraded {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// True when the in-memory value has changes the store has not accepted.
    pub fn is_dirty(&self) -> bool {
        self.generation != self.synced_generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn health(&self) -> &StoreHealth {
        &self.health
    }
}
