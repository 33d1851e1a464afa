//! Asset availability port and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use fleetcmd_core::{AssetKey, AssetStatus};

/// Availability snapshot errors.
#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("availability backend error: {0}")]
    Backend(String),
}

/// Point-in-time read of device reachability and topology.
#[async_trait]
pub trait AvailabilityProvider: Send + Sync {
    /// Snapshot entries for the requested assets. Assets the provider
    /// cannot find are simply absent from the result; callers synthesize
    /// them via [`fill_missing`].
    async fn get_many(&self, keys: &[AssetKey]) -> Result<Vec<AssetStatus>, AvailabilityError>;
}

/// Complete a snapshot: every requested key the provider did not return
/// gets a synthesized `Missing` root with no sub-components.
///
/// The fallback is part of the snapshot contract, not an error.
pub fn fill_missing(keys: &[AssetKey], mut found: Vec<AssetStatus>) -> Vec<AssetStatus> {
    for key in keys {
        if !found.iter().any(|entry| &entry.key == key) {
            found.push(AssetStatus::missing(key.clone()));
        }
    }
    found
}

/// In-memory availability table.
pub struct InMemoryAvailability {
    entries: RwLock<HashMap<AssetKey, AssetStatus>>,
}

impl InMemoryAvailability {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace one root entry.
    pub async fn insert(&self, entry: AssetStatus) {
        self.entries.write().await.insert(entry.key.clone(), entry);
    }
}

impl Default for InMemoryAvailability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AvailabilityProvider for InMemoryAvailability {
    async fn get_many(&self, keys: &[AssetKey]) -> Result<Vec<AssetStatus>, AvailabilityError> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).cloned())
            .collect())
    }
}
