//! Message-bus publish port and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// Publish errors.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Outbound command channel to the device fleet.
///
/// Delivery and transport-level retry are the bus's concern, not the
/// engine's.
#[async_trait]
pub trait CommandBus: Send + Sync {
    /// Publish with retained semantics: the transport must keep the
    /// message for delivery to a device that is offline at publish time.
    async fn publish_retained(&self, topic: &str, payload: serde_json::Value)
        -> Result<(), BusError>;
}

/// In-memory bus recording every publish and the retained message per
/// topic.
pub struct InMemoryCommandBus {
    published: RwLock<Vec<(String, serde_json::Value)>>,
    retained: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryCommandBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            published: RwLock::new(Vec::new()),
            retained: RwLock::new(HashMap::new()),
        }
    }

    /// Every publish so far, in publish order.
    pub async fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published.read().await.clone()
    }

    /// The currently retained message on a topic, if any.
    pub async fn retained(&self, topic: &str) -> Option<serde_json::Value> {
        self.retained.read().await.get(topic).cloned()
    }
}

impl Default for InMemoryCommandBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandBus for InMemoryCommandBus {
    async fn publish_retained(
        &self,
        topic: &str,
        payload: serde_json::Value,
    ) -> Result<(), BusError> {
        self.published
            .write()
            .await
            .push((topic.to_string(), payload.clone()));
        self.retained
            .write()
            .await
            .insert(topic.to_string(), payload);
        Ok(())
    }
}
