//! Audit sink port and the failure-isolating recorder.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::error;

use fleetcmd_core::{AssetKey, AuditEvent, ErrorKind, TaskId};

/// Audit sink errors.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    Write(String),
}

/// Side-channel sink for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Write one event.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Records workflow milestones without ever failing the workflow.
///
/// Sink failures are logged with the attempted event attached and then
/// dropped; the audit channel is invisible to the caller.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
}

impl AuditRecorder {
    /// Create a recorder over a sink.
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Record that a task-asset was created.
    pub async fn record_create(&self, task_id: &TaskId, key: &AssetKey) {
        self.record(AuditEvent::created(task_id.clone(), key)).await;
    }

    /// Record that a task-asset's command was dispatched.
    pub async fn record_execute(&self, task_id: &TaskId, key: &AssetKey) {
        self.record(AuditEvent::executed(task_id.clone(), key)).await;
    }

    /// Record that a task-asset failed with a classified error.
    pub async fn record_fail(&self, task_id: &TaskId, key: &AssetKey, kind: ErrorKind) {
        self.record(AuditEvent::failed(task_id.clone(), key, kind))
            .await;
    }

    async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.sink.record(event.clone()).await {
            error!(
                error = %e,
                task_id = %event.task_id,
                type_id = %event.type_id,
                asset_id = %event.asset_id,
                milestone = ?event.milestone,
                "Audit write failed; continuing"
            );
        }
    }
}

/// In-memory audit sink.
pub struct InMemoryAuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// All events recorded so far, in write order.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

impl Default for InMemoryAuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcmd_core::AuditMilestone;

    struct FailingSink;

    #[async_trait]
    impl AuditSink for FailingSink {
        async fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
            Err(AuditError::Write("sink unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_recorder_writes_through() {
        let log = Arc::new(InMemoryAuditLog::new());
        let recorder = AuditRecorder::new(log.clone());
        let task_id = TaskId::generate();
        let key = AssetKey::new("RZ100", "0000213");

        recorder.record_execute(&task_id, &key).await;
        recorder
            .record_fail(&task_id, &key, ErrorKind::Connection)
            .await;

        let events = log.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].milestone, AuditMilestone::Execute);
        assert_eq!(events[1].milestone, AuditMilestone::Fail);
        assert_eq!(events[1].error, Some(ErrorKind::Connection));
    }

    #[tokio::test]
    async fn test_sink_failure_never_escapes() {
        let recorder = AuditRecorder::new(Arc::new(FailingSink));
        let task_id = TaskId::generate();
        let key = AssetKey::new("RZ100", "0000213");

        // Both calls must resolve despite the sink failing.
        recorder.record_execute(&task_id, &key).await;
        recorder.record_fail(&task_id, &key, ErrorKind::System).await;
    }
}
