//! Task persistence port and the in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use fleetcmd_core::{AssetKey, Task, TaskAssetStatus, TaskId, TaskStatus};

/// Task store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task-asset not found: {key} on task {task_id}")]
    TaskAssetNotFound { task_id: TaskId, key: AssetKey },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable task storage.
///
/// Each operation is individually transaction-safe in the backing store;
/// the engine never wraps multi-step sequences in its own transaction.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load a task with its task-asset rows.
    async fn get_task(&self, task_id: &TaskId) -> Result<Task, StoreError>;

    /// Persist a newly scheduled task.
    async fn insert_task(&self, task: Task) -> Result<(), StoreError>;

    /// Transition the task to InProgress.
    async fn mark_in_progress(&self, task_id: &TaskId) -> Result<(), StoreError>;

    /// Persist a task-level status.
    async fn update_task_status(&self, task_id: &TaskId, status: TaskStatus)
        -> Result<(), StoreError>;

    /// Persist one task-asset's status.
    async fn update_task_asset_status(
        &self,
        key: &AssetKey,
        task_id: &TaskId,
        status: TaskAssetStatus,
    ) -> Result<(), StoreError>;

    /// Record the file path a retrieve-log task expects a device to upload.
    async fn insert_expected_log_artifact(
        &self,
        task_id: &TaskId,
        key: &AssetKey,
        file_path: &str,
    ) -> Result<(), StoreError>;
}

/// One expected log artifact row.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedLogArtifact {
    /// Owning task.
    pub task_id: TaskId,
    /// Sub-asset the archive will come from.
    pub key: AssetKey,
    /// Upload destination path on the transfer server.
    pub file_path: String,
}

/// In-memory task store.
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    artifacts: RwLock<Vec<ExpectedLogArtifact>>,
}

impl InMemoryTaskStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            artifacts: RwLock::new(Vec::new()),
        }
    }

    /// All expected log artifacts recorded so far, in insertion order.
    pub async fn expected_artifacts(&self) -> Vec<ExpectedLogArtifact> {
        self.artifacts.read().await.clone()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get_task(&self, task_id: &TaskId) -> Result<Task, StoreError> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::TaskNotFound(task_id.clone()))
    }

    async fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        self.tasks.write().await.insert(task.id.clone(), task);
        Ok(())
    }

    async fn mark_in_progress(&self, task_id: &TaskId) -> Result<(), StoreError> {
        self.update_task_status(task_id, TaskStatus::InProgress)
            .await
    }

    async fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::TaskNotFound(task_id.clone()))?;
        task.status = status;
        Ok(())
    }

    async fn update_task_asset_status(
        &self,
        key: &AssetKey,
        task_id: &TaskId,
        status: TaskAssetStatus,
    ) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| StoreError::TaskNotFound(task_id.clone()))?;
        let record = task
            .assets
            .iter_mut()
            .find(|a| &a.key == key)
            .ok_or_else(|| StoreError::TaskAssetNotFound {
                task_id: task_id.clone(),
                key: key.clone(),
            })?;
        record.set_status(status);
        Ok(())
    }

    async fn insert_expected_log_artifact(
        &self,
        task_id: &TaskId,
        key: &AssetKey,
        file_path: &str,
    ) -> Result<(), StoreError> {
        self.artifacts.write().await.push(ExpectedLogArtifact {
            task_id: task_id.clone(),
            key: key.clone(),
            file_path: file_path.to_string(),
        });
        Ok(())
    }
}
