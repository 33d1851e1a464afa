//! Per-operation orchestration drivers.
//!
//! One entry point per operation type. Each task run is a single logical
//! thread of control: task-assets are processed strictly in order, and a
//! retrieve-log task's sub-assets likewise. One asset's failure never
//! aborts the others; only the start guard and the availability read can
//! fail the whole request.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use fleetcmd_core::{
    AssetKey, AssetStatus, ErrorKind, LogKind, Package, Task, TaskAssetStatus, TaskId, TaskPayload,
    TaskStatus, TypeId,
};

use crate::aggregate;
use crate::audit::AuditRecorder;
use crate::availability::{self, AvailabilityError, AvailabilityProvider};
use crate::config::TransferConfig;
use crate::dispatch::Dispatcher;
use crate::resolver;
use crate::session::SessionManager;
use crate::store::{StoreError, TaskStore};
use crate::urls;

/// Driver errors. Only failures of the task-level request surface here;
/// per-asset failures are captured in task-asset rows.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task '{task_id}' is not a {expected} task")]
    WrongTaskKind {
        task_id: TaskId,
        expected: &'static str,
    },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Availability(#[from] AvailabilityError),
}

impl From<StoreError> for DriverError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TaskNotFound(id) => Self::TaskNotFound(id),
            other => Self::Store(other),
        }
    }
}

/// Orchestrates one task run end to end.
pub struct TaskDriver {
    store: Arc<dyn TaskStore>,
    availability: Arc<dyn AvailabilityProvider>,
    sessions: Arc<dyn SessionManager>,
    dispatcher: Dispatcher,
    audit: AuditRecorder,
    transfer: TransferConfig,
}

impl TaskDriver {
    /// Create a driver over its collaborators.
    pub fn new(
        store: Arc<dyn TaskStore>,
        availability: Arc<dyn AvailabilityProvider>,
        sessions: Arc<dyn SessionManager>,
        dispatcher: Dispatcher,
        audit: AuditRecorder,
        transfer: TransferConfig,
    ) -> Self {
        Self {
            store,
            availability,
            sessions,
            dispatcher,
            audit,
            transfer,
        }
    }

    /// Run a download-package task.
    pub async fn run_download_package(&self, task_id: &TaskId) -> Result<(), DriverError> {
        let Some(task) = self.start(task_id, "download-package").await? else {
            return Ok(());
        };
        let TaskPayload::DownloadPackage { package } = &task.payload else {
            // start() already verified the kind
            return Ok(());
        };

        let snapshot = self.snapshot(&task).await?;
        for record in &task.assets {
            self.process_download_asset(task_id, package, &record.key, &snapshot)
                .await;
        }

        aggregate::finalize(self.store.as_ref(), task_id).await?;
        Ok(())
    }

    /// Run a retrieve-log task.
    pub async fn run_retrieve_log(&self, task_id: &TaskId) -> Result<(), DriverError> {
        let Some(task) = self.start(task_id, "retrieve-log").await? else {
            return Ok(());
        };
        let TaskPayload::RetrieveLog { log_kind } = &task.payload else {
            return Ok(());
        };

        let snapshot = self.snapshot(&task).await?;
        for record in &task.assets {
            self.process_log_asset(task_id, *log_kind, &record.key, &snapshot)
                .await;
        }

        aggregate::finalize(self.store.as_ref(), task_id).await?;
        Ok(())
    }

    /// Load the task, verify its kind, and apply the start-once guard.
    ///
    /// Returns `None` when the task was already started: duplicate
    /// triggers are a no-op success and perform no per-asset work.
    async fn start(
        &self,
        task_id: &TaskId,
        expected: &'static str,
    ) -> Result<Option<Task>, DriverError> {
        let task = self.store.get_task(task_id).await?;

        let kind_matches = match (&task.payload, expected) {
            (TaskPayload::DownloadPackage { .. }, "download-package") => true,
            (TaskPayload::RetrieveLog { .. }, "retrieve-log") => true,
            _ => false,
        };
        if !kind_matches {
            return Err(DriverError::WrongTaskKind {
                task_id: task_id.clone(),
                expected,
            });
        }

        if task.status != TaskStatus::Scheduled {
            info!(task_id = %task_id, status = ?task.status, "Task already started; nothing to do");
            return Ok(None);
        }

        self.store.mark_in_progress(task_id).await?;
        info!(task_id = %task_id, operation = expected, assets = task.assets.len(), "Task started");
        Ok(Some(task))
    }

    /// One availability snapshot for the whole run, missing roots
    /// synthesized.
    async fn snapshot(&self, task: &Task) -> Result<Vec<AssetStatus>, DriverError> {
        let keys: Vec<AssetKey> = task.assets.iter().map(|a| a.key.clone()).collect();
        let found = self.availability.get_many(&keys).await?;
        Ok(availability::fill_missing(&keys, found))
    }

    /// Full pipeline for one asset of a download-package task.
    async fn process_download_asset(
        &self,
        task_id: &TaskId,
        package: &Package,
        key: &AssetKey,
        snapshot: &[AssetStatus],
    ) {
        let Some(target) = self
            .resolve_target(task_id, key, &package.target_type_id, snapshot)
            .await
        else {
            return;
        };

        let session = match self
            .sessions
            .open(&target.key.type_id, &target.key.asset_id)
            .await
        {
            Ok(session) => session,
            Err(e) => {
                error!(task_id = %task_id, key = %key, error = %e, "Session open failed; skipping asset");
                return;
            }
        };

        let endpoint = urls::download_endpoint(&self.transfer, package);
        if let Err(e) = self
            .dispatcher
            .dispatch_download(&session, task_id, package, &endpoint)
            .await
        {
            error!(task_id = %task_id, key = %key, error = %e, "Dispatch failed; skipping asset");
            return;
        }

        self.mark_dispatched(task_id, key).await;
    }

    /// Full pipeline for one asset of a retrieve-log task: fan out over
    /// every sub-component of the root, sequentially. The first sub-asset
    /// failure stops the remaining ones and suppresses the execute audit.
    async fn process_log_asset(
        &self,
        task_id: &TaskId,
        log_kind: LogKind,
        key: &AssetKey,
        snapshot: &[AssetStatus],
    ) {
        // The desired type is the task-asset's own: "give me this device".
        let Some(root) = self.resolve_target(task_id, key, &key.type_id, snapshot).await else {
            return;
        };

        for sub in &root.sub_assets {
            let session = match self
                .sessions
                .open(&sub.key.type_id, &sub.key.asset_id)
                .await
            {
                Ok(session) => session,
                Err(e) => {
                    error!(task_id = %task_id, key = %key, sub = %sub.key, error = %e, "Session open failed; aborting asset");
                    return;
                }
            };

            let endpoint = urls::upload_endpoint(&self.transfer, task_id, log_kind, &sub.key);
            let file_path = urls::log_artifact_path(&self.transfer, task_id, &sub.key);
            if let Err(e) = self
                .store
                .insert_expected_log_artifact(task_id, &sub.key, &file_path)
                .await
            {
                error!(task_id = %task_id, key = %key, sub = %sub.key, error = %e, "Failed to record expected artifact; aborting asset");
                return;
            }

            if let Err(e) = self
                .dispatcher
                .dispatch_log_upload(&session, task_id, &endpoint)
                .await
            {
                error!(task_id = %task_id, key = %key, sub = %sub.key, error = %e, "Dispatch failed; aborting asset");
                return;
            }
        }

        self.mark_dispatched(task_id, key).await;
    }

    /// Resolve and classify. Returns the dispatch target, or `None` after
    /// the asset has been settled (classified failure) or skipped
    /// (topology integrity violation).
    async fn resolve_target(
        &self,
        task_id: &TaskId,
        key: &AssetKey,
        desired_type: &TypeId,
        snapshot: &[AssetStatus],
    ) -> Option<AssetStatus> {
        match resolver::resolve(key, desired_type, snapshot) {
            Err(e) => {
                // Not attributable to a single task-asset; leave its row alone.
                error!(task_id = %task_id, key = %key, error = %e, "Topology integrity violation; skipping asset");
                None
            }
            Ok(None) => {
                warn!(task_id = %task_id, key = %key, desired_type = %desired_type, "Asset topology not found");
                self.settle_failure(task_id, key, TaskAssetStatus::SystemError, ErrorKind::System)
                    .await;
                None
            }
            Ok(Some(found)) if !found.state.is_reachable() => {
                warn!(task_id = %task_id, key = %key, target = %found.key, "Device not reachable");
                self.settle_failure(
                    task_id,
                    key,
                    TaskAssetStatus::ConnectionError,
                    ErrorKind::Connection,
                )
                .await;
                None
            }
            Ok(Some(found)) => Some(found.clone()),
        }
    }

    /// Write a classified terminal status and its fail audit event.
    async fn settle_failure(
        &self,
        task_id: &TaskId,
        key: &AssetKey,
        status: TaskAssetStatus,
        kind: ErrorKind,
    ) {
        if let Err(e) = self
            .store
            .update_task_asset_status(key, task_id, status)
            .await
        {
            error!(task_id = %task_id, key = %key, error = %e, "Failed to persist task-asset status");
        }
        self.audit.record_fail(task_id, key, kind).await;
    }

    /// Mark the task-asset dispatched and write its execute audit event.
    async fn mark_dispatched(&self, task_id: &TaskId, key: &AssetKey) {
        if let Err(e) = self
            .store
            .update_task_asset_status(key, task_id, TaskAssetStatus::InProgress)
            .await
        {
            error!(task_id = %task_id, key = %key, error = %e, "Failed to persist task-asset status");
            return;
        }
        self.audit.record_execute(task_id, key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditRecorder, InMemoryAuditLog};
    use crate::availability::InMemoryAvailability;
    use crate::bus::InMemoryCommandBus;
    use crate::session::SessionError;
    use crate::store::InMemoryTaskStore;
    use async_trait::async_trait;
    use fleetcmd_core::{AssetId, AuditMilestone, AvailabilityState, Session};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    /// Session manager stub that counts opens and can fail from the Nth
    /// call on.
    struct StubSessions {
        opened: Mutex<Vec<AssetKey>>,
        fail_from: Option<usize>,
    }

    impl StubSessions {
        fn new() -> Self {
            Self {
                opened: Mutex::new(Vec::new()),
                fail_from: None,
            }
        }

        fn failing_from(call: usize) -> Self {
            Self {
                opened: Mutex::new(Vec::new()),
                fail_from: Some(call),
            }
        }

        async fn open_count(&self) -> usize {
            self.opened.lock().await.len()
        }
    }

    #[async_trait]
    impl SessionManager for StubSessions {
        async fn open(
            &self,
            type_id: &TypeId,
            asset_id: &AssetId,
        ) -> Result<Session, SessionError> {
            let mut opened = self.opened.lock().await;
            let call = opened.len();
            opened.push(AssetKey::new(type_id.clone(), asset_id.clone()));
            if matches!(self.fail_from, Some(n) if call >= n) {
                return Err(SessionError::Transport("connection refused".to_string()));
            }
            Ok(Session {
                type_id: type_id.clone(),
                asset_id: asset_id.clone(),
                session_id: Uuid::new_v4(),
                topic_prefix: format!("fleet/{}/{}", type_id, asset_id),
            })
        }
    }

    struct Harness {
        store: Arc<InMemoryTaskStore>,
        availability: Arc<InMemoryAvailability>,
        sessions: Arc<StubSessions>,
        bus: Arc<InMemoryCommandBus>,
        audit_log: Arc<InMemoryAuditLog>,
        driver: TaskDriver,
    }

    fn harness_with_sessions(sessions: StubSessions) -> Harness {
        let store = Arc::new(InMemoryTaskStore::new());
        let availability = Arc::new(InMemoryAvailability::new());
        let sessions = Arc::new(sessions);
        let bus = Arc::new(InMemoryCommandBus::new());
        let audit_log = Arc::new(InMemoryAuditLog::new());

        let driver = TaskDriver::new(
            store.clone(),
            availability.clone(),
            sessions.clone(),
            Dispatcher::new(bus.clone()),
            AuditRecorder::new(audit_log.clone()),
            TransferConfig::default(),
        );

        Harness {
            store,
            availability,
            sessions,
            bus,
            audit_log,
            driver,
        }
    }

    fn harness() -> Harness {
        harness_with_sessions(StubSessions::new())
    }

    fn package() -> Package {
        Package {
            package_id: "fw-2024-11".to_string(),
            file_name: "fw-2024-11.pkg".to_string(),
            target_type_id: "BV100".into(),
            version: None,
        }
    }

    fn download_task(keys: &[AssetKey]) -> Task {
        let mut task = Task::new(TaskPayload::DownloadPackage { package: package() });
        for key in keys {
            task.add_asset(key.clone());
        }
        task
    }

    fn log_task(keys: &[AssetKey]) -> Task {
        let mut task = Task::new(TaskPayload::RetrieveLog {
            log_kind: LogKind::Diagnostic,
        });
        for key in keys {
            task.add_asset(key.clone());
        }
        task
    }

    fn root_with_subs(key: &AssetKey, sub_keys: &[AssetKey]) -> AssetStatus {
        AssetStatus {
            key: key.clone(),
            state: AvailabilityState::Good,
            sub_assets: sub_keys
                .iter()
                .map(|k| AssetStatus::leaf(k.clone(), AvailabilityState::Good))
                .collect(),
        }
    }

    async fn milestones(h: &Harness) -> Vec<AuditMilestone> {
        h.audit_log
            .events()
            .await
            .iter()
            .map(|e| e.milestone)
            .collect()
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let h = harness();
        let key = AssetKey::new("RZ100", "1");
        let task = download_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        h.availability
            .insert(root_with_subs(&key, &[AssetKey::new("BV100", "1-1")]))
            .await;

        h.driver.run_download_package(&task_id).await.unwrap();
        let after_first = h.bus.published().await.len();
        assert_eq!(after_first, 1);

        // Duplicate trigger: no-op success, no further per-asset work.
        h.driver.run_download_package(&task_id).await.unwrap();
        assert_eq!(h.bus.published().await.len(), after_first);
        assert_eq!(h.sessions.open_count().await, 1);
    }

    #[tokio::test]
    async fn test_wrong_kind_rejected_before_start() {
        let h = harness();
        let key = AssetKey::new("RZ100", "1");
        let task = log_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();

        let err = h.driver.run_download_package(&task_id).await.unwrap_err();
        assert!(matches!(err, DriverError::WrongTaskKind { .. }));

        // The guard fired before the start transition.
        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_unknown_task_is_not_found() {
        let h = harness();
        let err = h
            .driver
            .run_download_package(&TaskId::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::TaskNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_topology_is_system_error_without_session() {
        let h = harness();
        let key = AssetKey::new("RZ100", "1");
        let task = download_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        // Root exists and is reachable, but has no BV100 sub-component.
        h.availability.insert(root_with_subs(&key, &[])).await;

        h.driver.run_download_package(&task_id).await.unwrap();

        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::SystemError);
        assert_eq!(h.sessions.open_count().await, 0);
        assert!(h.bus.published().await.is_empty());

        let events = h.audit_log.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].milestone, AuditMilestone::Fail);
        assert_eq!(events[0].error, Some(ErrorKind::System));

        // No Scheduled/InProgress assets remain: the task settles.
        assert_eq!(task.status, TaskStatus::Failure);
    }

    #[tokio::test]
    async fn test_offline_device_is_connection_error_without_session() {
        let h = harness();
        let key = AssetKey::new("RZ100", "1");
        let task = log_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        // No availability entry at all: the snapshot synthesizes a
        // Missing root.

        h.driver.run_retrieve_log(&task_id).await.unwrap();

        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::ConnectionError);
        assert_eq!(h.sessions.open_count().await, 0);
        assert!(h.bus.published().await.is_empty());

        let events = h.audit_log.events().await;
        assert_eq!(events[0].error, Some(ErrorKind::Connection));
    }

    #[tokio::test]
    async fn test_download_dispatches_to_resolved_sub_asset() {
        let h = harness();
        let key = AssetKey::new("RZ100", "1");
        let sub_key = AssetKey::new("BV100", "1-1");
        let task = download_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        h.availability
            .insert(root_with_subs(&key, std::slice::from_ref(&sub_key)))
            .await;

        h.driver.run_download_package(&task_id).await.unwrap();

        // Session and command address the resolved sub-component.
        assert_eq!(
            h.sessions.opened.lock().await.as_slice(),
            std::slice::from_ref(&sub_key)
        );
        let published = h.bus.published().await;
        assert_eq!(published.len(), 1);
        let (topic, payload) = &published[0];
        assert_eq!(topic, "fleet/BV100/1-1/command/DownloadPackage");
        assert_eq!(payload["messageId"], task_id.as_str());

        // The task-asset row tracks the addressed device, not the module.
        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::InProgress);
        assert!(task.assets[0].started_at.is_some());
        assert_eq!(milestones(&h).await, vec![AuditMilestone::Execute]);

        // Dispatch succeeded for every asset: the task stays InProgress
        // until the devices respond.
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_one_asset_failure_never_aborts_the_rest() {
        let h = harness();
        let broken = AssetKey::new("RZ100", "1");
        let good = AssetKey::new("RZ100", "2");
        let sub_key = AssetKey::new("BV100", "2-1");
        let task = download_task(&[broken.clone(), good.clone()]);
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        h.availability.insert(root_with_subs(&broken, &[])).await;
        h.availability
            .insert(root_with_subs(&good, std::slice::from_ref(&sub_key)))
            .await;

        h.driver.run_download_package(&task_id).await.unwrap();

        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::SystemError);
        assert_eq!(task.assets[1].status, TaskAssetStatus::InProgress);
        assert_eq!(h.bus.published().await.len(), 1);
    }

    #[tokio::test]
    async fn test_session_failure_skips_asset_without_status_write() {
        let h = harness_with_sessions(StubSessions::failing_from(0));
        let key = AssetKey::new("RZ100", "1");
        let sub_key = AssetKey::new("BV100", "1-1");
        let task = download_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        h.availability
            .insert(root_with_subs(&key, std::slice::from_ref(&sub_key)))
            .await;

        h.driver.run_download_package(&task_id).await.unwrap();

        // Remaining steps skipped; classification is left to the layer
        // that owns session failures.
        assert!(h.bus.published().await.is_empty());
        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::Scheduled);
        assert!(milestones(&h).await.is_empty());
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_log_fan_out_covers_every_sub_asset_in_order() {
        let h = harness();
        let key = AssetKey::new("RZ100", "1");
        let subs = vec![
            AssetKey::new("BV100", "1-1"),
            AssetKey::new("RC200", "1-2"),
            AssetKey::new("PR300", "1-3"),
        ];
        let task = log_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        h.availability.insert(root_with_subs(&key, &subs)).await;

        h.driver.run_retrieve_log(&task_id).await.unwrap();

        assert_eq!(h.sessions.opened.lock().await.as_slice(), &subs[..]);
        let published = h.bus.published().await;
        assert_eq!(published.len(), 3);
        assert_eq!(published[0].0, "fleet/BV100/1-1/command/UploadLogs");
        assert_eq!(published[1].1["filename"], "RC200-1-2.tar.gz");
        assert_eq!(published[2].1["type"], "diagnostic");

        let artifacts = h.store.expected_artifacts().await;
        assert_eq!(artifacts.len(), 3);
        assert_eq!(
            artifacts[0].file_path,
            format!("logs/{}/BV100-1-1.tar.gz", task_id)
        );

        // Execute audit only after all sub-assets succeeded.
        assert_eq!(milestones(&h).await, vec![AuditMilestone::Execute]);
        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::InProgress);
    }

    #[tokio::test]
    async fn test_log_fan_out_stops_at_first_failure() {
        // Second session open fails: third sub-asset never attempted.
        let h = harness_with_sessions(StubSessions::failing_from(1));
        let key = AssetKey::new("RZ100", "1");
        let subs = vec![
            AssetKey::new("BV100", "1-1"),
            AssetKey::new("RC200", "1-2"),
            AssetKey::new("PR300", "1-3"),
        ];
        let task = log_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();
        h.availability.insert(root_with_subs(&key, &subs)).await;

        h.driver.run_retrieve_log(&task_id).await.unwrap();

        assert_eq!(h.sessions.open_count().await, 2);
        assert_eq!(h.bus.published().await.len(), 1);
        // No execute audit for the task-asset.
        assert!(milestones(&h).await.is_empty());
        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_duplicate_root_skips_asset_without_status_write() {
        let h = harness();
        let key = AssetKey::new("RZ100", "1");
        let task = log_task(std::slice::from_ref(&key));
        let task_id = task.id.clone();
        h.store.insert_task(task).await.unwrap();

        // The in-memory table cannot hold duplicates, so drive the
        // resolver path directly through a handmade snapshot.
        let snapshot = vec![
            root_with_subs(&key, &[AssetKey::new("BV100", "1-1")]),
            AssetStatus::leaf(key.clone(), AvailabilityState::Good),
        ];
        h.driver
            .process_log_asset(&task_id, LogKind::Diagnostic, &key, &snapshot)
            .await;

        assert_eq!(h.sessions.open_count().await, 0);
        let task = h.store.get_task(&task_id).await.unwrap();
        assert_eq!(task.assets[0].status, TaskAssetStatus::Scheduled);
        assert!(milestones(&h).await.is_empty());
    }
}
