//! Shared application state.

use std::sync::Arc;

use crate::audit::{AuditRecorder, AuditSink};
use crate::availability::AvailabilityProvider;
use crate::bus::CommandBus;
use crate::config::TransferConfig;
use crate::dispatch::Dispatcher;
use crate::driver::TaskDriver;
use crate::session::SessionManager;
use crate::store::TaskStore;

/// Shared application state.
pub struct AppState {
    /// Task persistence, shared with the driver.
    pub store: Arc<dyn TaskStore>,

    /// Audit recorder for scheduling-time events.
    pub audit: AuditRecorder,

    /// The orchestration driver behind the dispatch endpoints.
    pub driver: TaskDriver,
}

impl AppState {
    /// Wire the collaborators together and wrap the state in an Arc.
    pub fn new(
        store: Arc<dyn TaskStore>,
        availability: Arc<dyn AvailabilityProvider>,
        sessions: Arc<dyn SessionManager>,
        bus: Arc<dyn CommandBus>,
        audit_sink: Arc<dyn AuditSink>,
        transfer: TransferConfig,
    ) -> Arc<Self> {
        let audit = AuditRecorder::new(audit_sink);
        let driver = TaskDriver::new(
            store.clone(),
            availability,
            sessions,
            Dispatcher::new(bus),
            audit.clone(),
            transfer,
        );
        Arc::new(Self {
            store,
            audit,
            driver,
        })
    }
}
