//! Command dispatch: wire payloads, topic construction, retained publish.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use fleetcmd_core::{Package, Session, TaskId};

use crate::bus::{BusError, CommandBus};
use crate::urls::{TransferEndpoint, UploadEndpoint};

/// Command name of the package-delivery operation.
pub const DOWNLOAD_PACKAGE_COMMAND: &str = "DownloadPackage";

/// Command name of the log-retrieval operation.
pub const UPLOAD_LOGS_COMMAND: &str = "UploadLogs";

/// Topic a command is published to within a session.
pub fn command_topic(topic_prefix: &str, command: &str) -> String {
    format!("{}/command/{}", topic_prefix, command)
}

/// Dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("failed to encode command payload: {0}")]
    Encode(String),
}

/// Correlation metadata carried on every command payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandMeta<'a> {
    type_id: &'a str,
    asset_id: &'a str,
    session_id: Uuid,
    /// Equal to the owning task id; lets the response handler find the
    /// task without a session lookup.
    message_id: &'a str,
}

impl<'a> CommandMeta<'a> {
    fn new(session: &'a Session, task_id: &'a TaskId) -> Self {
        Self {
            type_id: session.type_id.as_str(),
            asset_id: session.asset_id.as_str(),
            session_id: session.session_id,
            message_id: task_id.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DownloadPackageCommand<'a> {
    #[serde(flatten)]
    meta: CommandMeta<'a>,
    package_id: &'a str,
    protocol: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadLogsCommand<'a> {
    #[serde(flatten)]
    meta: CommandMeta<'a>,
    protocol: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(rename = "type")]
    kind: &'a str,
    filename: &'a str,
}

/// Publishes device commands over the message bus.
#[derive(Clone)]
pub struct Dispatcher {
    bus: Arc<dyn CommandBus>,
}

impl Dispatcher {
    /// Create a dispatcher over a bus.
    pub fn new(bus: Arc<dyn CommandBus>) -> Self {
        Self { bus }
    }

    /// Publish one retained package-download command.
    pub async fn dispatch_download(
        &self,
        session: &Session,
        task_id: &TaskId,
        package: &Package,
        endpoint: &TransferEndpoint,
    ) -> Result<(), DispatchError> {
        let command = DownloadPackageCommand {
            meta: CommandMeta::new(session, task_id),
            package_id: &package.package_id,
            protocol: &endpoint.protocol,
            url: &endpoint.url,
            username: endpoint.username.as_deref(),
            password: endpoint.password.as_deref(),
        };
        let payload =
            serde_json::to_value(&command).map_err(|e| DispatchError::Encode(e.to_string()))?;
        let topic = command_topic(&session.topic_prefix, DOWNLOAD_PACKAGE_COMMAND);

        self.bus.publish_retained(&topic, payload).await?;
        info!(
            task_id = %task_id,
            type_id = %session.type_id,
            asset_id = %session.asset_id,
            session_id = %session.session_id,
            package_id = %package.package_id,
            "Download command dispatched"
        );
        Ok(())
    }

    /// Publish one retained log-upload command for a single sub-asset.
    pub async fn dispatch_log_upload(
        &self,
        session: &Session,
        task_id: &TaskId,
        endpoint: &UploadEndpoint,
    ) -> Result<(), DispatchError> {
        let command = UploadLogsCommand {
            meta: CommandMeta::new(session, task_id),
            protocol: &endpoint.protocol,
            url: &endpoint.url,
            username: endpoint.username.as_deref(),
            password: endpoint.password.as_deref(),
            kind: endpoint.kind.as_str(),
            filename: &endpoint.filename,
        };
        let payload =
            serde_json::to_value(&command).map_err(|e| DispatchError::Encode(e.to_string()))?;
        let topic = command_topic(&session.topic_prefix, UPLOAD_LOGS_COMMAND);

        self.bus.publish_retained(&topic, payload).await?;
        info!(
            task_id = %task_id,
            type_id = %session.type_id,
            asset_id = %session.asset_id,
            session_id = %session.session_id,
            filename = %endpoint.filename,
            "Upload command dispatched"
        );
        Ok(())
    }
}
