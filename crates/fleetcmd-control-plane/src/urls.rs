//! File-transfer endpoint builders.
//!
//! Pure and synchronous; the devices do the actual transfers.

use fleetcmd_core::{AssetKey, LogKind, Package, TaskId};

use crate::config::TransferConfig;

/// Download source for a firmware package.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferEndpoint {
    /// Transfer protocol scheme.
    pub protocol: String,
    /// Full download URL.
    pub url: String,
    /// Transfer credentials, if required.
    pub username: Option<String>,
    /// Transfer credentials, if required.
    pub password: Option<String>,
}

/// Upload destination for one sub-asset's log archive.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadEndpoint {
    /// Transfer protocol scheme.
    pub protocol: String,
    /// Full upload URL the device must push to.
    pub url: String,
    /// Transfer credentials, if required.
    pub username: Option<String>,
    /// Transfer credentials, if required.
    pub password: Option<String>,
    /// Which log archive the device must produce.
    pub kind: LogKind,
    /// Archive file name.
    pub filename: String,
}

/// Archive file name for one sub-asset's logs.
pub fn log_filename(key: &AssetKey) -> String {
    format!("{}-{}.tar.gz", key.type_id, key.asset_id)
}

/// Server-local path a retrieve-log task expects the archive to land at.
pub fn log_artifact_path(cfg: &TransferConfig, task_id: &TaskId, key: &AssetKey) -> String {
    format!("{}/{}/{}", cfg.log_root, task_id, log_filename(key))
}

/// Build the download endpoint for a package.
pub fn download_endpoint(cfg: &TransferConfig, package: &Package) -> TransferEndpoint {
    TransferEndpoint {
        protocol: cfg.protocol.clone(),
        url: format!(
            "{}://{}:{}/{}/{}",
            cfg.protocol, cfg.host, cfg.port, cfg.package_root, package.file_name
        ),
        username: cfg.username.clone(),
        password: cfg.password.clone(),
    }
}

/// Build the upload endpoint for one sub-asset of a retrieve-log task.
///
/// The destination is scoped by task id so concurrent tasks against the
/// same device cannot collide.
pub fn upload_endpoint(
    cfg: &TransferConfig,
    task_id: &TaskId,
    log_kind: LogKind,
    key: &AssetKey,
) -> UploadEndpoint {
    UploadEndpoint {
        protocol: cfg.protocol.clone(),
        url: format!(
            "{}://{}:{}/{}",
            cfg.protocol,
            cfg.host,
            cfg.port,
            log_artifact_path(cfg, task_id, key)
        ),
        username: cfg.username.clone(),
        password: cfg.password.clone(),
        kind: log_kind,
        filename: log_filename(key),
    }
}
