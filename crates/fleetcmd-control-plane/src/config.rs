//! Control plane configuration.

use std::env;

/// Control plane configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server bind address.
    pub bind_addr: String,

    /// Base URL of the external session manager.
    pub session_manager_url: String,

    /// File-transfer server settings for package downloads and log uploads.
    pub transfer: TransferConfig,
}

/// File-transfer server settings.
///
/// Devices pull packages from and push log archives to this server; the
/// control plane only builds the endpoints, it never transfers files
/// itself.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Transfer protocol scheme.
    pub protocol: String,

    /// Transfer server host.
    pub host: String,

    /// Transfer server port.
    pub port: u16,

    /// Transfer credentials, if the server requires them.
    pub username: Option<String>,

    /// Transfer credentials, if the server requires them.
    pub password: Option<String>,

    /// Root directory packages are served from.
    pub package_root: String,

    /// Root directory devices upload log archives into.
    pub log_root: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            session_manager_url: "http://127.0.0.1:8081".to_string(),
            transfer: TransferConfig::default(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            protocol: "ftp".to_string(),
            host: "127.0.0.1".to_string(),
            port: 21,
            username: None,
            password: None,
            package_root: "packages".to_string(),
            log_root: "logs".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let transfer_defaults = defaults.transfer;

        Self {
            bind_addr: env::var("FLEETCMD_BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_manager_url: env::var("FLEETCMD_SESSION_MANAGER_URL")
                .unwrap_or(defaults.session_manager_url),
            transfer: TransferConfig {
                protocol: env::var("FLEETCMD_TRANSFER_PROTOCOL")
                    .unwrap_or(transfer_defaults.protocol),
                host: env::var("FLEETCMD_TRANSFER_HOST").unwrap_or(transfer_defaults.host),
                port: env::var("FLEETCMD_TRANSFER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(transfer_defaults.port),
                username: env::var("FLEETCMD_TRANSFER_USERNAME").ok(),
                password: env::var("FLEETCMD_TRANSFER_PASSWORD").ok(),
                package_root: env::var("FLEETCMD_PACKAGE_ROOT")
                    .unwrap_or(transfer_defaults.package_root),
                log_root: env::var("FLEETCMD_LOG_ROOT").unwrap_or(transfer_defaults.log_root),
            },
        }
    }
}
