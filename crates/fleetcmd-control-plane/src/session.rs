//! Session manager port.

use async_trait::async_trait;
use thiserror::Error;

use fleetcmd_core::{AssetId, Session, TypeId};
use fleetcmd_session_client::{ClientError, SessionClient};

/// Session manager errors. Both kinds propagate out of the per-asset
/// pipeline; neither is recovered locally.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session manager could not be reached or refused the request.
    #[error("session manager unavailable: {0}")]
    Transport(String),

    /// The session manager answered with a body the engine cannot decode.
    #[error("invalid session manager response: {0}")]
    InvalidResponse(String),
}

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Transport(e) => Self::Transport(e.to_string()),
            ClientError::Endpoint { status } => {
                Self::Transport(format!("HTTP {}", status))
            }
            ClientError::InvalidResponse(msg) => Self::InvalidResponse(msg),
        }
    }
}

/// Opens correlation sessions against the external session manager.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Open a session for one asset, immediately before dispatching its
    /// command.
    async fn open(&self, type_id: &TypeId, asset_id: &AssetId) -> Result<Session, SessionError>;
}

#[async_trait]
impl SessionManager for SessionClient {
    async fn open(&self, type_id: &TypeId, asset_id: &AssetId) -> Result<Session, SessionError> {
        Ok(self.create_session(type_id, asset_id).await?)
    }
}
