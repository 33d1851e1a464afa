//! HTTP client for the session manager's create-session endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use fleetcmd_core::{AssetId, Session, TypeId};

use crate::error::ClientError;

/// Path of the create-session endpoint, relative to the base URL.
const SESSIONS_PATH: &str = "/session-manager/sessions";

/// HTTP client for the session manager.
pub struct SessionClient {
    inner: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    type_id: &'a str,
    asset_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateSessionResponse {
    session_id: Uuid,
    topic_prefix: String,
}

impl SessionClient {
    /// Create a new session client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open a correlation session for one asset.
    ///
    /// The response is decoded into a typed record before it reaches the
    /// engine; a body that fails to decode is an [`ClientError::InvalidResponse`],
    /// not a transport error.
    pub async fn create_session(
        &self,
        type_id: &TypeId,
        asset_id: &AssetId,
    ) -> Result<Session, ClientError> {
        let url = format!("{}{}", self.base_url, SESSIONS_PATH);
        debug!(url = %url, type_id = %type_id, asset_id = %asset_id, "Creating session");

        let response = self
            .inner
            .post(&url)
            .json(&CreateSessionRequest {
                type_id: type_id.as_str(),
                asset_id: asset_id.as_str(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Endpoint {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let decoded: CreateSessionResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        Ok(Session {
            type_id: type_id.clone(),
            asset_id: asset_id.clone(),
            session_id: decoded.session_id,
            topic_prefix: decoded.topic_prefix,
        })
    }
}
