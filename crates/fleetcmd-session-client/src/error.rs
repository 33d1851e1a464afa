//! Error types for the session client.

use thiserror::Error;

/// Errors that can occur when talking to the session manager.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure reaching the session manager.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The session manager answered with a non-success status.
    #[error("session manager returned HTTP {status}")]
    Endpoint { status: u16 },

    /// The response body did not match the expected schema. Distinct from
    /// a transport error: the manager answered, but with something the
    /// engine cannot act on.
    #[error("invalid session manager response: {0}")]
    InvalidResponse(String),
}
