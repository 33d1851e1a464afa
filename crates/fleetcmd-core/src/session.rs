//! Correlation session records.

use crate::{AssetId, TypeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Short-lived correlation identifier for one command/response exchange
/// over the message bus.
///
/// Created on demand immediately before a command is dispatched and used
/// exactly once; the engine never caches or reuses sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Device type the session addresses.
    pub type_id: TypeId,

    /// Asset the session addresses.
    pub asset_id: AssetId,

    /// Correlation identifier assigned by the session manager.
    pub session_id: Uuid,

    /// Topic prefix all of the session's messages are published under.
    pub topic_prefix: String,
}
