//! Failure-classification taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classified failure kinds, carried on fail audit events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Topology/configuration inconsistency: the referenced asset does
    /// not exist in the snapshot.
    System,
    /// The device is not currently reachable.
    Connection,
    /// The device reported a failure executing the command.
    Device,
    /// Unexpected collaborator failure (session creation, publish, audit
    /// write).
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::System => "system",
            Self::Connection => "connection",
            Self::Device => "device",
            Self::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}
