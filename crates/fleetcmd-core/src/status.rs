//! Status enums for Tasks, TaskAssets, and device availability.

use serde::{Deserialize, Serialize};

/// Status of a Task in the control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task created and waiting for its dispatch trigger.
    #[default]
    Scheduled,
    /// Task has been started; per-asset commands are issued or in flight.
    InProgress,
    /// All task-assets finished successfully.
    Complete,
    /// At least one task-asset finished in an error state.
    Failure,
}

impl TaskStatus {
    /// Returns true if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failure)
    }
}

/// Status of one asset's progress within a Task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskAssetStatus {
    /// Created alongside the task, no command issued yet.
    #[default]
    Scheduled,
    /// Command dispatched, awaiting the device's response.
    InProgress,
    /// Device reported successful completion.
    Complete,
    /// Device was not reachable at dispatch time.
    ConnectionError,
    /// Device reported a failure executing the command.
    DeviceError,
    /// The task references an asset topology that does not exist.
    SystemError,
}

impl TaskAssetStatus {
    /// Returns true if this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::ConnectionError | Self::DeviceError | Self::SystemError
        )
    }

    /// Returns true if this status is a terminal error.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError | Self::DeviceError | Self::SystemError
        )
    }
}

/// Reachability of a device (or sub-component) in an availability snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityState {
    /// Device is connected and healthy.
    Good,
    /// Device is connected but reporting an internal error.
    Error,
    /// Device is not currently reachable.
    Missing,
    /// Device is connected; health not yet assessed.
    Online,
}

impl AvailabilityState {
    /// Returns true if a command can be addressed to the device right now.
    pub fn is_reachable(&self) -> bool {
        !matches!(self, Self::Missing)
    }
}
