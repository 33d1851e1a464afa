//! Availability-snapshot entries describing device topology and reachability.

use crate::{AssetKey, AvailabilityState, TypeId};
use serde::{Deserialize, Serialize};

/// One entry in an availability snapshot.
///
/// A root entry represents a composite physical device; its `sub_assets`
/// are the device's addressable internal components. Snapshots are
/// point-in-time and immutable for the duration of one task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetStatus {
    /// Compound identity of the asset.
    pub key: AssetKey,

    /// Reachability at snapshot time.
    pub state: AvailabilityState,

    /// Addressable sub-components, empty for leaf entries.
    pub sub_assets: Vec<AssetStatus>,
}

impl AssetStatus {
    /// Create a leaf entry with no sub-components.
    pub fn leaf(key: AssetKey, state: AvailabilityState) -> Self {
        Self {
            key,
            state,
            sub_assets: Vec::new(),
        }
    }

    /// Synthesized entry for an asset the availability collaborator could
    /// not find: `Missing` with no sub-components. Part of the snapshot
    /// contract, not an error.
    pub fn missing(key: AssetKey) -> Self {
        Self::leaf(key, AvailabilityState::Missing)
    }

    /// First sub-component of the given device type, if any.
    pub fn find_sub_asset(&self, type_id: &TypeId) -> Option<&AssetStatus> {
        self.sub_assets.iter().find(|s| &s.key.type_id == type_id)
    }
}
