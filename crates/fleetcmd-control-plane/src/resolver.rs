//! Asset topology resolution.

use thiserror::Error;

use fleetcmd_core::{AssetKey, AssetStatus, TypeId};

/// Topology resolution errors.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// More than one root entry for one asset identity. A data-integrity
    /// violation in the snapshot, not attributable to any single
    /// task-asset.
    #[error("more than one topology root for {key}")]
    DuplicateRoot { key: AssetKey },
}

/// Find the concrete device (or sub-component) a command must address.
///
/// Locates the root entry whose identity equals `key`. If the root's own
/// type matches `desired_type` the root itself is the result ("give me
/// this device"); otherwise the first sub-component of the desired type
/// is ("give me this device's X module"). `None` means the task references
/// topology that does not exist.
pub fn resolve<'a>(
    key: &AssetKey,
    desired_type: &TypeId,
    snapshot: &'a [AssetStatus],
) -> Result<Option<&'a AssetStatus>, ResolveError> {
    let mut roots = snapshot.iter().filter(|entry| &entry.key == key);

    let root = match roots.next() {
        Some(root) => root,
        None => return Ok(None),
    };
    if roots.next().is_some() {
        return Err(ResolveError::DuplicateRoot { key: key.clone() });
    }

    if &root.key.type_id == desired_type {
        return Ok(Some(root));
    }
    Ok(root.find_sub_asset(desired_type))
}
