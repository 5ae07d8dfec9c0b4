//! Orphan identification by set difference.

use common::AssetId;
use std::collections::HashSet;

/// Stored ids that nothing references, in stored order.
pub fn find_orphans(stored: &[AssetId], referenced: &HashSet<AssetId>) -> Vec<AssetId> {
    stored
        .iter()
        .filter(|id| !referenced.contains(*id))
        .cloned()
        .collect()
}
