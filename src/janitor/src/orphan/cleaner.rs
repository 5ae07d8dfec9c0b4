//! Orphan asset deletion with batch processing.
//!
//! This module implements batch deletion of orphan assets with:
//! - Batches bounded by the store's per-call limit
//! - Dry-run mode that logs without deleting
//! - An optional pause between batches
//!
//! Batches run strictly one after another. A failing batch is logged and
//! recorded, then the next batch is attempted.

use crate::orphan::config::OrphanCleanupConfig;
use common::{AssetId, AssetStore};
use std::sync::Arc;
use std::time::Duration;

/// A delete call that failed as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// 1-based batch number.
    pub batch: usize,
    pub ids: Vec<AssetId>,
    pub error: String,
}

/// Result of a deletion operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionResult {
    /// Number of batches attempted (or logged, in dry-run mode).
    pub batches: usize,
    /// Batches whose delete call failed.
    pub failed_batches: Vec<BatchFailure>,
    /// Assets deleted. In dry-run mode, assets that would have been deleted.
    pub deleted: usize,
    /// Assets the store no longer had.
    pub not_found: usize,
    /// Assets the store reported with any other status.
    pub failed: Vec<(AssetId, String)>,
    pub dry_run: bool,
}

impl DeletionResult {
    /// Every batch succeeded and every id was deleted or already absent.
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty() && self.failed.is_empty()
    }
}

/// Orphan asset cleaner with batch processing support.
pub struct OrphanCleaner {
    batch_size: usize,
    dry_run: bool,
    batch_pause: Duration,
    store: Arc<dyn AssetStore>,
}

impl OrphanCleaner {
    /// Create a new orphan cleaner.
    ///
    /// The batch size is clamped to what the store accepts per call.
    pub fn new(config: &OrphanCleanupConfig, store: Arc<dyn AssetStore>) -> Self {
        let batch_size = config.batch_size.clamp(1, store.max_delete_batch().max(1));
        Self {
            batch_size,
            dry_run: config.dry_run,
            batch_pause: config.batch_pause,
            store,
        }
    }

    /// Delete orphan assets in batches.
    ///
    /// Partitions `orphans` into consecutive batches of at most `batch_size`
    /// ids and issues one delete call per batch. Never fails: batch errors
    /// are tracked in the result.
    pub async fn delete_orphans_batch(&self, orphans: &[AssetId]) -> DeletionResult {
        let mut result = DeletionResult {
            dry_run: self.dry_run,
            ..DeletionResult::default()
        };

        if orphans.is_empty() {
            tracing::info!("No orphan assets to delete");
            return result;
        }

        tracing::info!(
            orphans = orphans.len(),
            dry_run = self.dry_run,
            batch_size = self.batch_size,
            "Starting batch deletion of orphan assets"
        );

        let total_batches = orphans.len().div_ceil(self.batch_size);
        for (batch_idx, batch) in orphans.chunks(self.batch_size).enumerate() {
            let batch_number = batch_idx + 1;
            result.batches += 1;

            tracing::info!(
                batch = batch_number,
                total_batches,
                batch_size = batch.len(),
                dry_run = self.dry_run,
                "Processing deletion batch"
            );

            if self.dry_run {
                for id in batch {
                    tracing::info!(
                        public_id = %id,
                        batch = batch_number,
                        "[DRY-RUN] Would delete orphan asset"
                    );
                }
                result.deleted += batch.len();
                continue;
            }

            match self.store.delete_resources(batch).await {
                Ok(outcome) => {
                    for (id, status) in &outcome.other {
                        tracing::warn!(
                            public_id = %id,
                            status = %status,
                            batch = batch_number,
                            "Asset store did not delete orphan asset"
                        );
                    }
                    tracing::info!(
                        batch = batch_number,
                        settled = outcome.settled(),
                        deleted = outcome.deleted.len(),
                        not_found = outcome.not_found.len(),
                        failed = outcome.other.len(),
                        "Deleted orphan batch"
                    );

                    result.deleted += outcome.deleted.len();
                    result.not_found += outcome.not_found.len();
                    result.failed.extend(outcome.other);
                }
                Err(e) => {
                    tracing::error!(
                        batch = batch_number,
                        total_batches,
                        batch_size = batch.len(),
                        error = %e,
                        "Failed to delete orphan batch, continuing with next batch"
                    );
                    result.failed_batches.push(BatchFailure {
                        batch: batch_number,
                        ids: batch.to_vec(),
                        error: e.to_string(),
                    });
                }
            }

            if batch_number < total_batches && !self.batch_pause.is_zero() {
                tracing::debug!(pause = ?self.batch_pause, "Pausing between batches");
                tokio::time::sleep(self.batch_pause).await;
            }
        }

        tracing::info!(
            batches = result.batches,
            failed_batches = result.failed_batches.len(),
            deleted = result.deleted,
            not_found = result.not_found,
            failed = result.failed.len(),
            dry_run = self.dry_run,
            "Batch deletion complete"
        );

        result
    }
}
