//! Run summary for one cleanup job.

use crate::orphan::{DeletionResult, ReferenceSource};
use common::AssetId;
use std::time::Duration;

/// What one cleanup run found and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupSummary {
    /// Distinct ids referenced by documents.
    pub referenced: usize,
    /// References that yielded no id.
    pub malformed_references: usize,
    /// Sources that could not be read and contributed nothing.
    pub failed_sources: Vec<ReferenceSource>,
    /// Distinct ids stored in the folder.
    pub stored: usize,
    pub search_pages: usize,
    /// Stored ids nothing references, in listing order.
    pub orphans: Vec<AssetId>,
    pub deletion: DeletionResult,
    pub duration: Duration,
}

impl CleanupSummary {
    pub fn dry_run(&self) -> bool {
        self.deletion.dry_run
    }

    /// Every source was read and every orphan was deleted or already absent.
    pub fn is_clean(&self) -> bool {
        self.failed_sources.is_empty() && self.deletion.is_complete()
    }

    /// Log the summary.
    pub fn log(&self) {
        let mode = if self.dry_run() { " [DRY-RUN]" } else { "" };
        tracing::info!("=== Orphan Cleanup Summary{mode} ===");
        tracing::info!(
            "References: {} referenced, {} malformed, {} source(s) failed",
            self.referenced,
            self.malformed_references,
            self.failed_sources.len()
        );
        tracing::info!(
            "Assets: {} stored across {} page(s), {} orphaned",
            self.stored,
            self.search_pages,
            self.orphans.len()
        );
        tracing::info!(
            "Deletion: {} batch(es), {} failed; {} deleted, {} already absent, {} rejected",
            self.deletion.batches,
            self.deletion.failed_batches.len(),
            self.deletion.deleted,
            self.deletion.not_found,
            self.deletion.failed.len()
        );
        tracing::info!("Duration: {:.2}s", self.duration.as_secs_f64());

        for source in &self.failed_sources {
            tracing::warn!(source = %source, "Source was not read, its assets were unprotected");
        }
        for failure in &self.deletion.failed_batches {
            tracing::warn!(
                batch = failure.batch,
                ids = failure.ids.len(),
                error = %failure.error,
                "Batch was not deleted"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orphan::BatchFailure;

    fn summary() -> CleanupSummary {
        CleanupSummary {
            referenced: 2,
            malformed_references: 0,
            failed_sources: Vec::new(),
            stored: 4,
            search_pages: 1,
            orphans: vec![AssetId::from("c"), AssetId::from("d")],
            deletion: DeletionResult {
                batches: 1,
                deleted: 2,
                ..DeletionResult::default()
            },
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_clean_run() {
        let summary = summary();
        assert!(summary.is_clean());
        assert!(!summary.dry_run());
        summary.log();
    }

    #[test]
    fn test_failed_source_or_batch_is_not_clean() {
        let mut with_failed_source = summary();
        with_failed_source.failed_sources.push(ReferenceSource::Logo);
        assert!(!with_failed_source.is_clean());

        let mut with_failed_batch = summary();
        with_failed_batch.deletion.failed_batches.push(BatchFailure {
            batch: 1,
            ids: vec![AssetId::from("c")],
            error: "unavailable".to_string(),
        });
        assert!(!with_failed_batch.is_clean());
        with_failed_batch.log();
    }
}
