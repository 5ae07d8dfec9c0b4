//! One cleanup run: collect, enumerate, reconcile, delete.
//!
//! The phases never interleave. Collection is complete before enumeration
//! starts, and nothing is deleted until the full listing has been
//! reconciled.

use crate::metrics::CleanupSummary;
use crate::orphan::{
    AssetEnumerator, OrphanCleaner, OrphanCleanupConfig, ReferenceCollector, find_orphans,
};
use common::{AssetStore, DocumentStore};
use std::sync::Arc;
use std::time::Instant;

/// Errors that end a run before any asset is deleted.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("Invalid cleanup configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("Asset enumeration failed, no assets were deleted: {0:#}")]
    Enumeration(anyhow::Error),
}

/// Orphan asset cleanup job.
pub struct CleanupJob {
    config: OrphanCleanupConfig,
    collector: ReferenceCollector,
    enumerator: AssetEnumerator,
    cleaner: OrphanCleaner,
}

impl CleanupJob {
    pub fn new(
        config: OrphanCleanupConfig,
        documents: Arc<dyn DocumentStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        let collector = ReferenceCollector::new(config.sources.clone(), documents);
        let enumerator = AssetEnumerator::new(
            config.search_expression(),
            config.search_page_size,
            assets.clone(),
        );
        let cleaner = OrphanCleaner::new(&config, assets);
        Self {
            config,
            collector,
            enumerator,
            cleaner,
        }
    }

    /// Run the job once.
    ///
    /// # Errors
    ///
    /// Fails only when the configuration is invalid or the stored assets
    /// cannot be listed in full. Source and batch failures are reported in
    /// the summary.
    pub async fn run(&self) -> Result<CleanupSummary, CleanupError> {
        let started = Instant::now();
        self.config.validate().map_err(CleanupError::Config)?;

        tracing::info!(
            folder = %self.config.folder,
            dry_run = self.config.dry_run,
            batch_size = self.config.batch_size,
            "Starting orphan asset cleanup"
        );

        let references = self.collector.collect().await;

        let stored = self.enumerator.enumerate().await.map_err(|e| {
            tracing::error!(
                error = %format!("{e:#}"),
                "Asset enumeration failed, aborting before any deletion"
            );
            CleanupError::Enumeration(e)
        })?;

        let orphans = find_orphans(stored.ids(), &references.referenced);
        tracing::info!(
            referenced = references.referenced.len(),
            stored = stored.len(),
            orphans = orphans.len(),
            "Identified orphan assets"
        );
        tracing::debug!(orphans = ?orphans, "Orphan asset ids");

        let deletion = self.cleaner.delete_orphans_batch(&orphans).await;

        let summary = CleanupSummary {
            referenced: references.referenced.len(),
            malformed_references: references.malformed(),
            failed_sources: references.failed_sources(),
            stored: stored.len(),
            search_pages: stored.pages(),
            orphans,
            deletion,
            duration: started.elapsed(),
        };
        summary.log();

        Ok(summary)
    }
}
