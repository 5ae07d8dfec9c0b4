//! Orphan asset cleanup configuration structures.

use common::config::{CleanupConfig, Configuration, ReferenceSources, validate_cleanup_bounds};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orphan asset cleanup configuration.
///
/// Assembled from the `cleanup` section and the asset store's
/// `resource_type`. Everything a single run needs lives here so the job
/// never reaches back into the process configuration.
///
/// ## Defaults
///
/// - `folder`: `sundorica`
/// - `search_page_size`: 500 (asset store maximum)
/// - `batch_size`: 100 (asset store maximum)
/// - `dry_run`: false
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrphanCleanupConfig {
    /// Asset store folder whose contents are reconciled.
    ///
    /// Env: MEDIASWEEP__CLEANUP__FOLDER
    pub folder: String,

    /// Resource type the search is scoped to.
    ///
    /// Env: MEDIASWEEP__CLOUDINARY__RESOURCE_TYPE
    pub resource_type: String,

    /// Results requested per search page.
    ///
    /// Env: MEDIASWEEP__CLEANUP__SEARCH_PAGE_SIZE
    pub search_page_size: usize,

    /// Maximum ids per delete call.
    ///
    /// Env: MEDIASWEEP__CLEANUP__BATCH_SIZE
    pub batch_size: usize,

    /// Dry-run mode: identify orphans but don't delete.
    ///
    /// Env: MEDIASWEEP__CLEANUP__DRY_RUN
    pub dry_run: bool,

    /// Pause between consecutive delete calls.
    ///
    /// Env: MEDIASWEEP__CLEANUP__BATCH_PAUSE (e.g. `250ms`)
    #[serde(with = "humantime_serde")]
    pub batch_pause: Duration,

    /// Where references live in the document store.
    pub sources: ReferenceSources,
}

impl Default for OrphanCleanupConfig {
    fn default() -> Self {
        Self::from(&Configuration::default())
    }
}

impl From<&Configuration> for OrphanCleanupConfig {
    fn from(config: &Configuration) -> Self {
        let CleanupConfig {
            folder,
            search_page_size,
            batch_size,
            dry_run,
            batch_pause,
            sources,
        } = config.cleanup.clone();

        Self {
            folder,
            resource_type: config.cloudinary.resource_type.clone(),
            search_page_size,
            batch_size,
            dry_run,
            batch_pause,
            sources,
        }
    }
}

impl OrphanCleanupConfig {
    /// Validate the orphan cleanup configuration.
    ///
    /// Checks:
    /// - Folder is not empty
    /// - Search page size is within 1..=500
    /// - Batch size is within 1..=100
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_cleanup_bounds(&self.folder, self.search_page_size, self.batch_size)
    }

    /// Search expression scoping enumeration to the configured folder.
    pub fn search_expression(&self) -> String {
        format!(
            "resource_type:{} AND folder={}",
            self.resource_type, self.folder
        )
    }
}
