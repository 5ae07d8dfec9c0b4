//! Orphan asset cleanup system.
//!
//! Finds assets in the asset store that no document references and deletes
//! them in bounded batches.
//!
//! ## Safety Principles
//!
//! 1. **Complete Listing**: Nothing is deleted unless every search page was fetched
//! 2. **Partial References**: An unreadable source is logged and skipped, never fatal
//! 3. **Audit Trail**: Every orphan and every batch outcome is logged
//!
//! ## Architecture
//!
//! - `config`: Configuration derived from the process configuration
//! - `extractor`: Asset id derivation from delivery URLs
//! - `collector`: Referenced set from the document store
//! - `enumerator`: Stored set from the asset store
//! - `reconciler`: Set difference
//! - `cleaner`: Batch deletion
//!
//! ## Usage
//!
//! ```no_run
//! use janitor::orphan::{AssetEnumerator, OrphanCleaner, OrphanCleanupConfig, ReferenceCollector, find_orphans};
//! # async fn example(
//! #     documents: std::sync::Arc<dyn common::DocumentStore>,
//! #     assets: std::sync::Arc<dyn common::AssetStore>,
//! # ) -> anyhow::Result<()> {
//! let config = OrphanCleanupConfig::default();
//!
//! let references = ReferenceCollector::new(config.sources.clone(), documents).collect().await;
//! let stored = AssetEnumerator::new(config.search_expression(), config.search_page_size, assets.clone())
//!     .enumerate()
//!     .await?;
//! let orphans = find_orphans(stored.ids(), &references.referenced);
//!
//! // Respects dry_run
//! let result = OrphanCleaner::new(&config, assets).delete_orphans_batch(&orphans).await;
//! # Ok(())
//! # }
//! ```

pub mod cleaner;
pub mod collector;
pub mod config;
pub mod enumerator;
pub mod extractor;
pub mod reconciler;

// Re-export commonly used types
pub use cleaner::{BatchFailure, DeletionResult, OrphanCleaner};
pub use collector::{ReferenceCollector, ReferenceReport, ReferenceSource, SourceReport};
pub use config::OrphanCleanupConfig;
pub use enumerator::{AssetEnumerator, StoredAssets};
pub use extractor::{ExtractError, extract_asset_id};
pub use reconciler::find_orphans;
