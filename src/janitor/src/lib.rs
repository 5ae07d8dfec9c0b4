//! Mediasweep Janitor Library
//!
//! Reconciles the assets stored in one asset store folder against the
//! references held in the document store, and deletes what nothing
//! references.

pub mod job;
pub mod metrics;
pub mod orphan;

// Re-export commonly used types
pub use job::{CleanupError, CleanupJob};
pub use metrics::CleanupSummary;
pub use orphan::{DeletionResult, OrphanCleanupConfig, ReferenceReport};
