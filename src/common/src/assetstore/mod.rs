//! Asset store port.
//!
//! Two operations are needed by the cleanup job: a cursor-paginated search
//! scoped by an expression, and a bounded batch delete by public id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::config::MAX_DELETE_BATCH;

pub mod cloudinary;
pub mod memory;

pub use cloudinary::CloudinaryAssetStore;
pub use memory::InMemoryAssetStore;

/// Storage-native key of an asset (Cloudinary's `public_id`), without file
/// extension and including its folder path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for AssetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One page request of a scoped search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    /// Search expression, e.g. `resource_type:image AND folder=shop`
    pub expression: String,
    pub max_results: usize,
    /// Cursor from the previous page; `None` requests the first page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// A stored asset as listed by search. Only the id is retained.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Resource {
    pub public_id: AssetId,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Absent on the last page
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub total_count: Option<u64>,
}

/// Per-id result of a delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: Vec<AssetId>,
    /// Ids the store did not have; deleting them is a no-op
    pub not_found: Vec<AssetId>,
    /// Ids with any other status, paired with the reported status
    pub other: Vec<(AssetId, String)>,
}

impl DeleteOutcome {
    /// Deleted or already absent.
    pub fn settled(&self) -> usize {
        self.deleted.len() + self.not_found.len()
    }
}

/// Error types that can occur during asset store operations
#[derive(Debug, thiserror::Error)]
pub enum AssetStoreError {
    #[error("Asset store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Asset store returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode asset store response: {0}")]
    Decode(String),

    #[error("Invalid asset store configuration: {0}")]
    Config(String),

    #[error("Invalid asset store request: {0}")]
    InvalidRequest(String),

    #[error("Asset store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for asset store operations
pub type AssetStoreResult<T> = Result<T, AssetStoreError>;

/// Remote media asset storage.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Fetch one page of a scoped search.
    async fn search(&self, request: &SearchRequest) -> AssetStoreResult<SearchPage>;

    /// Delete up to the store's batch limit of assets in one call.
    async fn delete_resources(&self, public_ids: &[AssetId]) -> AssetStoreResult<DeleteOutcome>;

    /// Most ids a single `delete_resources` call accepts.
    fn max_delete_batch(&self) -> usize {
        MAX_DELETE_BATCH
    }
}
