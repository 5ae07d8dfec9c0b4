//! Stored asset enumeration.
//!
//! Pages through a scoped search, chaining each page's cursor into the next
//! request until a page comes back without one. Any failed page fails the
//! whole enumeration: a partial listing cannot be reconciled.

use anyhow::{Context, Result};
use common::assetstore::SearchRequest;
use common::{AssetId, AssetStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Every asset id in scope, in listing order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredAssets {
    ids: Vec<AssetId>,
    pages: usize,
}

impl StoredAssets {
    pub fn ids(&self) -> &[AssetId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Search pages fetched to build the listing.
    pub fn pages(&self) -> usize {
        self.pages
    }
}

/// Lists every stored asset matching one search expression.
pub struct AssetEnumerator {
    expression: String,
    page_size: usize,
    store: Arc<dyn AssetStore>,
}

impl AssetEnumerator {
    pub fn new(expression: impl Into<String>, page_size: usize, store: Arc<dyn AssetStore>) -> Self {
        Self {
            expression: expression.into(),
            page_size: page_size.max(1),
            store,
        }
    }

    /// Fetch every page.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails or the store hands back a
    /// cursor it already returned.
    pub async fn enumerate(&self) -> Result<StoredAssets> {
        tracing::info!(
            expression = %self.expression,
            page_size = self.page_size,
            "Enumerating stored assets"
        );

        let mut seen = HashSet::new();
        let mut cursors = HashSet::new();
        let mut stored = StoredAssets::default();
        let mut next_cursor: Option<String> = None;

        loop {
            let page_number = stored.pages + 1;
            let request = SearchRequest {
                expression: self.expression.clone(),
                max_results: self.page_size,
                next_cursor: next_cursor.take(),
            };

            let page = self
                .store
                .search(&request)
                .await
                .with_context(|| format!("Failed to fetch search page {page_number}"))?;
            stored.pages = page_number;

            tracing::debug!(
                page = page_number,
                resources = page.resources.len(),
                total_count = ?page.total_count,
                has_more = page.next_cursor.is_some(),
                "Fetched asset page"
            );

            for resource in page.resources {
                if seen.insert(resource.public_id.clone()) {
                    stored.ids.push(resource.public_id);
                }
            }

            match page.next_cursor.filter(|cursor| !cursor.is_empty()) {
                Some(cursor) => {
                    if !cursors.insert(cursor.clone()) {
                        anyhow::bail!(
                            "Search page {page_number} repeated cursor `{cursor}`, listing would not terminate"
                        );
                    }
                    next_cursor = Some(cursor);
                }
                None => break,
            }
        }

        tracing::info!(
            stored = stored.len(),
            pages = stored.pages,
            "Enumerated stored assets"
        );

        Ok(stored)
    }
}
