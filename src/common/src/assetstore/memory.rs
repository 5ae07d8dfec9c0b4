use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use super::{
    AssetId, AssetStore, AssetStoreError, AssetStoreResult, DeleteOutcome, Resource, SearchPage,
    SearchRequest,
};
use crate::config::{MAX_DELETE_BATCH, MAX_SEARCH_PAGE_SIZE};

const CURSOR_PREFIX: &str = "offset:";

/// In-memory asset store holding a single folder.
///
/// Search expressions are recorded but not evaluated; every stored asset
/// matches. Cursors are opaque offsets. Every search and delete call is
/// recorded, including calls that were made to fail.
#[derive(Debug)]
pub struct InMemoryAssetStore {
    page_size: usize,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    assets: Vec<AssetId>,
    searches: Vec<SearchRequest>,
    delete_calls: Vec<Vec<AssetId>>,
    failing_searches: HashSet<usize>,
    failing_deletes: HashSet<usize>,
}

impl Default for InMemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self {
            page_size: MAX_SEARCH_PAGE_SIZE,
            state: Mutex::new(State::default()),
        }
    }

    /// Seed stored assets in listing order. Duplicates are kept as given.
    pub fn with_assets<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AssetId>,
    {
        self.state
            .get_mut()
            .assets
            .extend(ids.into_iter().map(Into::into));
        self
    }

    /// Cap the page size below whatever the caller requests.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make the `n`th search call (1-based) fail.
    pub fn fail_search(mut self, n: usize) -> Self {
        self.state.get_mut().failing_searches.insert(n);
        self
    }

    /// Make the `n`th delete call (1-based) fail.
    pub fn fail_delete(mut self, n: usize) -> Self {
        self.state.get_mut().failing_deletes.insert(n);
        self
    }

    /// Assets still stored.
    pub async fn assets(&self) -> Vec<AssetId> {
        self.state.lock().await.assets.clone()
    }

    /// Every search request received, in order.
    pub async fn searches(&self) -> Vec<SearchRequest> {
        self.state.lock().await.searches.clone()
    }

    /// The ids of every delete call received, in order.
    pub async fn delete_calls(&self) -> Vec<Vec<AssetId>> {
        self.state.lock().await.delete_calls.clone()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn search(&self, request: &SearchRequest) -> AssetStoreResult<SearchPage> {
        let mut state = self.state.lock().await;
        state.searches.push(request.clone());
        let call = state.searches.len();

        if state.failing_searches.contains(&call) {
            return Err(AssetStoreError::Unavailable(format!(
                "search call {call} failed"
            )));
        }

        let offset = match &request.next_cursor {
            None => 0,
            Some(cursor) => cursor
                .strip_prefix(CURSOR_PREFIX)
                .and_then(|offset| offset.parse::<usize>().ok())
                .ok_or_else(|| {
                    AssetStoreError::InvalidRequest(format!("unknown cursor `{cursor}`"))
                })?,
        };

        let limit = request.max_results.clamp(1, self.page_size);
        let end = (offset + limit).min(state.assets.len());
        let resources = state.assets[offset.min(end)..end]
            .iter()
            .cloned()
            .map(|public_id| Resource { public_id })
            .collect();
        let next_cursor = (end < state.assets.len()).then(|| format!("{CURSOR_PREFIX}{end}"));

        Ok(SearchPage {
            resources,
            next_cursor,
            total_count: Some(state.assets.len() as u64),
        })
    }

    async fn delete_resources(&self, public_ids: &[AssetId]) -> AssetStoreResult<DeleteOutcome> {
        let mut state = self.state.lock().await;
        state.delete_calls.push(public_ids.to_vec());
        let call = state.delete_calls.len();

        if public_ids.len() > MAX_DELETE_BATCH {
            return Err(AssetStoreError::InvalidRequest(format!(
                "{} public ids exceed the limit of {MAX_DELETE_BATCH} per call",
                public_ids.len()
            )));
        }
        if state.failing_deletes.contains(&call) {
            return Err(AssetStoreError::Unavailable(format!(
                "delete call {call} failed"
            )));
        }

        let mut outcome = DeleteOutcome::default();
        for id in public_ids {
            let before = state.assets.len();
            state.assets.retain(|stored| stored != id);
            if state.assets.len() < before {
                outcome.deleted.push(id.clone());
            } else {
                outcome.not_found.push(id.clone());
            }
        }
        Ok(outcome)
    }
}
