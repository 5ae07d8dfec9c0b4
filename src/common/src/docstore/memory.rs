use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};

use super::{Document, DocumentStore, DocumentStoreError, DocumentStoreResult};

/// In-memory document store with injectable read failures.
///
/// The store is assembled up front with the builder methods and is
/// read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    collections: BTreeMap<String, Vec<Document>>,
    failing_collections: HashSet<String>,
    failing_documents: HashSet<(String, String)>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a document in a collection.
    pub fn with_document(mut self, collection: &str, document: Document) -> Self {
        let documents = self.collections.entry(collection.to_string()).or_default();
        documents.retain(|existing| existing.id != document.id);
        documents.push(document);
        self
    }

    /// Make every `list` of this collection fail.
    pub fn fail_collection(mut self, collection: &str) -> Self {
        self.failing_collections.insert(collection.to_string());
        self
    }

    /// Make `get` of this document fail.
    pub fn fail_document(mut self, collection: &str, id: &str) -> Self {
        self.failing_documents
            .insert((collection.to_string(), id.to_string()));
        self
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list(&self, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        if self.failing_collections.contains(collection) {
            return Err(DocumentStoreError::Unavailable(format!(
                "listing `{collection}` failed"
            )));
        }
        Ok(self.collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> DocumentStoreResult<Option<Document>> {
        if self
            .failing_documents
            .contains(&(collection.to_string(), id.to_string()))
        {
            return Err(DocumentStoreError::Unavailable(format!(
                "reading `{collection}/{id}` failed"
            )));
        }
        Ok(self
            .collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|doc| doc.id == id))
            .cloned())
    }
}
