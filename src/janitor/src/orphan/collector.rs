//! Reference collection from the document store.
//!
//! Three document kinds carry asset references:
//!
//! 1. **Catalog**: every record of the catalog collection, array field of URLs
//! 2. **Logo**: one settings record, single optional URL field
//! 3. **Slider**: one settings record, list of slides each with an optional URL
//!
//! Each source is visited independently. A failing source is logged and
//! contributes nothing; the others are still visited. A reference whose id
//! cannot be extracted is logged and left out of the referenced set.

use crate::orphan::extractor::extract_asset_id;
use anyhow::{Context, Result};
use common::config::ReferenceSources;
use common::docstore::FieldValue;
use common::{AssetId, DocumentStore};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A document kind visited during collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSource {
    Catalog,
    Logo,
    Slider,
}

impl ReferenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Catalog => "catalog",
            Self::Logo => "logo",
            Self::Slider => "slider",
        }
    }
}

impl fmt::Display for ReferenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of visiting one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: ReferenceSource,
    /// Ids extracted from this source, duplicates included.
    pub found: usize,
    /// References from this source that yielded no id.
    pub malformed: usize,
    /// Set when the source could not be read at all.
    pub error: Option<String>,
}

/// Everything collection produced: the referenced set and how each source fared.
#[derive(Debug, Clone, Default)]
pub struct ReferenceReport {
    pub referenced: HashSet<AssetId>,
    pub sources: Vec<SourceReport>,
}

impl ReferenceReport {
    pub fn source(&self, source: ReferenceSource) -> Option<&SourceReport> {
        self.sources.iter().find(|report| report.source == source)
    }

    /// Total references that yielded no id.
    pub fn malformed(&self) -> usize {
        self.sources.iter().map(|report| report.malformed).sum()
    }

    /// Sources that could not be read.
    pub fn failed_sources(&self) -> Vec<ReferenceSource> {
        self.sources
            .iter()
            .filter(|report| report.error.is_some())
            .map(|report| report.source)
            .collect()
    }

    fn record(&mut self, source: ReferenceSource, visit: Result<Harvest>) {
        let report = match visit {
            Ok(harvest) => {
                let found = harvest.ids.len();
                self.referenced.extend(harvest.ids);
                tracing::info!(
                    source = %source,
                    found,
                    malformed = harvest.malformed,
                    referenced = self.referenced.len(),
                    "Collected asset references"
                );
                SourceReport {
                    source,
                    found,
                    malformed: harvest.malformed,
                    error: None,
                }
            }
            Err(e) => {
                let error = format!("{e:#}");
                tracing::error!(
                    source = %source,
                    error = %error,
                    "Failed to collect asset references, source contributes nothing"
                );
                SourceReport {
                    source,
                    found: 0,
                    malformed: 0,
                    error: Some(error),
                }
            }
        };
        self.sources.push(report);
    }
}

/// Ids gathered from one source before it is merged into the report.
#[derive(Debug)]
struct Harvest {
    source: ReferenceSource,
    ids: Vec<AssetId>,
    malformed: usize,
}

impl Harvest {
    fn new(source: ReferenceSource) -> Self {
        Self {
            source,
            ids: Vec::new(),
            malformed: 0,
        }
    }

    fn add_reference(&mut self, document: &str, reference: &str) {
        if reference.is_empty() {
            return;
        }
        match extract_asset_id(reference) {
            Ok(id) => self.ids.push(id),
            Err(e) => {
                // The asset behind this reference is not protected from deletion.
                tracing::warn!(
                    source = %self.source,
                    document = %document,
                    reference = %reference,
                    error = %e,
                    "Could not extract asset id, reference is not protected"
                );
                self.malformed += 1;
            }
        }
    }

    fn add_value(&mut self, document: &str, value: &FieldValue) {
        match value {
            FieldValue::Null => {}
            FieldValue::String(reference) => self.add_reference(document, reference),
            other => {
                tracing::warn!(
                    source = %self.source,
                    document = %document,
                    found = other.kind(),
                    "Skipping non-string asset reference"
                );
                self.malformed += 1;
            }
        }
    }
}

/// Builds the referenced set from the document store.
pub struct ReferenceCollector {
    sources: ReferenceSources,
    store: Arc<dyn DocumentStore>,
}

impl ReferenceCollector {
    pub fn new(sources: ReferenceSources, store: Arc<dyn DocumentStore>) -> Self {
        Self { sources, store }
    }

    /// Visit every source in turn. Never fails: per-source errors are
    /// recorded in the report.
    pub async fn collect(&self) -> ReferenceReport {
        let mut report = ReferenceReport::default();

        report.record(ReferenceSource::Catalog, self.visit_catalog().await);
        report.record(ReferenceSource::Logo, self.visit_logo().await);
        report.record(ReferenceSource::Slider, self.visit_slider().await);

        tracing::info!(
            referenced = report.referenced.len(),
            malformed = report.malformed(),
            failed_sources = report.failed_sources().len(),
            "Reference collection complete"
        );

        report
    }

    async fn visit_catalog(&self) -> Result<Harvest> {
        let collection = &self.sources.catalog_collection;
        let field = &self.sources.catalog_image_field;
        let mut harvest = Harvest::new(ReferenceSource::Catalog);

        let documents = self
            .store
            .list(collection)
            .await
            .with_context(|| format!("Failed to list collection `{collection}`"))?;

        tracing::debug!(
            collection = %collection,
            documents = documents.len(),
            "Listed catalog records"
        );

        for document in &documents {
            match document.array(field) {
                Ok(Some(values)) => {
                    for value in values {
                        harvest.add_value(&document.id, value);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        collection = %collection,
                        document = %document.id,
                        error = %e,
                        "Skipping catalog record with malformed image field"
                    );
                    harvest.malformed += 1;
                }
            }
        }

        Ok(harvest)
    }

    async fn visit_logo(&self) -> Result<Harvest> {
        let collection = &self.sources.settings_collection;
        let id = &self.sources.logo_document;
        let mut harvest = Harvest::new(ReferenceSource::Logo);

        let Some(document) = self
            .store
            .get(collection, id)
            .await
            .with_context(|| format!("Failed to read `{collection}/{id}`"))?
        else {
            tracing::debug!(collection = %collection, document = %id, "Logo record not found");
            return Ok(harvest);
        };

        let logo = document
            .string(&self.sources.logo_field)
            .with_context(|| format!("Malformed `{collection}/{id}`"))?;
        if let Some(reference) = logo {
            harvest.add_reference(&document.id, reference);
        }

        Ok(harvest)
    }

    async fn visit_slider(&self) -> Result<Harvest> {
        let collection = &self.sources.settings_collection;
        let id = &self.sources.slider_document;
        let mut harvest = Harvest::new(ReferenceSource::Slider);

        let Some(document) = self
            .store
            .get(collection, id)
            .await
            .with_context(|| format!("Failed to read `{collection}/{id}`"))?
        else {
            tracing::debug!(collection = %collection, document = %id, "Slider record not found");
            return Ok(harvest);
        };

        let Some(slides) = document
            .array(&self.sources.slides_field)
            .with_context(|| format!("Malformed `{collection}/{id}`"))?
        else {
            return Ok(harvest);
        };

        for (index, slide) in slides.iter().enumerate() {
            let image = slide
                .as_map()
                .map(|fields| fields.string(&self.sources.slide_image_field));
            match image {
                Some(Ok(Some(reference))) => harvest.add_reference(&document.id, reference),
                Some(Ok(None)) => {}
                Some(Err(e)) => {
                    tracing::warn!(slide = index, error = %e, "Skipping malformed slide");
                    harvest.malformed += 1;
                }
                None => {
                    tracing::warn!(slide = index, found = slide.kind(), "Skipping malformed slide");
                    harvest.malformed += 1;
                }
            }
        }

        Ok(harvest)
    }
}
