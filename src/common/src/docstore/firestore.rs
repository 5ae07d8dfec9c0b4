//! Firestore REST (v1) adapter for the document store port.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use url::Url;

use super::{
    Document, DocumentStore, DocumentStoreError, DocumentStoreResult, FieldMap, FieldValue,
};
use crate::config::FirestoreConfig;

/// Firestore document store reached over its REST API.
#[derive(Debug, Clone)]
pub struct FirestoreDocumentStore {
    http: reqwest::Client,
    /// `{base}/projects/{project}/databases/{database}/documents`
    documents_url: Url,
    api_key: Option<String>,
    page_size: usize,
}

impl FirestoreDocumentStore {
    pub fn new(config: &FirestoreConfig) -> DocumentStoreResult<Self> {
        if config.project_id.is_empty() {
            return Err(DocumentStoreError::Config(
                "firestore.project_id is empty".to_string(),
            ));
        }

        let documents_url = append_segments(
            &config.base_url,
            &[
                "projects",
                &config.project_id,
                "databases",
                &config.database,
                "documents",
            ],
        )?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("mediasweep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            documents_url,
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            page_size: config.page_size.max(1),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> DocumentStoreResult<T> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(DocumentStoreError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        serde_json::from_slice(&body).map_err(|e| DocumentStoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn list(&self, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let url = append_segments(&self.documents_url, &[collection])?;
        let page_size = self.page_size.to_string();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(url.clone())
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = self.authorize(request).send().await?;
            let page: ListDocumentsResponse = Self::decode(response).await?;

            tracing::debug!(
                collection = %collection,
                documents = page.documents.len(),
                has_more = page.next_page_token.is_some(),
                "Fetched document page"
            );

            for wire in page.documents {
                documents.push(wire.into_document()?);
            }

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> DocumentStoreResult<Option<Document>> {
        let url = append_segments(&self.documents_url, &[collection, id])?;
        let response = self.authorize(self.http.get(url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let wire: WireDocument = Self::decode(response).await?;
        wire.into_document().map(Some)
    }
}

fn append_segments(base: &Url, segments: &[&str]) -> DocumentStoreResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DocumentStoreError::Config(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireDocument {
    /// Full resource name, the id is its last segment
    name: String,
    #[serde(default)]
    fields: BTreeMap<String, WireValue>,
}

impl WireDocument {
    fn into_document(self) -> DocumentStoreResult<Document> {
        let id = self
            .name
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DocumentStoreError::Decode(format!("document name `{}` has no id", self.name))
            })?
            .to_string();
        Ok(Document::new(id, decode_fields(self.fields)?))
    }
}

/// Firestore's tagged value encoding: exactly one key names the type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum WireValue {
    NullValue(serde_json::Value),
    BooleanValue(bool),
    /// int64 travels as a decimal string
    IntegerValue(String),
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    BytesValue(String),
    ReferenceValue(String),
    GeoPointValue(WireGeoPoint),
    ArrayValue(WireArray),
    MapValue(WireMap),
}

#[derive(Debug, Deserialize)]
struct WireGeoPoint {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct WireArray {
    #[serde(default)]
    values: Vec<WireValue>,
}

#[derive(Debug, Deserialize)]
struct WireMap {
    #[serde(default)]
    fields: BTreeMap<String, WireValue>,
}

fn decode_fields(fields: BTreeMap<String, WireValue>) -> DocumentStoreResult<FieldMap> {
    fields
        .into_iter()
        .map(|(name, value)| -> DocumentStoreResult<(String, FieldValue)> {
            Ok((name, decode_value(value)?))
        })
        .collect()
}

fn decode_value(value: WireValue) -> DocumentStoreResult<FieldValue> {
    Ok(match value {
        WireValue::NullValue(_) => FieldValue::Null,
        WireValue::BooleanValue(value) => FieldValue::Bool(value),
        WireValue::IntegerValue(raw) => FieldValue::Integer(raw.parse().map_err(|_| {
            DocumentStoreError::Decode(format!("integerValue `{raw}` is not an int64"))
        })?),
        WireValue::DoubleValue(value) => FieldValue::Double(value),
        WireValue::TimestampValue(value) => FieldValue::Timestamp(value),
        WireValue::StringValue(value) => FieldValue::String(value),
        WireValue::BytesValue(value) => FieldValue::Bytes(value),
        WireValue::ReferenceValue(value) => FieldValue::Reference(value),
        WireValue::GeoPointValue(point) => FieldValue::GeoPoint {
            latitude: point.latitude,
            longitude: point.longitude,
        },
        WireValue::ArrayValue(array) => FieldValue::Array(
            array
                .values
                .into_iter()
                .map(decode_value)
                .collect::<DocumentStoreResult<_>>()?,
        ),
        WireValue::MapValue(map) => FieldValue::Map(decode_fields(map.fields)?),
    })
}
