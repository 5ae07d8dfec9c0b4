//! Cloudinary Admin API adapter for the asset store port.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use url::Url;

use super::{
    AssetId, AssetStore, AssetStoreError, AssetStoreResult, DeleteOutcome, SearchPage,
    SearchRequest,
};
use crate::config::{CloudinaryConfig, MAX_DELETE_BATCH};

const STATUS_DELETED: &str = "deleted";
const STATUS_NOT_FOUND: &str = "not_found";

/// Cloudinary asset store authenticated with HTTP basic auth.
#[derive(Debug, Clone)]
pub struct CloudinaryAssetStore {
    http: reqwest::Client,
    /// `{base}/{cloud}/resources/search`
    search_url: Url,
    /// `{base}/{cloud}/resources/{resource_type}/{delivery_type}`
    delete_url: Url,
    api_key: String,
    api_secret: String,
}

impl CloudinaryAssetStore {
    pub fn new(config: &CloudinaryConfig) -> AssetStoreResult<Self> {
        if config.cloud_name.is_empty() {
            return Err(AssetStoreError::Config(
                "cloudinary.cloud_name is empty".to_string(),
            ));
        }

        let search_url = append_segments(
            &config.base_url,
            &[&config.cloud_name, "resources", "search"],
        )?;
        let delete_url = append_segments(
            &config.base_url,
            &[
                &config.cloud_name,
                "resources",
                &config.resource_type,
                &config.delivery_type,
            ],
        )?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("mediasweep/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            search_url,
            delete_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.api_key, Some(&self.api_secret))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> AssetStoreResult<T> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(AssetStoreError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        serde_json::from_slice(&body).map_err(|e| AssetStoreError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AssetStore for CloudinaryAssetStore {
    async fn search(&self, request: &SearchRequest) -> AssetStoreResult<SearchPage> {
        let response = self
            .authorize(self.http.post(self.search_url.clone()))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete_resources(&self, public_ids: &[AssetId]) -> AssetStoreResult<DeleteOutcome> {
        if public_ids.is_empty() {
            return Ok(DeleteOutcome::default());
        }
        if public_ids.len() > MAX_DELETE_BATCH {
            return Err(AssetStoreError::InvalidRequest(format!(
                "{} public ids exceed the limit of {MAX_DELETE_BATCH} per call",
                public_ids.len()
            )));
        }

        let query: Vec<(&str, &str)> = public_ids
            .iter()
            .map(|id| ("public_ids[]", id.as_str()))
            .collect();

        let response = self
            .authorize(self.http.delete(self.delete_url.clone()))
            .query(&query)
            .send()
            .await?;
        let body: DeleteResponse = Self::decode(response).await?;

        Ok(body.into_outcome(public_ids))
    }
}

fn append_segments(base: &Url, segments: &[&str]) -> AssetStoreResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AssetStoreError::Config(format!("{base} cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Cloudinary reports failures as `{"error": {"message": "..."}}`.
fn error_message(body: &[u8]) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_slice::<ErrorBody>(body)
        .map(|body| body.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    /// public id → status (`deleted`, `not_found`, ...)
    #[serde(default)]
    deleted: BTreeMap<String, String>,
}

impl DeleteResponse {
    /// Classify in request order. Ids the response does not mention land in `other`.
    fn into_outcome(mut self, requested: &[AssetId]) -> DeleteOutcome {
        let mut outcome = DeleteOutcome::default();
        for id in requested {
            match self.deleted.remove(id.as_str()).as_deref() {
                Some(STATUS_DELETED) => outcome.deleted.push(id.clone()),
                Some(STATUS_NOT_FOUND) => outcome.not_found.push(id.clone()),
                Some(status) => outcome.other.push((id.clone(), status.to_string())),
                None => outcome
                    .other
                    .push((id.clone(), "missing from response".to_string())),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Recorder, base_url, serve};
    use axum::extract::State;
    use axum::http::header::AUTHORIZATION;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::response::IntoResponse;
    use axum::{Json, Router};
    use serde_json::json;

    fn config() -> CloudinaryConfig {
        CloudinaryConfig {
            cloud_name: "demo".to_string(),
            api_key: "1234".to_string(),
            api_secret: "s3cr3t".to_string(),
            ..CloudinaryConfig::default()
        }
    }

    #[test]
    fn test_endpoint_urls() {
        let store = CloudinaryAssetStore::new(&config()).unwrap();
        assert_eq!(
            store.search_url.as_str(),
            "https://api.cloudinary.com/v1_1/demo/resources/search"
        );
        assert_eq!(
            store.delete_url.as_str(),
            "https://api.cloudinary.com/v1_1/demo/resources/image/upload"
        );
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let config = CloudinaryConfig {
            base_url: Url::parse("http://localhost:8080/v1_1").unwrap(),
            ..config()
        };
        let store = CloudinaryAssetStore::new(&config).unwrap();
        assert_eq!(
            store.search_url.as_str(),
            "http://localhost:8080/v1_1/demo/resources/search"
        );
    }

    #[test]
    fn test_empty_cloud_name_is_rejected() {
        assert!(matches!(
            CloudinaryAssetStore::new(&CloudinaryConfig::default()),
            Err(AssetStoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected_before_sending() {
        let store = CloudinaryAssetStore::new(&config()).unwrap();
        let ids: Vec<AssetId> = (0..=MAX_DELETE_BATCH)
            .map(|i| AssetId::new(format!("shop/{i}")))
            .collect();
        assert!(matches!(
            store.delete_resources(&ids).await,
            Err(AssetStoreError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let store = CloudinaryAssetStore::new(&config()).unwrap();
        let outcome = store.delete_resources(&[]).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::default());
    }

    #[test]
    fn test_delete_response_classification() {
        let response: DeleteResponse = serde_json::from_str(
            r#"{"deleted": {"shop/a": "deleted", "shop/b": "not_found", "shop/c": "rate_limited"},
                "deleted_counts": {}, "partial": false}"#,
        )
        .unwrap();
        let requested: Vec<AssetId> = ["shop/a", "shop/b", "shop/c", "shop/d"]
            .into_iter()
            .map(AssetId::from)
            .collect();

        let outcome = response.into_outcome(&requested);
        assert_eq!(outcome.deleted, vec![AssetId::from("shop/a")]);
        assert_eq!(outcome.not_found, vec![AssetId::from("shop/b")]);
        assert_eq!(outcome.other.len(), 2);
        assert_eq!(outcome.other[0], (AssetId::from("shop/c"), "rate_limited".to_string()));
        assert_eq!(outcome.other[1].0, AssetId::from("shop/d"));
        assert_eq!(outcome.settled(), 2);
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(br#"{"error": {"message": "Invalid credentials"}}"#),
            "Invalid credentials"
        );
        assert_eq!(error_message(b"Bad gateway"), "Bad gateway");
    }

    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        path: String,
        authorization: Option<String>,
        public_ids: Vec<String>,
        body: String,
    }

    /// Search and delete endpoints for any cloud; the `locked` cloud rejects
    /// every call.
    async fn cloudinary_stub(
        State(seen): State<Recorder<Seen>>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> axum::response::Response {
        let query = uri.query().unwrap_or_default();
        let public_ids: Vec<String> = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == "public_ids[]")
            .map(|(_, value)| value.into_owned())
            .collect();
        let path = uri.path().to_string();
        seen.record(Seen {
            method: method.clone(),
            path: path.clone(),
            authorization: headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
            public_ids: public_ids.clone(),
            body,
        });

        if path.contains("/locked/") {
            let error = json!({"error": {"message": "Invalid Signature"}});
            return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
        }
        if method == Method::POST && path.ends_with("/resources/search") {
            return Json(json!({
                "resources": [{"public_id": "shop/a", "format": "jpg"}, {"public_id": "shop/b"}],
                "next_cursor": "cursor-2",
                "total_count": 3
            }))
            .into_response();
        }
        if method == Method::DELETE && path.ends_with("/resources/image/upload") {
            let deleted: serde_json::Map<String, serde_json::Value> = public_ids
                .into_iter()
                .map(|id| {
                    let status = if id == "shop/gone" { "not_found" } else { "deleted" };
                    (id, json!(status))
                })
                .collect();
            return Json(json!({"deleted": deleted, "partial": false})).into_response();
        }
        StatusCode::NOT_FOUND.into_response()
    }

    async fn stub_store(cloud_name: &str) -> (CloudinaryAssetStore, Recorder<Seen>) {
        let seen = Recorder::default();
        let app = Router::new()
            .fallback(cloudinary_stub)
            .with_state(seen.clone());
        let addr = serve(app).await;

        let store = CloudinaryAssetStore::new(&CloudinaryConfig {
            cloud_name: cloud_name.to_string(),
            base_url: base_url(addr, "v1_1/"),
            ..config()
        })
        .unwrap();
        (store, seen)
    }

    #[tokio::test]
    async fn test_search_posts_expression_with_basic_auth() {
        let (store, seen) = stub_store("demo").await;
        let request = SearchRequest {
            expression: "resource_type:image AND folder=shop".to_string(),
            max_results: 2,
            next_cursor: Some("cursor-1".to_string()),
        };

        let page = store.search(&request).await.unwrap();

        let ids: Vec<&str> = page.resources.iter().map(|r| r.public_id.as_str()).collect();
        assert_eq!(ids, vec!["shop/a", "shop/b"]);
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
        assert_eq!(page.total_count, Some(3));

        let requests = seen.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].path, "/v1_1/demo/resources/search");
        // base64("1234:s3cr3t")
        assert_eq!(
            requests[0].authorization.as_deref(),
            Some("Basic MTIzNDpzM2NyM3Q=")
        );
        let body: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
        assert_eq!(
            body,
            json!({
                "expression": "resource_type:image AND folder=shop",
                "max_results": 2,
                "next_cursor": "cursor-1"
            })
        );
    }

    #[tokio::test]
    async fn test_first_page_search_omits_cursor() {
        let (store, seen) = stub_store("demo").await;
        let request = SearchRequest {
            expression: "resource_type:image AND folder=shop".to_string(),
            max_results: 500,
            next_cursor: None,
        };

        store.search(&request).await.unwrap();

        let body: serde_json::Value = serde_json::from_str(&seen.requests()[0].body).unwrap();
        assert!(body.get("next_cursor").is_none());
    }

    #[tokio::test]
    async fn test_delete_sends_public_ids_as_repeated_query_params() {
        let (store, seen) = stub_store("demo").await;
        let ids = [AssetId::from("shop/a"), AssetId::from("shop/gone")];

        let outcome = store.delete_resources(&ids).await.unwrap();

        assert_eq!(outcome.deleted, vec![AssetId::from("shop/a")]);
        assert_eq!(outcome.not_found, vec![AssetId::from("shop/gone")]);
        assert!(outcome.other.is_empty());
        assert_eq!(outcome.settled(), 2);

        let requests = seen.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::DELETE);
        assert_eq!(requests[0].path, "/v1_1/demo/resources/image/upload");
        assert_eq!(requests[0].public_ids, vec!["shop/a", "shop/gone"]);
        assert_eq!(
            requests[0].authorization.as_deref(),
            Some("Basic MTIzNDpzM2NyM3Q=")
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials_surface_the_error_message() {
        let (store, _) = stub_store("locked").await;

        match store.delete_resources(&[AssetId::from("shop/a")]).await {
            Err(AssetStoreError::Status { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid Signature");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }
}
