//! HTTP implementation of [`Backend`] on top of [`reqwest`].
//!
//! All paths are appended to the configured base (which already includes the
//! `/api` prefix), e.g. `http://127.0.0.1:5173/api` + `/articles`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::error_message;
use super::models::CollectStatus;
use super::{
    ApiError, Article, ArticleQuery, Backend, CollectRunResult, FeedKind, Health, Source,
    SourceCollectResult, SourceDraft, SourcePatch, Tag,
};
use crate::probe::{self, ProbeError, ProbeReport};

pub struct HttpBackend {
    http: Client,
    base: String,
}

impl HttpBackend {
    /// Create a client for the service rooted at `base`.
    ///
    /// `timeout` bounds every request; `None` keeps the transport default.
    pub fn new(base: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            base: base.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.http.get(self.endpoint(path)).send().await?;
        read_json(response).await
    }

    async fn send_json<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .request(method, self.endpoint(path))
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    /// POST with no body and decode whatever JSON comes back, whatever the
    /// status.  Returns the status alongside so callers can annotate
    /// failures.
    async fn trigger<T>(&self, path: &str) -> Result<(T, reqwest::StatusCode, Vec<u8>), ApiError>
    where
        T: DeserializeOwned + Default,
    {
        let response = self.http.post(self.endpoint(path)).send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        let parsed = serde_json::from_slice(&body).unwrap_or_else(|err| {
            tracing::warn!(path, %status, error = %err, "collection response was not a result object");
            T::default()
        });
        Ok((parsed, status, body))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(ApiError::status(status, &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl Backend for HttpBackend {
    async fn health(&self) -> Result<Health, ApiError> {
        self.get_json("/health").await
    }

    async fn list_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>, ApiError> {
        let response = self
            .http
            .get(self.endpoint("/articles"))
            .query(&query.pairs())
            .send()
            .await?;
        read_json(response).await
    }

    async fn list_sources(&self) -> Result<Vec<Source>, ApiError> {
        self.get_json("/sources").await
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.get_json("/tags").await
    }

    async fn create_source(&self, draft: &SourceDraft) -> Result<Source, ApiError> {
        self.send_json(reqwest::Method::POST, "/sources", draft).await
    }

    async fn update_source(&self, id: i64, patch: &SourcePatch) -> Result<Source, ApiError> {
        self.send_json(reqwest::Method::PATCH, &format!("/sources/{id}"), patch)
            .await
    }

    async fn delete_source(&self, id: i64) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/sources/{id}")))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await?;
        Err(ApiError::status(status, &body))
    }

    async fn collect_all(&self) -> Result<CollectRunResult, ApiError> {
        let (mut result, status, body): (CollectRunResult, _, _) =
            self.trigger("/collect/run").await?;
        if !status.is_success() && result.errors.is_empty() {
            result.errors.push(error_message(status, &body));
        }
        Ok(result)
    }

    async fn collect_source(&self, id: i64) -> Result<SourceCollectResult, ApiError> {
        let (mut result, status, body): (SourceCollectResult, _, _) =
            self.trigger(&format!("/collect/run/{id}")).await?;
        if !status.is_success() && !result.ok && result.error.is_none() {
            result.error = Some(error_message(status, &body));
        }
        Ok(result)
    }

    async fn collect_status(&self) -> Result<Option<CollectRunResult>, ApiError> {
        let status: CollectStatus = self.get_json("/collect/status").await?;
        Ok(status.last_run)
    }

    async fn probe_feed(&self, kind: FeedKind, url: &str) -> Result<ProbeReport, ProbeError> {
        probe::fetch(&self.http, kind, url).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Bytes,
        extract::{Path, RawQuery, State},
        http::StatusCode,
        response::IntoResponse,
        routing::{get, patch, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::{net::TcpListener, sync::Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Recorded {
        queries: Arc<Mutex<Vec<Option<String>>>>,
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    async fn list_articles(
        State(recorded): State<Recorded>,
        RawQuery(query): RawQuery,
    ) -> Json<Value> {
        recorded.queries.lock().await.push(query);
        Json(json!([{"id": 1, "title": "X", "tags": []}]))
    }

    async fn create_source(State(recorded): State<Recorded>, body: Bytes) -> impl IntoResponse {
        let body: Value = serde_json::from_slice(&body).unwrap();
        recorded.bodies.lock().await.push(body.clone());
        (
            StatusCode::CREATED,
            Json(json!({
                "id": 9,
                "name": body["name"],
                "type_or_kind": body["type_or_kind"],
                "url_or_config": body["url_or_config"],
                "created_at": "2024-05-01T10:00:00"
            })),
        )
    }

    async fn update_source(Path(id): Path<i64>) -> impl IntoResponse {
        if id == 5 {
            return (StatusCode::BAD_REQUEST, Json(json!({"detail": "name exists"}))).into_response();
        }
        (StatusCode::NOT_FOUND, Json(json!({"detail": "Source not found"}))).into_response()
    }

    async fn delete_source(Path(id): Path<i64>) -> StatusCode {
        if id == 1 {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::NOT_FOUND
        }
    }

    async fn collect_run() -> Json<Value> {
        Json(json!({
            "sources_ok": 2,
            "sources_fail": 1,
            "articles_added": 4,
            "errors": ["timeout"]
        }))
    }

    async fn collect_one(Path(id): Path<i64>) -> impl IntoResponse {
        match id {
            1 => (StatusCode::OK, Json(json!({"ok": true, "articles_added": 3}))).into_response(),
            2 => (StatusCode::OK, Json(json!({"ok": false, "error": "403 Forbidden"}))).into_response(),
            _ => (StatusCode::NOT_FOUND, Json(json!({"detail": "Source not found"}))).into_response(),
        }
    }

    async fn spawn_api(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = Router::new().nest("/api", router);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}/api")
    }

    async fn spawn_full_api() -> (String, Recorded) {
        let recorded = Recorded::default();
        let router = Router::new()
            .route(
                "/health",
                get(|| async { Json(json!({"status": "ok", "service": "HotspotCollection"})) }),
            )
            .route("/articles", get(list_articles))
            .route("/sources", post(create_source))
            .route("/sources/:id", patch(update_source).delete(delete_source))
            .route("/collect/run", post(collect_run))
            .route("/collect/run/:id", post(collect_one))
            .route(
                "/collect/status",
                get(|| async { Json(json!({"last_run": null, "message": "never run"})) }),
            )
            .with_state(recorded.clone());
        (spawn_api(router).await, recorded)
    }

    #[tokio::test]
    async fn health_decodes_status_and_service() {
        let (base, _) = spawn_full_api().await;
        let backend = HttpBackend::new(base, None).unwrap();
        let health = backend.health().await.unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.service, "HotspotCollection");
    }

    #[tokio::test]
    async fn list_articles_sends_only_set_filters() {
        let (base, recorded) = spawn_full_api().await;
        let backend = HttpBackend::new(format!("{base}/"), None).unwrap();
        let query = ArticleQuery {
            source_id: Some(3),
            tag_id: None,
            date_from: None,
            date_to: None,
            limit: 20,
            offset: 0,
        };

        let articles = backend.list_articles(&query).await.unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "X");
        assert!(articles[0].tags.is_empty());
        assert_eq!(
            recorded.queries.lock().await.as_slice(),
            &[Some("source_id=3&limit=20&offset=0".to_string())]
        );
    }

    #[tokio::test]
    async fn create_source_posts_draft() {
        let (base, recorded) = spawn_full_api().await;
        let backend = HttpBackend::new(base, None).unwrap();
        let draft = SourceDraft {
            name: "HN".into(),
            type_or_kind: Some("rss".into()),
            url_or_config: None,
        };

        let created = backend.create_source(&draft).await.unwrap();

        assert_eq!(created.id, 9);
        assert_eq!(created.kind.as_deref(), Some("rss"));
        assert!(created.created_at.is_some());
        assert_eq!(
            recorded.bodies.lock().await.as_slice(),
            &[json!({"name": "HN", "type_or_kind": "rss", "url_or_config": null})]
        );
    }

    #[tokio::test]
    async fn update_rejection_surfaces_detail() {
        let (base, _) = spawn_full_api().await;
        let backend = HttpBackend::new(base, None).unwrap();
        let patch = SourcePatch {
            name: Some("dup".into()),
            ..SourcePatch::default()
        };

        let err = backend.update_source(5, &patch).await.unwrap_err();

        match err {
            ApiError::Status { status, message } => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert_eq!(message, "name exists");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_accepts_no_content_and_reports_missing() {
        let (base, _) = spawn_full_api().await;
        let backend = HttpBackend::new(base, None).unwrap();

        backend.delete_source(1).await.unwrap();
        let err = backend.delete_source(2).await.unwrap_err();
        assert_eq!(err.to_string(), "Source not found");
    }

    #[tokio::test]
    async fn collect_all_decodes_result() {
        let (base, _) = spawn_full_api().await;
        let backend = HttpBackend::new(base, None).unwrap();

        let result = backend.collect_all().await.unwrap();

        assert_eq!(
            result,
            CollectRunResult {
                sources_ok: 2,
                sources_fail: 1,
                articles_added: 4,
                errors: vec!["timeout".into()],
            }
        );
    }

    #[tokio::test]
    async fn collect_all_degrades_on_non_json_failure() {
        let router = Router::new().route(
            "/collect/run",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let backend = HttpBackend::new(spawn_api(router).await, None).unwrap();

        let result = backend.collect_all().await.unwrap();

        assert_eq!(result.sources_ok, 0);
        assert_eq!(result.articles_added, 0);
        assert_eq!(result.errors, vec!["Internal Server Error".to_string()]);
    }

    #[tokio::test]
    async fn collect_source_reports_each_shape() {
        let (base, _) = spawn_full_api().await;
        let backend = HttpBackend::new(base, None).unwrap();

        let ok = backend.collect_source(1).await.unwrap();
        assert!(ok.ok);
        assert_eq!(ok.articles_added, Some(3));

        let failed = backend.collect_source(2).await.unwrap();
        assert!(!failed.ok);
        assert_eq!(failed.error.as_deref(), Some("403 Forbidden"));

        let missing = backend.collect_source(77).await.unwrap();
        assert!(!missing.ok);
        assert_eq!(missing.error.as_deref(), Some("Source not found"));
    }

    #[tokio::test]
    async fn collect_status_without_previous_run() {
        let (base, _) = spawn_full_api().await;
        let backend = HttpBackend::new(base, None).unwrap();
        assert!(backend.collect_status().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_reported() {
        // Bind and drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(format!("http://{addr}/api"), None).unwrap();
        let err = backend.list_sources().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn decode_failure_is_reported() {
        let router = Router::new().route("/tags", get(|| async { Json(json!({"tags": []})) }));
        let backend = HttpBackend::new(spawn_api(router).await, None).unwrap();

        let err = backend.list_tags().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn probe_feed_parses_api_rows() {
        let router = Router::new().route(
            "/feed.json",
            get(|| async { Json(json!([{"title": "A", "url": "https://a"}, {"title": "B"}])) }),
        );
        let base = spawn_api(router).await;
        let backend = HttpBackend::new(base.clone(), None).unwrap();

        let report = backend
            .probe_feed(FeedKind::Api, &format!("{base}/feed.json"))
            .await
            .unwrap();
        assert_eq!(report.usable, 1);
        assert_eq!(report.skipped, 1);
    }
    #[tokio::test]
    async fn feed_check_sends_browser_agent_and_follows_redirects() {
        async fn guarded_feed(headers: axum::http::HeaderMap) -> impl IntoResponse {
            let agent = headers
                .get(axum::http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if !agent.starts_with("Mozilla/5.0") {
                return StatusCode::FORBIDDEN.into_response();
            }
            let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>T</title><id>urn:f</id>
<updated>2024-01-01T00:00:00Z</updated><entry><title>Moved</title><id>urn:1</id>
<updated>2024-01-01T00:00:00Z</updated><link href="https://example.com/1"/></entry></feed>"#;
            ([(axum::http::header::CONTENT_TYPE, "application/atom+xml")], atom).into_response()
        }

        let router = Router::new()
            .route("/feed.xml", get(guarded_feed))
            .route(
                "/old.xml",
                get(|| async { axum::response::Redirect::permanent("/api/feed.xml") }),
            );
        let base = spawn_api(router).await;
        let backend = HttpBackend::new(base.clone(), None).unwrap();

        let report = backend
            .probe_feed(FeedKind::Rss, &format!("{base}/old.xml"))
            .await
            .unwrap();
        assert_eq!(report.usable, 1);
        assert_eq!(report.first_title.as_deref(), Some("Moved"));
    }
}
