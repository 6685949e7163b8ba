//! HTTP integration tests against a server on an ephemeral port

use std::sync::Arc;

use anchorpost::SqliteStore;
use anchorpost::config::AnchorConfig;
use anchorpost::render::{Rasterizer, Renderer};
use anchorpost::server::{self, AppState};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

struct FakeRasterizer;

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn screenshot(&self, _html: &str, _width: u32, _height: u32) -> anchorpost::Result<Vec<u8>> {
        Ok(FAKE_PNG.to_vec())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let mut config = AnchorConfig::default();
        config.rate_limit.max_requests = 1_000;
        Self::with_config(config).await
    }

    async fn with_config(config: AnchorConfig) -> Self {
        let store = Box::new(SqliteStore::open_in_memory().unwrap());
        let renderer = Renderer::new(Arc::new(FakeRasterizer), 8);
        let state = Arc::new(AppState::new(config, store, renderer));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server::serve_on(listener, state));

        Self {
            base: format!("http://{}", addr),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap_or(Value::Null))
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    /// Core value + linked supporting value + linked quote
    async fn linked_data(&self) -> (String, String, String) {
        let (_, cv) = self.post("/api/admin/core-values", json!({ "value": "Growth" })).await;
        let cv_id = cv["id"].as_str().unwrap().to_string();
        let (_, sv) = self
            .post("/api/admin/supporting-values", json!({ "value": "Curiosity", "coreValueId": cv_id }))
            .await;
        let (_, quote) = self
            .post(
                "/api/admin/quotes",
                json!({
                    "text": "The only way to grow is to keep learning.",
                    "authorName": "Jane Doe",
                    "coreValueIds": [cv_id],
                }),
            )
            .await;
        (
            cv_id,
            sv["id"].as_str().unwrap().to_string(),
            quote["id"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_core_value_crud() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/api/admin/core-values", json!({ "value": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, created) = server
        .post("/api/admin/core-values", json!({ "value": " Balance ", "description": "Harmony" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["value"], "Balance");
    assert_eq!(created["isActive"], true);
    let id = created["id"].as_str().unwrap().to_string();
    let path = format!("/api/admin/core-values/{}", id);

    let (status, fetched) = server.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["supportingValues"], json!([]));
    assert_eq!(fetched["quotes"], json!([]));

    let (status, updated) = server
        .send(reqwest::Method::PUT, &path, json!({ "description": "Finding harmony" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["value"], "Balance");
    assert_eq!(updated["description"], "Finding harmony");

    let (status, body) = server.send(reqwest::Method::PATCH, &path, json!({ "action": "archive" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (_, list) = server.get("/api/admin/core-values").await;
    assert_eq!(list, json!([]));

    let (status, _) = server.send(reqwest::Method::PATCH, &path, json!({ "action": "explode" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    server.send(reqwest::Method::PATCH, &path, json!({ "action": "restore" })).await;
    let (_, list) = server.get("/api/admin/core-values").await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, _) = server.send(reqwest::Method::DELETE, &path, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = server.send(reqwest::Method::DELETE, &path, Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Core value not found");

    let (status, _) = server.get("/api/admin/core-values/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_supporting_values_and_quotes_links() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/api/admin/supporting-values", json!({ "value": "Patience" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "At least one core value is required");

    let (status, body) = server
        .post("/api/admin/supporting-values", json!({ "value": "Patience", "coreValueId": "missing" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (cv_id, sv_id, quote_id) = server.linked_data().await;

    let (_, sv) = server.get(&format!("/api/admin/supporting-values/{}", sv_id)).await;
    assert_eq!(sv["coreValueIds"], json!([cv_id]));

    let (_, filtered) = server
        .get(&format!("/api/admin/supporting-values?coreValueId={}", cv_id))
        .await;
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    let (_, filtered) = server.get("/api/admin/supporting-values?coreValueId=other").await;
    assert_eq!(filtered, json!([]));

    // Alias path, author created on the fly
    let (status, quote) = server.get(&format!("/api/admin/quotes-relational/{}", quote_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["author"]["name"], "Jane Doe");
    assert_eq!(quote["coreValueIds"], json!([cv_id]));

    let (_, authors) = server.get("/api/admin/authors").await;
    assert_eq!(authors.as_array().unwrap().len(), 1);

    // Same name reuses the author
    let (status, _) = server
        .post("/api/admin/quotes", json!({ "text": "Another line about growth.", "authorName": "Jane Doe" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, authors) = server.get("/api/admin/authors").await;
    assert_eq!(authors.as_array().unwrap().len(), 1);

    let (_, for_core) = server.get(&format!("/api/admin/quotes?coreValueId={}", cv_id)).await;
    assert_eq!(for_core.as_array().unwrap().len(), 1);

    let (status, body) = server.post("/api/admin/quotes", json!({ "authorName": "Nobody" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // Deleting the core value drops its links
    server
        .send(reqwest::Method::DELETE, &format!("/api/admin/core-values/{}", cv_id), Value::Null)
        .await;
    let (_, sv) = server.get(&format!("/api/admin/supporting-values/{}", sv_id)).await;
    assert_eq!(sv["coreValueIds"], json!([]));
}

#[tokio::test]
async fn test_random_post_and_post_image() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/api/generate-random-post", Value::Null).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Not enough"));

    let (cv_id, sv_id, quote_id) = server.linked_data().await;
    let (status, generated) = server.post("/api/generate-random-post-relational", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(generated["relationships"]["coreValueId"], cv_id.as_str());
    assert_eq!(generated["relationships"]["supportingValueId"], sv_id.as_str());
    assert_eq!(generated["relationships"]["quoteId"], quote_id.as_str());
    assert_eq!(generated["preview"]["author"], "Jane Doe");
    assert_eq!(generated["quotePost"]["isPublished"], false);
    let post_id = generated["quotePost"]["id"].as_str().unwrap().to_string();

    let (_, posts) = server.get("/api/admin/posts").await;
    assert_eq!(posts[0]["id"], post_id.as_str());
    assert_eq!(posts[0]["coreValue"]["value"], "Growth");

    let resp = server
        .client
        .post(server.url("/api/generate-post-image"))
        .json(&json!({ "quotePostId": post_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(
        resp.headers()["content-disposition"],
        format!("attachment; filename=\"quote-post-{}.png\"", post_id).as_str()
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), FAKE_PNG);

    let (status, body) = server.post("/api/generate-post-image", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
    let (status, body) = server.post("/api/generate-post-image", json!({ "quotePostId": "nope" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, updated) = server
        .send(
            reqwest::Method::PATCH,
            &format!("/api/admin/posts/{}", post_id),
            json!({ "isPublished": true, "metaPostId": "meta-1" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isPublished"], true);
    assert!(updated["publishedAt"].is_string());

    let (_, stats) = server.get("/api/admin/stats").await;
    assert_eq!(stats["posts"], 1);
    assert_eq!(stats["publishedPosts"], 1);
}

#[tokio::test]
async fn test_generate_image_validation_and_headers() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/api/generate-image"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_JSON");

    let (status, body) = server
        .post("/api/generate-image", json!({ "coreValue": "Growth", "quote": "short" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["fields"]["supportingValue"], "Supporting value is required");
    assert_eq!(body["fields"]["quote"], "Quote must be at least 10 characters");

    let card = json!({
        "coreValue": "Growth",
        "supportingValue": "Curiosity",
        "quote": "Stay hungry, <b>stay</b> foolish.",
        "style": "daily-anchor-2",
    });
    let resp = server.client.post(server.url("/api/generate-image")).json(&card).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "image/png");
    assert_eq!(resp.headers()["cache-control"], "public, max-age=3600");
    assert!(resp.headers().contains_key("etag"));
    assert_eq!(resp.headers()["x-ratelimit-limit"], "1000");
    // Invalid and rejected bodies above still count
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "997");

    let (status, body) = server.post("/api/generate-text-image", json!({ "text": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "MISSING_TEXT");

    let resp = server
        .client
        .post(server.url("/api/generate-text-image"))
        .json(&json!({ "text": "Be **bold**" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_exhausts() {
    let mut config = AnchorConfig::default();
    config.rate_limit.max_requests = 2;
    let server = TestServer::with_config(config).await;

    let send = || {
        server
            .client
            .post(server.url("/api/generate-text-image"))
            .header("x-forwarded-for", "203.0.113.7")
            .json(&json!({ "text": "Hello" }))
            .send()
    };
    assert_eq!(send().await.unwrap().status(), StatusCode::OK);
    assert_eq!(send().await.unwrap().status(), StatusCode::OK);

    let resp = send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "0");
    assert!(resp.headers().contains_key("x-ratelimit-reset"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");

    // Admin routes are not limited
    let (status, _) = server.get("/api/admin/stats").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_seed_styles_health_and_pages() {
    let server = TestServer::start().await;

    let (status, body) = server.post("/api/admin/seed", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "samples");
    assert_eq!(body["summary"]["coreValues"], 3);
    let (_, body) = server.post("/api/admin/seed", Value::Null).await;
    assert_eq!(body["seeded"], false);

    let (_, check) = server.get("/api/debug/data-check").await;
    assert_eq!(check["counts"]["coreValues"], 3);
    assert_eq!(check["samples"]["coreValues"].as_array().unwrap().len(), 2);

    let (_, dump) = server.get("/api/admin/debug/db-structure").await;
    assert_eq!(dump["coreValueSupportingValues"].as_array().unwrap().len(), 2);

    let (status, report) = server.get("/api/admin/analyze-data").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["coreValues"].as_array().unwrap().len(), 3);

    let (status, body) = server.post("/api/admin/seed-notion", Value::Null).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (_, styles) = server.get("/api/styles").await;
    assert_eq!(styles[0]["id"], "daily-anchor-2");

    let (_, health) = server.get("/api/health").await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["browser"]["healthy"], true);
    assert_eq!(health["backend"], "sqlite");

    for page in ["/admin", "/admin/values", "/admin/quotes", "/admin/posts", "/admin/image-gen", "/admin/post-generator"] {
        let resp = server.client.get(server.url(page)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", page);
        let html = resp.text().await.unwrap();
        assert!(html.contains("<nav>"), "{}", page);
    }
    let html = server.client.get(server.url("/admin/values")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("Authenticity"));
}

#[tokio::test]
async fn test_failed_quote_write_creates_no_author() {
    let server = TestServer::start().await;

    let (status, body) = server
        .post(
            "/api/admin/quotes",
            json!({
                "text": "A quote that never lands anywhere.",
                "authorName": "Orphan Writer",
                "coreValueIds": ["missing-id"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Core value not found");

    let (status, _) = server
        .send(
            reqwest::Method::PUT,
            "/api/admin/quotes/missing-quote",
            json!({ "authorName": "Ghost Writer" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, quote) = server
        .post("/api/admin/quotes", json!({ "text": "An existing quote to relink." }))
        .await;
    let path = format!("/api/admin/quotes/{}", quote["id"].as_str().unwrap());
    let (status, _) = server
        .send(
            reqwest::Method::PUT,
            &path,
            json!({ "authorName": "Late Writer", "coreValueIds": ["missing-id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, authors) = server.get("/api/admin/authors").await;
    assert_eq!(authors, json!([]));
}

#[tokio::test]
async fn test_update_quote_detaches_author() {
    let server = TestServer::start().await;
    let (_, _, quote_id) = server.linked_data().await;
    let path = format!("/api/admin/quotes/{}", quote_id);

    // Absent authorId keeps the author
    let (status, quote) = server.send(reqwest::Method::PUT, &path, json!({ "source": "Notebook" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["author"]["name"], "Jane Doe");

    let (status, quote) = server.send(reqwest::Method::PUT, &path, json!({ "authorId": null })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(quote.get("author").is_none());
    assert!(quote["authorId"].is_null());

    let (_, quote) = server.send(reqwest::Method::PUT, &path, json!({ "authorName": "Jane Doe" })).await;
    assert_eq!(quote["author"]["name"], "Jane Doe");
    let (_, quote) = server.send(reqwest::Method::PUT, &path, json!({ "authorId": "" })).await;
    assert!(quote.get("author").is_none());
}

#[tokio::test]
async fn test_value_pages_offer_forms_and_deletes() {
    let server = TestServer::start().await;
    let (cv_id, sv_id, quote_id) = server.linked_data().await;

    let values = server.client.get(server.url("/admin/values")).send().await.unwrap().text().await.unwrap();
    assert!(values.contains("'POST', '/api/admin/supporting-values'"));
    assert!(values.contains(&format!(r#"<option value="{}">Growth</option>"#, cv_id)));
    assert!(values.contains(&format!("'DELETE', '/api/admin/core-values/{}'", cv_id)));
    assert!(values.contains(&format!("'DELETE', '/api/admin/supporting-values/{}'", sv_id)));

    let quotes = server.client.get(server.url("/admin/quotes")).send().await.unwrap().text().await.unwrap();
    assert!(quotes.contains(r#"<select name="coreValueId">"#));
    assert!(quotes.contains(&format!(r#"<option value="{}">Growth</option>"#, cv_id)));
    assert!(quotes.contains(&format!("'DELETE', '/api/admin/quotes/{}'", quote_id)));
}
