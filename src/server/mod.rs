//! HTTP server: admin REST API, image generation and admin pages

use axum::{
    Router,
    body::Bytes,
    middleware,
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::Error;
use crate::config::AnchorConfig;
use crate::render::Renderer;
use crate::storage::{self, Store};

pub mod admin;
pub mod error;
pub mod generate;
pub mod pages;
pub mod rate_limit;

use error::ApiError;
use rate_limit::RateLimiter;

pub type ApiResult<T> = Result<T, ApiError>;

/// Server state
pub struct AppState {
    /// Every handler goes through this lock, so writes are serialized
    pub store: Mutex<Box<dyn Store>>,
    pub renderer: Renderer,
    pub rate_limiter: RateLimiter,
    pub config: AnchorConfig,
}

impl AppState {
    pub fn new(config: AnchorConfig, store: Box<dyn Store>, renderer: Renderer) -> Self {
        Self {
            store: Mutex::new(store),
            renderer,
            rate_limiter: RateLimiter::new(&config.rate_limit),
            config,
        }
    }

    /// Log `err` and turn it into a response, exposing detail only when configured
    pub fn fail(&self, err: Error, context: &str) -> ApiError {
        ApiError::from_error(err, context, self.config.server.expose_errors)
    }
}

/// Parse a request body that must be JSON
pub(crate) fn parse_json(body: &Bytes) -> ApiResult<Value> {
    serde_json::from_slice(body).map_err(|_| ApiError::invalid_json())
}

/// Parse a JSON body into `T`; shape mismatches are `INVALID_REQUEST`
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    let value = parse_json(body)?;
    serde_json::from_value(value).map_err(|e| ApiError::invalid_request(format!("Invalid request body: {}", e)))
}

pub fn router(state: Arc<AppState>) -> Router {
    let generation = Router::new()
        .route("/api/generate-image", post(generate::generate_image))
        .route("/api/generate-post-image", post(generate::generate_post_image))
        .route("/api/generate-text-image", post(generate::generate_text_image))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit::limit_generation));

    let mut app = Router::new()
        // Core values
        .route(
            "/api/admin/core-values",
            get(admin::list_core_values).post(admin::create_core_value),
        )
        .route(
            "/api/admin/core-values/{id}",
            get(admin::get_core_value)
                .put(admin::update_core_value)
                .patch(admin::patch_core_value)
                .delete(admin::delete_core_value),
        )
        // Supporting values
        .route(
            "/api/admin/supporting-values",
            get(admin::list_supporting_values).post(admin::create_supporting_value),
        )
        .route(
            "/api/admin/supporting-values/{id}",
            get(admin::get_supporting_value)
                .put(admin::update_supporting_value)
                .patch(admin::patch_supporting_value)
                .delete(admin::delete_supporting_value),
        )
        // Authors
        .route("/api/admin/authors", get(admin::list_authors).post(admin::create_author))
        .route(
            "/api/admin/authors/{id}",
            get(admin::get_author)
                .put(admin::update_author)
                .patch(admin::patch_author)
                .delete(admin::delete_author),
        );

    for base in ["/api/admin/quotes", "/api/admin/quotes-relational"] {
        app = app
            .route(base, get(admin::list_quotes).post(admin::create_quote))
            .route(
                &format!("{}/{{id}}", base),
                get(admin::get_quote)
                    .put(admin::update_quote)
                    .patch(admin::patch_quote)
                    .delete(admin::delete_quote),
            );
    }

    let mut app = app
        .route("/api/admin/posts", get(admin::list_posts))
        .route("/api/admin/posts-relational", get(admin::list_posts))
        .route("/api/admin/posts/{id}", get(admin::get_post).patch(admin::update_post))
        .route("/api/admin/stats", get(admin::stats))
        .route("/api/admin/seed", post(admin::seed))
        .route("/api/admin/seed-notion", post(admin::seed_notion))
        .route("/api/admin/analyze-data", get(admin::analyze_data))
        .route("/api/admin/debug/db-structure", get(admin::db_structure))
        .route("/api/debug/data-check", get(admin::data_check))
        .route("/api/generate-random-post", post(generate::generate_random_post))
        .route("/api/generate-random-post-relational", post(generate::generate_random_post))
        .route("/api/styles", get(generate::styles))
        .route("/api/health", get(generate::health))
        .route("/admin", get(pages::dashboard))
        .route("/admin/values", get(pages::values))
        .route("/admin/quotes", get(pages::quotes))
        .route("/admin/posts", get(pages::posts))
        .route("/admin/image-gen", get(pages::image_gen))
        .route("/admin/post-generator", get(pages::post_generator))
        .merge(generation);

    if let Some(dir) = &state.config.server.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on an already bound listener
pub async fn serve_on(listener: TcpListener, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

pub async fn start_server(config: AnchorConfig) -> anyhow::Result<()> {
    let store = storage::open_store(&config.storage)?;
    let renderer = Renderer::from_config(&config.render);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, store, renderer));

    let listener = TcpListener::bind(&addr).await?;
    let local = listener.local_addr()?;
    tracing::info!("Starting server on {}", local);
    println!("🌍 Server running at http://{}/admin", local);

    serve_on(listener, state).await
}
