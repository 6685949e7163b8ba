//! Post generation, image rendering and service routes

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use std::sync::Arc;

use super::error::{ApiError, MISSING_TEXT};
use super::{ApiResult, AppState, parse_json};
use crate::model::NewQuotePost;
use crate::render::presets::{self, StylePreset};
use crate::render::{RenderedImage, sanitize, validate};

fn png_response(image: RenderedImage, attachment: Option<String>) -> Response {
    let mut response = image.png.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=3600"));
    if let Ok(etag) = HeaderValue::from_str(&image.etag) {
        headers.insert(header::ETAG, etag);
    }
    if let Some(disposition) = attachment.and_then(|d| HeaderValue::from_str(&d).ok()) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    response
}

/// Pick a thematically consistent core value, supporting value and quote
/// and record them as a new unpublished post
pub async fn generate_random_post(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let data = store
        .random_post_data(&mut rand::thread_rng())
        .map_err(|e| state.fail(e, "Failed to generate thematically matched post"))?;

    let Some(data) = data else {
        let stats = store.stats().unwrap_or_default();
        tracing::warn!(
            core_values = stats.core_values,
            supporting_values = stats.supporting_values,
            quotes = stats.quotes,
            "random post generation found no related data"
        );
        return Err(ApiError::invalid_request(
            "Not enough thematically related data available in the database.",
        ));
    };

    let post = store
        .create_quote_post(NewQuotePost {
            core_value_id: data.core_value.id.clone(),
            supporting_value_id: data.supporting_value.id.clone(),
            quote_id: data.quote.quote.id.clone(),
            ..Default::default()
        })
        .map_err(|e| state.fail(e, "Failed to generate thematically matched post"))?;
    tracing::info!(post = %post.id, core_value = %data.core_value.value, "random post created");

    Ok(Json(json!({
        "quotePost": post,
        "preview": {
            "coreValue": data.core_value.value,
            "supportingValue": data.supporting_value.value,
            "quote": data.quote.quote.text,
            "author": data.quote.author_name(),
        },
        "relationships": {
            "coreValueId": data.core_value.id,
            "supportingValueId": data.supporting_value.id,
            "quoteId": data.quote.quote.id,
            "authorId": data.quote.author.as_ref().map(|a| a.id.as_str()),
        },
    })))
}

pub async fn generate_image(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Response> {
    let body = parse_json(&body)?;
    let input = validate::validate_quote(&body).map_err(ApiError::validation_fields)?;
    let input = sanitize::sanitize_quote(&input);

    let image = state
        .renderer
        .render_quote(&input)
        .await
        .map_err(|e| state.fail(e, "Failed to generate image"))?;
    Ok(png_response(image, None))
}

pub async fn generate_post_image(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Response> {
    let body = parse_json(&body).map_err(|_| ApiError::invalid_request("Quote post ID is required"))?;
    let post_id = body
        .get("quotePostId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::invalid_request("Quote post ID is required"))?;

    let post = {
        let store = state.store.lock().await;
        store
            .get_quote_post(post_id)
            .map_err(|e| state.fail(e, "Failed to generate image"))?
    };
    let post = post.ok_or_else(|| ApiError::not_found("Quote post"))?;

    let image = state
        .renderer
        .render_post(&post)
        .await
        .map_err(|e| state.fail(e, "Failed to generate image"))?;
    let attachment = format!("attachment; filename=\"quote-post-{}.png\"", post.post.id);
    Ok(png_response(image, Some(attachment)))
}

pub async fn generate_text_image(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Response> {
    let body = parse_json(&body)?;
    let text = body
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, MISSING_TEXT, "Text is required"))?;

    let image = state
        .renderer
        .render_text(text)
        .await
        .map_err(|e| state.fail(e, "Failed to generate image"))?;
    Ok(png_response(image, None))
}

pub async fn styles() -> Json<Vec<&'static StylePreset>> {
    Json(presets::active_presets().collect())
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let browser_healthy = state.renderer.is_healthy();
    let backend = state.store.lock().await.backend();
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "backend": backend.as_str(),
        "browser": {
            "healthy": browser_healthy,
        },
    }))
}
