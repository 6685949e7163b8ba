//! `/api/admin/*` CRUD routes and data utilities

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use std::sync::Arc;

use super::error::ApiError;
use super::{ApiResult, AppState, parse_body};
use crate::importer::{self, ImportSummary};
use crate::model::{
    Author, AuthorPatch, CoreValue, CoreValueWithRelations, Dataset, NewAuthor, NewQuote, NewValue, QuotePatch,
    QuotePost, QuotePostPatch, QuotePostWithData, QuoteWithAuthor, StoreStats, SupportingValueWithLinks, ValuePatch,
};
use crate::quality::{self, QualityReport};
use crate::storage::{self, SeedOutcome, Store};
use crate::Error;

// ========== Request bodies ==========

/// Body for core and supporting values
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValueBody {
    pub value: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub core_value_id: Option<String>,
    pub core_value_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorBody {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuoteBody {
    pub text: Option<String>,
    /// `null` or `""` detaches the author on update
    #[serde(deserialize_with = "explicit_null")]
    pub author_id: Option<Option<String>>,
    pub author_name: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub core_value_id: Option<String>,
    pub core_value_ids: Option<Vec<String>>,
}

/// Absent stays `None`; an explicit `null` becomes `Some(None)`
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActionBody {
    pub action: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreValueFilter {
    pub core_value_id: Option<String>,
}

enum Action {
    Archive,
    Restore,
}

fn parse_action(body: &Bytes) -> ApiResult<Action> {
    let body: ActionBody = parse_body(body)?;
    match body.action.as_deref() {
        Some("archive") => Ok(Action::Archive),
        Some("restore") => Ok(Action::Restore),
        _ => Err(ApiError::invalid_request("Invalid action. Use \"archive\" or \"restore\"")),
    }
}

/// Trimmed non-empty text, or a 400 naming the field
fn required(value: Option<String>, message: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation(message))
}

/// Like [`required`] but absent is fine (partial updates)
fn optional_non_blank(value: Option<String>, message: &str) -> ApiResult<Option<String>> {
    match value {
        None => Ok(None),
        some => required(some, message).map(Some),
    }
}

/// `coreValueIds` wins over `coreValueId`
fn core_value_ids(single: Option<String>, many: Option<Vec<String>>) -> Option<Vec<String>> {
    match (many, single) {
        (Some(many), _) => Some(many.into_iter().filter(|id| !id.trim().is_empty()).collect()),
        (None, Some(single)) if !single.trim().is_empty() => Some(vec![single]),
        _ => None,
    }
}

fn success() -> Json<Value> {
    Json(json!({ "success": true }))
}

// ========== Core values ==========

pub async fn list_core_values(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<CoreValue>>> {
    let store = state.store.lock().await;
    let values = store
        .list_core_values()
        .map_err(|e| state.fail(e, "Failed to fetch core values"))?;
    Ok(Json(values))
}

pub async fn create_core_value(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let body: ValueBody = parse_body(&body)?;
    let value = required(body.value, "Value is required")?;
    let input = NewValue {
        value,
        description: body.description,
        is_active: body.is_active.unwrap_or(true),
    };

    let mut store = state.store.lock().await;
    let created = store
        .create_core_value(input)
        .map_err(|e| state.fail(e, "Failed to create core value"))?;
    tracing::info!(id = %created.id, value = %created.value, "core value created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_core_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CoreValueWithRelations>> {
    let store = state.store.lock().await;
    store
        .get_core_value_with_relations(&id)
        .map_err(|e| state.fail(e, "Failed to fetch core value"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Core value"))
}

pub async fn update_core_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<CoreValue>> {
    let body: ValueBody = parse_body(&body)?;
    let patch = ValuePatch {
        value: optional_non_blank(body.value, "Value cannot be empty")?,
        description: body.description,
        is_active: body.is_active,
    };

    let mut store = state.store.lock().await;
    store
        .update_core_value(&id, patch)
        .map_err(|e| state.fail(e, "Failed to update core value"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Core value"))
}

pub async fn patch_core_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let action = parse_action(&body)?;
    let mut store = state.store.lock().await;
    let found = match action {
        Action::Archive => store.archive_core_value(&id),
        Action::Restore => store.restore_core_value(&id),
    }
    .map_err(|e| state.fail(e, "Failed to update core value"))?;
    if !found {
        return Err(ApiError::not_found("Core value"));
    }
    Ok(success())
}

pub async fn delete_core_value(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let deleted = store
        .delete_core_value(&id)
        .map_err(|e| state.fail(e, "Failed to delete core value"))?;
    if !deleted {
        return Err(ApiError::not_found("Core value"));
    }
    tracing::info!(id = %id, "core value deleted");
    Ok(success())
}

// ========== Supporting values ==========

pub async fn list_supporting_values(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CoreValueFilter>,
) -> ApiResult<Json<Vec<SupportingValueWithLinks>>> {
    let store = state.store.lock().await;
    let mut values = store
        .list_supporting_values()
        .map_err(|e| state.fail(e, "Failed to fetch supporting values"))?;
    if let Some(core_value_id) = filter.core_value_id {
        values.retain(|sv| sv.core_value_ids.contains(&core_value_id));
    }
    Ok(Json(values))
}

pub async fn create_supporting_value(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let body: ValueBody = parse_body(&body)?;
    let value = required(body.value, "Value is required")?;
    let ids = core_value_ids(body.core_value_id, body.core_value_ids).unwrap_or_default();
    if ids.is_empty() {
        return Err(ApiError::validation("At least one core value is required"));
    }
    let input = NewValue {
        value,
        description: body.description,
        is_active: body.is_active.unwrap_or(true),
    };

    let mut store = state.store.lock().await;
    let created = store
        .create_supporting_value(input, &ids)
        .map_err(|e| state.fail(e, "Failed to create supporting value"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_supporting_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<SupportingValueWithLinks>> {
    let store = state.store.lock().await;
    store
        .get_supporting_value(&id)
        .map_err(|e| state.fail(e, "Failed to fetch supporting value"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Supporting value"))
}

pub async fn update_supporting_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SupportingValueWithLinks>> {
    let body: ValueBody = parse_body(&body)?;
    let patch = ValuePatch {
        value: optional_non_blank(body.value, "Value cannot be empty")?,
        description: body.description,
        is_active: body.is_active,
    };
    let ids = core_value_ids(body.core_value_id, body.core_value_ids);
    if ids.as_ref().is_some_and(Vec::is_empty) {
        return Err(ApiError::validation("At least one core value is required"));
    }

    let mut store = state.store.lock().await;
    store
        .update_supporting_value(&id, patch, ids.as_deref())
        .map_err(|e| state.fail(e, "Failed to update supporting value"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Supporting value"))
}

pub async fn patch_supporting_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let action = parse_action(&body)?;
    let mut store = state.store.lock().await;
    let found = match action {
        Action::Archive => store.archive_supporting_value(&id),
        Action::Restore => store.restore_supporting_value(&id),
    }
    .map_err(|e| state.fail(e, "Failed to update supporting value"))?;
    if !found {
        return Err(ApiError::not_found("Supporting value"));
    }
    Ok(success())
}

pub async fn delete_supporting_value(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let deleted = store
        .delete_supporting_value(&id)
        .map_err(|e| state.fail(e, "Failed to delete supporting value"))?;
    if !deleted {
        return Err(ApiError::not_found("Supporting value"));
    }
    Ok(success())
}

// ========== Authors ==========

pub async fn list_authors(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Author>>> {
    let store = state.store.lock().await;
    let authors = store
        .list_authors()
        .map_err(|e| state.fail(e, "Failed to fetch authors"))?;
    Ok(Json(authors))
}

pub async fn create_author(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let body: AuthorBody = parse_body(&body)?;
    let name = required(body.name, "Name is required")?;
    let input = NewAuthor {
        name,
        is_active: body.is_active.unwrap_or(true),
    };

    let mut store = state.store.lock().await;
    let created = store
        .create_author(input)
        .map_err(|e| state.fail(e, "Failed to create author"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_author(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Author>> {
    let store = state.store.lock().await;
    store
        .get_author(&id)
        .map_err(|e| state.fail(e, "Failed to fetch author"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Author"))
}

pub async fn update_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Author>> {
    let body: AuthorBody = parse_body(&body)?;
    let patch = AuthorPatch {
        name: optional_non_blank(body.name, "Name cannot be empty")?,
        is_active: body.is_active,
    };

    let mut store = state.store.lock().await;
    store
        .update_author(&id, patch)
        .map_err(|e| state.fail(e, "Failed to update author"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Author"))
}

pub async fn patch_author(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let action = parse_action(&body)?;
    let mut store = state.store.lock().await;
    let found = match action {
        Action::Archive => store.archive_author(&id),
        Action::Restore => store.restore_author(&id),
    }
    .map_err(|e| state.fail(e, "Failed to update author"))?;
    if !found {
        return Err(ApiError::not_found("Author"));
    }
    Ok(success())
}

pub async fn delete_author(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let deleted = store
        .delete_author(&id)
        .map_err(|e| state.fail(e, "Failed to delete author"))?;
    if !deleted {
        return Err(ApiError::not_found("Author"));
    }
    Ok(success())
}

// ========== Quotes ==========

/// What a quote body asks for its author
#[derive(Debug, PartialEq)]
enum AuthorChange {
    Keep,
    Clear,
    Set(String),
}

impl AuthorChange {
    fn into_id(self) -> Option<String> {
        match self {
            AuthorChange::Set(id) => Some(id),
            AuthorChange::Keep | AuthorChange::Clear => None,
        }
    }

    /// Patch form: an empty id detaches
    fn into_patch(self) -> Option<String> {
        match self {
            AuthorChange::Keep => None,
            AuthorChange::Clear => Some(String::new()),
            AuthorChange::Set(id) => Some(id),
        }
    }
}

/// A non-blank `authorId`, else find-or-create by `authorName`, else clear
/// when `authorId` was sent as null or blank
fn resolve_author(
    store: &mut dyn Store,
    author_id: Option<Option<String>>,
    author_name: Option<String>,
) -> crate::Result<AuthorChange> {
    let author_id = author_id.map(|id| id.filter(|id| !id.trim().is_empty()));
    if let Some(Some(id)) = author_id {
        return Ok(AuthorChange::Set(id));
    }
    if let Some(name) = author_name.filter(|name| !name.trim().is_empty()) {
        return Ok(AuthorChange::Set(store.find_or_create_author(&name)?.id));
    }
    Ok(match author_id {
        Some(_) => AuthorChange::Clear,
        None => AuthorChange::Keep,
    })
}

/// Checked before any author is created so a failed write leaves nothing behind
fn require_core_values(store: &dyn Store, ids: &[String]) -> crate::Result<()> {
    for id in ids {
        if store.get_core_value(id)?.is_none() {
            return Err(Error::NotFound("Core value", id.clone()));
        }
    }
    Ok(())
}

pub async fn list_quotes(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CoreValueFilter>,
) -> ApiResult<Json<Vec<QuoteWithAuthor>>> {
    let store = state.store.lock().await;
    let quotes = match filter.core_value_id {
        Some(core_value_id) => store.list_quotes_for_core(&core_value_id),
        None => store.list_quotes(),
    }
    .map_err(|e| state.fail(e, "Failed to fetch quotes"))?;
    Ok(Json(quotes))
}

pub async fn create_quote(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<impl IntoResponse> {
    let body: QuoteBody = parse_body(&body)?;
    let text = required(body.text, "Quote text is required and must be a string")?;
    let ids = core_value_ids(body.core_value_id, body.core_value_ids).unwrap_or_default();

    let mut guard = state.store.lock().await;
    let store: &mut dyn Store = &mut **guard;
    let created = require_core_values(store, &ids)
        .and_then(|()| resolve_author(store, body.author_id, body.author_name))
        .and_then(|author| {
            let input = NewQuote {
                text,
                author_id: author.into_id(),
                source: body.source,
                category: body.category,
                tags: body.tags.unwrap_or_default(),
                is_active: body.is_active.unwrap_or(true),
            };
            store.create_quote(input, &ids)
        })
        .map_err(|e| state.fail(e, "Failed to create quote"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_quote(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<QuoteWithAuthor>> {
    let store = state.store.lock().await;
    store
        .get_quote(&id)
        .map_err(|e| state.fail(e, "Failed to fetch quote"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quote"))
}

pub async fn update_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<QuoteWithAuthor>> {
    let body: QuoteBody = parse_body(&body)?;
    let text = optional_non_blank(body.text, "Quote text cannot be empty")?;
    let ids = core_value_ids(body.core_value_id, body.core_value_ids);

    let mut guard = state.store.lock().await;
    let store: &mut dyn Store = &mut **guard;
    let updated = (|| -> crate::Result<Option<QuoteWithAuthor>> {
        if store.get_quote(&id)?.is_none() {
            return Ok(None);
        }
        if let Some(ids) = &ids {
            require_core_values(store, ids)?;
        }
        let author = resolve_author(store, body.author_id, body.author_name)?;
        let patch = QuotePatch {
            text,
            author_id: author.into_patch(),
            source: body.source,
            category: body.category,
            tags: body.tags,
            is_active: body.is_active,
        };
        store.update_quote(&id, patch, ids.as_deref())
    })()
    .map_err(|e| state.fail(e, "Failed to update quote"))?;
    updated.map(Json).ok_or_else(|| ApiError::not_found("Quote"))
}

pub async fn patch_quote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let action = parse_action(&body)?;
    let mut store = state.store.lock().await;
    let found = match action {
        Action::Archive => store.archive_quote(&id),
        Action::Restore => store.restore_quote(&id),
    }
    .map_err(|e| state.fail(e, "Failed to update quote"))?;
    if !found {
        return Err(ApiError::not_found("Quote"));
    }
    Ok(success())
}

pub async fn delete_quote(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let mut store = state.store.lock().await;
    let deleted = store
        .delete_quote(&id)
        .map_err(|e| state.fail(e, "Failed to delete quote"))?;
    if !deleted {
        return Err(ApiError::not_found("Quote"));
    }
    Ok(success())
}

// ========== Posts ==========

pub async fn list_posts(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<QuotePostWithData>>> {
    let store = state.store.lock().await;
    let posts = store
        .list_quote_posts()
        .map_err(|e| state.fail(e, "Failed to fetch posts"))?;
    Ok(Json(posts))
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<QuotePostWithData>> {
    let store = state.store.lock().await;
    store
        .get_quote_post(&id)
        .map_err(|e| state.fail(e, "Failed to fetch post"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quote post"))
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<QuotePost>> {
    let patch: QuotePostPatch = parse_body(&body)?;
    let mut store = state.store.lock().await;
    let updated = store
        .update_quote_post(&id, patch)
        .map_err(|e| state.fail(e, "Failed to update post"))?
        .ok_or_else(|| ApiError::not_found("Quote post"))?;
    tracing::info!(id = %updated.id, published = updated.is_published, "post updated");
    Ok(Json(updated))
}

// ========== Data utilities ==========

pub async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<StoreStats>> {
    let store = state.store.lock().await;
    let stats = store.stats().map_err(|e| state.fail(e, "Failed to fetch stats"))?;
    Ok(Json(stats))
}

pub async fn seed(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let csv_path = state.config.import.csv_path.clone();
    let mut guard = state.store.lock().await;
    let outcome = storage::seed_sample_data(&mut **guard, csv_path.as_deref())
        .map_err(|e| state.fail(e, "Failed to seed database"))?;

    let body = match outcome {
        SeedOutcome::AlreadySeeded => json!({
            "success": true,
            "seeded": false,
            "message": "Database already contains data",
        }),
        SeedOutcome::Imported(summary) => json!({
            "success": true,
            "seeded": true,
            "source": "csv",
            "message": format!("Imported {}", summary),
            "summary": summary,
        }),
        SeedOutcome::Samples(summary) => json!({
            "success": true,
            "seeded": true,
            "source": "samples",
            "message": format!("Inserted sample data: {}", summary),
            "summary": summary,
        }),
    };
    Ok(Json(body))
}

fn read_configured_csv(state: &AppState) -> ApiResult<String> {
    let path = state
        .config
        .import
        .csv_path
        .as_ref()
        .ok_or_else(|| ApiError::invalid_request("No Notion CSV export configured (import.csv_path)"))?;
    std::fs::read_to_string(path).map_err(|e| {
        state.fail(
            e.into(),
            "Failed to import Notion data. Make sure the CSV export exists at the configured path.",
        )
    })
}

pub async fn seed_notion(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let content = read_configured_csv(&state)?;
    let dataset = importer::parse_notion_csv(&content);
    let summary = ImportSummary::from(&dataset);

    let mut store = state.store.lock().await;
    store
        .replace_dataset(&dataset)
        .map_err(|e| state.fail(e, "Failed to import Notion data"))?;
    tracing::info!("{}", summary);

    Ok(Json(json!({
        "success": true,
        "message": format!("Imported {}", summary),
        "summary": summary,
    })))
}

/// Quality report of the configured CSV, or of the store when none is set
pub async fn analyze_data(State(state): State<Arc<AppState>>) -> ApiResult<Json<QualityReport>> {
    let dataset = if state.config.import.csv_path.is_some() {
        importer::parse_notion_csv(&read_configured_csv(&state)?)
    } else {
        let store = state.store.lock().await;
        store
            .export_dataset()
            .map_err(|e| state.fail(e, "Failed to analyze data"))?
    };
    Ok(Json(quality::analyze(&dataset)))
}

pub async fn db_structure(State(state): State<Arc<AppState>>) -> ApiResult<Json<Dataset>> {
    let store = state.store.lock().await;
    let dataset = store
        .export_dataset()
        .map_err(|e| state.fail(e, "Failed to read database"))?;
    Ok(Json(dataset))
}

pub async fn data_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let store = state.store.lock().await;
    let result = (|| -> crate::Result<Value> {
        let core_values = store.list_core_values()?;
        let supporting_values = store.list_supporting_values()?;
        let quotes = store.list_quotes()?;
        let authors = store.list_authors()?;
        Ok(json!({
            "status": "success",
            "backend": store.backend().as_str(),
            "counts": {
                "coreValues": core_values.len(),
                "supportingValues": supporting_values.len(),
                "quotes": quotes.len(),
                "authors": authors.len(),
            },
            "samples": {
                "coreValues": &core_values[..core_values.len().min(2)],
                "supportingValues": &supporting_values[..supporting_values.len().min(3)],
                "quotes": &quotes[..quotes.len().min(2)],
                "authors": &authors[..authors.len().min(2)],
            },
        }))
    })();
    result.map(Json).map_err(|e| state.fail(e, "Failed to check data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_value_ids_precedence() {
        assert_eq!(
            core_value_ids(Some("a".into()), Some(vec!["b".into(), " ".into()])),
            Some(vec!["b".to_string()])
        );
        assert_eq!(core_value_ids(Some("a".into()), None), Some(vec!["a".to_string()]));
        assert_eq!(core_value_ids(Some("  ".into()), None), None);
        assert_eq!(core_value_ids(None, None), None);
    }

    #[test]
    fn test_required_trims() {
        assert_eq!(required(Some("  Growth ".into()), "x").unwrap(), "Growth");
        assert!(required(Some("   ".into()), "x").is_err());
        assert!(required(None, "x").is_err());
        assert_eq!(optional_non_blank(None, "x").unwrap(), None);
        assert!(optional_non_blank(Some("".into()), "x").is_err());
    }

    #[test]
    fn test_author_body_null_and_absent_differ() {
        let absent: QuoteBody = serde_json::from_str(r#"{"text":"x"}"#).unwrap();
        assert_eq!(absent.author_id, None);
        let null: QuoteBody = serde_json::from_str(r#"{"authorId":null}"#).unwrap();
        assert_eq!(null.author_id, Some(None));
        let set: QuoteBody = serde_json::from_str(r#"{"authorId":"a1"}"#).unwrap();
        assert_eq!(set.author_id, Some(Some("a1".to_string())));
    }

    #[test]
    fn test_resolve_author_precedence() {
        let mut store = crate::SqliteStore::open_in_memory().unwrap();
        let store: &mut dyn Store = &mut store;

        assert_eq!(resolve_author(store, None, None).unwrap(), AuthorChange::Keep);
        assert_eq!(resolve_author(store, Some(None), None).unwrap(), AuthorChange::Clear);
        assert_eq!(resolve_author(store, Some(Some(" ".into())), None).unwrap(), AuthorChange::Clear);
        assert_eq!(
            resolve_author(store, Some(Some("a1".into())), Some("Rumi".into())).unwrap(),
            AuthorChange::Set("a1".into())
        );
        // Name lookup only runs when no id is given
        assert!(store.list_authors().unwrap().is_empty());

        let AuthorChange::Set(id) = resolve_author(store, Some(None), Some("Rumi".into())).unwrap() else {
            panic!("expected an author");
        };
        assert_eq!(store.list_authors().unwrap()[0].id, id);
        assert_eq!(AuthorChange::Clear.into_patch(), Some(String::new()));
        assert_eq!(AuthorChange::Clear.into_id(), None);
    }

    #[test]
    fn test_parse_action() {
        assert!(matches!(parse_action(&Bytes::from_static(br#"{"action":"archive"}"#)), Ok(Action::Archive)));
        assert!(matches!(parse_action(&Bytes::from_static(br#"{"action":"restore"}"#)), Ok(Action::Restore)));
        let err = parse_action(&Bytes::from_static(br#"{"action":"explode"}"#)).err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let err = parse_action(&Bytes::from_static(b"not json")).err().unwrap();
        assert_eq!(err.body.code, Some("INVALID_JSON"));
    }
}
