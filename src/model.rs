//! Entity types - the relational model of values and quotes
//!
//! Four entity tables and three link tables:
//! - `CoreValue`, `SupportingValue`: thematic tags
//! - `Author`, `Quote`: quote text with optional attribution
//! - `CoreValueSupportingValue`, `CoreValueQuote`: many-to-many links
//! - `QuotePost`: a generated core value + supporting value + quote pairing
//!
//! Every entity carries `is_active` (soft delete) and audit timestamps.
//! On the wire all fields are camelCase and timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Generate a fresh, sortable identifier
pub fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

/// A top-level theme (e.g. "Growth")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreValue {
    pub id: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A secondary theme linked to one or more core values (e.g. "Curiosity")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingValue {
    pub id: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreValueSupportingValue {
    pub id: String,
    pub core_value_id: String,
    pub supporting_value_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreValueQuote {
    pub id: String,
    pub core_value_id: String,
    pub quote_id: String,
    pub created_at: DateTime<Utc>,
}

/// A generated post, optionally rendered and scheduled for publishing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePost {
    pub id: String,
    pub core_value_id: String,
    pub supporting_value_id: String,
    pub quote_id: String,
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_post_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ========== Inputs ==========

/// Input for a new core or supporting value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewValue {
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: None,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial update of a core or supporting value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePatch {
    pub value: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAuthor {
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewAuthor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPatch {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuote {
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewQuote {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author_id: None,
            source: None,
            category: None,
            tags: Vec::new(),
            is_active: true,
        }
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePatch {
    pub text: Option<String>,
    pub author_id: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuotePost {
    pub core_value_id: String,
    pub supporting_value_id: String,
    pub quote_id: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta_post_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Publishing and scheduling changes to a post
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePostPatch {
    pub is_published: Option<bool>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub meta_post_id: Option<String>,
    pub image_url: Option<String>,
}

fn default_true() -> bool {
    true
}

// ========== Constructors and patching ==========

impl CoreValue {
    pub fn create(input: NewValue, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            value: input.value,
            description: input.description,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ValuePatch, now: DateTime<Utc>) {
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
    }
}

impl SupportingValue {
    pub fn create(input: NewValue, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            value: input.value,
            description: input.description,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: ValuePatch, now: DateTime<Utc>) {
        if let Some(value) = patch.value {
            self.value = value;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
    }
}

impl Author {
    pub fn create(input: NewAuthor, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            name: input.name,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: AuthorPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
    }
}

impl Quote {
    pub fn create(input: NewQuote, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            text: input.text,
            author_id: input.author_id,
            source: input.source,
            category: input.category,
            tags: input.tags,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: QuotePatch, now: DateTime<Utc>) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(author_id) = patch.author_id {
            // An empty id detaches the author
            self.author_id = if author_id.is_empty() { None } else { Some(author_id) };
        }
        if let Some(source) = patch.source {
            self.source = Some(source);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        self.updated_at = now;
    }
}

impl CoreValueSupportingValue {
    pub fn new(core_value_id: impl Into<String>, supporting_value_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            core_value_id: core_value_id.into(),
            supporting_value_id: supporting_value_id.into(),
            created_at: now,
        }
    }
}

impl CoreValueQuote {
    pub fn new(core_value_id: impl Into<String>, quote_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            core_value_id: core_value_id.into(),
            quote_id: quote_id.into(),
            created_at: now,
        }
    }
}

impl QuotePost {
    pub fn create(input: NewQuotePost, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            core_value_id: input.core_value_id,
            supporting_value_id: input.supporting_value_id,
            quote_id: input.quote_id,
            is_published: input.is_published,
            published_at: input.is_published.then_some(now),
            scheduled_for: input.scheduled_for,
            meta_post_id: input.meta_post_id,
            image_url: input.image_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a patch; `published_at` is stamped the first time a post is published
    pub fn apply(&mut self, patch: QuotePostPatch, now: DateTime<Utc>) {
        if let Some(published) = patch.is_published {
            if published && !self.is_published {
                self.published_at = Some(now);
            }
            if !published {
                self.published_at = None;
            }
            self.is_published = published;
        }
        if let Some(at) = patch.scheduled_for {
            self.scheduled_for = Some(at);
        }
        if let Some(meta_id) = patch.meta_post_id {
            self.meta_post_id = Some(meta_id);
        }
        if let Some(url) = patch.image_url {
            self.image_url = Some(url);
        }
        self.updated_at = now;
    }
}

// ========== Views ==========

/// A quote joined with its (active) author and linked core values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteWithAuthor {
    #[serde(flatten)]
    pub quote: Quote,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default)]
    pub core_value_ids: Vec<String>,
}

impl QuoteWithAuthor {
    pub fn author_name(&self) -> &str {
        self.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }
}

/// A supporting value with the ids of the core values it hangs off
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportingValueWithLinks {
    #[serde(flatten)]
    pub supporting_value: SupportingValue,
    #[serde(default)]
    pub core_value_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreValueWithRelations {
    #[serde(flatten)]
    pub core_value: CoreValue,
    pub supporting_values: Vec<SupportingValue>,
    pub quotes: Vec<QuoteWithAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePostWithData {
    #[serde(flatten)]
    pub post: QuotePost,
    pub core_value: CoreValue,
    pub supporting_value: SupportingValue,
    pub quote: QuoteWithAuthor,
}

/// A thematically consistent selection for a new post
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomPostData {
    pub core_value: CoreValue,
    pub supporting_value: SupportingValue,
    pub quote: QuoteWithAuthor,
}

/// The whole store as plain arrays; also the JSON backend's file format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub core_values: Vec<CoreValue>,
    #[serde(default)]
    pub supporting_values: Vec<SupportingValue>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub quotes: Vec<Quote>,
    #[serde(default)]
    pub core_value_supporting_values: Vec<CoreValueSupportingValue>,
    #[serde(default)]
    pub core_value_quotes: Vec<CoreValueQuote>,
    #[serde(default)]
    pub quote_posts: Vec<QuotePost>,
}

impl Dataset {
    pub fn is_empty(&self) -> bool {
        self.core_values.is_empty() && self.supporting_values.is_empty() && self.quotes.is_empty()
    }
}

/// Active-row counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub core_values: usize,
    pub supporting_values: usize,
    pub quotes: usize,
    pub authors: usize,
    pub posts: usize,
    pub published_posts: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Core values: {}", self.core_values)?;
        writeln!(f, "  Supporting values: {}", self.supporting_values)?;
        writeln!(f, "  Quotes: {}", self.quotes)?;
        writeln!(f, "  Authors: {}", self.authors)?;
        writeln!(f, "  Posts: {} ({} published)", self.posts, self.published_posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_camel_case() {
        let now = Utc::now();
        let quote = Quote::create(NewQuote::new("Stay curious.").with_author("a1"), now);
        let json = serde_json::to_value(&quote).unwrap();

        assert_eq!(json["authorId"], "a1");
        assert_eq!(json["isActive"], true);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("source").is_none());
    }

    #[test]
    fn test_flattened_views() {
        let now = Utc::now();
        let sv = SupportingValue::create(NewValue::new("Patience"), now);
        let view = SupportingValueWithLinks {
            supporting_value: sv,
            core_value_ids: vec!["cv1".to_string()],
        };
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["value"], "Patience");
        assert_eq!(json["coreValueIds"][0], "cv1");
    }

    #[test]
    fn test_new_value_defaults_active() {
        let input: NewValue = serde_json::from_str(r#"{"value":"Growth"}"#).unwrap();
        assert!(input.is_active);
        assert!(input.description.is_none());
    }

    #[test]
    fn test_publish_stamps_once() {
        let t0 = Utc::now();
        let mut post = QuotePost::create(
            NewQuotePost {
                core_value_id: "cv".into(),
                supporting_value_id: "sv".into(),
                quote_id: "q".into(),
                ..Default::default()
            },
            t0,
        );
        assert!(post.published_at.is_none());

        let t1 = t0 + chrono::Duration::seconds(5);
        post.apply(QuotePostPatch { is_published: Some(true), ..Default::default() }, t1);
        assert_eq!(post.published_at, Some(t1));

        let t2 = t1 + chrono::Duration::seconds(5);
        post.apply(QuotePostPatch { is_published: Some(true), ..Default::default() }, t2);
        assert_eq!(post.published_at, Some(t1));
        assert_eq!(post.updated_at, t2);
    }

    #[test]
    fn test_quote_patch_detaches_author() {
        let now = Utc::now();
        let mut quote = Quote::create(NewQuote::new("Be here now.").with_author("a1"), now);
        quote.apply(QuotePatch { author_id: Some(String::new()), ..Default::default() }, now);
        assert!(quote.author_id.is_none());
    }
}
