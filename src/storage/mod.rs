//! Storage Layer - the relational store of values, quotes and posts
//!
//! Two backends implement [`Store`]:
//! - [`SqliteStore`]: tables with foreign keys; link rows and posts cascade
//! - [`JsonStore`]: one JSON document holding a [`Dataset`]
//!
//! The backend is chosen at runtime from [`StorageConfig`].
//!
//! Conventions shared by both backends:
//! - list operations return active rows only; `get_*` ignores `is_active`
//! - update/archive/restore/delete of an unknown id is `Ok(None)` / `Ok(false)`
//! - hard delete removes link rows and posts referencing the row; deleting an
//!   author detaches it from its quotes

pub mod schema;
pub mod sqlite;
pub mod json;

use std::path::Path;

use chrono::Utc;
use rand::RngCore;
use rand::seq::SliceRandom;

use crate::Result;
use crate::config::{Backend, StorageConfig};
use crate::importer::{self, ImportSummary};
use crate::model::{
    Author, AuthorPatch, CoreValue, CoreValueQuote, CoreValueSupportingValue, CoreValueWithRelations, Dataset,
    NewAuthor, NewQuote, NewQuotePost, NewValue, Quote, QuotePatch, QuotePost, QuotePostPatch, QuotePostWithData,
    QuoteWithAuthor, RandomPostData, StoreStats, SupportingValue, SupportingValueWithLinks, ValuePatch,
};

pub use json::JsonStore;
pub use sqlite::SqliteStore;

/// Persistence operations over the value/quote model
pub trait Store: Send {
    fn backend(&self) -> Backend;

    // ========== Core Values ==========

    fn list_core_values(&self) -> Result<Vec<CoreValue>>;
    fn get_core_value(&self, id: &str) -> Result<Option<CoreValue>>;
    fn create_core_value(&mut self, input: NewValue) -> Result<CoreValue>;
    fn update_core_value(&mut self, id: &str, patch: ValuePatch) -> Result<Option<CoreValue>>;
    fn set_core_value_active(&mut self, id: &str, active: bool) -> Result<bool>;
    fn delete_core_value(&mut self, id: &str) -> Result<bool>;

    /// A core value with its active supporting values and active quotes
    fn get_core_value_with_relations(&self, id: &str) -> Result<Option<CoreValueWithRelations>> {
        let Some(core_value) = self.get_core_value(id)? else {
            return Ok(None);
        };
        Ok(Some(CoreValueWithRelations {
            supporting_values: self.list_supporting_values_for_core(id)?,
            quotes: self.list_quotes_for_core(id)?,
            core_value,
        }))
    }

    fn archive_core_value(&mut self, id: &str) -> Result<bool> {
        self.set_core_value_active(id, false)
    }

    fn restore_core_value(&mut self, id: &str) -> Result<bool> {
        self.set_core_value_active(id, true)
    }

    // ========== Supporting Values ==========

    fn list_supporting_values(&self) -> Result<Vec<SupportingValueWithLinks>>;
    fn list_supporting_values_for_core(&self, core_value_id: &str) -> Result<Vec<SupportingValue>>;
    fn get_supporting_value(&self, id: &str) -> Result<Option<SupportingValueWithLinks>>;
    fn create_supporting_value(&mut self, input: NewValue, core_value_ids: &[String]) -> Result<SupportingValueWithLinks>;
    /// Update fields; when `core_value_ids` is given the links are replaced
    fn update_supporting_value(
        &mut self,
        id: &str,
        patch: ValuePatch,
        core_value_ids: Option<&[String]>,
    ) -> Result<Option<SupportingValueWithLinks>>;
    fn set_supporting_value_active(&mut self, id: &str, active: bool) -> Result<bool>;
    fn delete_supporting_value(&mut self, id: &str) -> Result<bool>;

    fn archive_supporting_value(&mut self, id: &str) -> Result<bool> {
        self.set_supporting_value_active(id, false)
    }

    fn restore_supporting_value(&mut self, id: &str) -> Result<bool> {
        self.set_supporting_value_active(id, true)
    }

    // ========== Authors ==========

    fn list_authors(&self) -> Result<Vec<Author>>;
    fn get_author(&self, id: &str) -> Result<Option<Author>>;
    /// Exact-name lookup regardless of `is_active`
    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>>;
    fn create_author(&mut self, input: NewAuthor) -> Result<Author>;
    fn update_author(&mut self, id: &str, patch: AuthorPatch) -> Result<Option<Author>>;
    fn set_author_active(&mut self, id: &str, active: bool) -> Result<bool>;
    fn delete_author(&mut self, id: &str) -> Result<bool>;

    fn find_or_create_author(&mut self, name: &str) -> Result<Author> {
        let name = name.trim();
        match self.find_author_by_name(name)? {
            Some(author) => Ok(author),
            None => self.create_author(NewAuthor::new(name)),
        }
    }

    fn archive_author(&mut self, id: &str) -> Result<bool> {
        self.set_author_active(id, false)
    }

    fn restore_author(&mut self, id: &str) -> Result<bool> {
        self.set_author_active(id, true)
    }

    // ========== Quotes ==========

    fn list_quotes(&self) -> Result<Vec<QuoteWithAuthor>>;
    fn list_quotes_for_core(&self, core_value_id: &str) -> Result<Vec<QuoteWithAuthor>>;
    fn get_quote(&self, id: &str) -> Result<Option<QuoteWithAuthor>>;
    fn create_quote(&mut self, input: NewQuote, core_value_ids: &[String]) -> Result<QuoteWithAuthor>;
    /// Update fields; when `core_value_ids` is given the links are replaced
    fn update_quote(
        &mut self,
        id: &str,
        patch: QuotePatch,
        core_value_ids: Option<&[String]>,
    ) -> Result<Option<QuoteWithAuthor>>;
    fn set_quote_active(&mut self, id: &str, active: bool) -> Result<bool>;
    fn delete_quote(&mut self, id: &str) -> Result<bool>;

    fn archive_quote(&mut self, id: &str) -> Result<bool> {
        self.set_quote_active(id, false)
    }

    fn restore_quote(&mut self, id: &str) -> Result<bool> {
        self.set_quote_active(id, true)
    }

    // ========== Relations ==========

    /// Link a supporting value to a core value; an existing pair is returned as is
    fn link_core_supporting(&mut self, core_value_id: &str, supporting_value_id: &str) -> Result<CoreValueSupportingValue>;
    /// Link a quote to a core value; an existing pair is returned as is
    fn link_core_quote(&mut self, core_value_id: &str, quote_id: &str) -> Result<CoreValueQuote>;

    // ========== Posts ==========

    /// All posts, newest first; posts whose references are gone are skipped
    fn list_quote_posts(&self) -> Result<Vec<QuotePostWithData>>;
    fn get_quote_post(&self, id: &str) -> Result<Option<QuotePostWithData>>;
    fn create_quote_post(&mut self, input: NewQuotePost) -> Result<QuotePost>;
    fn update_quote_post(&mut self, id: &str, patch: QuotePostPatch) -> Result<Option<QuotePost>>;

    // ========== Whole store ==========

    fn stats(&self) -> Result<StoreStats>;
    /// Every row of every table, active or not
    fn export_dataset(&self) -> Result<Dataset>;
    /// Wipe the store and load `dataset` with its ids intact
    fn replace_dataset(&mut self, dataset: &Dataset) -> Result<()>;
    /// No core values, supporting values or quotes at all
    fn is_empty(&self) -> Result<bool>;

    /// Pick a random active core value, then a random active supporting value
    /// and quote linked to it
    fn random_post_data(&self, rng: &mut dyn RngCore) -> Result<Option<RandomPostData>> {
        let core_values = self.list_core_values()?;
        let Some(core_value) = core_values.choose(rng).cloned() else {
            return Ok(None);
        };
        let supporting_values = self.list_supporting_values_for_core(&core_value.id)?;
        let Some(supporting_value) = supporting_values.choose(rng).cloned() else {
            return Ok(None);
        };
        let quotes = self.list_quotes_for_core(&core_value.id)?;
        let Some(quote) = quotes.choose(rng).cloned() else {
            return Ok(None);
        };
        Ok(Some(RandomPostData { core_value, supporting_value, quote }))
    }
}

/// Open the backend named by `config`
pub fn open_store(config: &StorageConfig) -> Result<Box<dyn Store>> {
    tracing::debug!(backend = config.backend.as_str(), path = %config.path.display(), "opening store");
    let store: Box<dyn Store> = match config.backend {
        Backend::Sqlite => Box::new(SqliteStore::open(&config.path)?),
        Backend::Json => Box::new(JsonStore::open(&config.path)?),
    };
    Ok(store)
}

/// Join a post with its core value, supporting value and quote.
/// `None` (with a warning) when any of them is gone.
pub(crate) fn with_post_data<S: Store + ?Sized>(store: &S, post: QuotePost) -> Result<Option<QuotePostWithData>> {
    let core_value = store.get_core_value(&post.core_value_id)?;
    let supporting_value = store.get_supporting_value(&post.supporting_value_id)?;
    let quote = store.get_quote(&post.quote_id)?;

    match (core_value, supporting_value, quote) {
        (Some(core_value), Some(supporting_value), Some(quote)) => Ok(Some(QuotePostWithData {
            post,
            core_value,
            supporting_value: supporting_value.supporting_value,
            quote,
        })),
        _ => {
            tracing::warn!(post = %post.id, "skipping post with missing references");
            Ok(None)
        }
    }
}

/// Result of [`seed_sample_data`]
#[derive(Debug, Clone, PartialEq)]
pub enum SeedOutcome {
    /// The store already had data; nothing was written
    AlreadySeeded,
    /// The CSV export was imported
    Imported(ImportSummary),
    /// The built-in sample set was inserted
    Samples(ImportSummary),
}

/// Seed an empty store from `csv_path` when readable, otherwise from samples
pub fn seed_sample_data(store: &mut dyn Store, csv_path: Option<&Path>) -> Result<SeedOutcome> {
    if !store.is_empty()? {
        return Ok(SeedOutcome::AlreadySeeded);
    }

    if let Some(path) = csv_path {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let dataset = importer::parse_notion_csv(&content);
                store.replace_dataset(&dataset)?;
                tracing::info!(path = %path.display(), "seeded store from CSV export");
                return Ok(SeedOutcome::Imported(ImportSummary::from(&dataset)));
            }
            Err(e) => tracing::warn!(path = %path.display(), "CSV export unreadable, using sample data: {}", e),
        }
    }

    let dataset = sample_dataset();
    store.replace_dataset(&dataset)?;
    tracing::info!("seeded store with sample data");
    Ok(SeedOutcome::Samples(ImportSummary::from(&dataset)))
}

/// The built-in sample set
pub fn sample_dataset() -> Dataset {
    let now = Utc::now();
    let core_values: Vec<CoreValue> = [
        ("Growth", "Personal development and learning"),
        ("Balance", "Finding harmony in life"),
        ("Authenticity", "Being true to yourself"),
    ]
    .into_iter()
    .map(|(value, description)| CoreValue::create(NewValue::new(value).with_description(description), now))
    .collect();

    let supporting_values: Vec<SupportingValue> = [
        ("Curiosity", "Eagerness to learn and explore"),
        ("Patience", "Ability to wait and persevere"),
        ("Courage", "Strength to face challenges"),
    ]
    .into_iter()
    .map(|(value, description)| SupportingValue::create(NewValue::new(value).with_description(description), now))
    .collect();

    let authors: Vec<Author> = ["Ralph Waldo Emerson", "Maya Angelou"]
        .into_iter()
        .map(|name| Author::create(NewAuthor::new(name), now))
        .collect();

    let quotes = vec![
        Quote::create(
            NewQuote::new("The only person you are destined to become is the person you decide to be.")
                .with_author(&authors[0].id),
            now,
        ),
        Quote::create(
            NewQuote::new("If you don't like something, change it. If you can't change it, change your attitude.")
                .with_author(&authors[1].id),
            now,
        ),
    ];

    Dataset {
        core_value_supporting_values: vec![
            CoreValueSupportingValue::new(&core_values[0].id, &supporting_values[0].id, now),
            CoreValueSupportingValue::new(&core_values[1].id, &supporting_values[1].id, now),
        ],
        core_value_quotes: vec![
            CoreValueQuote::new(&core_values[0].id, &quotes[0].id, now),
            CoreValueQuote::new(&core_values[2].id, &quotes[1].id, now),
        ],
        core_values,
        supporting_values,
        authors,
        quotes,
        quote_posts: Vec::new(),
    }
}
