//! JSON file storage implementation
//!
//! The whole [`Dataset`] lives in memory and is written back after every
//! mutation. Writes go to a temp file in the same directory which is then
//! renamed over the target, so readers never see a half-written file.
//! Foreign-key clean-up that SQLite does with cascades happens here in code.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{Store, with_post_data};
use crate::config::Backend;
use crate::model::{
    Author, AuthorPatch, CoreValue, CoreValueQuote, CoreValueSupportingValue, Dataset, NewAuthor, NewQuote,
    NewQuotePost, NewValue, Quote, QuotePatch, QuotePost, QuotePostPatch, QuotePostWithData, QuoteWithAuthor,
    StoreStats, SupportingValue, SupportingValueWithLinks, ValuePatch,
};
use crate::{Error, Result};

/// Single-file JSON store
pub struct JsonStore {
    path: PathBuf,
    data: Dataset,
}

impl JsonStore {
    /// Load `path`, creating it with an empty dataset when missing
    pub fn open(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let data: Dataset = if contents.trim().is_empty() {
                Dataset::default()
            } else {
                serde_json::from_str(&contents)?
            };
            return Ok(Self { path: path.to_path_buf(), data });
        }

        let store = Self {
            path: path.to_path_buf(),
            data: Dataset::default(),
        };
        store.save(&store.data)?;
        tracing::info!(path = %path.display(), "created empty JSON store");
        Ok(store)
    }

    fn save(&self, data: &Dataset) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, data)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Apply `change` to a copy of the dataset, persist the copy, then adopt it.
    /// The in-memory state is untouched when the save fails.
    fn commit<T>(&mut self, change: impl FnOnce(&mut Dataset) -> T) -> Result<T> {
        let mut next = self.data.clone();
        let value = change(&mut next);
        self.save(&next)?;
        self.data = next;
        Ok(value)
    }

    fn require_core_values(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            if !self.data.core_values.iter().any(|cv| &cv.id == id) {
                return Err(Error::NotFound("Core value", id.clone()));
            }
        }
        Ok(())
    }

    fn require_author(&self, id: &str) -> Result<()> {
        if self.data.authors.iter().any(|a| a.id == id) {
            Ok(())
        } else {
            Err(Error::NotFound("Author", id.to_string()))
        }
    }

    fn supporting_links(&self, supporting_value_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .data
            .core_value_supporting_values
            .iter()
            .filter(|rel| rel.supporting_value_id == supporting_value_id)
            .map(|rel| rel.core_value_id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn quote_view(&self, quote: &Quote) -> QuoteWithAuthor {
        let author = quote
            .author_id
            .as_deref()
            .and_then(|id| self.data.authors.iter().find(|a| a.id == id && a.is_active))
            .cloned();
        let mut core_value_ids: Vec<String> = self
            .data
            .core_value_quotes
            .iter()
            .filter(|rel| rel.quote_id == quote.id)
            .map(|rel| rel.core_value_id.clone())
            .collect();
        core_value_ids.sort();
        QuoteWithAuthor {
            quote: quote.clone(),
            author,
            core_value_ids,
        }
    }

    fn sorted_quote_views<'a>(&self, quotes: impl Iterator<Item = &'a Quote>) -> Vec<QuoteWithAuthor> {
        let mut quotes: Vec<&Quote> = quotes.filter(|q| q.is_active).collect();
        quotes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        quotes.into_iter().map(|q| self.quote_view(q)).collect()
    }
}

/// Existing pair or a new link row
fn link_supporting(
    data: &mut Dataset,
    core_value_id: &str,
    supporting_value_id: &str,
    now: DateTime<Utc>,
) -> CoreValueSupportingValue {
    if let Some(rel) = data
        .core_value_supporting_values
        .iter()
        .find(|rel| rel.core_value_id == core_value_id && rel.supporting_value_id == supporting_value_id)
    {
        return rel.clone();
    }
    let rel = CoreValueSupportingValue::new(core_value_id, supporting_value_id, now);
    data.core_value_supporting_values.push(rel.clone());
    rel
}

fn link_quote(data: &mut Dataset, core_value_id: &str, quote_id: &str, now: DateTime<Utc>) -> CoreValueQuote {
    if let Some(rel) = data
        .core_value_quotes
        .iter()
        .find(|rel| rel.core_value_id == core_value_id && rel.quote_id == quote_id)
    {
        return rel.clone();
    }
    let rel = CoreValueQuote::new(core_value_id, quote_id, now);
    data.core_value_quotes.push(rel.clone());
    rel
}

/// Flip `is_active` on the row with `id`; the closure exposes its fields
fn toggle<T>(rows: &mut [T], id: &str, active: bool, fields: impl Fn(&mut T) -> (&str, &mut bool, &mut DateTime<Utc>)) -> bool {
    for row in rows.iter_mut() {
        let (row_id, is_active, updated_at) = fields(row);
        if row_id == id {
            *is_active = active;
            *updated_at = Utc::now();
            return true;
        }
    }
    false
}

impl Store for JsonStore {
    fn backend(&self) -> Backend {
        Backend::Json
    }

    // ========== Core Values ==========

    fn list_core_values(&self) -> Result<Vec<CoreValue>> {
        let mut values: Vec<CoreValue> = self.data.core_values.iter().filter(|cv| cv.is_active).cloned().collect();
        values.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(values)
    }

    fn get_core_value(&self, id: &str) -> Result<Option<CoreValue>> {
        Ok(self.data.core_values.iter().find(|cv| cv.id == id).cloned())
    }

    fn create_core_value(&mut self, input: NewValue) -> Result<CoreValue> {
        let core_value = CoreValue::create(input, Utc::now());
        self.commit(|data| data.core_values.push(core_value.clone()))?;
        Ok(core_value)
    }

    fn update_core_value(&mut self, id: &str, patch: ValuePatch) -> Result<Option<CoreValue>> {
        let Some(index) = self.data.core_values.iter().position(|cv| cv.id == id) else {
            return Ok(None);
        };
        let updated = self.commit(|data| {
            let core_value = &mut data.core_values[index];
            core_value.apply(patch, Utc::now());
            core_value.clone()
        })?;
        Ok(Some(updated))
    }

    fn set_core_value_active(&mut self, id: &str, active: bool) -> Result<bool> {
        if !self.data.core_values.iter().any(|cv| cv.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            toggle(&mut data.core_values, id, active, |cv| (cv.id.as_str(), &mut cv.is_active, &mut cv.updated_at))
        })
    }

    fn delete_core_value(&mut self, id: &str) -> Result<bool> {
        if !self.data.core_values.iter().any(|cv| cv.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            data.core_values.retain(|cv| cv.id != id);
            data.core_value_supporting_values.retain(|rel| rel.core_value_id != id);
            data.core_value_quotes.retain(|rel| rel.core_value_id != id);
            data.quote_posts.retain(|post| post.core_value_id != id);
        })?;
        Ok(true)
    }

    // ========== Supporting Values ==========

    fn list_supporting_values(&self) -> Result<Vec<SupportingValueWithLinks>> {
        let mut values: Vec<&SupportingValue> = self.data.supporting_values.iter().filter(|sv| sv.is_active).collect();
        values.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(values
            .into_iter()
            .map(|sv| SupportingValueWithLinks {
                supporting_value: sv.clone(),
                core_value_ids: self.supporting_links(&sv.id),
            })
            .collect())
    }

    fn list_supporting_values_for_core(&self, core_value_id: &str) -> Result<Vec<SupportingValue>> {
        let linked: HashSet<&str> = self
            .data
            .core_value_supporting_values
            .iter()
            .filter(|rel| rel.core_value_id == core_value_id)
            .map(|rel| rel.supporting_value_id.as_str())
            .collect();
        let mut values: Vec<SupportingValue> = self
            .data
            .supporting_values
            .iter()
            .filter(|sv| sv.is_active && linked.contains(sv.id.as_str()))
            .cloned()
            .collect();
        values.sort_by(|a, b| a.value.cmp(&b.value));
        Ok(values)
    }

    fn get_supporting_value(&self, id: &str) -> Result<Option<SupportingValueWithLinks>> {
        Ok(self
            .data
            .supporting_values
            .iter()
            .find(|sv| sv.id == id)
            .map(|sv| SupportingValueWithLinks {
                supporting_value: sv.clone(),
                core_value_ids: self.supporting_links(id),
            }))
    }

    fn create_supporting_value(&mut self, input: NewValue, core_value_ids: &[String]) -> Result<SupportingValueWithLinks> {
        self.require_core_values(core_value_ids)?;

        let now = Utc::now();
        let supporting_value = SupportingValue::create(input, now);
        let id = supporting_value.id.clone();
        self.commit(|data| {
            data.supporting_values.push(supporting_value);
            for core_value_id in core_value_ids {
                link_supporting(data, core_value_id, &id, now);
            }
        })?;

        self.get_supporting_value(&id)?.ok_or(Error::NotFound("Supporting value", id))
    }

    fn update_supporting_value(
        &mut self,
        id: &str,
        patch: ValuePatch,
        core_value_ids: Option<&[String]>,
    ) -> Result<Option<SupportingValueWithLinks>> {
        let Some(index) = self.data.supporting_values.iter().position(|sv| sv.id == id) else {
            return Ok(None);
        };
        if let Some(ids) = core_value_ids {
            self.require_core_values(ids)?;
        }

        let now = Utc::now();
        self.commit(|data| {
            data.supporting_values[index].apply(patch, now);
            if let Some(ids) = core_value_ids {
                data.core_value_supporting_values.retain(|rel| rel.supporting_value_id != id);
                for core_value_id in ids {
                    link_supporting(data, core_value_id, id, now);
                }
            }
        })?;
        self.get_supporting_value(id)
    }

    fn set_supporting_value_active(&mut self, id: &str, active: bool) -> Result<bool> {
        if !self.data.supporting_values.iter().any(|sv| sv.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            toggle(&mut data.supporting_values, id, active, |sv| {
                (sv.id.as_str(), &mut sv.is_active, &mut sv.updated_at)
            })
        })
    }

    fn delete_supporting_value(&mut self, id: &str) -> Result<bool> {
        if !self.data.supporting_values.iter().any(|sv| sv.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            data.supporting_values.retain(|sv| sv.id != id);
            data.core_value_supporting_values.retain(|rel| rel.supporting_value_id != id);
            data.quote_posts.retain(|post| post.supporting_value_id != id);
        })?;
        Ok(true)
    }

    // ========== Authors ==========

    fn list_authors(&self) -> Result<Vec<Author>> {
        let mut authors: Vec<Author> = self.data.authors.iter().filter(|a| a.is_active).cloned().collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(authors)
    }

    fn get_author(&self, id: &str) -> Result<Option<Author>> {
        Ok(self.data.authors.iter().find(|a| a.id == id).cloned())
    }

    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        Ok(self.data.authors.iter().find(|a| a.name == name).cloned())
    }

    fn create_author(&mut self, input: NewAuthor) -> Result<Author> {
        let author = Author::create(input, Utc::now());
        self.commit(|data| data.authors.push(author.clone()))?;
        Ok(author)
    }

    fn update_author(&mut self, id: &str, patch: AuthorPatch) -> Result<Option<Author>> {
        let Some(index) = self.data.authors.iter().position(|a| a.id == id) else {
            return Ok(None);
        };
        let updated = self.commit(|data| {
            let author = &mut data.authors[index];
            author.apply(patch, Utc::now());
            author.clone()
        })?;
        Ok(Some(updated))
    }

    fn set_author_active(&mut self, id: &str, active: bool) -> Result<bool> {
        if !self.data.authors.iter().any(|a| a.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            toggle(&mut data.authors, id, active, |a| (a.id.as_str(), &mut a.is_active, &mut a.updated_at))
        })
    }

    fn delete_author(&mut self, id: &str) -> Result<bool> {
        if !self.data.authors.iter().any(|a| a.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            data.authors.retain(|a| a.id != id);
            for quote in data.quotes.iter_mut().filter(|q| q.author_id.as_deref() == Some(id)) {
                quote.author_id = None;
            }
        })?;
        Ok(true)
    }

    // ========== Quotes ==========

    fn list_quotes(&self) -> Result<Vec<QuoteWithAuthor>> {
        Ok(self.sorted_quote_views(self.data.quotes.iter()))
    }

    fn list_quotes_for_core(&self, core_value_id: &str) -> Result<Vec<QuoteWithAuthor>> {
        let linked: HashSet<&str> = self
            .data
            .core_value_quotes
            .iter()
            .filter(|rel| rel.core_value_id == core_value_id)
            .map(|rel| rel.quote_id.as_str())
            .collect();
        Ok(self.sorted_quote_views(self.data.quotes.iter().filter(|q| linked.contains(q.id.as_str()))))
    }

    fn get_quote(&self, id: &str) -> Result<Option<QuoteWithAuthor>> {
        Ok(self.data.quotes.iter().find(|q| q.id == id).map(|q| self.quote_view(q)))
    }

    fn create_quote(&mut self, input: NewQuote, core_value_ids: &[String]) -> Result<QuoteWithAuthor> {
        if let Some(author_id) = &input.author_id {
            self.require_author(author_id)?;
        }
        self.require_core_values(core_value_ids)?;

        let now = Utc::now();
        let quote = Quote::create(input, now);
        let id = quote.id.clone();
        self.commit(|data| {
            data.quotes.push(quote);
            for core_value_id in core_value_ids {
                link_quote(data, core_value_id, &id, now);
            }
        })?;

        self.get_quote(&id)?.ok_or(Error::NotFound("Quote", id))
    }

    fn update_quote(
        &mut self,
        id: &str,
        patch: QuotePatch,
        core_value_ids: Option<&[String]>,
    ) -> Result<Option<QuoteWithAuthor>> {
        let Some(index) = self.data.quotes.iter().position(|q| q.id == id) else {
            return Ok(None);
        };
        let mut quote = self.data.quotes[index].clone();
        let now = Utc::now();
        quote.apply(patch, now);

        if let Some(author_id) = &quote.author_id {
            self.require_author(author_id)?;
        }
        if let Some(ids) = core_value_ids {
            self.require_core_values(ids)?;
        }

        self.commit(|data| {
            data.quotes[index] = quote;
            if let Some(ids) = core_value_ids {
                data.core_value_quotes.retain(|rel| rel.quote_id != id);
                for core_value_id in ids {
                    link_quote(data, core_value_id, id, now);
                }
            }
        })?;
        self.get_quote(id)
    }

    fn set_quote_active(&mut self, id: &str, active: bool) -> Result<bool> {
        if !self.data.quotes.iter().any(|q| q.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            toggle(&mut data.quotes, id, active, |q| (q.id.as_str(), &mut q.is_active, &mut q.updated_at))
        })
    }

    fn delete_quote(&mut self, id: &str) -> Result<bool> {
        if !self.data.quotes.iter().any(|q| q.id == id) {
            return Ok(false);
        }
        self.commit(|data| {
            data.quotes.retain(|q| q.id != id);
            data.core_value_quotes.retain(|rel| rel.quote_id != id);
            data.quote_posts.retain(|post| post.quote_id != id);
        })?;
        Ok(true)
    }

    // ========== Relations ==========

    fn link_core_supporting(&mut self, core_value_id: &str, supporting_value_id: &str) -> Result<CoreValueSupportingValue> {
        self.require_core_values(&[core_value_id.to_string()])?;
        if !self.data.supporting_values.iter().any(|sv| sv.id == supporting_value_id) {
            return Err(Error::NotFound("Supporting value", supporting_value_id.to_string()));
        }
        self.commit(|data| link_supporting(data, core_value_id, supporting_value_id, Utc::now()))
    }

    fn link_core_quote(&mut self, core_value_id: &str, quote_id: &str) -> Result<CoreValueQuote> {
        self.require_core_values(&[core_value_id.to_string()])?;
        if !self.data.quotes.iter().any(|q| q.id == quote_id) {
            return Err(Error::NotFound("Quote", quote_id.to_string()));
        }
        self.commit(|data| link_quote(data, core_value_id, quote_id, Utc::now()))
    }

    // ========== Posts ==========

    fn list_quote_posts(&self) -> Result<Vec<QuotePostWithData>> {
        let mut posts: Vec<&QuotePost> = self.data.quote_posts.iter().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let mut result = Vec::with_capacity(posts.len());
        for post in posts {
            if let Some(full) = with_post_data(self, post.clone())? {
                result.push(full);
            }
        }
        Ok(result)
    }

    fn get_quote_post(&self, id: &str) -> Result<Option<QuotePostWithData>> {
        match self.data.quote_posts.iter().find(|p| p.id == id) {
            Some(post) => with_post_data(self, post.clone()),
            None => Ok(None),
        }
    }

    fn create_quote_post(&mut self, input: NewQuotePost) -> Result<QuotePost> {
        self.require_core_values(std::slice::from_ref(&input.core_value_id))?;
        if !self.data.supporting_values.iter().any(|sv| sv.id == input.supporting_value_id) {
            return Err(Error::NotFound("Supporting value", input.supporting_value_id));
        }
        if !self.data.quotes.iter().any(|q| q.id == input.quote_id) {
            return Err(Error::NotFound("Quote", input.quote_id));
        }

        let post = QuotePost::create(input, Utc::now());
        self.commit(|data| data.quote_posts.push(post.clone()))?;
        Ok(post)
    }

    fn update_quote_post(&mut self, id: &str, patch: QuotePostPatch) -> Result<Option<QuotePost>> {
        let Some(index) = self.data.quote_posts.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let updated = self.commit(|data| {
            let post = &mut data.quote_posts[index];
            post.apply(patch, Utc::now());
            post.clone()
        })?;
        Ok(Some(updated))
    }

    // ========== Whole store ==========

    fn stats(&self) -> Result<StoreStats> {
        let data = &self.data;
        Ok(StoreStats {
            core_values: data.core_values.iter().filter(|cv| cv.is_active).count(),
            supporting_values: data.supporting_values.iter().filter(|sv| sv.is_active).count(),
            quotes: data.quotes.iter().filter(|q| q.is_active).count(),
            authors: data.authors.iter().filter(|a| a.is_active).count(),
            posts: data.quote_posts.len(),
            published_posts: data.quote_posts.iter().filter(|p| p.is_published).count(),
        })
    }

    fn export_dataset(&self) -> Result<Dataset> {
        Ok(self.data.clone())
    }

    fn replace_dataset(&mut self, dataset: &Dataset) -> Result<()> {
        self.save(dataset)?;
        self.data = dataset.clone();
        tracing::debug!(
            core_values = dataset.core_values.len(),
            quotes = dataset.quotes.len(),
            "replaced JSON dataset"
        );
        Ok(())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.data.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("database.json");
        let store = JsonStore::open(&path).unwrap();

        assert!(path.exists());
        assert!(store.is_empty().unwrap());
        let on_disk: Dataset = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, Dataset::default());
    }

    #[test]
    fn test_mutations_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let quote_id = {
            let mut store = JsonStore::open(&path).unwrap();
            let cv = store.create_core_value(NewValue::new("Balance")).unwrap();
            let quote = store.create_quote(NewQuote::new("Balance is a verb, not a noun."), &[cv.id]).unwrap();
            quote.quote.id
        };

        let store = JsonStore::open(&path).unwrap();
        let quote = store.get_quote(&quote_id).unwrap().unwrap();
        assert_eq!(quote.core_value_ids.len(), 1);
        assert_eq!(store.list_core_values().unwrap()[0].value, "Balance");
    }

    #[test]
    fn test_file_format_is_camel_case_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let mut store = JsonStore::open(&path).unwrap();
        store.create_author(NewAuthor::new("Lao Tzu")).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["authors"][0]["name"], "Lao Tzu");
        assert_eq!(raw["authors"][0]["isActive"], true);
        assert!(raw["coreValueSupportingValues"].as_array().unwrap().is_empty());
        assert!(raw["quotePosts"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let mut store = JsonStore::open(&path).unwrap();
        for name in ["A", "B", "C"] {
            store.create_core_value(NewValue::new(name)).unwrap();
        }

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonStore::open(&path), Err(Error::Json(_))));
    }

    /// Swap the database file for a non-empty directory so every rename fails
    fn break_target(path: &Path) {
        std::fs::remove_file(path).unwrap();
        std::fs::create_dir(path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();
    }

    #[test]
    fn test_failed_save_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("database.json");
        let mut store = JsonStore::open(&path).unwrap();
        let cv = store.create_core_value(NewValue::new("Growth")).unwrap();
        let author = store.create_author(NewAuthor::new("Rumi")).unwrap();
        break_target(&path);

        assert!(store.create_core_value(NewValue::new("Balance")).is_err());
        let patch = ValuePatch {
            value: Some("Changed".into()),
            ..Default::default()
        };
        assert!(store.update_core_value(&cv.id, patch).is_err());
        assert!(store.archive_core_value(&cv.id).is_err());
        assert!(store.delete_author(&author.id).is_err());
        assert!(store.create_quote(NewQuote::new("Failing writes change nothing."), &[cv.id.clone()]).is_err());
        assert!(store.replace_dataset(&Dataset::default()).is_err());

        let values = store.list_core_values().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].value, "Growth");
        assert_eq!(store.list_authors().unwrap().len(), 1);
        assert!(store.list_quotes().unwrap().is_empty());
    }
}
