//! SQLite storage implementation

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Params, Row, params};

use super::{Store, schema, with_post_data};
use crate::config::Backend;
use crate::model::{
    Author, AuthorPatch, CoreValue, CoreValueQuote, CoreValueSupportingValue, Dataset, NewAuthor, NewQuote,
    NewQuotePost, NewValue, Quote, QuotePatch, QuotePost, QuotePostPatch, QuotePostWithData, QuoteWithAuthor,
    StoreStats, SupportingValue, SupportingValueWithLinks, ValuePatch,
};
use crate::{Error, Result};

const VALUE_COLUMNS: &str = "id, value, description, is_active, created_at, updated_at";
const AUTHOR_COLUMNS: &str = "id, name, is_active, created_at, updated_at";
const QUOTE_COLUMNS: &str = "id, text, author_id, source, category, tags, is_active, created_at, updated_at";
const POST_COLUMNS: &str = "id, core_value_id, supporting_value_id, quote_id, is_published, published_at, \
                            scheduled_for, meta_post_id, image_url, created_at, updated_at";

/// Supporting value columns followed by its linked core value ids
const SUPPORTING_SELECT: &str = r#"
SELECT sv.id, sv.value, sv.description, sv.is_active, sv.created_at, sv.updated_at,
       (SELECT GROUP_CONCAT(l.core_value_id) FROM core_value_supporting_values l WHERE l.supporting_value_id = sv.id)
FROM supporting_values sv
"#;

/// Quote columns, its active author (if any) and its linked core value ids
const QUOTE_SELECT: &str = r#"
SELECT q.id, q.text, q.author_id, q.source, q.category, q.tags, q.is_active, q.created_at, q.updated_at,
       a.id, a.name, a.is_active, a.created_at, a.updated_at,
       (SELECT GROUP_CONCAT(l.core_value_id) FROM core_value_quotes l WHERE l.quote_id = q.id)
FROM quotes q
LEFT JOIN authors a ON a.id = q.author_id AND a.is_active = 1
"#;

/// SQLite-backed store with foreign keys enforced
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", true)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn get_quote_row(&self, id: &str) -> Result<Option<Quote>> {
        self.conn
            .query_row(&format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?1"), [id], row_to_quote)
            .optional()
            .map_err(Into::into)
    }

    fn get_post_row(&self, id: &str) -> Result<Option<QuotePost>> {
        self.conn
            .query_row(&format!("SELECT {POST_COLUMNS} FROM quote_posts WHERE id = ?1"), [id], row_to_post)
            .optional()
            .map_err(Into::into)
    }
}

impl Store for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    // ========== Core Values ==========

    fn list_core_values(&self) -> Result<Vec<CoreValue>> {
        query_all(
            &self.conn,
            &format!("SELECT {VALUE_COLUMNS} FROM core_values WHERE is_active = 1 ORDER BY value"),
            [],
            row_to_core_value,
        )
    }

    fn get_core_value(&self, id: &str) -> Result<Option<CoreValue>> {
        self.conn
            .query_row(&format!("SELECT {VALUE_COLUMNS} FROM core_values WHERE id = ?1"), [id], row_to_core_value)
            .optional()
            .map_err(Into::into)
    }

    fn create_core_value(&mut self, input: NewValue) -> Result<CoreValue> {
        let core_value = CoreValue::create(input, Utc::now());
        insert_core_value(&self.conn, &core_value)?;
        Ok(core_value)
    }

    fn update_core_value(&mut self, id: &str, patch: ValuePatch) -> Result<Option<CoreValue>> {
        let Some(mut core_value) = self.get_core_value(id)? else {
            return Ok(None);
        };
        core_value.apply(patch, Utc::now());
        self.conn.execute(
            "UPDATE core_values SET value = ?2, description = ?3, is_active = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                core_value.id,
                core_value.value,
                core_value.description,
                core_value.is_active,
                core_value.updated_at
            ],
        )?;
        Ok(Some(core_value))
    }

    fn set_core_value_active(&mut self, id: &str, active: bool) -> Result<bool> {
        set_active(&self.conn, "core_values", id, active)
    }

    fn delete_core_value(&mut self, id: &str) -> Result<bool> {
        delete_row(&self.conn, "core_values", id)
    }

    // ========== Supporting Values ==========

    fn list_supporting_values(&self) -> Result<Vec<SupportingValueWithLinks>> {
        query_all(
            &self.conn,
            &format!("{SUPPORTING_SELECT} WHERE sv.is_active = 1 ORDER BY sv.value"),
            [],
            row_to_supporting_with_links,
        )
    }

    fn list_supporting_values_for_core(&self, core_value_id: &str) -> Result<Vec<SupportingValue>> {
        query_all(
            &self.conn,
            r#"
            SELECT sv.id, sv.value, sv.description, sv.is_active, sv.created_at, sv.updated_at
            FROM supporting_values sv
            JOIN core_value_supporting_values l ON l.supporting_value_id = sv.id
            WHERE l.core_value_id = ?1 AND sv.is_active = 1
            ORDER BY sv.value
            "#,
            [core_value_id],
            row_to_supporting_value,
        )
    }

    fn get_supporting_value(&self, id: &str) -> Result<Option<SupportingValueWithLinks>> {
        self.conn
            .query_row(&format!("{SUPPORTING_SELECT} WHERE sv.id = ?1"), [id], row_to_supporting_with_links)
            .optional()
            .map_err(Into::into)
    }

    fn create_supporting_value(&mut self, input: NewValue, core_value_ids: &[String]) -> Result<SupportingValueWithLinks> {
        let now = Utc::now();
        let supporting_value = SupportingValue::create(input, now);
        let id = supporting_value.id.clone();

        let tx = self.conn.transaction()?;
        for core_value_id in core_value_ids {
            require(&tx, "core_values", "Core value", core_value_id)?;
        }
        insert_supporting_value(&tx, &supporting_value)?;
        for core_value_id in core_value_ids {
            link_supporting(&tx, core_value_id, &id, now)?;
        }
        tx.commit()?;

        self.get_supporting_value(&id)?.ok_or(Error::NotFound("Supporting value", id))
    }

    fn update_supporting_value(
        &mut self,
        id: &str,
        patch: ValuePatch,
        core_value_ids: Option<&[String]>,
    ) -> Result<Option<SupportingValueWithLinks>> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;
        let current = tx
            .query_row(&format!("SELECT {VALUE_COLUMNS} FROM supporting_values WHERE id = ?1"), [id], row_to_supporting_value)
            .optional()?;
        let Some(mut supporting_value) = current else {
            return Ok(None);
        };

        supporting_value.apply(patch, now);
        tx.execute(
            "UPDATE supporting_values SET value = ?2, description = ?3, is_active = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                supporting_value.id,
                supporting_value.value,
                supporting_value.description,
                supporting_value.is_active,
                supporting_value.updated_at
            ],
        )?;

        if let Some(core_value_ids) = core_value_ids {
            for core_value_id in core_value_ids {
                require(&tx, "core_values", "Core value", core_value_id)?;
            }
            tx.execute("DELETE FROM core_value_supporting_values WHERE supporting_value_id = ?1", [id])?;
            for core_value_id in core_value_ids {
                link_supporting(&tx, core_value_id, id, now)?;
            }
        }
        tx.commit()?;

        self.get_supporting_value(id)
    }

    fn set_supporting_value_active(&mut self, id: &str, active: bool) -> Result<bool> {
        set_active(&self.conn, "supporting_values", id, active)
    }

    fn delete_supporting_value(&mut self, id: &str) -> Result<bool> {
        delete_row(&self.conn, "supporting_values", id)
    }

    // ========== Authors ==========

    fn list_authors(&self) -> Result<Vec<Author>> {
        query_all(
            &self.conn,
            &format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE is_active = 1 ORDER BY name"),
            [],
            row_to_author,
        )
    }

    fn get_author(&self, id: &str) -> Result<Option<Author>> {
        self.conn
            .query_row(&format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE id = ?1"), [id], row_to_author)
            .optional()
            .map_err(Into::into)
    }

    fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        self.conn
            .query_row(
                &format!("SELECT {AUTHOR_COLUMNS} FROM authors WHERE name = ?1 ORDER BY rowid LIMIT 1"),
                [name],
                row_to_author,
            )
            .optional()
            .map_err(Into::into)
    }

    fn create_author(&mut self, input: NewAuthor) -> Result<Author> {
        let author = Author::create(input, Utc::now());
        insert_author(&self.conn, &author)?;
        Ok(author)
    }

    fn update_author(&mut self, id: &str, patch: AuthorPatch) -> Result<Option<Author>> {
        let Some(mut author) = self.get_author(id)? else {
            return Ok(None);
        };
        author.apply(patch, Utc::now());
        self.conn.execute(
            "UPDATE authors SET name = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?1",
            params![author.id, author.name, author.is_active, author.updated_at],
        )?;
        Ok(Some(author))
    }

    fn set_author_active(&mut self, id: &str, active: bool) -> Result<bool> {
        set_active(&self.conn, "authors", id, active)
    }

    fn delete_author(&mut self, id: &str) -> Result<bool> {
        delete_row(&self.conn, "authors", id)
    }

    // ========== Quotes ==========

    fn list_quotes(&self) -> Result<Vec<QuoteWithAuthor>> {
        query_all(
            &self.conn,
            &format!("{QUOTE_SELECT} WHERE q.is_active = 1 ORDER BY q.created_at, q.id"),
            [],
            row_to_quote_with_author,
        )
    }

    fn list_quotes_for_core(&self, core_value_id: &str) -> Result<Vec<QuoteWithAuthor>> {
        query_all(
            &self.conn,
            &format!(
                "{QUOTE_SELECT} JOIN core_value_quotes link ON link.quote_id = q.id \
                 WHERE link.core_value_id = ?1 AND q.is_active = 1 ORDER BY q.created_at, q.id"
            ),
            [core_value_id],
            row_to_quote_with_author,
        )
    }

    fn get_quote(&self, id: &str) -> Result<Option<QuoteWithAuthor>> {
        self.conn
            .query_row(&format!("{QUOTE_SELECT} WHERE q.id = ?1"), [id], row_to_quote_with_author)
            .optional()
            .map_err(Into::into)
    }

    fn create_quote(&mut self, input: NewQuote, core_value_ids: &[String]) -> Result<QuoteWithAuthor> {
        let now = Utc::now();
        let quote = Quote::create(input, now);
        let id = quote.id.clone();

        let tx = self.conn.transaction()?;
        if let Some(author_id) = &quote.author_id {
            require(&tx, "authors", "Author", author_id)?;
        }
        for core_value_id in core_value_ids {
            require(&tx, "core_values", "Core value", core_value_id)?;
        }
        insert_quote(&tx, &quote)?;
        for core_value_id in core_value_ids {
            link_quote(&tx, core_value_id, &id, now)?;
        }
        tx.commit()?;

        self.get_quote(&id)?.ok_or(Error::NotFound("Quote", id))
    }

    fn update_quote(
        &mut self,
        id: &str,
        patch: QuotePatch,
        core_value_ids: Option<&[String]>,
    ) -> Result<Option<QuoteWithAuthor>> {
        let now = Utc::now();
        let Some(mut quote) = self.get_quote_row(id)? else {
            return Ok(None);
        };
        quote.apply(patch, now);

        let tx = self.conn.transaction()?;
        if let Some(author_id) = &quote.author_id {
            require(&tx, "authors", "Author", author_id)?;
        }
        tx.execute(
            r#"
            UPDATE quotes SET text = ?2, author_id = ?3, source = ?4, category = ?5, tags = ?6,
                              is_active = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
            params![
                quote.id,
                quote.text,
                quote.author_id,
                quote.source,
                quote.category,
                serde_json::to_string(&quote.tags)?,
                quote.is_active,
                quote.updated_at
            ],
        )?;

        if let Some(core_value_ids) = core_value_ids {
            for core_value_id in core_value_ids {
                require(&tx, "core_values", "Core value", core_value_id)?;
            }
            tx.execute("DELETE FROM core_value_quotes WHERE quote_id = ?1", [id])?;
            for core_value_id in core_value_ids {
                link_quote(&tx, core_value_id, id, now)?;
            }
        }
        tx.commit()?;

        self.get_quote(id)
    }

    fn set_quote_active(&mut self, id: &str, active: bool) -> Result<bool> {
        set_active(&self.conn, "quotes", id, active)
    }

    fn delete_quote(&mut self, id: &str) -> Result<bool> {
        delete_row(&self.conn, "quotes", id)
    }

    // ========== Relations ==========

    fn link_core_supporting(&mut self, core_value_id: &str, supporting_value_id: &str) -> Result<CoreValueSupportingValue> {
        require(&self.conn, "core_values", "Core value", core_value_id)?;
        require(&self.conn, "supporting_values", "Supporting value", supporting_value_id)?;
        link_supporting(&self.conn, core_value_id, supporting_value_id, Utc::now())
    }

    fn link_core_quote(&mut self, core_value_id: &str, quote_id: &str) -> Result<CoreValueQuote> {
        require(&self.conn, "core_values", "Core value", core_value_id)?;
        require(&self.conn, "quotes", "Quote", quote_id)?;
        link_quote(&self.conn, core_value_id, quote_id, Utc::now())
    }

    // ========== Posts ==========

    fn list_quote_posts(&self) -> Result<Vec<QuotePostWithData>> {
        let posts = query_all(
            &self.conn,
            &format!("SELECT {POST_COLUMNS} FROM quote_posts ORDER BY created_at DESC, id DESC"),
            [],
            row_to_post,
        )?;

        let mut result = Vec::with_capacity(posts.len());
        for post in posts {
            if let Some(full) = with_post_data(self, post)? {
                result.push(full);
            }
        }
        Ok(result)
    }

    fn get_quote_post(&self, id: &str) -> Result<Option<QuotePostWithData>> {
        match self.get_post_row(id)? {
            Some(post) => with_post_data(self, post),
            None => Ok(None),
        }
    }

    fn create_quote_post(&mut self, input: NewQuotePost) -> Result<QuotePost> {
        require(&self.conn, "core_values", "Core value", &input.core_value_id)?;
        require(&self.conn, "supporting_values", "Supporting value", &input.supporting_value_id)?;
        require(&self.conn, "quotes", "Quote", &input.quote_id)?;

        let post = QuotePost::create(input, Utc::now());
        insert_post(&self.conn, &post)?;
        Ok(post)
    }

    fn update_quote_post(&mut self, id: &str, patch: QuotePostPatch) -> Result<Option<QuotePost>> {
        let Some(mut post) = self.get_post_row(id)? else {
            return Ok(None);
        };
        post.apply(patch, Utc::now());
        self.conn.execute(
            r#"
            UPDATE quote_posts SET is_published = ?2, published_at = ?3, scheduled_for = ?4,
                                   meta_post_id = ?5, image_url = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                post.id,
                post.is_published,
                post.published_at,
                post.scheduled_for,
                post.meta_post_id,
                post.image_url,
                post.updated_at
            ],
        )?;
        Ok(Some(post))
    }

    // ========== Whole store ==========

    fn stats(&self) -> Result<StoreStats> {
        self.conn
            .query_row(
                r#"
                SELECT (SELECT COUNT(*) FROM core_values WHERE is_active = 1),
                       (SELECT COUNT(*) FROM supporting_values WHERE is_active = 1),
                       (SELECT COUNT(*) FROM quotes WHERE is_active = 1),
                       (SELECT COUNT(*) FROM authors WHERE is_active = 1),
                       (SELECT COUNT(*) FROM quote_posts),
                       (SELECT COUNT(*) FROM quote_posts WHERE is_published = 1)
                "#,
                [],
                |row| {
                    Ok(StoreStats {
                        core_values: row.get::<_, i64>(0)? as usize,
                        supporting_values: row.get::<_, i64>(1)? as usize,
                        quotes: row.get::<_, i64>(2)? as usize,
                        authors: row.get::<_, i64>(3)? as usize,
                        posts: row.get::<_, i64>(4)? as usize,
                        published_posts: row.get::<_, i64>(5)? as usize,
                    })
                },
            )
            .map_err(Into::into)
    }

    fn export_dataset(&self) -> Result<Dataset> {
        let conn = &self.conn;
        Ok(Dataset {
            core_values: query_all(conn, &format!("SELECT {VALUE_COLUMNS} FROM core_values ORDER BY rowid"), [], row_to_core_value)?,
            supporting_values: query_all(
                conn,
                &format!("SELECT {VALUE_COLUMNS} FROM supporting_values ORDER BY rowid"),
                [],
                row_to_supporting_value,
            )?,
            authors: query_all(conn, &format!("SELECT {AUTHOR_COLUMNS} FROM authors ORDER BY rowid"), [], row_to_author)?,
            quotes: query_all(conn, &format!("SELECT {QUOTE_COLUMNS} FROM quotes ORDER BY rowid"), [], row_to_quote)?,
            core_value_supporting_values: query_all(
                conn,
                "SELECT id, core_value_id, supporting_value_id, created_at FROM core_value_supporting_values ORDER BY rowid",
                [],
                |row| {
                    Ok(CoreValueSupportingValue {
                        id: row.get(0)?,
                        core_value_id: row.get(1)?,
                        supporting_value_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )?,
            core_value_quotes: query_all(
                conn,
                "SELECT id, core_value_id, quote_id, created_at FROM core_value_quotes ORDER BY rowid",
                [],
                |row| {
                    Ok(CoreValueQuote {
                        id: row.get(0)?,
                        core_value_id: row.get(1)?,
                        quote_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )?,
            quote_posts: query_all(conn, &format!("SELECT {POST_COLUMNS} FROM quote_posts ORDER BY rowid"), [], row_to_post)?,
        })
    }

    fn replace_dataset(&mut self, dataset: &Dataset) -> Result<()> {
        let tx = self.conn.transaction()?;
        for table in schema::TABLES_CHILD_FIRST {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        for core_value in &dataset.core_values {
            insert_core_value(&tx, core_value)?;
        }
        for supporting_value in &dataset.supporting_values {
            insert_supporting_value(&tx, supporting_value)?;
        }
        for author in &dataset.authors {
            insert_author(&tx, author)?;
        }
        for quote in &dataset.quotes {
            insert_quote(&tx, quote)?;
        }
        for rel in &dataset.core_value_supporting_values {
            tx.execute(
                "INSERT OR IGNORE INTO core_value_supporting_values (id, core_value_id, supporting_value_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![rel.id, rel.core_value_id, rel.supporting_value_id, rel.created_at],
            )?;
        }
        for rel in &dataset.core_value_quotes {
            tx.execute(
                "INSERT OR IGNORE INTO core_value_quotes (id, core_value_id, quote_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![rel.id, rel.core_value_id, rel.quote_id, rel.created_at],
            )?;
        }
        for post in &dataset.quote_posts {
            insert_post(&tx, post)?;
        }

        tx.commit()?;
        tracing::debug!(
            core_values = dataset.core_values.len(),
            quotes = dataset.quotes.len(),
            "replaced sqlite dataset"
        );
        Ok(())
    }

    fn is_empty(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT (SELECT COUNT(*) FROM core_values) + (SELECT COUNT(*) FROM supporting_values) + (SELECT COUNT(*) FROM quotes)",
            [],
            |row| row.get(0),
        )?;
        Ok(count == 0)
    }
}

// ========== Helpers ==========

fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, f: F) -> Result<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn exists(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let found = conn
        .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn require(conn: &Connection, table: &str, kind: &'static str, id: &str) -> Result<()> {
    if exists(conn, table, id)? {
        Ok(())
    } else {
        Err(Error::NotFound(kind, id.to_string()))
    }
}

fn set_active(conn: &Connection, table: &str, id: &str, active: bool) -> Result<bool> {
    let changed = conn.execute(
        &format!("UPDATE {table} SET is_active = ?2, updated_at = ?3 WHERE id = ?1"),
        params![id, active, Utc::now()],
    )?;
    Ok(changed > 0)
}

/// Dependent rows go with it via the foreign keys
fn delete_row(conn: &Connection, table: &str, id: &str) -> Result<bool> {
    let changed = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
    Ok(changed > 0)
}

fn link_supporting(
    conn: &Connection,
    core_value_id: &str,
    supporting_value_id: &str,
    now: DateTime<Utc>,
) -> Result<CoreValueSupportingValue> {
    let existing = conn
        .query_row(
            "SELECT id, core_value_id, supporting_value_id, created_at FROM core_value_supporting_values \
             WHERE core_value_id = ?1 AND supporting_value_id = ?2",
            [core_value_id, supporting_value_id],
            |row| {
                Ok(CoreValueSupportingValue {
                    id: row.get(0)?,
                    core_value_id: row.get(1)?,
                    supporting_value_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    if let Some(rel) = existing {
        return Ok(rel);
    }

    let rel = CoreValueSupportingValue::new(core_value_id, supporting_value_id, now);
    conn.execute(
        "INSERT INTO core_value_supporting_values (id, core_value_id, supporting_value_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![rel.id, rel.core_value_id, rel.supporting_value_id, rel.created_at],
    )?;
    Ok(rel)
}

fn link_quote(conn: &Connection, core_value_id: &str, quote_id: &str, now: DateTime<Utc>) -> Result<CoreValueQuote> {
    let existing = conn
        .query_row(
            "SELECT id, core_value_id, quote_id, created_at FROM core_value_quotes WHERE core_value_id = ?1 AND quote_id = ?2",
            [core_value_id, quote_id],
            |row| {
                Ok(CoreValueQuote {
                    id: row.get(0)?,
                    core_value_id: row.get(1)?,
                    quote_id: row.get(2)?,
                    created_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    if let Some(rel) = existing {
        return Ok(rel);
    }

    let rel = CoreValueQuote::new(core_value_id, quote_id, now);
    conn.execute(
        "INSERT INTO core_value_quotes (id, core_value_id, quote_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![rel.id, rel.core_value_id, rel.quote_id, rel.created_at],
    )?;
    Ok(rel)
}

fn insert_core_value(conn: &Connection, cv: &CoreValue) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO core_values ({VALUE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![cv.id, cv.value, cv.description, cv.is_active, cv.created_at, cv.updated_at],
    )?;
    Ok(())
}

fn insert_supporting_value(conn: &Connection, sv: &SupportingValue) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO supporting_values ({VALUE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
        params![sv.id, sv.value, sv.description, sv.is_active, sv.created_at, sv.updated_at],
    )?;
    Ok(())
}

fn insert_author(conn: &Connection, author: &Author) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO authors ({AUTHOR_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        params![author.id, author.name, author.is_active, author.created_at, author.updated_at],
    )?;
    Ok(())
}

fn insert_quote(conn: &Connection, quote: &Quote) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO quotes ({QUOTE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        params![
            quote.id,
            quote.text,
            quote.author_id,
            quote.source,
            quote.category,
            serde_json::to_string(&quote.tags)?,
            quote.is_active,
            quote.created_at,
            quote.updated_at
        ],
    )?;
    Ok(())
}

fn insert_post(conn: &Connection, post: &QuotePost) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO quote_posts ({POST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
        params![
            post.id,
            post.core_value_id,
            post.supporting_value_id,
            post.quote_id,
            post.is_published,
            post.published_at,
            post.scheduled_for,
            post.meta_post_id,
            post.image_url,
            post.created_at,
            post.updated_at
        ],
    )?;
    Ok(())
}

// ========== Row mapping ==========

fn row_to_core_value(row: &Row<'_>) -> rusqlite::Result<CoreValue> {
    Ok(CoreValue {
        id: row.get(0)?,
        value: row.get(1)?,
        description: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_supporting_value(row: &Row<'_>) -> rusqlite::Result<SupportingValue> {
    Ok(SupportingValue {
        id: row.get(0)?,
        value: row.get(1)?,
        description: row.get(2)?,
        is_active: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_supporting_with_links(row: &Row<'_>) -> rusqlite::Result<SupportingValueWithLinks> {
    Ok(SupportingValueWithLinks {
        supporting_value: row_to_supporting_value(row)?,
        core_value_ids: split_ids(row.get(6)?),
    })
}

fn row_to_author(row: &Row<'_>) -> rusqlite::Result<Author> {
    Ok(Author {
        id: row.get(0)?,
        name: row.get(1)?,
        is_active: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn row_to_quote(row: &Row<'_>) -> rusqlite::Result<Quote> {
    let tags: String = row.get(5)?;
    Ok(Quote {
        id: row.get(0)?,
        text: row.get(1)?,
        author_id: row.get(2)?,
        source: row.get(3)?,
        category: row.get(4)?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Expects [`QUOTE_SELECT`] column order
fn row_to_quote_with_author(row: &Row<'_>) -> rusqlite::Result<QuoteWithAuthor> {
    let quote = row_to_quote(row)?;
    let author = match row.get::<_, Option<String>>(9)? {
        Some(id) => Some(Author {
            id,
            name: row.get(10)?,
            is_active: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        }),
        None => None,
    };
    Ok(QuoteWithAuthor {
        quote,
        author,
        core_value_ids: split_ids(row.get(14)?),
    })
}

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<QuotePost> {
    Ok(QuotePost {
        id: row.get(0)?,
        core_value_id: row.get(1)?,
        supporting_value_id: row.get(2)?,
        quote_id: row.get(3)?,
        is_published: row.get(4)?,
        published_at: row.get(5)?,
        scheduled_for: row.get(6)?,
        meta_post_id: row.get(7)?,
        image_url: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Ids are ULIDs, so a comma never occurs inside one
fn split_ids(joined: Option<String>) -> Vec<String> {
    let mut ids: Vec<String> = joined
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anchorpost.db");
        {
            let mut store = SqliteStore::open(&path).unwrap();
            store.create_core_value(NewValue::new("Growth")).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.list_core_values().unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.conn.execute(
            "INSERT INTO core_value_quotes (id, core_value_id, quote_id, created_at) VALUES ('x', 'a', 'b', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_tags_roundtrip_as_json_text() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut input = NewQuote::new("Tags travel as a JSON array.");
        input.tags = vec!["calm".into(), "focus".into()];
        let quote = store.create_quote(input, &[]).unwrap();

        let raw: String = store
            .conn
            .query_row("SELECT tags FROM quotes WHERE id = ?1", [&quote.quote.id], |row| row.get(0))
            .unwrap();
        assert_eq!(raw, r#"["calm","focus"]"#);
        assert_eq!(store.get_quote(&quote.quote.id).unwrap().unwrap().quote.tags, vec!["calm", "focus"]);
    }

    #[test]
    fn test_archived_author_hidden_from_quote_view() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let author = store.create_author(NewAuthor::new("Rumi")).unwrap();
        let quote = store
            .create_quote(NewQuote::new("What you seek is seeking you.").with_author(&author.id), &[])
            .unwrap();
        store.archive_author(&author.id).unwrap();

        let view = store.get_quote(&quote.quote.id).unwrap().unwrap();
        assert_eq!(view.quote.author_id.as_deref(), Some(author.id.as_str()));
        assert!(view.author.is_none());
    }

    #[test]
    fn test_failed_link_rolls_back_quote() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let result = store.create_quote(NewQuote::new("Nothing should persist here."), &["missing".to_string()]);
        assert!(result.is_err());
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_corrupt_tags_are_an_error() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let quote = store.create_quote(NewQuote::new("Tags must stay valid JSON."), &[]).unwrap();
        store
            .conn
            .execute("UPDATE quotes SET tags = 'not json' WHERE id = ?1", [&quote.quote.id])
            .unwrap();

        let result = store.get_quote(&quote.quote.id);
        assert!(matches!(
            result,
            Err(Error::Storage(rusqlite::Error::FromSqlConversionFailure(5, Type::Text, _)))
        ));
    }
}
