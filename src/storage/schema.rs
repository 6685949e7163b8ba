//! Database schema definitions
//!
//! Timestamps are stored as text in one fixed format, so ordering by them
//! as strings is chronological. Quote tags are a JSON array in text.

/// SQL to create the core_values table
pub const CREATE_CORE_VALUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS core_values (
    id TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create the supporting_values table
pub const CREATE_SUPPORTING_VALUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS supporting_values (
    id TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_AUTHORS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS authors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// Deleting an author leaves its quotes unattributed
pub const CREATE_QUOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quotes (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    author_id TEXT REFERENCES authors(id) ON DELETE SET NULL,
    source TEXT,
    category TEXT,
    tags TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_CORE_VALUE_SUPPORTING_VALUES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS core_value_supporting_values (
    id TEXT PRIMARY KEY,
    core_value_id TEXT NOT NULL REFERENCES core_values(id) ON DELETE CASCADE,
    supporting_value_id TEXT NOT NULL REFERENCES supporting_values(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE(core_value_id, supporting_value_id)
)
"#;

pub const CREATE_CORE_VALUE_QUOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS core_value_quotes (
    id TEXT PRIMARY KEY,
    core_value_id TEXT NOT NULL REFERENCES core_values(id) ON DELETE CASCADE,
    quote_id TEXT NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE(core_value_id, quote_id)
)
"#;

pub const CREATE_QUOTE_POSTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS quote_posts (
    id TEXT PRIMARY KEY,
    core_value_id TEXT NOT NULL REFERENCES core_values(id) ON DELETE CASCADE,
    supporting_value_id TEXT NOT NULL REFERENCES supporting_values(id) ON DELETE CASCADE,
    quote_id TEXT NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
    is_published INTEGER NOT NULL DEFAULT 0,
    published_at TEXT,
    scheduled_for TEXT,
    meta_post_id TEXT,
    image_url TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_quotes_author ON quotes(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_cvsv_supporting ON core_value_supporting_values(supporting_value_id)",
    "CREATE INDEX IF NOT EXISTS idx_cvq_quote ON core_value_quotes(quote_id)",
    "CREATE INDEX IF NOT EXISTS idx_posts_created ON quote_posts(created_at)",
];

/// All schema creation statements, in dependency order
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_CORE_VALUES_TABLE,
        CREATE_SUPPORTING_VALUES_TABLE,
        CREATE_AUTHORS_TABLE,
        CREATE_QUOTES_TABLE,
        CREATE_CORE_VALUE_SUPPORTING_VALUES_TABLE,
        CREATE_CORE_VALUE_QUOTES_TABLE,
        CREATE_QUOTE_POSTS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}

/// Tables in reverse dependency order, for wiping the store
pub const TABLES_CHILD_FIRST: &[&str] = &[
    "quote_posts",
    "core_value_quotes",
    "core_value_supporting_values",
    "quotes",
    "authors",
    "supporting_values",
    "core_values",
];
