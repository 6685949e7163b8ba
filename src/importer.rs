//! Notion CSV importer
//!
//! Turns a Notion "Core Values" export into a normalized [`Dataset`].
//! The export is semi-structured: rollup columns hold comma-joined lists,
//! and quotes themselves contain commas. Column layout:
//!
//! | index | column |
//! |---|---|
//! | 2 | Core Value Roll |
//! | 4 | All Values Roll (supporting values) |
//! | 6 | Quotes Roll |
//! | 7 | Author Roll (positionally aligned with quotes, blanks kept) |

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{
    Author, CoreValue, CoreValueQuote, CoreValueSupportingValue, Dataset, NewAuthor, NewQuote, NewValue, Quote,
    SupportingValue,
};

const MIN_COLUMNS: usize = 8;
const CORE_VALUE_COLUMN: usize = 2;
const SUPPORTING_VALUES_COLUMN: usize = 4;
const QUOTES_COLUMN: usize = 6;
const AUTHORS_COLUMN: usize = 7;

/// Fragments this short are list noise, not quotes
const MIN_QUOTE_CHARS: usize = 20;

static EDGE_QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^["']+|["']+$"#).expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One data row of the export, before entity creation
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub core_value: String,
    pub supporting_values: Vec<String>,
    pub quotes: Vec<String>,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteAuthorPair {
    pub quote: String,
    pub author: Option<String>,
}

/// Entity and link counts of an imported dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub core_values: usize,
    pub supporting_values: usize,
    pub authors: usize,
    pub quotes: usize,
    pub core_value_supporting_values: usize,
    pub core_value_quotes: usize,
}

impl From<&Dataset> for ImportSummary {
    fn from(dataset: &Dataset) -> Self {
        Self {
            core_values: dataset.core_values.len(),
            supporting_values: dataset.supporting_values.len(),
            authors: dataset.authors.len(),
            quotes: dataset.quotes.len(),
            core_value_supporting_values: dataset.core_value_supporting_values.len(),
            core_value_quotes: dataset.core_value_quotes.len(),
        }
    }
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} core values, {} supporting values, {} quotes from {} authors ({} value links, {} quote links)",
            self.core_values,
            self.supporting_values,
            self.quotes,
            self.authors,
            self.core_value_supporting_values,
            self.core_value_quotes
        )
    }
}

/// Parse a Notion CSV export into a dataset stamped with the current time
pub fn parse_notion_csv(content: &str) -> Dataset {
    parse_notion_csv_at(content, Utc::now())
}

/// Parse a Notion CSV export; every created row shares `now`
pub fn parse_notion_csv_at(content: &str, now: DateTime<Utc>) -> Dataset {
    let rows: Vec<ParsedRow> = content
        .split('\n')
        .skip(1)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_row)
        .collect();

    tracing::debug!("Parsed {} CSV rows", rows.len());
    build_dataset(&rows, now)
}

/// Split one CSV line into its columns and pick out the rollups we use
pub fn parse_row(line: &str) -> Option<ParsedRow> {
    let parts = parse_csv_line(line);
    if parts.len() < MIN_COLUMNS {
        return None;
    }

    let core_value = clean_value(&parts[CORE_VALUE_COLUMN]);
    if core_value.is_empty() {
        return None;
    }

    let supporting_values = parts[SUPPORTING_VALUES_COLUMN]
        .split(',')
        .map(clean_value)
        .filter(|v| !v.is_empty())
        .collect();

    Some(ParsedRow {
        core_value,
        supporting_values,
        quotes: parse_quotes(&parts[QUOTES_COLUMN]),
        authors: parse_authors(&parts[AUTHORS_COLUMN]),
    })
}

/// Comma-separated fields; `"` toggles quoting and `""` inside quotes is a literal quote
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => result.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    result.push(current);
    result
}

/// Split a quotes rollup. A comma ends a quote only when the text so far
/// ends a sentence; shorter fragments are discarded.
pub fn parse_quotes(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let mut quotes = Vec::new();
    let mut current = String::new();

    for c in raw.chars() {
        if c == ',' && ends_sentence(current.trim()) {
            push_quote(&mut quotes, current.trim());
            current.clear();
        } else {
            current.push(c);
        }
    }
    push_quote(&mut quotes, current.trim());

    quotes
}

fn ends_sentence(text: &str) -> bool {
    text.ends_with(['.', '!', '?'])
}

fn push_quote(quotes: &mut Vec<String>, candidate: &str) {
    if candidate.chars().count() > MIN_QUOTE_CHARS {
        quotes.push(clean_value(candidate));
    }
}

/// Split an authors rollup, keeping blank entries so positions line up with quotes
pub fn parse_authors(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|a| a.trim().to_string()).collect()
}

/// Quote `i` is attributed to author `i` when that entry exists and is not blank
pub fn pair_quotes_with_authors(quotes: &[String], authors: &[String]) -> Vec<QuoteAuthorPair> {
    quotes
        .iter()
        .enumerate()
        .map(|(i, quote)| QuoteAuthorPair {
            quote: quote.clone(),
            author: authors.get(i).filter(|a| !a.trim().is_empty()).cloned(),
        })
        .collect()
}

/// Trim, strip edge quote marks, collapse whitespace and straighten curly quotes
pub fn clean_value(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let stripped = EDGE_QUOTES.replace_all(trimmed, "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .trim()
        .to_string()
}

/// Stock description for the well-known values, generic phrasing otherwise
pub fn value_description(value: &str) -> String {
    match value {
        "Balance" => "Finding harmony and equilibrium in all aspects of life".to_string(),
        "Contribution" => "Making a positive impact and serving others meaningfully".to_string(),
        "Freedom" => "Liberation from limitations and the power to choose your path".to_string(),
        "Growth" => "Continuous learning, development, and personal evolution".to_string(),
        "Authenticity" => "Being true to your genuine self and living with integrity".to_string(),
        other => format!("Embodying the principle of {}", other.to_lowercase()),
    }
}

/// Keyword-bucket category for a quote
pub fn categorize_quote(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["love", "heart", "compassion"]) {
        "Love & Compassion"
    } else if has(&["fear", "courage", "strength"]) {
        "Courage & Strength"
    } else if has(&["wisdom", "knowledge", "learn"]) {
        "Wisdom & Insight"
    } else if has(&["grow", "change", "transform"]) {
        "Growth & Transformation"
    } else if has(&["peace", "calm", "present"]) {
        "Peace & Presence"
    } else {
        "General Wisdom"
    }
}

/// First-seen-order set of cleaned strings
#[derive(Default)]
struct Ordered {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl Ordered {
    fn insert(&mut self, value: String) {
        if !value.is_empty() && self.seen.insert(value.clone()) {
            self.items.push(value);
        }
    }
}

fn build_dataset(rows: &[ParsedRow], now: DateTime<Utc>) -> Dataset {
    let mut core_names = Ordered::default();
    let mut supporting_names = Ordered::default();
    let mut author_names = Ordered::default();
    let mut pairs = Vec::new();

    for row in rows {
        core_names.insert(row.core_value.clone());
        for sv in &row.supporting_values {
            supporting_names.insert(sv.clone());
        }
        for pair in pair_quotes_with_authors(&row.quotes, &row.authors) {
            if let Some(author) = &pair.author {
                author_names.insert(clean_value(author));
            }
            pairs.push(pair);
        }
    }

    let core_values: Vec<CoreValue> = core_names
        .items
        .into_iter()
        .map(|value| {
            let description = value_description(&value);
            CoreValue::create(NewValue::new(value).with_description(description), now)
        })
        .collect();

    let supporting_values: Vec<SupportingValue> = supporting_names
        .items
        .into_iter()
        .map(|value| {
            let description = value_description(&value);
            SupportingValue::create(NewValue::new(value).with_description(description), now)
        })
        .collect();

    let authors: Vec<Author> = author_names
        .items
        .into_iter()
        .map(|name| Author::create(NewAuthor::new(name), now))
        .collect();

    let author_ids: HashMap<&str, &str> = authors.iter().map(|a| (a.name.as_str(), a.id.as_str())).collect();

    // The first attribution seen for a quote text wins
    let mut quotes: Vec<Quote> = Vec::new();
    let mut quote_ids: HashMap<String, String> = HashMap::new();
    for pair in &pairs {
        let text = clean_value(&pair.quote);
        if text.is_empty() || quote_ids.contains_key(&text) {
            continue;
        }
        let mut input = NewQuote::new(text.clone()).with_category(categorize_quote(&text));
        if let Some(id) = pair.author.as_deref().map(clean_value).and_then(|name| author_ids.get(name.as_str()).copied()) {
            input = input.with_author(id);
        }
        let quote = Quote::create(input, now);
        quote_ids.insert(text, quote.id.clone());
        quotes.push(quote);
    }

    let core_ids: HashMap<&str, &str> = core_values.iter().map(|c| (c.value.as_str(), c.id.as_str())).collect();
    let supporting_ids: HashMap<&str, &str> =
        supporting_values.iter().map(|s| (s.value.as_str(), s.id.as_str())).collect();

    let mut cv_sv = Vec::new();
    let mut cv_q = Vec::new();
    let mut seen_sv_links = HashSet::new();
    let mut seen_q_links = HashSet::new();

    for row in rows {
        let Some(&core_id) = core_ids.get(row.core_value.as_str()) else {
            continue;
        };

        for sv in &row.supporting_values {
            if let Some(&sv_id) = supporting_ids.get(sv.as_str()) {
                if seen_sv_links.insert((core_id, sv_id)) {
                    cv_sv.push(CoreValueSupportingValue::new(core_id, sv_id, now));
                }
            }
        }

        for text in &row.quotes {
            if let Some(quote_id) = quote_ids.get(&clean_value(text)) {
                if seen_q_links.insert((core_id, quote_id.clone())) {
                    cv_q.push(CoreValueQuote::new(core_id, quote_id.clone(), now));
                }
            }
        }
    }

    Dataset {
        core_values,
        supporting_values,
        authors,
        quotes,
        core_value_supporting_values: cv_sv,
        core_value_quotes: cv_q,
        quote_posts: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Name,Created,Core Value Roll,Values,All Values Roll,Quotes,Quotes Roll,Author Roll";

    fn csv(rows: &[&str]) -> String {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out
    }

    #[test]
    fn test_csv_line_quoting() {
        let parts = parse_csv_line(r#"a,"b, c","say ""hi""",d"#);
        assert_eq!(parts, vec!["a", "b, c", r#"say "hi""#, "d"]);
    }

    #[test]
    fn test_csv_line_trailing_empty_field() {
        assert_eq!(parse_csv_line("a,b,"), vec!["a", "b", ""]);
    }

    #[test]
    fn test_quote_boundaries_need_sentence_end() {
        let raw = "Be yourself, everyone else is already taken by someone.,Growth happens when comfort ends, and courage begins!";
        let quotes = parse_quotes(raw);
        assert_eq!(
            quotes,
            vec![
                "Be yourself, everyone else is already taken by someone.",
                "Growth happens when comfort ends, and courage begins!",
            ]
        );
    }

    #[test]
    fn test_short_fragments_dropped() {
        let quotes = parse_quotes("Too short.,This one is long enough to be kept.");
        assert_eq!(quotes, vec!["This one is long enough to be kept."]);
    }

    #[test]
    fn test_authors_keep_blank_positions() {
        assert_eq!(parse_authors("Rumi, ,Lao Tzu"), vec!["Rumi", "", "Lao Tzu"]);
        assert!(parse_authors("  ").is_empty());
    }

    #[test]
    fn test_positional_pairing() {
        let quotes = vec!["q1".to_string(), "q2".to_string(), "q3".to_string()];
        let authors = vec!["Rumi".to_string(), "".to_string()];
        let pairs = pair_quotes_with_authors(&quotes, &authors);

        assert_eq!(pairs[0].author.as_deref(), Some("Rumi"));
        assert_eq!(pairs[1].author, None);
        assert_eq!(pairs[2].author, None);
    }

    #[test]
    fn test_clean_value() {
        assert_eq!(clean_value("  \"Hello   world\"  "), "Hello world");
        assert_eq!(clean_value("\u{201C}Curly\u{201D} \u{2018}quotes\u{2019}"), "\"Curly\" 'quotes'");
        assert_eq!(clean_value(""), "");
    }

    #[test]
    fn test_descriptions_and_categories() {
        assert_eq!(value_description("Growth"), "Continuous learning, development, and personal evolution");
        assert_eq!(value_description("Joy"), "Embodying the principle of joy");
        assert_eq!(categorize_quote("Love is the answer."), "Love & Compassion");
        assert_eq!(categorize_quote("Be present."), "Peace & Presence");
        assert_eq!(categorize_quote("Keep going."), "General Wisdom");
    }

    #[test]
    fn test_rows_with_too_few_columns_are_skipped() {
        let dataset = parse_notion_csv(&csv(&["a,b,Growth"]));
        assert!(dataset.core_values.is_empty());
    }

    #[test]
    fn test_full_import_dedups_and_links() {
        let content = csv(&[
            r#"Row1,2024,Growth,x,"Curiosity, Patience",x,"The only way to grow is to keep learning daily.,Change is the law of life and nothing less.","Rumi, "#,
            r#"Row2,2024,Growth,x,"Curiosity",x,"The only way to grow is to keep learning daily.","Rumi""#,
            r#"Row3,2024,Balance,x,"Patience",x,"Peace comes from within, do not seek it without.","Buddha""#,
        ]);
        let dataset = parse_notion_csv(&content);

        assert_eq!(dataset.core_values.len(), 2);
        assert_eq!(dataset.supporting_values.len(), 2);
        assert_eq!(dataset.authors.len(), 2);
        assert_eq!(dataset.quotes.len(), 3);

        // Growth -> Curiosity, Growth -> Patience, Balance -> Patience
        assert_eq!(dataset.core_value_supporting_values.len(), 3);
        // Growth -> q1, Growth -> q2, Balance -> q3
        assert_eq!(dataset.core_value_quotes.len(), 3);

        let rumi = dataset.authors.iter().find(|a| a.name == "Rumi").unwrap();
        let q1 = dataset.quotes.iter().find(|q| q.text.starts_with("The only way")).unwrap();
        let q2 = dataset.quotes.iter().find(|q| q.text.starts_with("Change is")).unwrap();
        assert_eq!(q1.author_id.as_deref(), Some(rumi.id.as_str()));
        assert_eq!(q2.author_id, None);
        assert_eq!(q1.category.as_deref(), Some("Wisdom & Insight"));

        assert!(dataset.quote_posts.is_empty());
        assert!(dataset.core_values.iter().all(|c| c.is_active));
    }

    #[test]
    fn test_summary_counts() {
        let content = csv(&[r#"R,2024,Freedom,x,"Courage",x,"Freedom lies in being bold, always and forever.","Robert Frost""#]);
        let summary = ImportSummary::from(&parse_notion_csv(&content));
        assert_eq!(
            summary,
            ImportSummary {
                core_values: 1,
                supporting_values: 1,
                authors: 1,
                quotes: 1,
                core_value_supporting_values: 1,
                core_value_quotes: 1,
            }
        );
    }
}
