//! Data quality report
//!
//! Heuristic review of quotes before they go out on social media.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::Dataset;

const MAX_SOCIAL_CHARS: usize = 200;
const MIN_SUBSTANCE_CHARS: usize = 20;
const RELEVANCE_CHECK_CHARS: usize = 50;

const RELIGIOUS_TERMS: &[&str] = &["God", "Divine", "Christ", "Jesus", "Bible", "Scripture", "Prayer"];
const ACADEMIC_TERMS: &[&str] = &["manifestations", "relinquishment", "episodic", "ontological"];
const SYSTEM_REFERENCES: &[&str] = &["Gene Keys", "Course in Miracles", "Notion"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRating {
    Good,
    NeedsReview,
    Archive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteAssessment {
    pub text: String,
    pub author: String,
    pub quality: QualityRating,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreValueReport {
    pub value: String,
    pub supporting_values: Vec<String>,
    pub quotes: Vec<QuoteAssessment>,
}

impl CoreValueReport {
    pub fn count(&self, rating: QualityRating) -> usize {
        self.quotes.iter().filter(|q| q.quality == rating).count()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub archive: Vec<String>,
    pub needs_review: Vec<String>,
    pub duplicates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub core_values: Vec<CoreValueReport>,
    pub recommendations: Recommendations,
}

/// Rate every quote under every core value of `dataset`
pub fn analyze(dataset: &Dataset) -> QualityReport {
    let authors: HashMap<&str, &str> = dataset.authors.iter().map(|a| (a.id.as_str(), a.name.as_str())).collect();

    let mut core_values = Vec::new();
    for cv in &dataset.core_values {
        let sv_ids: HashSet<&str> = dataset
            .core_value_supporting_values
            .iter()
            .filter(|rel| rel.core_value_id == cv.id)
            .map(|rel| rel.supporting_value_id.as_str())
            .collect();
        let supporting_values = dataset
            .supporting_values
            .iter()
            .filter(|sv| sv_ids.contains(sv.id.as_str()))
            .map(|sv| sv.value.clone())
            .collect();

        let quote_ids: HashSet<&str> = dataset
            .core_value_quotes
            .iter()
            .filter(|rel| rel.core_value_id == cv.id)
            .map(|rel| rel.quote_id.as_str())
            .collect();
        let quotes = dataset
            .quotes
            .iter()
            .filter(|q| quote_ids.contains(q.id.as_str()))
            .map(|q| {
                let author = q
                    .author_id
                    .as_deref()
                    .and_then(|id| authors.get(id).copied())
                    .unwrap_or("")
                    .to_string();
                let (quality, issues) = assess_quote(&q.text, &author, &cv.value);
                QuoteAssessment { text: q.text.clone(), author, quality, issues }
            })
            .collect();

        core_values.push(CoreValueReport { value: cv.value.clone(), supporting_values, quotes });
    }

    let mut recommendations = Recommendations::default();
    for cv in &core_values {
        for quote in &cv.quotes {
            let line = format!("\"{}\" - {}", quote.text, quote.issues.join(", "));
            match quote.quality {
                QualityRating::Archive => recommendations.archive.push(line),
                QualityRating::NeedsReview => recommendations.needs_review.push(line),
                QualityRating::Good => {}
            }
        }
    }

    let mut links_per_quote: HashMap<&str, usize> = HashMap::new();
    for rel in &dataset.core_value_quotes {
        *links_per_quote.entry(rel.quote_id.as_str()).or_default() += 1;
    }
    recommendations.duplicates = dataset
        .quotes
        .iter()
        .filter(|q| links_per_quote.get(q.id.as_str()).copied().unwrap_or(0) > 1)
        .map(|q| q.text.clone())
        .collect();

    QualityReport { core_values, recommendations }
}

/// Rate one quote; any issue downgrades it to `NeedsReview`
pub fn assess_quote(text: &str, author: &str, core_value: &str) -> (QualityRating, Vec<String>) {
    let mut issues = Vec::new();
    let length = text.chars().count();
    let lower = text.to_lowercase();
    let trimmed = text.trim();

    if length > MAX_SOCIAL_CHARS {
        issues.push("Too long for social media".to_string());
    }
    if length < MIN_SUBSTANCE_CHARS {
        issues.push("Too short, lacks substance".to_string());
    }
    if RELIGIOUS_TERMS.iter().any(|term| text.contains(term)) {
        issues.push("Contains specific religious references".to_string());
    }
    if ACADEMIC_TERMS.iter().any(|term| lower.contains(term)) {
        issues.push("May be too academic/complex".to_string());
    }
    if !trimmed.ends_with(['.', '?', '!']) {
        issues.push("Incomplete sentence".to_string());
    }
    if SYSTEM_REFERENCES.iter().any(|term| text.contains(term)) {
        issues.push("Contains specific book/system references".to_string());
    }
    if author.trim().is_empty() {
        issues.push("Missing author attribution".to_string());
    }

    let keywords = core_value_keywords(core_value);
    if length > RELEVANCE_CHECK_CHARS && !keywords.iter().any(|k| lower.contains(k)) {
        issues.push(format!("May not relate clearly to {}", core_value));
    }

    let rating = if issues.is_empty() { QualityRating::Good } else { QualityRating::NeedsReview };
    (rating, issues)
}

fn core_value_keywords(core_value: &str) -> &'static [&'static str] {
    match core_value {
        "Balance" => &["balance", "harmony", "equilibrium", "peace", "flow", "stability", "center"],
        "Growth" => &["grow", "develop", "learn", "evolve", "progress", "expand", "journey", "change"],
        "Freedom" => &["free", "choice", "liberty", "independence", "courage", "path", "decide"],
        "Contribution" => &["give", "serve", "help", "love", "connect", "community", "share", "impact"],
        "Authenticity" => &["true", "authentic", "genuine", "self", "honest", "real", "essence", "nature"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::parse_notion_csv;

    #[test]
    fn test_good_quote() {
        let (rating, issues) = assess_quote("Every day is a chance to grow.", "Anon", "Growth");
        assert_eq!(rating, QualityRating::Good);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_issues_accumulate() {
        let (rating, issues) = assess_quote("Pray to God", "", "Growth");
        assert_eq!(rating, QualityRating::NeedsReview);
        assert!(issues.contains(&"Too short, lacks substance".to_string()));
        assert!(issues.contains(&"Contains specific religious references".to_string()));
        assert!(issues.contains(&"Incomplete sentence".to_string()));
        assert!(issues.contains(&"Missing author attribution".to_string()));
    }

    #[test]
    fn test_relevance_only_checked_for_known_values_and_long_quotes() {
        let long = "This sentence is deliberately long enough to cross the relevance threshold.";
        let (_, issues) = assess_quote(long, "Someone", "Balance");
        assert!(issues.contains(&"May not relate clearly to Balance".to_string()));

        // Unknown values have no keywords, so every long quote is flagged
        let (_, issues) = assess_quote(long, "Someone", "Wonder");
        assert!(issues.iter().any(|i| i.contains("Wonder")));
    }

    #[test]
    fn test_report_groups_by_core_value() {
        let content = "h\n\
            R1,x,Growth,x,Curiosity,x,\"We grow through what we go through, always.\",Anon\n\
            R2,x,Balance,x,Patience,x,\"We grow through what we go through, always.\",Anon";
        let report = analyze(&parse_notion_csv(content));

        assert_eq!(report.core_values.len(), 2);
        assert_eq!(report.core_values[0].supporting_values, vec!["Curiosity"]);
        assert_eq!(report.core_values[0].count(QualityRating::Good), 1);
        assert_eq!(report.recommendations.duplicates, vec!["We grow through what we go through, always."]);
    }
}
