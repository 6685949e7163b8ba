use tabled::{Table, Tabled, settings::Style};

use crate::importer::ImportSummary;
use crate::model::StoreStats;
use crate::quality::{QualityRating, QualityReport};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Count")]
    pub value: String,
}

#[derive(Tabled)]
pub struct QualityRow {
    #[tabled(rename = "Core value")]
    pub core_value: String,
    #[tabled(rename = "Supporting")]
    pub supporting: usize,
    #[tabled(rename = "Quotes")]
    pub quotes: usize,
    #[tabled(rename = "Good")]
    pub good: usize,
    #[tabled(rename = "Review")]
    pub needs_review: usize,
    #[tabled(rename = "Archive")]
    pub archive: usize,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &StoreStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Core values", stats.core_values);
    builder.add_row("Supporting values", stats.supporting_values);
    builder.add_row("Quotes", stats.quotes);
    builder.add_row("Authors", stats.authors);
    builder.add_row("Posts", stats.posts);
    builder.add_row("Published posts", stats.published_posts);
    builder.build()
}

pub fn summary_table(summary: &ImportSummary) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Core values", summary.core_values);
    builder.add_row("Supporting values", summary.supporting_values);
    builder.add_row("Authors", summary.authors);
    builder.add_row("Quotes", summary.quotes);
    builder.add_row("Core ↔ supporting links", summary.core_value_supporting_values);
    builder.add_row("Core ↔ quote links", summary.core_value_quotes);
    builder.build()
}

pub fn quality_table(report: &QualityReport) -> String {
    let rows: Vec<QualityRow> = report
        .core_values
        .iter()
        .map(|cv| QualityRow {
            core_value: cv.value.clone(),
            supporting: cv.supporting_values.len(),
            quotes: cv.quotes.len(),
            good: cv.count(QualityRating::Good),
            needs_review: cv.count(QualityRating::NeedsReview),
            archive: cv.count(QualityRating::Archive),
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_table_lists_counts() {
        let stats = StoreStats {
            core_values: 3,
            published_posts: 1,
            ..Default::default()
        };
        let table = stats_table(&stats);
        assert!(table.contains("Core values"));
        assert!(table.contains("Published posts"));
        assert!(table.contains('3'));
    }

    #[test]
    fn test_empty_builder_renders_nothing() {
        assert!(TableBuilder::new().build().is_empty());
    }
}
