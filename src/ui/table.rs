use crate::model::{DbStats, Source};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
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

pub fn stats_table(stats: &DbStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Sources", &stats.total_sources.to_string());
    for (kind, count) in &stats.sources_by_type {
        builder.add_row(&format!("  {}", kind), &count.to_string());
    }
    for (status, count) in &stats.sources_by_status {
        builder.add_row(&format!("  {}", status), &count.to_string());
    }
    builder.add_row("Identifiers", &stats.total_identifiers.to_string());
    builder.add_row("Notes", &stats.total_notes.to_string());
    builder.add_row("Entities", &stats.total_entities.to_string());
    builder.add_row("Entity links", &stats.total_links.to_string());
    builder.build()
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "#")]
    id: i64,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Type")]
    source_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Updated")]
    updated_at: String,
}

pub fn sources_table(sources: &[Source]) -> String {
    let rows: Vec<SourceRow> = sources
        .iter()
        .map(|s| SourceRow {
            id: s.id,
            title: s.title.clone(),
            source_type: s.source_type.to_string(),
            status: s.status.to_string(),
            updated_at: s.updated_at.clone(),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}
