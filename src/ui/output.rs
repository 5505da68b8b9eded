use crate::model::{Source, SourceDetails};
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::BOOKS, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// One numbered line of a source listing
pub fn source_line(index: usize, source: &Source) {
    println!("{}. {}", index, source.title.style(theme().header.clone()));
    println!(
        "   {} {}  {} {}",
        dim("type"),
        source.source_type,
        dim("status"),
        source.status.as_str().style(theme().status(source.status))
    );
}

/// Compact multi-line summary of a source and what hangs off it
pub fn source_summary(details: &SourceDetails) -> String {
    let source = &details.source;
    let mut lines = vec![
        format!("{} {}", Icons::BOOKS, source.title),
        format!("   Type: {}", source.source_type),
        format!("   Status: {}", source.status),
    ];

    if !details.identifiers.is_empty() {
        let ids: Vec<String> = details
            .identifiers
            .iter()
            .map(|i| format!("{}: {}", i.identifier_type, i.identifier_value))
            .collect();
        lines.push(format!("   IDs: {}", ids.join(", ")));
    }
    if !details.notes.is_empty() {
        lines.push(format!("   Notes: {}", details.notes.len()));
    }
    if !details.entity_links.is_empty() {
        lines.push(format!("   Entity Links: {}", details.entity_links.len()));
    }

    lines.join("\n")
}
