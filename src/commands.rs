use std::path::{Path, PathBuf};

use litshelf::config::{self, LitshelfConfig};
use litshelf::identifier;
use litshelf::model::{EntitySource, IdentifierType, RelationType, SourceFilter, Status, Vocabulary};
use litshelf::output::{OutputMode, emit_success};
use litshelf::server::McpService;
use litshelf::ui::{self, Icons};
use litshelf::{LiteratureStore, SourceRef, SourceType};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::{debug, info};

/// Warn (human mode only) when a value does not look like its identifier type
fn check_identifier(output_mode: OutputMode, identifier_type: IdentifierType, value: &str) -> bool {
    let valid = identifier::looks_valid(identifier_type, value);
    if !valid {
        debug!(%identifier_type, value, "identifier does not look well-formed");
        if output_mode.is_human() {
            ui::warn(&format!("'{}' does not look like a valid {} identifier (stored anyway)", value, identifier_type));
        }
    }
    valid
}

pub fn run_init(
    output_mode: OutputMode,
    database: Option<PathBuf>,
    config_path: Option<PathBuf>,
    force: bool,
    no_config: bool,
) -> anyhow::Result<()> {
    let config_path = config_path.unwrap_or_else(config::default_config_path);
    let database = database.unwrap_or_else(|| {
        config::default_database_path_in(config_path.parent().unwrap_or_else(|| Path::new("")))
    });

    if !no_config && config_path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", config_path.display());
    }

    let store = LiteratureStore::create(&database)?;
    let stats = store.database_stats()?;
    drop(store);
    info!("initialised store at {}", database.display());

    if !no_config {
        // Absolute, so the config works from any working directory
        let recorded = std::fs::canonicalize(&database)?;
        config::write_config(&config_path, &LitshelfConfig::with_database(recorded), force)?;
    }

    if output_mode.is_human() {
        ui::success(&format!("Literature database ready at {}", database.display()));
        if !no_config {
            ui::info("Config", &config_path.display().to_string());
        }
        ui::info("Sources", &stats.total_sources.to_string());
    } else {
        emit_success(
            output_mode,
            "init",
            &json!({
                "database": database,
                "config": (!no_config).then_some(&config_path),
                "total_sources": stats.total_sources,
            }),
        )?;
    }
    Ok(())
}

pub fn run_add_source(
    store: &mut LiteratureStore,
    output_mode: OutputMode,
    source_ref: SourceRef,
    note: Option<(String, String)>,
) -> anyhow::Result<()> {
    let well_formed = check_identifier(output_mode, source_ref.identifier_type, &source_ref.identifier_value);

    let (source_id, note_id) = store.add_source_with_note(
        &source_ref.title,
        source_ref.source_type,
        source_ref.identifier_type,
        &source_ref.identifier_value,
        note.as_ref().map(|(title, content)| (title.as_str(), content.as_str())),
    )?;
    info!(source_id, ?note_id, "added source");

    if output_mode.is_human() {
        ui::success(&format!("Added source: {}", source_ref.title));
        ui::summary_row("Type:", source_ref.source_type.as_str());
        ui::summary_row(
            "Identifier:",
            &format!("{}:{}", source_ref.identifier_type, source_ref.identifier_value),
        );
        if note_id.is_some() {
            ui::summary_row("Note:", "initial note added");
        }
    } else {
        emit_success(
            output_mode,
            "add-source",
            &json!({
                "source_id": source_id,
                "note_id": note_id,
                "identifier_looks_valid": well_formed,
            }),
        )?;
    }
    Ok(())
}

pub fn run_add_identifier(
    store: &mut LiteratureStore,
    output_mode: OutputMode,
    source_ref: SourceRef,
    identifier_type: &str,
    identifier_value: &str,
) -> anyhow::Result<()> {
    let identifier_type: IdentifierType = identifier_type.parse()?;
    let well_formed = check_identifier(output_mode, identifier_type, identifier_value);

    store.add_identifier(&source_ref, identifier_type, identifier_value)?;

    if output_mode.is_human() {
        ui::success(&format!(
            "Added identifier {}:{} to '{}'",
            identifier_type, identifier_value, source_ref.title
        ));
    } else {
        emit_success(
            output_mode,
            "add-identifier",
            &json!({
                "identifier_type": identifier_type,
                "identifier_value": identifier_value,
                "identifier_looks_valid": well_formed,
            }),
        )?;
    }
    Ok(())
}

pub fn run_add_note(
    store: &mut LiteratureStore,
    output_mode: OutputMode,
    source_ref: SourceRef,
    note_title: &str,
    note_content: &str,
) -> anyhow::Result<()> {
    let note_id = store.add_note(&source_ref, note_title, note_content)?;

    if output_mode.is_human() {
        ui::success(&format!("Added note '{}' to '{}'", note_title, source_ref.title));
    } else {
        emit_success(output_mode, "add-note", &json!({ "note_id": note_id }))?;
    }
    Ok(())
}

pub fn run_update_status(
    store: &mut LiteratureStore,
    output_mode: OutputMode,
    source_ref: SourceRef,
    status: &str,
) -> anyhow::Result<()> {
    let status: Status = status.parse()?;
    store.update_status(&source_ref, status)?;

    if output_mode.is_human() {
        ui::success(&format!(
            "'{}' is now {}",
            source_ref.title,
            status.as_str().style(ui::theme().status(status))
        ));
    } else {
        emit_success(output_mode, "update-status", &json!({ "status": status }))?;
    }
    Ok(())
}

pub fn run_link_entity(
    store: &mut LiteratureStore,
    output_mode: OutputMode,
    source_ref: SourceRef,
    entity_name: &str,
    relation_type: &str,
    description: Option<&str>,
) -> anyhow::Result<()> {
    let relation_type: RelationType = relation_type.parse()?;
    store.link_to_entity(&source_ref, entity_name, relation_type, description)?;

    if output_mode.is_human() {
        ui::success(&format!("{} {} {} '{}'", Icons::LINK, source_ref.title, relation_type, entity_name));
    } else {
        emit_success(
            output_mode,
            "link-entity",
            &json!({
                "entity_name": entity_name,
                "relation_type": relation_type,
                "description": description,
            }),
        )?;
    }
    Ok(())
}

pub fn run_entity(store: &LiteratureStore, output_mode: OutputMode, entity_name: &str) -> anyhow::Result<()> {
    let linked: Vec<EntitySource> = store.get_entity_sources(entity_name)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "entity", &linked);
    }

    ui::header(&format!("Sources linked to '{}'", entity_name));
    if linked.is_empty() {
        println!("  {} {}", Icons::EMPTY, ui::muted("No sources linked to this entity"));
        return Ok(());
    }
    for (i, entry) in linked.iter().enumerate() {
        ui::source_line(i + 1, &entry.source);
        let description = entry.description.as_deref().unwrap_or("");
        println!("   {} {} {}", Icons::TAG, entry.relation_type, ui::dim(description));
    }
    Ok(())
}

pub fn run_show(store: &LiteratureStore, output_mode: OutputMode, source_ref: SourceRef) -> anyhow::Result<()> {
    let details = store.get_source_details(&source_ref)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "show", &details);
    }

    println!("{}", ui::source_summary(&details));
    ui::summary_row("Added:", &details.source.created_at);
    ui::summary_row("Updated:", &details.source.updated_at);

    if !details.notes.is_empty() {
        ui::section(" Notes ");
        for note in &details.notes {
            println!("{} {} {}", Icons::NOTE, note.note_title.bold(), ui::dim(&note.created_at));
            for line in note.note_content.lines() {
                println!("   {}", line);
            }
        }
    }

    if !details.entity_links.is_empty() {
        ui::section(" Entities ");
        for link in &details.entity_links {
            let description = link
                .description
                .as_deref()
                .map(|d| format!(" - {}", d))
                .unwrap_or_default();
            println!("{} {} {}{}", Icons::LINK, link.relation_type, link.entity_name.bold(), ui::dim(&description));
        }
    }
    Ok(())
}

pub fn run_list(
    store: &LiteratureStore,
    output_mode: OutputMode,
    source_type: Option<&str>,
    status: Option<&str>,
    limit: usize,
) -> anyhow::Result<()> {
    let filter = SourceFilter {
        source_type: source_type.map(str::parse::<SourceType>).transpose()?,
        status: status.map(str::parse::<Status>).transpose()?,
        limit: Some(limit),
    };
    let sources = store.list_sources(&filter)?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "list", &sources);
    }

    if sources.is_empty() {
        println!("{} {}", Icons::EMPTY, ui::muted("No sources found"));
        return Ok(());
    }
    ui::header(&format!("{} source(s)", sources.len()));
    println!("{}", ui::sources_table(&sources));
    Ok(())
}

pub fn run_search(store: &LiteratureStore, output_mode: OutputMode, query: &str, limit: usize) -> anyhow::Result<()> {
    let sources = store.search_sources(query, Some(limit))?;

    if !output_mode.is_human() {
        return emit_success(output_mode, "search", &sources);
    }

    if sources.is_empty() {
        println!("{} {}", Icons::SEARCH, ui::muted(&format!("No sources matching '{}'", query)));
        return Ok(());
    }
    println!("{} Found {} source(s) matching '{}'", Icons::SEARCH, sources.len(), query);
    for (i, source) in sources.iter().enumerate() {
        ui::source_line(i + 1, source);
    }
    Ok(())
}

pub fn run_stats(store: &LiteratureStore, output_mode: OutputMode) -> anyhow::Result<()> {
    let stats = store.database_stats()?;

    if output_mode.is_human() {
        println!("{} Database Statistics", Icons::STATS);
        println!("{}", ui::stats_table(&stats));
    } else {
        emit_success(output_mode, "stats", &stats)?;
    }
    Ok(())
}

pub fn run_detect(output_mode: OutputMode, text: &str) -> anyhow::Result<()> {
    let detected = identifier::detect(text);
    let guessed = detected
        .as_ref()
        .map(|d| identifier::guess_source_type(text, d.identifier_type));

    if !output_mode.is_human() {
        return emit_success(
            output_mode,
            "detect",
            &json!({ "identifier": detected, "guessed_source_type": guessed }),
        );
    }

    match (detected, guessed) {
        (Some(found), Some(source_type)) => {
            ui::success(&format!("{}:{}", found.identifier_type, found.identifier_value));
            ui::info("Likely source type", source_type.as_str());
        }
        _ => println!("{} {}", Icons::EMPTY, ui::muted("No identifier found")),
    }
    Ok(())
}

pub fn run_vocabulary(output_mode: OutputMode) -> anyhow::Result<()> {
    let vocab = Vocabulary::current();

    if output_mode.is_human() {
        ui::header("Valid values");
        ui::summary_row("Source types:", &vocab.source_types.join(", "));
        ui::summary_row("Identifier types:", &vocab.identifier_types.join(", "));
        ui::summary_row("Statuses:", &vocab.statuses.join(", "));
        ui::summary_row("Relation types:", &vocab.relation_types.join(", "));
    } else {
        emit_success(output_mode, "vocabulary", &vocab)?;
    }
    Ok(())
}

pub fn run_serve(store: LiteratureStore) -> anyhow::Result<()> {
    eprintln!("{} litshelf MCP server listening on stdio", Icons::PLUG);
    let runtime = tokio::runtime::Runtime::new()?;
    let service = McpService::new(store);
    let served = runtime.block_on(service.run_stdio());
    // The stdin reader may still be parked in a blocking read
    runtime.shutdown_background();
    served
}
