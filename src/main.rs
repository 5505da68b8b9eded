//! Litshelf CLI - personal literature catalogue

mod commands;

use clap::{Args, Parser, Subcommand};
use litshelf::config::{load_or_default, resolve_store_config};
use litshelf::output::{OutputMode, emit_error};
use litshelf::{LiteratureStore, SourceRef};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "litshelf")]
#[command(version)]
#[command(about = "Personal literature catalogue - sources, notes, reading status and linked concepts")]
#[command(long_about = r#"
Litshelf keeps track of what you read:
  • Papers, books, webpages, videos and blogs, identified by arXiv/DOI/ISBN/URL
  • Notes and a reading status per source
  • Links from sources to the concepts they discuss, introduce or critique

An existing source is always named as TITLE TYPE ID_TYPE ID_VALUE. Only the
identifier is used to find it.

Example usage:
  litshelf init
  litshelf add-source "Attention Is All You Need" paper arxiv 1706.03762
  litshelf update-status "Attention Is All You Need" paper arxiv 1706.03762 completed
  litshelf link-entity "Attention Is All You Need" paper arxiv 1706.03762 "transformer architecture" introduces
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of styled output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the literature database
    #[arg(short, long, global = true, env = "LITERATURE_DB_PATH")]
    database: Option<PathBuf>,

    /// Path to the config file (default: ./litshelf.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// An existing source, as TITLE TYPE ID_TYPE ID_VALUE
#[derive(Args, Debug)]
struct RefArgs {
    /// Title of the source
    title: String,
    /// Source type (paper, book, webpage, video, blog)
    source_type: String,
    /// Identifier type (arxiv, doi, isbn, url, semantic_scholar)
    identifier_type: String,
    /// Identifier value
    identifier_value: String,
}

impl RefArgs {
    fn to_ref(&self) -> litshelf::Result<SourceRef> {
        SourceRef::parse(&self.title, &self.source_type, &self.identifier_type, &self.identifier_value)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and write litshelf.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,

        /// Only create the database
        #[arg(long)]
        no_config: bool,
    },

    /// Add a new source with its first identifier
    AddSource {
        #[command(flatten)]
        source: RefArgs,

        /// Title of an initial note
        #[arg(long, requires = "note_content")]
        note_title: Option<String>,

        /// Content of an initial note
        #[arg(long, requires = "note_title")]
        note_content: Option<String>,
    },

    /// Attach another identifier to a source
    AddIdentifier {
        #[command(flatten)]
        source: RefArgs,

        /// Type of the new identifier
        new_identifier_type: String,

        /// Value of the new identifier
        new_identifier_value: String,
    },

    /// Add a note to a source
    AddNote {
        #[command(flatten)]
        source: RefArgs,

        note_title: String,

        note_content: String,
    },

    /// Change the reading status (unread, reading, completed, archived)
    UpdateStatus {
        #[command(flatten)]
        source: RefArgs,

        status: String,
    },

    /// Link a source to a concept
    LinkEntity {
        #[command(flatten)]
        source: RefArgs,

        /// Concept name (case-sensitive)
        entity: String,

        /// discusses, introduces, extends, evaluates, applies or critiques
        relation: String,

        /// Free-text description of the link
        #[arg(long)]
        description: Option<String>,
    },

    /// List the sources linked to a concept
    Entity {
        entity: String,
    },

    /// Show everything about one source
    Show {
        #[command(flatten)]
        source: RefArgs,
    },

    /// List sources, most recently updated first
    List {
        /// Filter by source type
        #[arg(short = 't', long = "type")]
        source_type: Option<String>,

        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,

        /// Maximum number of results (default: `[limits] list` in litshelf.toml, else 20)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Search source titles (case-insensitive)
    Search {
        query: String,

        /// Maximum number of results (default: `[limits] search` in litshelf.toml, else 10)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show database statistics
    Stats,

    /// Find an identifier (DOI, arXiv, ISBN, URL) in free text
    Detect {
        text: String,
    },

    /// Print the valid source types, identifier types, statuses and relations
    Vocabulary,

    /// Run the MCP tool server on stdio
    Serve,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Init { .. } => "init",
            Commands::AddSource { .. } => "add-source",
            Commands::AddIdentifier { .. } => "add-identifier",
            Commands::AddNote { .. } => "add-note",
            Commands::UpdateStatus { .. } => "update-status",
            Commands::LinkEntity { .. } => "link-entity",
            Commands::Entity { .. } => "entity",
            Commands::Show { .. } => "show",
            Commands::List { .. } => "list",
            Commands::Search { .. } => "search",
            Commands::Stats => "stats",
            Commands::Detect { .. } => "detect",
            Commands::Vocabulary => "vocabulary",
            Commands::Serve => "serve",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output and the MCP protocol
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let output_mode = OutputMode::from_flag(cli.json);
    let command = cli.command.name();

    if let Err(err) = run(cli, output_mode) {
        tracing::debug!("{command} failed: {err:?}");
        emit_error(output_mode, command, &err);
        std::process::exit(1);
    }
}

fn open_store(database: Option<PathBuf>, config: Option<&std::path::Path>) -> anyhow::Result<LiteratureStore> {
    let store_config = resolve_store_config(database, config)?;
    tracing::debug!("opening store at {}", store_config.database.display());
    Ok(LiteratureStore::open(&store_config)?)
}

fn run(cli: Cli, output_mode: OutputMode) -> anyhow::Result<()> {
    let Cli { database, config, command, .. } = cli;

    match command {
        Commands::Init { force, no_config } => {
            commands::run_init(output_mode, database, config, force, no_config)
        }
        Commands::Detect { text } => commands::run_detect(output_mode, &text),
        Commands::Vocabulary => commands::run_vocabulary(output_mode),
        Commands::Serve => {
            let store = open_store(database, config.as_deref())?;
            commands::run_serve(store)
        }
        Commands::AddSource { source, note_title, note_content } => {
            let source_ref = source.to_ref()?;
            let mut store = open_store(database, config.as_deref())?;
            let note = note_title.zip(note_content);
            commands::run_add_source(&mut store, output_mode, source_ref, note)
        }
        Commands::AddIdentifier { source, new_identifier_type, new_identifier_value } => {
            let source_ref = source.to_ref()?;
            let mut store = open_store(database, config.as_deref())?;
            commands::run_add_identifier(
                &mut store,
                output_mode,
                source_ref,
                &new_identifier_type,
                &new_identifier_value,
            )
        }
        Commands::AddNote { source, note_title, note_content } => {
            let source_ref = source.to_ref()?;
            let mut store = open_store(database, config.as_deref())?;
            commands::run_add_note(&mut store, output_mode, source_ref, &note_title, &note_content)
        }
        Commands::UpdateStatus { source, status } => {
            let source_ref = source.to_ref()?;
            let mut store = open_store(database, config.as_deref())?;
            commands::run_update_status(&mut store, output_mode, source_ref, &status)
        }
        Commands::LinkEntity { source, entity, relation, description } => {
            let source_ref = source.to_ref()?;
            let mut store = open_store(database, config.as_deref())?;
            commands::run_link_entity(
                &mut store,
                output_mode,
                source_ref,
                &entity,
                &relation,
                description.as_deref(),
            )
        }
        Commands::Entity { entity } => {
            let store = open_store(database, config.as_deref())?;
            commands::run_entity(&store, output_mode, &entity)
        }
        Commands::Show { source } => {
            let source_ref = source.to_ref()?;
            let store = open_store(database, config.as_deref())?;
            commands::run_show(&store, output_mode, source_ref)
        }
        Commands::List { source_type, status, limit } => {
            let limit = match limit {
                Some(limit) => limit,
                None => load_or_default(config.as_deref())?.limits.list,
            };
            let store = open_store(database, config.as_deref())?;
            commands::run_list(&store, output_mode, source_type.as_deref(), status.as_deref(), limit)
        }
        Commands::Search { query, limit } => {
            let limit = match limit {
                Some(limit) => limit,
                None => load_or_default(config.as_deref())?.limits.search,
            };
            let store = open_store(database, config.as_deref())?;
            commands::run_search(&store, output_mode, &query, limit)
        }
        Commands::Stats => {
            let store = open_store(database, config.as_deref())?;
            commands::run_stats(&store, output_mode)
        }
    }
}
