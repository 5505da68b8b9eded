//! Database schema definitions

/// Current time as ISO-8601 UTC with milliseconds, evaluated by SQLite
pub const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// SQL to create the sources table
pub const CREATE_SOURCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    source_type TEXT NOT NULL CHECK(source_type IN ('paper', 'book', 'webpage', 'video', 'blog')),
    status TEXT NOT NULL DEFAULT 'unread' CHECK(status IN ('unread', 'reading', 'completed', 'archived')),
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
"#;

/// SQL to create the identifiers table
/// The (identifier_type, identifier_value) pair is the natural key of a source
pub const CREATE_IDENTIFIERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS identifiers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id),
    identifier_type TEXT NOT NULL CHECK(identifier_type IN ('arxiv', 'doi', 'isbn', 'url', 'semantic_scholar')),
    identifier_value TEXT NOT NULL,
    UNIQUE(identifier_type, identifier_value)
)
"#;

/// SQL to create the notes table
pub const CREATE_NOTES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id),
    note_title TEXT NOT NULL,
    note_content TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
)
"#;

/// SQL to create the entities table
pub const CREATE_ENTITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the entity_links table
pub const CREATE_ENTITY_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entity_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id),
    entity_id INTEGER NOT NULL REFERENCES entities(id),
    relation_type TEXT NOT NULL CHECK(relation_type IN ('discusses', 'introduces', 'extends', 'evaluates', 'applies', 'critiques')),
    description TEXT,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE(source_id, entity_id, relation_type)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_sources_type ON sources(source_type)",
    "CREATE INDEX IF NOT EXISTS idx_sources_status ON sources(status)",
    "CREATE INDEX IF NOT EXISTS idx_sources_updated ON sources(updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_identifiers_source ON identifiers(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_notes_source ON notes(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_entity_links_source ON entity_links(source_id)",
    "CREATE INDEX IF NOT EXISTS idx_entity_links_entity ON entity_links(entity_id)",
];

/// Tables that must exist for a file to count as a literature store
pub const REQUIRED_TABLES: &[&str] = &["sources", "identifiers", "notes", "entities", "entity_links"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_SOURCES_TABLE,
        CREATE_IDENTIFIERS_TABLE,
        CREATE_NOTES_TABLE,
        CREATE_ENTITIES_TABLE,
        CREATE_ENTITY_LINKS_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
