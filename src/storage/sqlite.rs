//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use crate::{Result, Error};
use crate::config::StoreConfig;
use crate::model::{
    DbStats, EntityLink, EntitySource, Identifier, IdentifierType, Note, RelationType, Source,
    SourceDetails, SourceFilter, SourceType, Status,
};
use crate::reference::{Resolution, SourceRef};
use super::schema::{self, NOW};

const SOURCE_COLUMNS: &str = "s.id, s.title, s.source_type, s.status, s.created_at, s.updated_at";

/// SQLite-backed literature store.
///
/// Owns a single connection; dropping the store closes it. Every operation
/// that writes more than one statement runs in its own transaction, so it
/// either applies completely or not at all.
pub struct LiteratureStore {
    conn: Connection,
}

impl LiteratureStore {
    /// Create a new store file (or reuse an existing one) and apply the schema
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.configure()?;
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open the existing store named by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::open_path(&config.database)
    }

    /// Open an existing store file. Never creates one.
    pub fn open_path(path: &Path) -> Result<Self> {
        let unavailable = |reason: String| {
            Error::StoreUnavailable(format!("{} ({})", path.display(), reason))
        };

        if !path.is_file() {
            return Err(unavailable("no database file; run `litshelf init` first".to_string()));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| unavailable(e.to_string()))?;
        let store = Self { conn };
        store.configure().map_err(|e| unavailable(e.to_string()))?;

        let tables = store.table_names().map_err(|e| unavailable(e.to_string()))?;
        let missing: Vec<&str> = schema::REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|t| !tables.iter().any(|name| name == t))
            .collect();
        if !missing.is_empty() {
            return Err(unavailable(format!("missing tables: {}", missing.join(", "))));
        }

        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.configure()?;
        store.initialize_schema()?;
        Ok(store)
    }

    fn configure(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    // ========== Resolution ==========

    /// Resolve a reference by its identifier pair. Title and type are not lookup keys.
    pub fn resolve(&self, source_ref: &SourceRef) -> Result<Resolution> {
        resolve_in(&self.conn, source_ref)
    }

    // ========== Source Operations ==========

    /// Insert a source together with its first identifier
    pub fn add_source(
        &mut self,
        title: &str,
        source_type: SourceType,
        identifier_type: IdentifierType,
        identifier_value: &str,
    ) -> Result<i64> {
        let (source_id, _) = self.add_source_with_note(title, source_type, identifier_type, identifier_value, None)?;
        Ok(source_id)
    }

    /// Insert a source, its first identifier and an optional `(title, content)` note
    /// in one transaction. Returns the source id and the note id.
    pub fn add_source_with_note(
        &mut self,
        title: &str,
        source_type: SourceType,
        identifier_type: IdentifierType,
        identifier_value: &str,
        note: Option<(&str, &str)>,
    ) -> Result<(i64, Option<i64>)> {
        let tx = self.conn.transaction()?;

        if let Some(owner) = find_by_identifier(&tx, identifier_type, identifier_value)? {
            return Err(duplicate(identifier_type, identifier_value, owner));
        }

        tx.execute(
            "INSERT INTO sources (title, source_type) VALUES (?1, ?2)",
            params![title, source_type.as_str()],
        )?;
        let source_id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO identifiers (source_id, identifier_type, identifier_value) VALUES (?1, ?2, ?3)",
            params![source_id, identifier_type.as_str(), identifier_value],
        )?;

        let note_id = match note {
            Some((note_title, note_content)) => {
                tx.execute(
                    "INSERT INTO notes (source_id, note_title, note_content) VALUES (?1, ?2, ?3)",
                    params![source_id, note_title, note_content],
                )?;
                Some(tx.last_insert_rowid())
            }
            None => None,
        };

        tx.commit()?;
        Ok((source_id, note_id))
    }

    /// Attach another identifier to an existing source.
    ///
    /// Re-adding a pair the source already owns is a no-op.
    pub fn add_identifier(
        &mut self,
        source_ref: &SourceRef,
        identifier_type: IdentifierType,
        identifier_value: &str,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        let source = require_in(&tx, source_ref)?;

        if let Some(owner) = find_by_identifier(&tx, identifier_type, identifier_value)? {
            if owner.id == source.id {
                return Ok(());
            }
            return Err(duplicate(identifier_type, identifier_value, owner));
        }

        tx.execute(
            "INSERT INTO identifiers (source_id, identifier_type, identifier_value) VALUES (?1, ?2, ?3)",
            params![source.id, identifier_type.as_str(), identifier_value],
        )?;
        touch(&tx, source.id)?;

        tx.commit()?;
        Ok(())
    }

    /// Append a note; returns the note id
    pub fn add_note(&mut self, source_ref: &SourceRef, note_title: &str, note_content: &str) -> Result<i64> {
        let tx = self.conn.transaction()?;
        let source = require_in(&tx, source_ref)?;

        tx.execute(
            "INSERT INTO notes (source_id, note_title, note_content) VALUES (?1, ?2, ?3)",
            params![source.id, note_title, note_content],
        )?;
        let note_id = tx.last_insert_rowid();
        touch(&tx, source.id)?;

        tx.commit()?;
        Ok(note_id)
    }

    /// Set the reading status
    pub fn update_status(&mut self, source_ref: &SourceRef, status: Status) -> Result<()> {
        let tx = self.conn.transaction()?;
        let source = require_in(&tx, source_ref)?;

        tx.execute(
            &format!("UPDATE sources SET status = ?1, updated_at = {NOW} WHERE id = ?2"),
            params![status.as_str(), source.id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Link a source to an entity, creating the entity on first use.
    ///
    /// The (source, entity, relation) triple is unique: linking it again
    /// replaces the description.
    pub fn link_to_entity(
        &mut self,
        source_ref: &SourceRef,
        entity_name: &str,
        relation_type: RelationType,
        description: Option<&str>,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        let source = require_in(&tx, source_ref)?;

        tx.execute(
            "INSERT INTO entities (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            [entity_name],
        )?;
        let entity_id: i64 = tx.query_row(
            "SELECT id FROM entities WHERE name = ?1",
            [entity_name],
            |row| row.get(0),
        )?;

        tx.execute(
            &format!(
                r#"
                INSERT INTO entity_links (source_id, entity_id, relation_type, description)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(source_id, entity_id, relation_type)
                DO UPDATE SET description = excluded.description, updated_at = {NOW}
                "#
            ),
            params![source.id, entity_id, relation_type.as_str(), description],
        )?;
        touch(&tx, source.id)?;

        tx.commit()?;
        Ok(())
    }

    // ========== Queries ==========

    /// Sources linked to an entity (exact, case-sensitive name). Unknown names yield nothing.
    pub fn get_entity_sources(&self, entity_name: &str) -> Result<Vec<EntitySource>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {SOURCE_COLUMNS}, l.relation_type, l.description
            FROM entity_links l
            JOIN entities e ON e.id = l.entity_id
            JOIN sources s ON s.id = l.source_id
            WHERE e.name = ?1
            ORDER BY s.updated_at DESC, s.id DESC, l.id
            "#
        ))?;

        let rows = stmt
            .query_map([entity_name], |row| {
                Ok(EntitySource {
                    source: row_to_source(row)?,
                    relation_type: parse_column(row, 6)?,
                    description: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// Sources matching all given filters, most recently updated first
    pub fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<Source>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {SOURCE_COLUMNS}
            FROM sources s
            WHERE (?1 IS NULL OR s.source_type = ?1)
              AND (?2 IS NULL OR s.status = ?2)
            ORDER BY s.updated_at DESC, s.id DESC
            LIMIT ?3
            "#
        ))?;

        let sources = stmt
            .query_map(
                params![
                    filter.source_type.map(|t| t.as_str()),
                    filter.status.map(|s| s.as_str()),
                    sql_limit(filter.limit),
                ],
                row_to_source,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sources)
    }

    /// Case-insensitive substring search on titles
    pub fn search_sources(&self, query: &str, limit: Option<usize>) -> Result<Vec<Source>> {
        let needle = query.to_lowercase();
        let all = self.list_sources(&SourceFilter::default())?;

        Ok(all
            .into_iter()
            .filter(|s| s.title.to_lowercase().contains(&needle))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    /// A source with its identifiers, notes and entity links
    pub fn get_source_details(&self, source_ref: &SourceRef) -> Result<SourceDetails> {
        let source = require_in(&self.conn, source_ref)?;

        let mut stmt = self.conn.prepare(
            "SELECT identifier_type, identifier_value FROM identifiers WHERE source_id = ?1 ORDER BY id",
        )?;
        let identifiers = stmt
            .query_map([source.id], |row| {
                Ok(Identifier {
                    identifier_type: parse_column(row, 0)?,
                    identifier_value: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, note_title, note_content, created_at FROM notes WHERE source_id = ?1 ORDER BY created_at, id",
        )?;
        let notes = stmt
            .query_map([source.id], |row| {
                Ok(Note {
                    id: row.get(0)?,
                    note_title: row.get(1)?,
                    note_content: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT e.name, l.relation_type, l.description, l.created_at, l.updated_at
            FROM entity_links l
            JOIN entities e ON e.id = l.entity_id
            WHERE l.source_id = ?1
            ORDER BY l.created_at, l.id
            "#,
        )?;
        let entity_links = stmt
            .query_map([source.id], |row| {
                Ok(EntityLink {
                    entity_name: row.get(0)?,
                    relation_type: parse_column(row, 1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SourceDetails {
            source,
            identifiers,
            notes,
            entity_links,
        })
    }

    // ========== Statistics ==========

    /// Get database statistics
    pub fn database_stats(&self) -> Result<DbStats> {
        let mut stats = DbStats {
            total_sources: self.count("sources")?,
            total_identifiers: self.count("identifiers")?,
            total_notes: self.count("notes")?,
            total_entities: self.count("entities")?,
            total_links: self.count("entity_links")?,
            ..DbStats::default()
        };

        for kind in SourceType::all() {
            stats.sources_by_type.insert(kind.as_str().to_string(), 0);
        }
        for status in Status::all() {
            stats.sources_by_status.insert(status.as_str().to_string(), 0);
        }

        for (name, count) in self.group_count("source_type")? {
            stats.sources_by_type.insert(name, count);
        }
        for (name, count) in self.group_count("status")? {
            stats.sources_by_status.insert(name, count);
        }

        Ok(stats)
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn group_count(&self, column: &str) -> Result<Vec<(String, usize)>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {column}, COUNT(*) FROM sources GROUP BY {column}"))?;
        let rows = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, count as usize))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn resolve_in(conn: &Connection, source_ref: &SourceRef) -> Result<Resolution> {
    let found = find_by_identifier(conn, source_ref.identifier_type, &source_ref.identifier_value)?;
    Ok(match found {
        Some(source) => Resolution::Found(source),
        None => Resolution::NotFound,
    })
}

fn require_in(conn: &Connection, source_ref: &SourceRef) -> Result<Source> {
    match resolve_in(conn, source_ref)? {
        Resolution::Found(source) => Ok(source),
        Resolution::NotFound => Err(Error::SourceNotFound(source_ref.describe())),
    }
}

fn find_by_identifier(
    conn: &Connection,
    identifier_type: IdentifierType,
    identifier_value: &str,
) -> Result<Option<Source>> {
    conn.query_row(
        &format!(
            r#"
            SELECT {SOURCE_COLUMNS}
            FROM identifiers i
            JOIN sources s ON s.id = i.source_id
            WHERE i.identifier_type = ?1 AND i.identifier_value = ?2
            "#
        ),
        params![identifier_type.as_str(), identifier_value],
        row_to_source,
    )
    .optional()
    .map_err(Into::into)
}

fn touch(conn: &Connection, source_id: i64) -> Result<()> {
    conn.execute(
        &format!("UPDATE sources SET updated_at = {NOW} WHERE id = ?1"),
        [source_id],
    )?;
    Ok(())
}

fn duplicate(identifier_type: IdentifierType, identifier_value: &str, owner: Source) -> Error {
    Error::DuplicateIdentifier {
        identifier_type: identifier_type.to_string(),
        identifier_value: identifier_value.to_string(),
        existing_title: owner.title,
    }
}

/// SQLite treats a negative LIMIT as unbounded
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l.min(i64::MAX as usize) as i64).unwrap_or(-1)
}

/// Parse a text column into one of the closed vocabularies
fn parse_column<T>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Helper to convert a row (starting with `SOURCE_COLUMNS`) to a Source
fn row_to_source(row: &rusqlite::Row) -> rusqlite::Result<Source> {
    Ok(Source {
        id: row.get(0)?,
        title: row.get(1)?,
        source_type: parse_column(row, 2)?,
        status: parse_column(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn attention_ref() -> SourceRef {
        SourceRef::new("Attention Is All You Need", SourceType::Paper, IdentifierType::Arxiv, "1706.03762")
    }

    fn store_with_attention() -> LiteratureStore {
        let mut store = LiteratureStore::open_in_memory().unwrap();
        store
            .add_source("Attention Is All You Need", SourceType::Paper, IdentifierType::Arxiv, "1706.03762")
            .unwrap();
        store
    }

    #[test]
    fn test_add_source_roundtrip() {
        let store = store_with_attention();

        let details = store.get_source_details(&attention_ref()).unwrap();
        assert_eq!(details.source.title, "Attention Is All You Need");
        assert_eq!(details.source.source_type, SourceType::Paper);
        assert_eq!(details.source.status, Status::Unread);
        assert_eq!(
            details.identifiers,
            vec![Identifier {
                identifier_type: IdentifierType::Arxiv,
                identifier_value: "1706.03762".to_string(),
            }]
        );
        assert!(details.notes.is_empty());
        assert!(details.entity_links.is_empty());
    }

    #[test]
    fn test_duplicate_identifier_leaves_store_unchanged() {
        let mut store = store_with_attention();
        let before = store.database_stats().unwrap();

        let err = store
            .add_source("Some Other Title", SourceType::Paper, IdentifierType::Arxiv, "1706.03762")
            .unwrap_err();
        match err {
            Error::DuplicateIdentifier { existing_title, .. } => {
                assert_eq!(existing_title, "Attention Is All You Need");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(store.database_stats().unwrap(), before);
    }

    #[test]
    fn test_add_source_with_initial_note() {
        let mut store = LiteratureStore::open_in_memory().unwrap();
        let (source_id, note_id) = store
            .add_source_with_note(
                "Attention Is All You Need",
                SourceType::Paper,
                IdentifierType::Arxiv,
                "1706.03762",
                Some(("Key Insight", "No recurrence")),
            )
            .unwrap();

        let details = store.get_source_details(&attention_ref()).unwrap();
        assert_eq!(details.source.id, source_id);
        assert_eq!(details.notes.len(), 1);
        assert_eq!(Some(details.notes[0].id), note_id);
    }

    #[test]
    fn test_failed_initial_note_rolls_back_source() {
        let mut store = LiteratureStore::open_in_memory().unwrap();
        store
            .conn
            .execute_batch(
                "CREATE TRIGGER reject_notes BEFORE INSERT ON notes
                 BEGIN SELECT RAISE(ABORT, 'notes are read-only'); END;",
            )
            .unwrap();

        let err = store
            .add_source_with_note(
                "Attention Is All You Need",
                SourceType::Paper,
                IdentifierType::Arxiv,
                "1706.03762",
                Some(("Key Insight", "No recurrence")),
            )
            .unwrap_err();
        assert_eq!(err.kind(), "storage");

        let stats = store.database_stats().unwrap();
        assert_eq!(stats.total_sources, 0);
        assert_eq!(stats.total_identifiers, 0);
        assert!(matches!(store.resolve(&attention_ref()).unwrap(), Resolution::NotFound));
    }

    #[test]
    fn test_same_value_different_type_is_distinct() {
        let mut store = store_with_attention();
        store
            .add_source("Other", SourceType::Webpage, IdentifierType::Url, "1706.03762")
            .unwrap();
        assert_eq!(store.database_stats().unwrap().total_sources, 2);
    }

    #[test]
    fn test_resolve_ignores_title_and_type() {
        let store = store_with_attention();

        let by_pair = SourceRef::new("a different title", SourceType::Book, IdentifierType::Arxiv, "1706.03762");
        let source = store.resolve(&by_pair).unwrap().into_option().unwrap();
        assert_eq!(source.title, "Attention Is All You Need");

        let missing = SourceRef::new("Attention Is All You Need", SourceType::Paper, IdentifierType::Doi, "1706.03762");
        assert_eq!(store.resolve(&missing).unwrap(), Resolution::NotFound);
    }

    #[test]
    fn test_add_identifier() {
        let mut store = store_with_attention();
        let r = attention_ref();

        store.add_identifier(&r, IdentifierType::Doi, "10.48550/arXiv.1706.03762").unwrap();
        // idempotent for the owning source
        store.add_identifier(&r, IdentifierType::Doi, "10.48550/arXiv.1706.03762").unwrap();

        let details = store.get_source_details(&r).unwrap();
        assert_eq!(details.identifiers.len(), 2);

        // the new identifier resolves to the same source
        let via_doi = SourceRef::new("", SourceType::Paper, IdentifierType::Doi, "10.48550/arXiv.1706.03762");
        assert_eq!(store.resolve(&via_doi).unwrap().into_option().unwrap().id, details.source.id);
    }

    #[test]
    fn test_add_identifier_claimed_by_other_source() {
        let mut store = store_with_attention();
        store
            .add_source("Deep Learning", SourceType::Book, IdentifierType::Isbn, "9780262035613")
            .unwrap();

        let err = store
            .add_identifier(&attention_ref(), IdentifierType::Isbn, "9780262035613")
            .unwrap_err();
        assert_eq!(err.kind(), "duplicate_identifier");
        assert_eq!(store.database_stats().unwrap().total_identifiers, 2);
    }

    #[test]
    fn test_operations_on_unknown_source() {
        let mut store = LiteratureStore::open_in_memory().unwrap();
        let r = attention_ref();

        assert_eq!(store.add_note(&r, "t", "c").unwrap_err().kind(), "source_not_found");
        assert_eq!(store.update_status(&r, Status::Reading).unwrap_err().kind(), "source_not_found");
        assert_eq!(
            store.link_to_entity(&r, "transformer", RelationType::Introduces, None).unwrap_err().kind(),
            "source_not_found"
        );
        assert_eq!(
            store.add_identifier(&r, IdentifierType::Doi, "10.1/x").unwrap_err().kind(),
            "source_not_found"
        );
        assert_eq!(store.get_source_details(&r).unwrap_err().kind(), "source_not_found");

        // nothing was created along the way
        let stats = store.database_stats().unwrap();
        assert_eq!(stats.total_entities, 0);
        assert_eq!(stats.total_identifiers, 0);
    }

    #[test]
    fn test_notes_allow_duplicate_titles_in_order() {
        let mut store = store_with_attention();
        let r = attention_ref();

        store.add_note(&r, "Key Insight", "No recurrence needed").unwrap();
        store.add_note(&r, "Key Insight", "Multi-head attention").unwrap();

        let notes = store.get_source_details(&r).unwrap().notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].note_content, "No recurrence needed");
        assert_eq!(notes[1].note_content, "Multi-head attention");
    }

    #[test]
    fn test_invalid_status_keeps_existing_status() {
        let mut store = store_with_attention();
        let r = attention_ref();
        store.update_status(&r, Status::Reading).unwrap();

        let parsed = "finished".parse::<Status>();
        assert_eq!(parsed.unwrap_err().kind(), "invalid_enum");

        let details = store.get_source_details(&r).unwrap();
        assert_eq!(details.source.status, Status::Reading);
    }

    #[test]
    fn test_any_status_transition_allowed() {
        let mut store = store_with_attention();
        let r = attention_ref();
        for status in [Status::Archived, Status::Unread, Status::Completed, Status::Reading] {
            store.update_status(&r, status).unwrap();
            assert_eq!(store.get_source_details(&r).unwrap().source.status, status);
        }
    }

    #[test]
    fn test_relink_overwrites_description() {
        let mut store = store_with_attention();
        let r = attention_ref();

        store
            .link_to_entity(&r, "transformer", RelationType::Introduces, Some("first"))
            .unwrap();
        store
            .link_to_entity(&r, "transformer", RelationType::Introduces, Some("second"))
            .unwrap();

        let links = store.get_source_details(&r).unwrap().entity_links;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].description.as_deref(), Some("second"));
        assert_eq!(store.database_stats().unwrap().total_entities, 1);
    }

    #[test]
    fn test_relation_types_are_independent_links() {
        let mut store = store_with_attention();
        let r = attention_ref();

        store.link_to_entity(&r, "transformer", RelationType::Introduces, None).unwrap();
        store.link_to_entity(&r, "transformer", RelationType::Evaluates, None).unwrap();

        let stats = store.database_stats().unwrap();
        assert_eq!(stats.total_links, 2);
        assert_eq!(stats.total_entities, 1);
    }

    #[test]
    fn test_get_entity_sources() {
        let mut store = store_with_attention();
        store
            .add_source("BERT", SourceType::Paper, IdentifierType::Arxiv, "1810.04805")
            .unwrap();
        let bert = SourceRef::new("BERT", SourceType::Paper, IdentifierType::Arxiv, "1810.04805");

        store
            .link_to_entity(&attention_ref(), "transformer", RelationType::Introduces, Some("origin"))
            .unwrap();
        store.link_to_entity(&bert, "transformer", RelationType::Applies, None).unwrap();

        let rows = store.get_entity_sources("transformer").unwrap();
        assert_eq!(rows.len(), 2);
        let attention = rows.iter().find(|r| r.source.title == "Attention Is All You Need").unwrap();
        assert_eq!(attention.relation_type, RelationType::Introduces);
        assert_eq!(attention.description.as_deref(), Some("origin"));

        // exact, case-sensitive
        assert!(store.get_entity_sources("Transformer").unwrap().is_empty());
        assert!(store.get_entity_sources("never linked").unwrap().is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_on_title() {
        let mut store = store_with_attention();
        store
            .add_source("Deep Learning", SourceType::Book, IdentifierType::Isbn, "9780262035613")
            .unwrap();
        store
            .add_source("The Illustrated Transformer", SourceType::Blog, IdentifierType::Url, "https://jalammar.github.io/illustrated-transformer/")
            .unwrap();

        let hits = store.search_sources("transformer", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "The Illustrated Transformer");

        let hits = store.search_sources("ATTENTION", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Attention Is All You Need");

        assert_eq!(store.search_sources("e", Some(2)).unwrap().len(), 2);
        assert!(store.search_sources("1706", None).unwrap().is_empty());
    }

    #[test]
    fn test_list_sources_filters_and_order() {
        let mut store = store_with_attention();
        sleep(Duration::from_millis(5));
        store
            .add_source("Deep Learning", SourceType::Book, IdentifierType::Isbn, "9780262035613")
            .unwrap();
        sleep(Duration::from_millis(5));
        store.update_status(&attention_ref(), Status::Completed).unwrap();

        let all = store.list_sources(&SourceFilter::default()).unwrap();
        let titles: Vec<&str> = all.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Attention Is All You Need", "Deep Learning"]);

        let books = store
            .list_sources(&SourceFilter { source_type: Some(SourceType::Book), ..Default::default() })
            .unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Deep Learning");

        let completed_books = store
            .list_sources(&SourceFilter {
                source_type: Some(SourceType::Book),
                status: Some(Status::Completed),
                limit: None,
            })
            .unwrap();
        assert!(completed_books.is_empty());

        let limited = store
            .list_sources(&SourceFilter { limit: Some(1), ..Default::default() })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_database_stats() {
        let mut store = store_with_attention();
        let r = attention_ref();
        store.add_note(&r, "n", "c").unwrap();
        store.link_to_entity(&r, "attention", RelationType::Discusses, None).unwrap();
        store.update_status(&r, Status::Reading).unwrap();

        let stats = store.database_stats().unwrap();
        assert_eq!(stats.total_sources, 1);
        assert_eq!(stats.sources_by_type["paper"], 1);
        assert_eq!(stats.sources_by_type["book"], 0);
        assert_eq!(stats.sources_by_status["reading"], 1);
        assert_eq!(stats.sources_by_status["unread"], 0);
        assert_eq!(stats.total_notes, 1);
        assert_eq!(stats.total_entities, 1);
        assert_eq!(stats.total_links, 1);
    }

    #[test]
    fn test_end_to_end_example() {
        let mut store = LiteratureStore::open_in_memory().unwrap();
        let id = store
            .add_source("Attention Is All You Need", SourceType::Paper, IdentifierType::Arxiv, "1706.03762")
            .unwrap();
        assert_eq!(id, 1);

        let r = attention_ref();
        store.add_note(&r, "Key Insight", "No recurrence needed").unwrap();
        store.update_status(&r, Status::Completed).unwrap();

        let details = store.get_source_details(&r).unwrap();
        assert_eq!(details.source.id, 1);
        assert_eq!(details.source.status, Status::Completed);
        assert_eq!(details.notes.len(), 1);
        assert_eq!(details.notes[0].note_title, "Key Insight");
        assert!(details.entity_links.is_empty());
    }

    #[test]
    fn test_open_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("absent.db"));
        let err = LiteratureStore::open(&config).err().unwrap();
        assert_eq!(err.kind(), "store_unavailable");
        assert!(!config.database.exists());
    }

    #[test]
    fn test_open_non_database_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, "not a sqlite file\n".repeat(64)).unwrap();

        let err = LiteratureStore::open_path(&path).err().unwrap();
        assert_eq!(err.kind(), "store_unavailable");
    }

    #[test]
    fn test_open_empty_sqlite_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path).unwrap().execute_batch("CREATE TABLE other (x INTEGER);").unwrap();

        let err = LiteratureStore::open_path(&path).err().unwrap();
        assert!(err.to_string().contains("missing tables"));
    }

    #[test]
    fn test_corruption_after_open_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("literature.db");
        {
            let mut store = LiteratureStore::create(&path).unwrap();
            store
                .add_source("Attention Is All You Need", SourceType::Paper, IdentifierType::Arxiv, "1706.03762")
                .unwrap();
        }

        // Scribble over the b-tree pages of `sources` and its indexes; the schema stays readable
        let (page_size, root_pages) = {
            let conn = Connection::open(&path).unwrap();
            let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0)).unwrap();
            let mut stmt = conn
                .prepare("SELECT rootpage FROM sqlite_master WHERE tbl_name = 'sources' AND rootpage > 0")
                .unwrap();
            let pages = stmt
                .query_map([], |row| row.get::<_, i64>(0))
                .unwrap()
                .collect::<rusqlite::Result<Vec<i64>>>()
                .unwrap();
            (page_size as usize, pages)
        };
        let mut bytes = std::fs::read(&path).unwrap();
        for page in root_pages {
            let start = (page as usize - 1) * page_size;
            bytes[start..start + page_size].fill(0xAB);
        }
        std::fs::write(&path, &bytes).unwrap();

        let store = LiteratureStore::open_path(&path).unwrap();
        let err = store.database_stats().unwrap_err();
        assert_eq!(err.kind(), "store_unavailable");
    }

    #[test]
    fn test_create_then_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("literature.db");

        {
            let mut store = LiteratureStore::create(&path).unwrap();
            store
                .add_source("Attention Is All You Need", SourceType::Paper, IdentifierType::Arxiv, "1706.03762")
                .unwrap();
        }

        let store = LiteratureStore::open_path(&path).unwrap();
        assert_eq!(store.database_stats().unwrap().total_sources, 1);
        // create is idempotent on an existing store
        let again = LiteratureStore::create(&path).unwrap();
        assert_eq!(again.database_stats().unwrap().total_sources, 1);
    }
}
