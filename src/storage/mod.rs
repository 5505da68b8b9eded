//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite file with tables:
//! - sources(id, title, source_type, status, created_at, updated_at)
//! - identifiers(source_id, identifier_type, identifier_value) unique per pair
//! - notes(source_id, note_title, note_content, created_at)
//! - entities(name) unique by exact name
//! - entity_links(source_id, entity_id, relation_type, description) unique per triple

pub mod schema;
pub mod sqlite;

pub use sqlite::LiteratureStore;
