//! Catalogue types
//!
//! Four closed vocabularies drive the catalogue:
//! - `SourceType`: paper, book, webpage, video, blog
//! - `IdentifierType`: arxiv, doi, isbn, url, semantic_scholar
//! - `Status`: unread, reading, completed, archived
//! - `RelationType`: discusses, introduces, extends, evaluates, applies, critiques
//!
//! Each parses from its lowercase name and rejects anything else with
//! `Error::InvalidEnum`, so a value that reaches the store is always in-set.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

fn invalid(field: &'static str, value: &str, all: &[&'static str]) -> Error {
    Error::InvalidEnum {
        field,
        value: value.to_string(),
        expected: all.join(", "),
    }
}

/// Kind of catalogued work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Paper,
    Book,
    Webpage,
    Video,
    Blog,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Paper => "paper",
            SourceType::Book => "book",
            SourceType::Webpage => "webpage",
            SourceType::Video => "video",
            SourceType::Blog => "blog",
        }
    }

    pub fn all() -> &'static [SourceType] {
        &[
            SourceType::Paper,
            SourceType::Book,
            SourceType::Webpage,
            SourceType::Video,
            SourceType::Blog,
        ]
    }

    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(|t| t.as_str()).collect()
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| invalid("source type", s, &Self::names()))
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of external identifier naming a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    Arxiv,
    Doi,
    Isbn,
    Url,
    SemanticScholar,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::Arxiv => "arxiv",
            IdentifierType::Doi => "doi",
            IdentifierType::Isbn => "isbn",
            IdentifierType::Url => "url",
            IdentifierType::SemanticScholar => "semantic_scholar",
        }
    }

    pub fn all() -> &'static [IdentifierType] {
        &[
            IdentifierType::Arxiv,
            IdentifierType::Doi,
            IdentifierType::Isbn,
            IdentifierType::Url,
            IdentifierType::SemanticScholar,
        ]
    }

    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(|t| t.as_str()).collect()
    }
}

impl FromStr for IdentifierType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| invalid("identifier type", s, &Self::names()))
    }
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reading progress. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unread,
    Reading,
    Completed,
    Archived,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unread => "unread",
            Status::Reading => "reading",
            Status::Completed => "completed",
            Status::Archived => "archived",
        }
    }

    pub fn all() -> &'static [Status] {
        &[Status::Unread, Status::Reading, Status::Completed, Status::Archived]
    }

    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(|s| s.as_str()).collect()
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| invalid("status", s, &Self::names()))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a source relates to an entity in the concept graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Discusses,
    Introduces,
    Extends,
    Evaluates,
    Applies,
    Critiques,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Discusses => "discusses",
            RelationType::Introduces => "introduces",
            RelationType::Extends => "extends",
            RelationType::Evaluates => "evaluates",
            RelationType::Applies => "applies",
            RelationType::Critiques => "critiques",
        }
    }

    pub fn all() -> &'static [RelationType] {
        &[
            RelationType::Discusses,
            RelationType::Introduces,
            RelationType::Extends,
            RelationType::Evaluates,
            RelationType::Applies,
            RelationType::Critiques,
        ]
    }

    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(|r| r.as_str()).collect()
    }
}

impl FromStr for RelationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| invalid("relation type", s, &Self::names()))
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalogued work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Surrogate key assigned by the store
    pub id: i64,
    pub title: String,
    pub source_type: SourceType,
    pub status: Status,
    /// ISO-8601 UTC, millisecond precision
    pub created_at: String,
    pub updated_at: String,
}

/// A typed external identifier owned by one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub identifier_type: IdentifierType,
    pub identifier_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub note_title: String,
    pub note_content: String,
    pub created_at: String,
}

/// A link from a source to a named entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLink {
    pub entity_name: String,
    pub relation_type: RelationType,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A source with everything attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDetails {
    pub source: Source,
    pub identifiers: Vec<Identifier>,
    /// Oldest first
    pub notes: Vec<Note>,
    pub entity_links: Vec<EntityLink>,
}

/// One row of `get_entity_sources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySource {
    pub source: Source,
    pub relation_type: RelationType,
    pub description: Option<String>,
}

/// The closed value sets, for help output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Vocabulary {
    pub source_types: Vec<&'static str>,
    pub identifier_types: Vec<&'static str>,
    pub statuses: Vec<&'static str>,
    pub relation_types: Vec<&'static str>,
}

impl Vocabulary {
    pub fn current() -> Self {
        Self {
            source_types: SourceType::names(),
            identifier_types: IdentifierType::names(),
            statuses: Status::names(),
            relation_types: RelationType::names(),
        }
    }
}

/// Optional, conjunctive filters for `list_sources`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceFilter {
    pub source_type: Option<SourceType>,
    pub status: Option<Status>,
    pub limit: Option<usize>,
}

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbStats {
    pub total_sources: usize,
    pub sources_by_type: BTreeMap<String, usize>,
    pub sources_by_status: BTreeMap<String, usize>,
    pub total_identifiers: usize,
    pub total_notes: usize,
    pub total_entities: usize,
    pub total_links: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Sources: {}", self.total_sources)?;
        for (kind, count) in &self.sources_by_type {
            writeln!(f, "    {}: {}", kind, count)?;
        }
        writeln!(f, "  By status:")?;
        for (status, count) in &self.sources_by_status {
            writeln!(f, "    {}: {}", status, count)?;
        }
        writeln!(f, "  Identifiers: {}", self.total_identifiers)?;
        writeln!(f, "  Notes: {}", self.total_notes)?;
        writeln!(f, "  Entities: {}", self.total_entities)?;
        write!(f, "  Entity links: {}", self.total_links)
    }
}
