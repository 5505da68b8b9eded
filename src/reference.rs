//! Source references
//!
//! Callers never address a source by row id. They name it the way they know
//! it: title, source type and one identifier. Only the identifier pair is used
//! to find the row; title and type travel along for messages.

use crate::model::{IdentifierType, Source, SourceType};
use crate::Result;
use serde::{Deserialize, Serialize};

/// How a caller names an existing source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub source_type: SourceType,
    pub identifier_type: IdentifierType,
    pub identifier_value: String,
}

impl SourceRef {
    pub fn new(
        title: impl Into<String>,
        source_type: SourceType,
        identifier_type: IdentifierType,
        identifier_value: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            source_type,
            identifier_type,
            identifier_value: identifier_value.into(),
        }
    }

    /// Build from raw strings, rejecting out-of-set type names
    pub fn parse(
        title: &str,
        source_type: &str,
        identifier_type: &str,
        identifier_value: &str,
    ) -> Result<Self> {
        Ok(Self::new(
            title,
            source_type.parse()?,
            identifier_type.parse()?,
            identifier_value,
        ))
    }

    /// `title (type) [id_type:value]`, used in not-found messages
    pub fn describe(&self) -> String {
        format!(
            "'{}' ({}) [{}:{}]",
            self.title, self.source_type, self.identifier_type, self.identifier_value
        )
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Outcome of resolving a `SourceRef`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found(Source),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn into_option(self) -> Option<Source> {
        match self {
            Resolution::Found(source) => Some(source),
            Resolution::NotFound => None,
        }
    }
}
