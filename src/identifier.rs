//! Identifier helpers
//!
//! Detection of identifiers in free text and advisory well-formedness checks.
//! The store accepts any identifier value; these helpers are for the adapters,
//! which warn about suspicious input or help the user pick an identifier type.

use crate::model::{IdentifierType, SourceType};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

fn doi_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)(?:doi[:\s]*)?(?:https?://(?:dx\.)?doi\.org/)?(?P<doi>10\.\d{4,}/[^\s\]}>"',;]+)"#,
        )
        .expect("valid DOI regex")
    })
}

fn arxiv_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(?:arxiv[:\s]*)?(?:https?://arxiv\.org/(?:abs|pdf)/)?(?P<id>\d{4}\.\d{4,5}(?:v\d+)?|[a-z-]+(?:\.[a-z]{2})?/\d{7}(?:v\d+)?)",
        )
        .expect("valid arXiv regex")
    })
}

fn isbn_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:isbn[:\s-]*)?(?P<isbn>(?:97[89][- ]?)?(?:\d[- ]?){9}[\dxX])")
            .expect("valid ISBN regex")
    })
}

fn url_in_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)https?://[^\s<>"]+"#).expect("valid URL regex"))
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^https?://(?:(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\.?|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
        )
        .expect("valid URL regex")
    })
}

fn doi_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^10\.\d{4,}/\S+$").expect("valid DOI pattern"))
}

fn arxiv_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\d{4}\.\d{4,5}|[a-z-]+(?:\.[A-Za-z-]+)?/\d{7})(?:v\d+)?$")
            .expect("valid arXiv pattern")
    })
}

fn semantic_scholar_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[0-9a-f]{40}|(?:CorpusId:)?\d+)$").expect("valid Semantic Scholar pattern")
    })
}

/// An identifier found in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedIdentifier {
    pub identifier_type: IdentifierType,
    pub identifier_value: String,
}

/// Find the most specific identifier in `text`.
///
/// DOIs win over arXiv ids (an arXiv DOI contains an arXiv id), arXiv ids win
/// over ISBNs, and a bare URL is the fallback.
pub fn detect(text: &str) -> Option<DetectedIdentifier> {
    let found = |identifier_type, identifier_value: String| {
        Some(DetectedIdentifier { identifier_type, identifier_value })
    };

    if let Some(m) = doi_regex().captures(text).and_then(|c| c.name("doi")) {
        return found(IdentifierType::Doi, clean_doi(m.as_str()));
    }
    if let Some(m) = arxiv_regex().captures(text).and_then(|c| c.name("id")) {
        return found(IdentifierType::Arxiv, m.as_str().to_string());
    }
    for cap in isbn_regex().captures_iter(text) {
        if let Some(m) = cap.name("isbn") {
            let isbn = normalize_isbn(m.as_str());
            if is_valid_isbn(&isbn) {
                return found(IdentifierType::Isbn, isbn);
            }
        }
    }
    if let Some(m) = url_in_text_regex().find(text) {
        let url = m.as_str().trim_end_matches(['.', ',', ';', ')']);
        return found(IdentifierType::Url, url.to_string());
    }
    None
}

/// Advisory check that `value` is shaped like an identifier of the given type.
pub fn looks_valid(identifier_type: IdentifierType, value: &str) -> bool {
    let value = value.trim();
    match identifier_type {
        IdentifierType::Doi => doi_pattern().is_match(value),
        IdentifierType::Arxiv => arxiv_pattern().is_match(value),
        IdentifierType::Isbn => is_valid_isbn(&normalize_isbn(value)),
        IdentifierType::Url => url_regex().is_match(value),
        IdentifierType::SemanticScholar => semantic_scholar_pattern().is_match(value),
    }
}

/// Best guess at what kind of work an identifier points to.
pub fn guess_source_type(title: &str, identifier_type: IdentifierType) -> SourceType {
    match identifier_type {
        IdentifierType::Arxiv | IdentifierType::Doi | IdentifierType::SemanticScholar => {
            return SourceType::Paper;
        }
        IdentifierType::Isbn => return SourceType::Book,
        IdentifierType::Url => {}
    }

    let title = title.to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| title.contains(w));

    if has_any(&["paper", "article", "journal", "conference"]) {
        SourceType::Paper
    } else if has_any(&["book", "textbook", "handbook"]) {
        SourceType::Book
    } else if has_any(&["video", "lecture", "tutorial"]) {
        SourceType::Video
    } else if has_any(&["blog", "post"]) {
        SourceType::Blog
    } else {
        SourceType::Webpage
    }
}

fn clean_doi(doi: &str) -> String {
    doi.trim_end_matches(['.', ',', ';']).to_string()
}

/// Strip separators, keep digits and a trailing check character
fn normalize_isbn(isbn: &str) -> String {
    isbn.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .collect::<String>()
        .to_uppercase()
}

fn is_valid_isbn(isbn: &str) -> bool {
    match isbn.len() {
        10 => is_valid_isbn10(isbn),
        13 => is_valid_isbn13(isbn),
        _ => false,
    }
}

fn is_valid_isbn10(isbn: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let value = match c {
            'X' if i == 9 => 10,
            c => match c.to_digit(10) {
                Some(d) => d,
                None => return false,
            },
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

fn is_valid_isbn13(isbn: &str) -> bool {
    if !(isbn.starts_with("978") || isbn.starts_with("979")) {
        return false;
    }
    let mut sum = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let Some(d) = c.to_digit(10) else {
            return false;
        };
        sum += if i % 2 == 0 { d } else { d * 3 };
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_arxiv() {
        let found = detect("see arXiv:1706.03762v5 for details").unwrap();
        assert_eq!(found.identifier_type, IdentifierType::Arxiv);
        assert_eq!(found.identifier_value, "1706.03762v5");

        let found = detect("https://arxiv.org/abs/1706.03762").unwrap();
        assert_eq!(found.identifier_type, IdentifierType::Arxiv);
        assert_eq!(found.identifier_value, "1706.03762");
    }

    #[test]
    fn test_detect_doi_wins() {
        let found = detect("https://doi.org/10.48550/arXiv.1706.03762.").unwrap();
        assert_eq!(found.identifier_type, IdentifierType::Doi);
        assert_eq!(found.identifier_value, "10.48550/arXiv.1706.03762");
    }

    #[test]
    fn test_detect_isbn() {
        let found = detect("ISBN 978-0262035613").unwrap();
        assert_eq!(found.identifier_type, IdentifierType::Isbn);
        assert_eq!(found.identifier_value, "9780262035613");
    }

    #[test]
    fn test_detect_url_fallback() {
        let found = detect("read https://example.com/article, later").unwrap();
        assert_eq!(found.identifier_type, IdentifierType::Url);
        assert_eq!(found.identifier_value, "https://example.com/article");
        assert!(detect("nothing to see here").is_none());
    }

    #[test]
    fn test_looks_valid() {
        assert!(looks_valid(IdentifierType::Arxiv, "1706.03762"));
        assert!(looks_valid(IdentifierType::Arxiv, "math.CO/0123456v1"));
        assert!(!looks_valid(IdentifierType::Arxiv, "attention"));
        assert!(looks_valid(IdentifierType::Doi, "10.1000/xyz123"));
        assert!(!looks_valid(IdentifierType::Doi, "doi-less"));
        assert!(looks_valid(IdentifierType::Isbn, "0-306-40615-2"));
        assert!(!looks_valid(IdentifierType::Isbn, "0-306-40615-3"));
        assert!(looks_valid(IdentifierType::Url, "https://www.deeplearningbook.org/"));
        assert!(!looks_valid(IdentifierType::Url, "ftp://example.com"));
        assert!(looks_valid(
            IdentifierType::SemanticScholar,
            "204e3073870fae3d05bcbc2f6a8e263d9b72e776"
        ));
    }

    #[test]
    fn test_guess_source_type() {
        assert_eq!(guess_source_type("anything", IdentifierType::Doi), SourceType::Paper);
        assert_eq!(guess_source_type("anything", IdentifierType::Isbn), SourceType::Book);
        assert_eq!(
            guess_source_type("Lecture 3: Backprop", IdentifierType::Url),
            SourceType::Video
        );
        assert_eq!(guess_source_type("My blog post", IdentifierType::Url), SourceType::Blog);
        assert_eq!(guess_source_type("Home", IdentifierType::Url), SourceType::Webpage);
    }
}
