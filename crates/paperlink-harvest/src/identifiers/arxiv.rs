use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HarvestError, Result};

// YYMM.NNNN or YYMM.NNNNN, optional version
static NEW_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}\.\d{4,5})(v\d+)?$").expect("valid arXiv regex"));

// category/YYMMNNN, optional version
static OLD_FORMAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z\-]+(?:\.[A-Z]{2})?/\d{7})(v\d+)?$").expect("valid arXiv regex")
});

const PREFIXES: &[&str] = &[
    "https://arxiv.org/abs/",
    "http://arxiv.org/abs/",
    "https://arxiv.org/pdf/",
    "http://arxiv.org/pdf/",
    "arXiv:",
    "arxiv:",
    "ArXiv:",
];

/// An arXiv identifier as used to look up publications in the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivId {
    /// Versionless identifier, e.g. `1706.03762` or `cs.AI/0601001`.
    pub id: String,
}

impl ArxivId {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let stripped = PREFIXES
            .iter()
            .find_map(|prefix| input.strip_prefix(prefix))
            .unwrap_or(input)
            .trim_end_matches(".pdf");

        let caps = NEW_FORMAT
            .captures(stripped)
            .or_else(|| OLD_FORMAT.captures(stripped))
            .ok_or_else(|| HarvestError::InvalidArxivId(input.to_string()))?;

        let id = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| HarvestError::InvalidArxivId(input.to_string()))?;
        Ok(Self { id })
    }

    /// Versionless form stored in the knowledge base.
    pub fn search_key(&self) -> &str {
        &self.id
    }
}

/// Key to search the knowledge base with; unparsable input is passed through trimmed.
pub fn arxiv_search_key(raw: &str) -> String {
    ArxivId::parse(raw)
        .map(|id| id.search_key().to_string())
        .unwrap_or_else(|_| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_format_bare() {
        let id = ArxivId::parse("2301.04567").unwrap();
        assert_eq!(id.id, "2301.04567");
    }

    #[test]
    fn new_format_with_version() {
        let id = ArxivId::parse("2301.04567v2").unwrap();
        assert_eq!(id.search_key(), "2301.04567");
    }

    #[test]
    fn old_format_with_category() {
        let id = ArxivId::parse("cs.AI/0601001").unwrap();
        assert_eq!(id.id, "cs.AI/0601001");
    }

    #[test]
    fn prefixed_forms() {
        assert_eq!(ArxivId::parse("arXiv:1706.03762v5").unwrap().id, "1706.03762");
        assert_eq!(
            ArxivId::parse("https://arxiv.org/pdf/1706.03762.pdf").unwrap().id,
            "1706.03762"
        );
    }

    #[test]
    fn rejects_non_arxiv() {
        assert!(ArxivId::parse("12345").is_err());
        assert!(ArxivId::parse("10.1000/xyz").is_err());
    }

    #[test]
    fn search_key_passes_unknown_input_through() {
        assert_eq!(arxiv_search_key(" 1706.03762v1 "), "1706.03762");
        assert_eq!(arxiv_search_key(" weird-id "), "weird-id");
    }
}
