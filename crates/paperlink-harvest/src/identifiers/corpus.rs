use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CORPUS_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CorpusID:(\d+)").expect("valid corpus ID regex"));

/// Semantic Scholar corpus token, e.g. `CorpusID:13756489`.
///
/// Usable directly as a paper ID in the Semantic Scholar graph API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorpusToken(String);

impl CorpusToken {
    pub fn from_digits(digits: &str) -> Self {
        Self(format!("CorpusID:{digits}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorpusToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Corpus token embedded in a citing-work link, if any.
pub fn resolve_identifier(citation_url: &str) -> Option<CorpusToken> {
    CORPUS_ID_REGEX
        .captures(citation_url)
        .and_then(|caps| caps.get(1))
        .map(|digits| CorpusToken::from_digits(digits.as_str()))
}
