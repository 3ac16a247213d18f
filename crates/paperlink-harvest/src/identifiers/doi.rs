use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HarvestError, Result};

static DOI_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https://doi\.org/10\.\d{4,9}/[-._;()/:A-Z0-9]+").expect("valid DOI regex")
});

const PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
    "DOI:",
];

/// Checks that `input` is a DOI (`10.<registrant>/<suffix>`), with or without a
/// resolver prefix.
pub fn validate_doi(input: &str) -> Result<()> {
    let input = input.trim();
    let stripped = PREFIXES
        .iter()
        .find_map(|prefix| input.strip_prefix(prefix))
        .unwrap_or(input)
        .trim_start();

    let valid = stripped.starts_with("10.")
        && stripped
            .split_once('/')
            .is_some_and(|(_, suffix)| !suffix.is_empty());
    if valid {
        Ok(())
    } else {
        Err(HarvestError::InvalidDoi(input.to_string()))
    }
}

/// First `https://doi.org/...` link in `text`, trailing sentence dot removed.
///
/// The link is returned as written, not normalized.
pub fn find_doi_url(text: &str) -> Option<String> {
    let found = DOI_URL_REGEX.find(text)?;
    let url = found.as_str().trim_end_matches('.');
    validate_doi(url).ok().map(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_and_prefixed_dois() {
        assert!(validate_doi("10.24432/C56C76").is_ok());
        assert!(validate_doi("https://doi.org/10.1000/xyz123").is_ok());
        assert!(validate_doi("DOI: 10.1000/xyz123").is_ok());
    }

    #[test]
    fn rejects_invalid() {
        assert!(matches!(validate_doi("not-a-doi"), Err(HarvestError::InvalidDoi(_))));
        assert!(validate_doi("10.1000").is_err());
        assert!(validate_doi("10.1000/").is_err());
        assert!(validate_doi("").is_err());
    }

    #[test]
    fn finds_doi_url_in_markup() {
        let html = r#"<a href="https://doi.org/10.24432/C56C76.">https://doi.org/10.24432/C56C76.</a>"#;
        assert_eq!(
            find_doi_url(html).as_deref(),
            Some("https://doi.org/10.24432/C56C76")
        );
    }

    #[test]
    fn no_doi_url_in_text() {
        assert_eq!(find_doi_url("see doi 10.1000/abc"), None);
    }
}
