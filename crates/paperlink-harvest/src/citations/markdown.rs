//! Renders a dataset detail page into the fixed markdown layout the
//! extractor parses. Section headers are literal strings shared with
//! [`crate::citations::extractor`].

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::identifiers::find_doi_url;

/// Public host used in the canonical-URL marker, independent of where the page was fetched.
pub const CANONICAL_DATASET_BASE: &str = "https://archive.ics.uci.edu/dataset";
pub const CITING_WORKS_MARKER: &str = "# Papers Citing this Dataset";
pub const UNKNOWN_DATASET_HEADING: &str = "# Unknown Dataset";

const TITLE_SUFFIX: &str = " - UCI Machine Learning Repository";
const CANONICAL_URL_LABEL: &str = "UCI Dataset Page";

static BIBTEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""BibTeX":"(.*?)"\}"#).expect("valid BibTeX regex"));
static FILES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""headers":\["File","Size"\],"data":(\[\[.*?\]\])"#).expect("valid files regex")
});
static TITLE_SEL: Lazy<Selector> = Lazy::new(|| selector("title"));
static CREATOR_SEL: Lazy<Selector> = Lazy::new(|| selector("p.font-semibold"));
static CITING_LINK_SEL: Lazy<Selector> = Lazy::new(|| selector("a.text-primary.underline"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector {css}: {e}"))
}

/// `[](https://archive.ics.uci.edu/dataset/{id}/<UCI Dataset Page>)`
pub fn canonical_url_marker(record_id: u32) -> String {
    format!("[]({CANONICAL_DATASET_BASE}/{record_id}/<{CANONICAL_URL_LABEL}>)")
}

/// Builds the markdown block for one dataset page. Sections, in order:
/// name heading, canonical URL marker, DOI, BibTeX, files, creators, citing works.
pub fn render_dataset_page(record_id: u32, html_text: &str) -> String {
    let document = Html::parse_document(html_text);
    let mut content = Vec::new();

    match page_title(&document) {
        Some(name) => content.push(format!("# {name}")),
        None => content.push(UNKNOWN_DATASET_HEADING.to_string()),
    }

    content.push(canonical_url_marker(record_id));

    if let Some(doi_url) = find_doi_url(html_text) {
        content.push("## DOI".to_string());
        content.push(format!("[{doi_url}]({doi_url})"));
    }

    if let Some(bibtex) = bibtex_payload(html_text) {
        content.push("## BibTeX Citation".to_string());
        content.push(format!("```bibtex\n{bibtex}\n```"));
    }

    let files = file_listing(html_text);
    if !files.is_empty() {
        content.push("## Files".to_string());
        content.extend(files.into_iter().map(|(name, size)| format!("- **{name}** ({size})")));
    }

    let creators = creators(&document);
    if !creators.is_empty() {
        content.push("## Creators".to_string());
        content.extend(creators.into_iter().map(|c| format!("- {c}")));
    }

    let citing = citing_works(&document);
    if !citing.is_empty() {
        content.push(CITING_WORKS_MARKER.to_string());
        content.extend(
            citing
                .into_iter()
                .map(|(title, url)| format!("[{title}](<{url}>)")),
        );
    }

    content.join("\n\n")
}

fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn page_title(document: &Html) -> Option<String> {
    let title = document.select(&TITLE_SEL).next()?;
    let text = element_text(&title);
    let name = text.replace(TITLE_SUFFIX, "").trim().to_string();
    (!name.is_empty()).then_some(name)
}

fn bibtex_payload(html_text: &str) -> Option<String> {
    let raw = BIBTEX_RE.captures(html_text)?.get(1)?.as_str();
    // The payload is a JSON string body; decode its escapes.
    Some(serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string()))
}

fn file_listing(html_text: &str) -> Vec<(String, String)> {
    let Some(raw) = FILES_RE.captures(html_text).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let Ok(rows) = serde_json::from_str::<Vec<Vec<Value>>>(raw.as_str()) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| match row.as_slice() {
            [name, size, ..] => Some((display_value(name), display_value(size))),
            _ => None,
        })
        .collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `p.font-semibold` entries whose grandparent block mentions "Creators".
fn creators(document: &Html) -> Vec<String> {
    document
        .select(&CREATOR_SEL)
        .filter(|p| {
            p.parent()
                .and_then(|parent| parent.parent())
                .and_then(ElementRef::wrap)
                .is_some_and(|block| element_text(&block).contains("Creators"))
        })
        .map(|p| element_text(&p))
        .filter(|name| !name.is_empty())
        .collect()
}

fn citing_works(document: &Html) -> Vec<(String, String)> {
    document
        .select(&CITING_LINK_SEL)
        .filter_map(|a| {
            let title = element_text(&a);
            let href = a.value().attr("href")?.trim();
            (!title.is_empty() && href.starts_with("http")).then(|| (title, href.to_string()))
        })
        .collect()
}
