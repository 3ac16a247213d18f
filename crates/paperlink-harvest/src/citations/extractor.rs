use once_cell::sync::Lazy;
use paperlink_core::Citation;
use regex::Regex;

use super::markdown::CITING_WORKS_MARKER;

static CANONICAL_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\]\((https?://archive\.ics\.uci\.edu/dataset/\d+)/<.*?>\)")
        .expect("valid canonical URL regex")
});

// Region after the marker, up to the next top-level heading.
static CITING_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s){}(.*?)(?:\n# |\z)",
        regex::escape(CITING_WORKS_MARKER)
    ))
    .expect("valid citing section regex")
});

static CITATION_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\[\s*(.*?)\s*\]\(.*?<\s*(.*?)\s*>\)").expect("valid citation line regex")
});

/// Fields pulled out of one rendered record block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub name: Option<String>,
    pub url: Option<String>,
    pub citations: Vec<Citation>,
}

/// Parses the markdown produced by [`super::render_dataset_page`].
///
/// Pure: the same input always yields the same output. Lines in the citing
/// section that do not match `[title](<url>)` are ignored.
pub fn extract(markdown: &str) -> Extraction {
    let name = markdown
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|rest| rest.trim().to_string());

    let url = CANONICAL_URL_RE
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    let citations = CITING_SECTION_RE
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .map(|section| {
            CITATION_LINE_RE
                .captures_iter(section.as_str())
                .map(|caps| Citation::new(&caps[1], &caps[2]))
                .collect()
        })
        .unwrap_or_default();

    Extraction {
        name,
        url,
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::render_dataset_page;

    const BLOCK: &str = "# Wine Quality

[](https://archive.ics.uci.edu/dataset/186/<UCI Dataset Page>)

## Creators

- Paulo Cortez

# Papers Citing this Dataset

[First Paper](<https://www.semanticscholar.org/search?q=CorpusID:11>)

[ Second Paper ](<  https://www.semanticscholar.org/search?q=CorpusID:22  >)

this line is not a link

[Third Paper](<https://example.org/third>)";

    #[test]
    fn extracts_name_url_and_citations() {
        let extraction = extract(BLOCK);

        assert_eq!(extraction.name.as_deref(), Some("Wine Quality"));
        assert_eq!(
            extraction.url.as_deref(),
            Some("https://archive.ics.uci.edu/dataset/186")
        );
        assert_eq!(extraction.citations.len(), 3);
        assert_eq!(extraction.citations[1].title, "Second Paper");
        assert_eq!(
            extraction.citations[1].url.as_deref(),
            Some("https://www.semanticscholar.org/search?q=CorpusID:22")
        );
    }

    #[test]
    fn extraction_is_deterministic() {
        assert_eq!(extract(BLOCK), extract(BLOCK));
    }

    #[test]
    fn citing_section_stops_at_next_top_level_heading() {
        let md = "# A\n\n# Papers Citing this Dataset\n\n[One](<https://x/1>)\n# Other\n\n[Two](<https://x/2>)";
        let extraction = extract(md);
        assert_eq!(extraction.citations.len(), 1);
        assert_eq!(extraction.citations[0].title, "One");
    }

    #[test]
    fn missing_sections_yield_empty_fields() {
        let extraction = extract("nothing here");
        assert_eq!(extraction, Extraction::default());
    }

    #[test]
    fn reads_back_rendered_page() {
        let html = r#"<title>Adult - UCI Machine Learning Repository</title>
<a class="text-primary underline" href="https://www.semanticscholar.org/search?q=CorpusID:5">Census Income Study</a>"#;
        let extraction = extract(&render_dataset_page(2, html));

        assert_eq!(extraction.name.as_deref(), Some("Adult"));
        assert_eq!(
            extraction.url.as_deref(),
            Some("https://archive.ics.uci.edu/dataset/2")
        );
        assert_eq!(extraction.citations.len(), 1);
        assert_eq!(extraction.citations[0].title, "Census Income Study");
    }
}
