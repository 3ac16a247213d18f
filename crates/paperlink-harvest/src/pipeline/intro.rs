use paperlink_core::{KgMatch, Record};

use super::filter::records_with_intro_papers;
use super::matcher::KbMatcher;
use crate::kg::KnowledgeBase;

/// Matches each record's intro paper by arXiv ID. Not cached.
///
/// Records whose intro paper has only a DOI pass the filter but produce no match.
pub async fn match_intro_papers<K: KnowledgeBase + ?Sized>(
    matcher: &KbMatcher<'_, K>,
    records: &[Record],
) -> Vec<KgMatch> {
    let mut matches = Vec::new();
    for record in records_with_intro_papers(records) {
        let Some(paper) = record.intro_paper.as_ref() else {
            continue;
        };
        let Some(arxiv) = paper.arxiv_id.as_deref().filter(|a| !a.trim().is_empty()) else {
            continue;
        };
        if let Some(kb_item_id) = matcher.lookup(arxiv).await {
            matches.push(KgMatch {
                record_id: record.record_id,
                record_name: record.name.clone(),
                record_url: record.canonical_url.clone(),
                external_id: arxiv.to_string(),
                external_title: paper.title.clone(),
                kb_item_id,
            });
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use paperlink_core::IntroPaper;
    use tracing::Span;

    use super::*;
    use crate::kg::memory::InMemoryKnowledgeBase;

    fn with_intro(id: u32, doi: Option<&str>, arxiv: Option<&str>) -> Record {
        let mut record = Record::new(id);
        record.canonical_url = Some(format!("https://archive.ics.uci.edu/dataset/{id}"));
        record.intro_paper = Some(IntroPaper {
            title: Some(format!("Intro {id}")),
            doi: doi.map(ToOwned::to_owned),
            arxiv_id: arxiv.map(ToOwned::to_owned),
            ..Default::default()
        });
        record
    }

    #[tokio::test]
    async fn only_arxiv_intro_papers_are_looked_up() {
        let kb = InMemoryKnowledgeBase::new()
            .with_publication("1802.01234", "Q42")
            .with_publication("1903.00001", "Q43");
        let matcher = KbMatcher::new(&kb, Span::none());
        let records = vec![
            with_intro(1, Some("10.1/a"), None),
            with_intro(2, None, Some("1802.01234")),
            with_intro(3, None, Some("0000.00000")),
            Record::new(4),
        ];

        let matches = match_intro_papers(&matcher, &records).await;

        assert_eq!(kb.searches(), 2);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].record_id, 2);
        assert_eq!(matches[0].kb_item_id, "Q42");
        assert_eq!(matches[0].external_title.as_deref(), Some("Intro 2"));
    }
}
