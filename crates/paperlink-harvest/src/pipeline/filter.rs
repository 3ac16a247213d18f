use paperlink_core::{Citation, Record};

/// Drops unapproved records and records without citations, and keeps only
/// citations carrying an arXiv ID, a URL, or a DOI.
pub fn records_with_citations(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .filter(Record::is_approved)
        .filter(|record| !record.citations.is_empty())
        .filter_map(|mut record| {
            record.citations.retain(Citation::is_identifiable);
            (!record.citations.is_empty()).then_some(record)
        })
        .collect()
}

pub fn records_with_arxiv_citations(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .filter(Record::has_arxiv_citation)
        .collect()
}

/// Records worth matching against the knowledge base.
pub fn prepare_for_matching(records: Vec<Record>) -> Vec<Record> {
    records_with_arxiv_citations(records_with_citations(records))
}

/// Records whose intro paper has a DOI or an arXiv ID.
pub fn records_with_intro_papers(records: &[Record]) -> Vec<&Record> {
    records
        .iter()
        .filter(|r| r.intro_paper.as_ref().is_some_and(|p| p.has_doi_or_arxiv()))
        .collect()
}
