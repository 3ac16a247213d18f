use std::path::Path;

use paperlink_core::storage::dump::{load_match_cache, save_match_cache};
use paperlink_core::{KgMatch, Record};
use tracing::Span;

use crate::error::Result;
use crate::identifiers::arxiv_search_key;
use crate::kg::KnowledgeBase;

/// Looks up arXiv-cited works of each record in the knowledge base.
pub struct KbMatcher<'a, K: KnowledgeBase + ?Sized> {
    kb: &'a K,
    span: Span,
}

impl<'a, K: KnowledgeBase + ?Sized> KbMatcher<'a, K> {
    pub fn new(kb: &'a K, span: Span) -> Self {
        Self { kb, span }
    }

    /// First knowledge-base item for `arxiv_id`, or `None` on no hit or lookup error.
    ///
    /// The search uses the versionless ID (`1706.03762v5` searches `1706.03762`),
    /// since knowledge-base items store arXiv IDs without a version.
    pub async fn lookup(&self, arxiv_id: &str) -> Option<String> {
        let key = arxiv_search_key(arxiv_id);
        match self.kb.search_by_arxiv(&key).await {
            Ok(hits) => {
                if !hits.is_empty() {
                    tracing::info!(
                        parent: &self.span,
                        arxiv = %key,
                        hits = hits.len(),
                        "found in knowledge base"
                    );
                }
                hits.into_iter().next()
            }
            Err(e) => {
                tracing::warn!(parent: &self.span, arxiv = %key, "lookup failed: {e}");
                None
            }
        }
    }

    /// One match per citation found in the knowledge base, in record then citation order.
    ///
    /// An existing cache file is returned as-is without any lookups; otherwise the
    /// result is written to `cache_path`.
    pub async fn match_records(&self, records: &[Record], cache_path: &Path) -> Result<Vec<KgMatch>> {
        if let Some(cached) = load_match_cache(cache_path)? {
            tracing::warn!(
                parent: &self.span,
                entries = cached.len(),
                "using cached matches from {}",
                cache_path.display()
            );
            return Ok(cached);
        }

        let mut matches = Vec::new();
        for record in records {
            for citation in &record.citations {
                let Some(arxiv) = citation.arxiv.as_deref().filter(|a| !a.trim().is_empty())
                else {
                    continue;
                };
                if let Some(kb_item_id) = self.lookup(arxiv).await {
                    matches.push(KgMatch {
                        record_id: record.record_id,
                        record_name: record.name.clone(),
                        record_url: record.canonical_url.clone(),
                        external_id: arxiv.to_string(),
                        external_title: Some(citation.title.clone()),
                        kb_item_id,
                    });
                }
            }
        }

        save_match_cache(cache_path, &matches)?;
        tracing::info!(parent: &self.span, matches = matches.len(), "knowledge-base matching done");
        Ok(matches)
    }
}
