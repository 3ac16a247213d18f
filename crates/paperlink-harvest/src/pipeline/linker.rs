use paperlink_core::ClaimPair;
use paperlink_core::config::KnowledgeBaseConfig;
use serde::Serialize;
use tracing::Span;

use crate::error::Result;
use crate::kg::{ActionIfExists, KnowledgeBase, Reference, Snak, SnakValue, Statement};

/// Properties used for "publication cites dataset" statements.
#[derive(Debug, Clone)]
pub struct ClaimProperties {
    pub cites_work: String,
    pub extracted_from: String,
}

impl From<&KnowledgeBaseConfig> for ClaimProperties {
    fn from(config: &KnowledgeBaseConfig) -> Self {
        Self {
            cites_work: config.cites_work_property.clone(),
            extracted_from: config.extracted_from_property.clone(),
        }
    }
}

impl Default for ClaimProperties {
    fn default() -> Self {
        Self::from(&KnowledgeBaseConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinkReport {
    pub linked: usize,
    pub skipped: usize,
    /// Publication item ID and error for each failed write.
    pub failed: Vec<(String, String)>,
}

/// Writes "cites work" statements without duplicating earlier ones.
pub struct ClaimWriter<'a, K: KnowledgeBase + ?Sized> {
    kb: &'a K,
    properties: ClaimProperties,
    span: Span,
}

impl<'a, K: KnowledgeBase + ?Sized> ClaimWriter<'a, K> {
    pub fn new(kb: &'a K, properties: ClaimProperties, span: Span) -> Self {
        Self {
            kb,
            properties,
            span,
        }
    }

    pub fn cites_work_statement(&self, dataset_item_id: &str, provenance_url: Option<&str>) -> Statement {
        let statement = Statement::new(Snak::new(
            self.properties.cites_work.clone(),
            SnakValue::Item(dataset_item_id.to_string()),
        ));
        match provenance_url.filter(|u| !u.is_empty()) {
            Some(url) => statement.with_reference(Reference::new(vec![Snak::new(
                self.properties.extracted_from.clone(),
                SnakValue::String(url.to_string()),
            )])),
            None => statement,
        }
    }

    /// Reads the publication item, merges the statement, and writes it back.
    pub async fn link(
        &self,
        publication_item_id: &str,
        dataset_item_id: &str,
        provenance_url: Option<&str>,
    ) -> Result<()> {
        let mut item = self.kb.get_item(publication_item_id).await?;
        item.add_statement(
            self.cites_work_statement(dataset_item_id, provenance_url),
            ActionIfExists::AppendOrReplace,
        );
        self.kb.write_item(&item).await
    }

    /// Links every complete pair. Incomplete pairs are skipped; failed writes
    /// are logged and counted, and the batch continues.
    pub async fn link_all(&self, pairs: &[ClaimPair]) -> LinkReport {
        let mut report = LinkReport::default();
        tracing::info!(parent: &self.span, items = pairs.len(), "updating knowledge-base items");

        for pair in pairs {
            let Some((publication, dataset)) = pair.resolved_ids() else {
                tracing::warn!(parent: &self.span, ?pair, "skipping pair with missing item IDs");
                report.skipped += 1;
                continue;
            };

            tracing::info!(parent: &self.span, publication, dataset, "linking publication with dataset");
            match self
                .link(publication, dataset, pair.provenance_url.as_deref())
                .await
            {
                Ok(()) => report.linked += 1,
                Err(e) => {
                    tracing::error!(parent: &self.span, publication, "write failed: {e}");
                    report.failed.push((publication.to_string(), e.to_string()));
                }
            }
        }

        tracing::info!(
            parent: &self.span,
            linked = report.linked,
            skipped = report.skipped,
            failed = report.failed.len(),
            "finished updating items"
        );
        report
    }
}
