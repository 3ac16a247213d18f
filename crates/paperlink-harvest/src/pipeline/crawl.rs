use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use paperlink_core::{Checkpoint, CheckpointStore, Citation, Record};
use serde::Serialize;
use tracing::Span;

use crate::citations::extract;
use crate::error::Result;
use crate::identifiers::resolve_identifier;
use crate::sources::{SemanticScholarSource, UciSource};

/// Produces one fully harvested record per identifier.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn harvest(&self, record_id: u32) -> Result<Record>;
}

/// Fetches a dataset page, extracts its citing works and enriches each one
/// through Semantic Scholar when its link carries a corpus token.
pub struct UciHarvester {
    uci: UciSource,
    scholar: SemanticScholarSource,
    span: Span,
}

impl UciHarvester {
    pub fn new(uci: UciSource, scholar: SemanticScholarSource, span: Span) -> Self {
        Self { uci, scholar, span }
    }

    async fn enrich_citation(&self, citation: Citation) -> Citation {
        let Some(token) = citation.url.as_deref().and_then(resolve_identifier) else {
            return citation;
        };
        match self.scholar.enrich(&token).await {
            Some(enrichment) => enrichment.apply_to(&citation),
            None => citation,
        }
    }
}

#[async_trait]
impl RecordSource for UciHarvester {
    async fn harvest(&self, record_id: u32) -> Result<Record> {
        let fetched = self.uci.fetch(record_id).await?;
        let extraction = extract(&fetched.markdown);

        let mut record = Record::new(record_id);
        record.name = extraction.name;
        record.canonical_url = extraction.url;
        record.intro_paper = fetched.intro_paper;

        let found = extraction.citations.len();
        for citation in extraction.citations {
            let citation = self.enrich_citation(citation).await;
            record.citations.push(citation);
        }
        tracing::debug!(parent: &self.span, record_id, citations = found, "record harvested");
        Ok(record)
    }
}

/// Outcome of one crawl run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlReport {
    /// Last completed ID of the progress file this run resumed from.
    pub resumed_from: Option<u32>,
    pub processed: usize,
    pub skipped: usize,
    pub failures: Vec<(u32, String)>,
    pub total_records: usize,
    /// Stopped before the last identifier; the output file was not written.
    pub interrupted: bool,
}

/// Resumable crawl over a sequence of identifiers.
pub struct Crawler<'a, S: RecordSource + ?Sized> {
    source: &'a S,
    store: CheckpointStore,
    checkpoint_interval: u32,
    stop: Arc<AtomicBool>,
    span: Span,
}

impl<'a, S: RecordSource + ?Sized> Crawler<'a, S> {
    pub fn new(source: &'a S, store: CheckpointStore, checkpoint_interval: u32, span: Span) -> Self {
        Self {
            source,
            store,
            checkpoint_interval,
            stop: Arc::new(AtomicBool::new(false)),
            span,
        }
    }

    /// Flag checked before each identifier; setting it ends the run after the current record.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    fn is_checkpoint(&self, record_id: u32) -> bool {
        self.checkpoint_interval != 0 && record_id % self.checkpoint_interval == 0
    }

    /// Harvests every identifier after the resume point, in the given order.
    ///
    /// Per-record failures are logged and reported; only storage errors abort the run.
    pub async fn run(&self, ids: impl IntoIterator<Item = u32>) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();

        let mut checkpoint = match self.store.load()? {
            Some(saved) => {
                report.resumed_from = saved.last_completed_id();
                tracing::info!(
                    parent: &self.span,
                    records = saved.len(),
                    last_id = ?report.resumed_from,
                    "resuming from {}",
                    self.store.progress_path().display()
                );
                saved
            }
            None => Checkpoint::new(),
        };
        let resume_after = checkpoint.resume_after();

        for record_id in ids {
            if record_id <= resume_after {
                report.skipped += 1;
                continue;
            }
            if self.stop.load(Ordering::SeqCst) {
                tracing::warn!(parent: &self.span, record_id, "crawl stopped before record");
                report.interrupted = true;
                break;
            }

            match self.source.harvest(record_id).await {
                Ok(record) => {
                    checkpoint.push(record);
                    report.processed += 1;
                    if self.is_checkpoint(record_id) {
                        self.store.save_progress(&checkpoint)?;
                        tracing::info!(
                            parent: &self.span,
                            record_id,
                            records = checkpoint.len(),
                            "progress saved"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(parent: &self.span, record_id, "skipping record: {e}");
                    report.failures.push((record_id, e.to_string()));
                }
            }
        }

        report.total_records = checkpoint.len();
        if report.interrupted {
            self.store.save_progress(&checkpoint)?;
        } else {
            self.store.finalize(&checkpoint)?;
            tracing::info!(
                parent: &self.span,
                records = report.total_records,
                failures = report.failures.len(),
                "crawl output written to {}",
                self.store.output_path().display()
            );
        }
        Ok(report)
    }
}
