//! Stage entry points shared by the CLI subcommands and the `run` workflow.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use paperlink_core::{
    AppConfig, CheckpointStore, ClaimPair, LinkCandidate, load_dump, load_identifier_mapping,
    match_cache_path, missing_record_ids,
};
use serde::Serialize;
use tracing::Span;

use super::crawl::{CrawlReport, Crawler, UciHarvester};
use super::filter::prepare_for_matching;
use super::intro::match_intro_papers;
use super::join::join_with_mapping;
use super::linker::{ClaimProperties, ClaimWriter, LinkReport};
use super::matcher::KbMatcher;
use crate::error::{HarvestError, Result};
use crate::kg::{Credentials, KnowledgeBase, WikibaseClient};
use crate::sources::{SemanticScholarSource, UciSource};

/// Where the crawl takes its identifiers from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSelection {
    /// `1..=crawl.last_index`
    Range,
    /// IDs from the catalog listing API.
    Listing,
}

pub async fn dataset_ids(config: &AppConfig, selection: IdSelection, span: &Span) -> Result<Vec<u32>> {
    match selection {
        IdSelection::Range => Ok((1..=config.crawl.last_index).collect()),
        IdSelection::Listing => {
            let uci = UciSource::from_config(&config.http, &config.uci, span.clone())?;
            let entries = uci.list_datasets(None, None, None).await?;
            Ok(entries.into_iter().map(|e| e.id).collect())
        }
    }
}

/// Crawls `ids` into the configured dump file, resuming from its progress file.
pub async fn crawl(
    config: &AppConfig,
    ids: Vec<u32>,
    stop: Arc<AtomicBool>,
    span: &Span,
) -> Result<CrawlReport> {
    let uci = UciSource::from_config(&config.http, &config.uci, span.clone())?;
    let api_key = AppConfig::secret_from_env(&config.semantic_scholar.api_key_env);
    let scholar = SemanticScholarSource::from_config(
        &config.http,
        &config.semantic_scholar,
        api_key,
        span.clone(),
    )?;
    let harvester = UciHarvester::new(uci, scholar, span.clone());

    let crawler = Crawler::new(
        &harvester,
        CheckpointStore::new(config.dump_path()),
        config.crawl.checkpoint_interval,
        span.clone(),
    )
    .with_stop_flag(stop);
    crawler.run(ids).await
}

/// IDs from `expected` missing in the dump. A missing dump file is an error.
pub fn check_dump(dump: &Path, expected: &[u32], span: &Span) -> Result<Vec<u32>> {
    let records = load_dump(dump)?;
    let missing = missing_record_ids(&records, expected);
    if !missing.is_empty() {
        tracing::warn!(parent: span, count = missing.len(), "dump is missing dataset IDs: {missing:?}");
    }
    Ok(missing)
}

/// Cited works found in the knowledge base, joined with the dataset mapping.
pub async fn citation_candidates<K: KnowledgeBase + ?Sized>(
    kb: &K,
    dump: &Path,
    mapping: &Path,
    span: &Span,
) -> Result<Vec<LinkCandidate>> {
    tracing::info!(parent: span, "loading records from {}", dump.display());
    let records = prepare_for_matching(load_dump(dump)?);
    tracing::info!(parent: span, records = records.len(), "records with arXiv citations");

    let matches = KbMatcher::new(kb, span.clone())
        .match_records(&records, &match_cache_path(dump))
        .await?;
    let mapping = load_identifier_mapping(mapping)?;
    Ok(join_with_mapping(matches, &mapping, span))
}

/// Intro papers found in the knowledge base, joined with the dataset mapping.
pub async fn intro_candidates<K: KnowledgeBase + ?Sized>(
    kb: &K,
    dump: &Path,
    mapping: &Path,
    span: &Span,
) -> Result<Vec<LinkCandidate>> {
    let records = load_dump(dump)?;
    let matcher = KbMatcher::new(kb, span.clone());
    let matches = match_intro_papers(&matcher, &records).await;
    tracing::info!(parent: span, matches = matches.len(), "intro papers found in knowledge base");
    if matches.is_empty() {
        return Ok(Vec::new());
    }
    let mapping = load_identifier_mapping(mapping)?;
    Ok(join_with_mapping(matches, &mapping, span))
}

pub async fn write_links<K: KnowledgeBase + ?Sized>(
    kb: &K,
    candidates: &[LinkCandidate],
    properties: ClaimProperties,
    span: &Span,
) -> LinkReport {
    let pairs: Vec<ClaimPair> = candidates.iter().map(LinkCandidate::to_claim_pair).collect();
    ClaimWriter::new(kb, properties, span.clone())
        .link_all(&pairs)
        .await
}

/// Anonymous client, sufficient for searching and reading items.
pub fn knowledge_base(config: &AppConfig, span: &Span) -> Result<WikibaseClient> {
    WikibaseClient::from_config(&config.http, &config.knowledge_base, span.clone())
}

/// Logs `client` in for writing. Returns `false` when no credentials are configured.
pub async fn login_for_writes(client: &WikibaseClient, config: &AppConfig, span: &Span) -> Result<bool> {
    match Credentials::from_env(&config.knowledge_base) {
        Ok(credentials) => {
            client.login(&credentials).await?;
            Ok(true)
        }
        Err(HarvestError::MissingCredentials(reason)) => {
            tracing::error!(parent: span, "no valid knowledge-base credentials ({reason}), skipping writes");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub ids: IdSelection,
    pub link_intro_papers: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub crawl: Option<CrawlReport>,
    pub citation_links: Option<LinkReport>,
    pub intro_links: Option<LinkReport>,
}

/// Full pipeline: ensure the dump exists, then match, join, and write links.
pub async fn run(
    config: &AppConfig,
    options: RunOptions,
    stop: Arc<AtomicBool>,
    span: &Span,
) -> Result<RunReport> {
    let mut report = RunReport::default();
    let dump = config.dump_path();
    let mapping = config.mapping_path();

    if dump.is_file() {
        tracing::info!(parent: span, "using existing dump {}", dump.display());
    } else {
        tracing::warn!(parent: span, "dump {} not found, starting crawl", dump.display());
        let ids = dataset_ids(config, options.ids, span).await?;
        let crawl_report = crawl(config, ids, stop, span).await?;
        let interrupted = crawl_report.interrupted;
        report.crawl = Some(crawl_report);
        if interrupted {
            return Ok(report);
        }
    }

    let kb = knowledge_base(config, span)?;
    let citations = citation_candidates(&kb, &dump, &mapping, span).await?;
    let intro = if options.link_intro_papers {
        intro_candidates(&kb, &dump, &mapping, span).await?
    } else {
        Vec::new()
    };

    if !login_for_writes(&kb, config, span).await? {
        return Ok(report);
    }
    let properties = ClaimProperties::from(&config.knowledge_base);
    report.citation_links = Some(write_links(&kb, &citations, properties.clone(), span).await);
    if options.link_intro_papers {
        report.intro_links = Some(write_links(&kb, &intro, properties, span).await);
    }
    tracing::info!(parent: span, "workflow complete");
    Ok(report)
}
