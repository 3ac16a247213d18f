use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use paperlink_core::{AppConfig, ExitCode, LinkCandidate};
use paperlink_harvest::pipeline::workflow::{self, IdSelection, RunOptions};
use paperlink_harvest::pipeline::ClaimProperties;
use paperlink_harvest::sources::UciSource;

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "paperlink",
    about = "Crawl UCI ML datasets and link citing papers in the MaRDI knowledge graph",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting PAPERLINK_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file (default: ~/.config/paperlink/config.toml or $PAPERLINK_CONFIG).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `paths.data_dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List datasets available in the UCI catalog.
    Datasets {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        area: Option<String>,
    },

    /// Crawl dataset pages into the dump file, resuming from saved progress.
    Crawl {
        #[command(flatten)]
        ids: IdArgs,
    },

    /// Report dataset IDs missing from the dump file.
    CheckDump {
        #[command(flatten)]
        ids: IdArgs,
    },

    /// Link arXiv papers citing datasets to the dataset items.
    LinkCitations {
        /// Print the links without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Link dataset intro papers to the dataset items.
    LinkIntro {
        /// Print the links without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Crawl if needed, then match and link.
    Run {
        #[command(flatten)]
        ids: IdArgs,
        /// Skip intro-paper linking.
        #[arg(long)]
        skip_intro: bool,
    },

    /// Show the effective configuration.
    Config,
}

#[derive(Args, Clone)]
struct IdArgs {
    /// Take dataset IDs from the catalog listing instead of 1..=last_index.
    #[arg(long, conflicts_with = "ids")]
    from_listing: bool,

    /// Explicit dataset IDs, comma-separated.
    #[arg(long, value_delimiter = ',')]
    ids: Vec<u32>,

    /// Override `crawl.last_index`.
    #[arg(long)]
    last_index: Option<u32>,
}

impl IdArgs {
    fn selection(&self) -> IdSelection {
        if self.from_listing {
            IdSelection::Listing
        } else {
            IdSelection::Range
        }
    }

    fn apply(&self, config: &mut AppConfig) {
        if let Some(last) = self.last_index {
            config.crawl.last_index = last;
        }
    }

    async fn resolve(&self, config: &AppConfig, span: &Span) -> Result<Vec<u32>> {
        if !self.ids.is_empty() {
            return Ok(self.ids.clone());
        }
        workflow::dataset_ids(config, self.selection(), span)
            .await
            .context("could not determine dataset IDs")
    }
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    init_logging(cli.log_file.as_deref())?;

    let json_output = cli.json || std::env::var("PAPERLINK_JSON").as_deref() == Ok("1");

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    if let Some(dir) = &cli.data_dir {
        config.paths.data_dir = dir.to_string_lossy().into_owned();
    }

    let span = tracing::info_span!("paperlink");

    match cli.command {
        Commands::Datasets {
            filter,
            search,
            area,
        } => {
            let uci = UciSource::from_config(&config.http, &config.uci, span.clone())?;
            let entries = uci
                .list_datasets(filter.as_deref(), search.as_deref(), area.as_deref())
                .await
                .context("catalog listing failed")?;
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": entries, "total": entries.len() },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                for entry in &entries {
                    println!("{:>4} - {}", entry.id, entry.name.as_deref().unwrap_or(""));
                }
            }
        }

        Commands::Crawl { ids } => {
            ids.apply(&mut config);
            let list = ids.resolve(&config, &span).await?;
            let report = workflow::crawl(&config, list, stop_on_ctrl_c(), &span)
                .await
                .context("crawl failed")?;
            if json_output {
                print_json(&serde_json::json!({
                    "status": if report.interrupted { "interrupted" } else { "ok" },
                    "data": report,
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                println!(
                    "Crawled {} datasets ({} skipped, {} failed), {} records in {}",
                    report.processed,
                    report.skipped,
                    report.failures.len(),
                    report.total_records,
                    config.dump_path().display()
                );
                for (id, reason) in &report.failures {
                    println!("  ✗ {id}: {reason}");
                }
            }
            if report.interrupted {
                std::process::exit(ExitCode::Incomplete as i32);
            }
        }

        Commands::CheckDump { ids } => {
            ids.apply(&mut config);
            let expected = ids.resolve(&config, &span).await?;
            let dump = config.dump_path();
            let missing = match workflow::check_dump(&dump, &expected, &span) {
                Ok(missing) => missing,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(ExitCode::NotFound as i32);
                }
            };
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "complete": missing.is_empty(), "missing": missing },
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else if missing.is_empty() {
                println!("✓ {} contains all {} datasets", dump.display(), expected.len());
            } else {
                println!("✗ {} is missing {} datasets: {missing:?}", dump.display(), missing.len());
            }
            if !missing.is_empty() {
                std::process::exit(ExitCode::Incomplete as i32);
            }
        }

        Commands::LinkCitations { dry_run } => {
            let kb = workflow::knowledge_base(&config, &span)?;
            let candidates = workflow::citation_candidates(
                &kb,
                &config.dump_path(),
                &config.mapping_path(),
                &span,
            )
            .await
            .context("citation matching failed")?;
            link_candidates(&kb, &config, &candidates, dry_run, json_output, start, &span).await?;
        }

        Commands::LinkIntro { dry_run } => {
            let kb = workflow::knowledge_base(&config, &span)?;
            let candidates = workflow::intro_candidates(
                &kb,
                &config.dump_path(),
                &config.mapping_path(),
                &span,
            )
            .await
            .context("intro paper matching failed")?;
            link_candidates(&kb, &config, &candidates, dry_run, json_output, start, &span).await?;
        }

        Commands::Run { ids, skip_intro } => {
            ids.apply(&mut config);
            let options = RunOptions {
                ids: ids.selection(),
                link_intro_papers: !skip_intro,
            };
            let report = workflow::run(&config, options, stop_on_ctrl_c(), &span)
                .await
                .context("workflow failed")?;
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": report,
                    "meta": { "duration_ms": start.elapsed().as_millis() }
                }))?;
            } else {
                if let Some(crawl) = &report.crawl {
                    println!(
                        "Crawl: {} processed, {} failed, {} records",
                        crawl.processed,
                        crawl.failures.len(),
                        crawl.total_records
                    );
                }
                if let Some(links) = &report.citation_links {
                    println!("Citations: {} linked, {} failed", links.linked, links.failed.len());
                }
                if let Some(links) = &report.intro_links {
                    println!("Intro papers: {} linked, {} failed", links.linked, links.failed.len());
                }
            }
            if report.crawl.as_ref().is_some_and(|c| c.interrupted) {
                std::process::exit(ExitCode::Incomplete as i32);
            }
        }

        Commands::Config => {
            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": config,
                    "meta": { "config_path": AppConfig::config_path() }
                }))?;
            } else {
                println!("# {}", AppConfig::config_path().display());
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

async fn link_candidates(
    kb: &paperlink_harvest::WikibaseClient,
    config: &AppConfig,
    candidates: &[LinkCandidate],
    dry_run: bool,
    json_output: bool,
    start: Instant,
    span: &Span,
) -> Result<()> {
    if dry_run {
        if json_output {
            print_json(&serde_json::json!({
                "status": "ok",
                "data": { "items": candidates, "total": candidates.len() },
                "meta": { "duration_ms": start.elapsed().as_millis(), "dry_run": true }
            }))?;
        } else {
            for c in candidates {
                println!(
                    "{} cites {}  (dataset {}, arXiv {})",
                    c.matched.kb_item_id, c.dataset_item_id, c.matched.record_id, c.matched.external_id
                );
            }
            println!("{} links (dry run)", candidates.len());
        }
        return Ok(());
    }

    if !workflow::login_for_writes(kb, config, span)
        .await
        .context("knowledge-base login failed")?
    {
        return Ok(());
    }
    let report = workflow::write_links(
        kb,
        candidates,
        ClaimProperties::from(&config.knowledge_base),
        span,
    )
    .await;

    if json_output {
        print_json(&serde_json::json!({
            "status": if report.failed.is_empty() { "ok" } else { "partial" },
            "data": report,
            "meta": { "duration_ms": start.elapsed().as_millis() }
        }))?;
    } else {
        println!("Linked {} items ({} skipped, {} failed)", report.linked, report.skipped, report.failed.len());
        for (item, reason) in &report.failed {
            println!("  ✗ {item}: {reason}");
        }
    }
    if !report.failed.is_empty() {
        std::process::exit(ExitCode::GeneralError as i32);
    }
    Ok(())
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}

/// Flag set on the first Ctrl-C; the crawl stops at the next dataset boundary.
fn stop_on_ctrl_c() -> Arc<AtomicBool> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current dataset");
            flag.store(true, Ordering::SeqCst);
        }
    });
    stop
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
