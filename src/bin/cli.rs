//! FAPEG edital harvester CLI
//!
//! Local execution entry point. One `run` is one batch over the listing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use editais::{
    error::Result,
    models::{CollectionOutput, Config},
    pipeline,
    services::{HttpFetcher, PopplerExtractor},
    storage::{EditalStorage, LocalStorage, ResultCache},
};

/// Editais - FAPEG grant notice harvester
#[derive(Parser, Debug)]
#[command(
    name = "editais",
    version,
    about = "Harvests FAPEG grant notices and watches the site layout for drift"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collect editais, check page structure and save the collection
    Run {
        /// Listing pages to walk (overrides crawler.max_pages)
        #[arg(long)]
        pages: Option<u32>,

        /// Skip the OCR fallback for scanned PDFs
        #[arg(long)]
        no_ocr: bool,

        /// Skip relevance scoring and requirement sentences
        #[arg(long)]
        no_nlp: bool,

        /// Ignore and do not write the result cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show cache statistics and the last collection
    Info,

    /// Print executive summaries of stored editais
    Summary {
        /// Minimum relevance score to include
        #[arg(long, default_value_t = 0)]
        min_score: u32,
    },
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stdout)
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    log::info!("Loaded configuration from {}", cli.config.display());

    let output = LocalStorage::new(&config.paths.output_dir);

    match cli.command {
        Command::Run {
            pages,
            no_ocr,
            no_nlp,
            no_cache,
        } => {
            if let Some(pages) = pages {
                config.crawler.max_pages = pages;
            }
            config.features.ocr &= !no_ocr;
            config.features.nlp &= !no_nlp;
            config.cache.enabled &= !no_cache;

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }

            let fetcher = HttpFetcher::new(&config.crawler)?;
            let extractor = PopplerExtractor::new(&config.ocr, config.features.ocr);
            let summary = pipeline::run_collector(&config, &fetcher, &extractor, &output).await?;

            if summary.critical_alerts > 0 {
                log::warn!(
                    "{} page(s) lost critical elements; check the selectors",
                    summary.critical_alerts
                );
            }
            log::info!("Collection complete!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} tracked keys, {} critical, {} interest areas)",
                config.structure.tracked.len(),
                config.structure.critical.len(),
                config.relevance.areas.len()
            );
        }

        Command::Info => {
            log::info!("Cache directory: {}", config.paths.cache_dir.display());
            let cache = ResultCache::new(&config.paths.cache_dir, config.cache.ttl_hours);
            let stats = cache.stats().await?;
            log::info!(
                "Cache: {} entries ({} valid, {} expired, {} bytes)",
                stats.total,
                stats.valid,
                stats.expired,
                stats.bytes
            );

            let structures = LocalStorage::new(&config.paths.structure_dir)
                .list_json()
                .await?;
            log::info!("Structure signatures: {}", structures.len());

            match output.load_collection().await? {
                Some(collection) => log_collection(&collection),
                None => log::info!("No collection found yet."),
            }
        }

        Command::Summary { min_score } => {
            let Some(collection) = output.load_collection().await? else {
                log::info!("No collection found yet. Run 'run' first.");
                return Ok(());
            };

            let mut selected: Vec<_> = collection
                .editais
                .iter()
                .filter(|e| e.score() >= min_score)
                .collect();
            selected.sort_by(|a, b| b.score().cmp(&a.score()));

            for edital in &selected {
                println!("{}", edital.executive_summary());
                if let Some(relevance) = &edital.relevance {
                    println!("RELEVÂNCIA: {} ({} pontos)\n", relevance.recommendation, relevance.score);
                }
            }
            log::info!(
                "{} of {} editais with score >= {}",
                selected.len(),
                collection.count,
                min_score
            );
        }
    }

    log::info!("Done!");

    Ok(())
}

fn log_collection(collection: &CollectionOutput) {
    log::info!(
        "Last collection: {} editais at {}",
        collection.count,
        collection.collected_at.to_rfc3339()
    );
    let with_pdf = collection.editais.iter().filter(|e| e.pdf.is_some()).count();
    log::info!("With analysed PDF: {}", with_pdf);
    if !collection.structure_changes.is_empty() {
        log::info!("Structure changes in that run:");
        for check in &collection.structure_changes {
            let marker = if check.report.critical { " [CRITICAL]" } else { "" };
            log::info!("    {} ({} keys){}", check.url, check.report.changes.len(), marker);
        }
    }
}
