// src/pipeline/collect.rs

//! Edital collection pipeline.
//!
//! One sequential pass: listing pages, notice pages, the first PDF of each
//! notice, keyword analysis, then a single write of the whole collection.
//! Every visited HTML page goes through structure detection before its
//! content is extracted.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scraper::Html;

use crate::error::Result;
use crate::models::{CollectionOutput, Config, Edital, EditalDetails, PdfDetails, StructureCheck};
use crate::pipeline::diff::{Diff, calculate_diff};
use crate::services::relevance::requirements;
use crate::services::{
    FieldExtractor, Fetcher, Fingerprinter, ListingParser, PdfTextExtractor, RelevanceScorer,
    StructureMonitor,
};
use crate::storage::{EditalStorage, LocalStorage, ResultCache};
use crate::utils::console;
use crate::utils::http::{pace, request_delay};

const TOTAL_STEPS: usize = 5;

/// What a run did.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_visited: usize,
    pub editais: usize,
    pub details_fetched: usize,
    pub pdfs_analyzed: usize,
    pub cache_hits: usize,
    pub failures: usize,
    pub structure_changes: usize,
    pub critical_alerts: usize,
    pub diff: Diff,
    pub output_location: String,
}

/// Run the whole collection and persist the result through `storage`.
///
/// Fetch and parse failures of single items are logged and counted. Errors
/// reading or writing structure signatures, and the final write, abort the
/// run.
pub async fn run_collector(
    config: &Config,
    fetcher: &dyn Fetcher,
    pdf_extractor: &dyn PdfTextExtractor,
    storage: &dyn EditalStorage,
) -> Result<RunSummary> {
    console::header("FAPEG edital collection");

    let collector = Collector::new(config, fetcher, pdf_extractor)?;
    let mut summary = RunSummary {
        started_at: Some(Utc::now()),
        ..RunSummary::default()
    };
    let mut checks = Vec::new();

    console::step(1, TOTAL_STEPS, "Collecting listing pages");
    let mut editais = collector.collect_listing(&mut summary, &mut checks).await?;
    summary.editais = editais.len();
    console::sub_item(&format!("{} editais found", editais.len()));

    console::step(2, TOTAL_STEPS, "Fetching notice pages");
    collector
        .fetch_details(&mut editais, &mut summary, &mut checks)
        .await?;

    console::step(3, TOTAL_STEPS, "Analysing notice PDFs");
    collector.analyze_pdfs(&mut editais, &mut summary).await;

    if config.features.nlp {
        console::step(4, TOTAL_STEPS, "Scoring relevance");
        collector.score(&mut editais)?;
    } else {
        console::step(4, TOTAL_STEPS, "Relevance scoring disabled");
    }
    for edital in &mut editais {
        if let Some(pdf) = edital.pdf.as_mut() {
            pdf.text.clear();
        }
    }

    console::step(5, TOTAL_STEPS, "Saving collection");
    let previous = match storage.load_collection().await {
        Ok(previous) => previous.map(|c| c.editais).unwrap_or_default(),
        Err(e) => {
            log::warn!("Previous collection unreadable, diffing against nothing: {}", e);
            Vec::new()
        }
    };
    let diff = calculate_diff(&previous, &editais);
    if diff.has_changes() {
        console::sub_item(&format!("{} change(s) since the last collection", diff.change_count()));
    } else {
        console::sub_item("No changes since the last collection");
    }
    for edital in &diff.added_editais {
        console::sub_item(&format!("New: {}", edital.title));
    }
    for edital in &diff.updated_editais {
        console::sub_item(&format!("Updated: {}", edital.title));
    }
    summary.diff = diff.diff;
    summary.structure_changes = checks.len();

    let output = CollectionOutput::new(editais, checks);
    let written = storage.write_collection(&output).await?;
    summary.output_location = written.location;
    summary.finished_at = Some(Utc::now());

    console::summary(
        "Collection",
        &[
            ("Listing pages", summary.pages_visited.to_string()),
            ("Editais", summary.editais.to_string()),
            ("Notice pages fetched", summary.details_fetched.to_string()),
            ("PDFs analysed", summary.pdfs_analyzed.to_string()),
            ("Cache hits", summary.cache_hits.to_string()),
            ("Failures", summary.failures.to_string()),
            ("Structure changes", summary.structure_changes.to_string()),
            ("Critical alerts", summary.critical_alerts.to_string()),
            ("New", summary.diff.added.len().to_string()),
            ("Updated", summary.diff.updated.len().to_string()),
            ("Removed", summary.diff.removed.len().to_string()),
            ("Output", summary.output_location.clone()),
        ],
    );

    Ok(summary)
}

struct Collector<'a> {
    config: &'a Config,
    fetcher: &'a dyn Fetcher,
    pdf_extractor: &'a dyn PdfTextExtractor,
    parser: ListingParser,
    fingerprinter: Fingerprinter,
    monitor: StructureMonitor<LocalStorage>,
    cache: Option<ResultCache>,
    fields: FieldExtractor,
    delay: Duration,
}

impl<'a> Collector<'a> {
    fn new(
        config: &'a Config,
        fetcher: &'a dyn Fetcher,
        pdf_extractor: &'a dyn PdfTextExtractor,
    ) -> Result<Self> {
        let cache = config.cache.enabled.then(|| {
            log::info!("Result cache enabled (TTL: {}h)", config.cache.ttl_hours);
            ResultCache::new(&config.paths.cache_dir, config.cache.ttl_hours)
        });

        Ok(Self {
            config,
            fetcher,
            pdf_extractor,
            parser: ListingParser::new(&config.site)?,
            fingerprinter: Fingerprinter::new(config.structure.tracked.clone()),
            monitor: StructureMonitor::from_config(
                LocalStorage::new(&config.paths.structure_dir),
                &config.structure,
            ),
            cache,
            fields: FieldExtractor::new()?,
            delay: request_delay(&config.crawler),
        })
    }

    /// Fetch, fingerprint and check one HTML page.
    ///
    /// `Ok(None)` when the page could not be fetched.
    async fn visit(
        &self,
        url: &str,
        summary: &mut RunSummary,
        checks: &mut Vec<StructureCheck>,
    ) -> Result<Option<Html>> {
        let fetched = self.fetcher.fetch(url).await;
        pace(self.delay).await;

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Failed to fetch {}: {}", url, e);
                summary.failures += 1;
                return Ok(None);
            }
        };

        let (document, signature) = self.fingerprinter.fingerprint_bytes(&bytes);
        let report = self.monitor.detect(url, &signature).await?;
        if report.critical {
            console::structure_alert(url, &report);
            summary.critical_alerts += 1;
        }
        if report.has_changes() {
            checks.push(StructureCheck {
                url: url.to_string(),
                report,
            });
        }

        Ok(Some(document))
    }

    async fn collect_listing(
        &self,
        summary: &mut RunSummary,
        checks: &mut Vec<StructureCheck>,
    ) -> Result<Vec<Edital>> {
        let mut editais = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=self.config.crawler.max_pages {
            let url = self.parser.page_url(page);
            let Some(document) = self.visit(&url, summary, checks).await? else {
                break;
            };
            summary.pages_visited += 1;

            let found = self.parser.parse_listing(&document);
            if found.is_empty() {
                log::info!("No editais on page {}, stopping", page);
                break;
            }
            console::sub_item(&format!("Page {}: {} editais", page, found.len()));
            editais.extend(found.into_iter().filter(|e| seen.insert(e.url.clone())));
        }

        Ok(editais)
    }

    async fn fetch_details(
        &self,
        editais: &mut [Edital],
        summary: &mut RunSummary,
        checks: &mut Vec<StructureCheck>,
    ) -> Result<()> {
        let total = editais.len();
        for (i, edital) in editais.iter_mut().enumerate() {
            if let Some(cache) = &self.cache {
                if let Some(details) = cache.get::<EditalDetails>(&edital.url).await {
                    log::debug!("[CACHE] {}", edital.url);
                    summary.cache_hits += 1;
                    edital.details = Some(details);
                    continue;
                }
            }

            log::debug!("Notice {}/{}: {}", i + 1, total, edital.url);
            let Some(document) = self.visit(&edital.url, summary, checks).await? else {
                continue;
            };
            let details = self.parser.parse_details(&document, &edital.url);
            drop(document);

            summary.details_fetched += 1;
            self.remember(&edital.url, &details).await;
            edital.details = Some(details);
        }
        Ok(())
    }

    async fn analyze_pdfs(&self, editais: &mut [Edital], summary: &mut RunSummary) {
        for edital in editais.iter_mut() {
            let Some(link) = edital.first_pdf().cloned() else {
                continue;
            };

            if let Some(cache) = &self.cache {
                if let Some(pdf) = cache.get::<PdfDetails>(&link.url).await {
                    log::debug!("[CACHE] {}", link.url);
                    summary.cache_hits += 1;
                    edital.pdf = Some(pdf);
                    continue;
                }
            }

            let fetched = self.fetcher.fetch(&link.url).await;
            pace(self.delay).await;
            let bytes = match fetched {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Failed to download PDF {}: {}", link.url, e);
                    summary.failures += 1;
                    continue;
                }
            };

            match self.pdf_extractor.extract_text(&bytes).await {
                Ok(text) => {
                    console::sub_item(&format!(
                        "{} ({} pages, {:?})",
                        edital.title, text.pages, text.method
                    ));
                    let details = self.fields.analyze_pdf(&link.url, text);
                    self.remember(&link.url, &details).await;
                    edital.pdf = Some(details);
                    summary.pdfs_analyzed += 1;
                }
                Err(e) => {
                    log::warn!("Could not read PDF {}: {}", link.url, e);
                    summary.failures += 1;
                }
            }
        }
    }

    fn score(&self, editais: &mut [Edital]) -> Result<()> {
        let scorer = RelevanceScorer::new(&self.config.relevance)?;
        for edital in editais.iter_mut() {
            let content = edital.content_text();
            let relevance = (!content.is_empty()).then(|| scorer.score(content));
            let source = edital
                .pdf
                .as_ref()
                .map(|pdf| pdf.text.as_str())
                .filter(|text| !text.is_empty())
                .unwrap_or(content);
            let found = requirements(source);

            edital.relevance = relevance;
            edital.requirements = found;
        }
        Ok(())
    }

    /// Store a payload in the cache. A failed write only costs a refetch.
    async fn remember<T: serde::Serialize + Sync>(&self, url: &str, payload: &T) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(url, payload).await {
                log::warn!("Could not cache {}: {}", url, e);
            }
        }
    }
}
