//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::ElementKey;

/// Longest accepted cache TTL: ten years.
pub const MAX_TTL_HOURS: u64 = 24 * 365 * 10;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Source site URLs
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP and pacing behavior
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// On-disk locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Layout drift detection
    #[serde(default)]
    pub structure: StructureConfig,

    /// Optional processing stages
    #[serde(default)]
    pub features: FeatureFlags,

    /// OCR fallback for scanned PDFs
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Institution interest profile
    #[serde(default)]
    pub relevance: RelevanceProfile,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if self.crawler.max_attempts == 0 {
            return Err(AppError::validation("crawler.max_attempts must be > 0"));
        }
        if self.cache.ttl_hours == 0 {
            return Err(AppError::validation("cache.ttl_hours must be > 0"));
        }
        if self.cache.ttl_hours > MAX_TTL_HOURS {
            return Err(AppError::validation(format!(
                "cache.ttl_hours must be <= {MAX_TTL_HOURS}"
            )));
        }
        url::Url::parse(&self.site.listing_url)?;
        url::Url::parse(&self.site.base_url)?;

        if self.structure.tracked.is_empty() {
            return Err(AppError::validation("structure.tracked is empty"));
        }
        let mut seen = HashSet::new();
        for key in &self.structure.tracked {
            if !seen.insert(key) {
                return Err(AppError::validation(format!(
                    "structure.tracked lists '{key}' twice"
                )));
            }
        }
        if let Some(key) = self
            .structure
            .critical
            .iter()
            .find(|key| !seen.contains(key))
        {
            return Err(AppError::validation(format!(
                "structure.critical key '{key}' is not tracked"
            )));
        }

        if let Some(area) = self
            .relevance
            .areas
            .iter()
            .find(|area| area.keywords.iter().all(|k| k.trim().is_empty()))
        {
            return Err(AppError::validation(format!(
                "relevance area '{}' has no keywords",
                area.id
            )));
        }

        if self.relevance.medium_threshold > self.relevance.high_threshold {
            return Err(AppError::validation(
                "relevance.medium_threshold exceeds relevance.high_threshold",
            ));
        }
        Ok(())
    }
}

/// Source site URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL that relative links resolve against
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// First listing page; later pages are `{listing_url}page/{n}/`
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            listing_url: defaults::listing_url(),
        }
    }
}

/// HTTP client and pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Attempts per URL in total, first try included
    #[serde(default = "defaults::max_attempts", alias = "max_retries")]
    pub max_attempts: u32,

    /// Listing pages to walk per run
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_attempts: defaults::max_attempts(),
            max_pages: defaults::max_pages(),
        }
    }
}

/// On-disk locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "defaults::structure_dir")]
    pub structure_dir: PathBuf,

    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            cache_dir: defaults::cache_dir(),
            structure_dir: defaults::structure_dir(),
            output_dir: defaults::output_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// Validity window of a cache entry
    #[serde(default = "defaults::ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            ttl_hours: defaults::ttl_hours(),
        }
    }
}

/// Tracked element keys and the critical anchors among them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Keys counted on every page, in report order
    #[serde(default = "defaults::tracked")]
    pub tracked: Vec<ElementKey>,

    /// Keys whose disappearance breaks extraction
    #[serde(default = "defaults::critical")]
    pub critical: Vec<ElementKey>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            tracked: defaults::tracked(),
            critical: defaults::critical(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFlags {
    #[serde(default = "defaults::enabled")]
    pub ocr: bool,

    #[serde(default = "defaults::enabled")]
    pub nlp: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            ocr: true,
            nlp: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Below this many characters the text layer is treated as missing
    #[serde(default = "defaults::min_text_chars")]
    pub min_text_chars: usize,

    /// Tesseract language code
    #[serde(default = "defaults::ocr_language")]
    pub language: String,

    /// Rasterisation resolution
    #[serde(default = "defaults::ocr_dpi")]
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            min_text_chars: defaults::min_text_chars(),
            language: defaults::ocr_language(),
            dpi: defaults::ocr_dpi(),
        }
    }
}

/// An area the institution cares about and the words that reveal it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterestArea {
    pub id: String,
    pub keywords: Vec<String>,
}

/// Interest profile used for relevance scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceProfile {
    #[serde(default = "defaults::interest_areas")]
    pub areas: Vec<InterestArea>,

    /// Score at or above which a notice is highly relevant
    #[serde(default = "defaults::high_threshold")]
    pub high_threshold: u32,

    #[serde(default = "defaults::medium_threshold")]
    pub medium_threshold: u32,
}

impl Default for RelevanceProfile {
    fn default() -> Self {
        Self {
            areas: defaults::interest_areas(),
            high_threshold: defaults::high_threshold(),
            medium_threshold: defaults::medium_threshold(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::InterestArea;
    use crate::models::ElementKey;

    // Site defaults
    pub fn base_url() -> String {
        "https://goias.gov.br/fapeg".into()
    }
    pub fn listing_url() -> String {
        "https://goias.gov.br/fapeg/categoria/editais/".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn max_pages() -> u32 {
        3
    }

    // Path defaults
    pub fn cache_dir() -> PathBuf {
        "cache_resultados".into()
    }
    pub fn structure_dir() -> PathBuf {
        "cache_estrutura".into()
    }
    pub fn output_dir() -> PathBuf {
        "output".into()
    }

    pub fn enabled() -> bool {
        true
    }
    pub fn ttl_hours() -> u64 {
        24
    }

    // Structure defaults
    pub fn tracked() -> Vec<ElementKey> {
        vec![
            ElementKey::new("article", "tease"),
            ElementKey::new("h2", "entry-title"),
            ElementKey::new("section", "entry-content"),
            ElementKey::new("div", "meta-date"),
        ]
    }
    pub fn critical() -> Vec<ElementKey> {
        vec![
            ElementKey::new("article", "tease"),
            ElementKey::new("h2", "entry-title"),
        ]
    }

    // OCR defaults
    pub fn min_text_chars() -> usize {
        100
    }
    pub fn ocr_language() -> String {
        "por".into()
    }
    pub fn ocr_dpi() -> u32 {
        300
    }

    // Relevance defaults
    fn area(id: &str, keywords: &[&str]) -> InterestArea {
        InterestArea {
            id: id.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
    pub fn interest_areas() -> Vec<InterestArea> {
        vec![
            area(
                "agronomia",
                &["agricultura", "agronomia", "rural", "agropecuária"],
            ),
            area("saude", &["saúde", "medicina", "enfermagem", "farmácia"]),
            area("tecnologia", &["tecnologia", "inovação", "software", "ti"]),
            area("educacao", &["educação", "ensino", "pedagógico"]),
            area("meio_ambiente", &["ambiente", "sustentabilidade"]),
        ]
    }
    pub fn high_threshold() -> u32 {
        40
    }
    pub fn medium_threshold() -> u32 {
        20
    }
}
