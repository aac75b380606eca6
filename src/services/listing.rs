// src/services/listing.rs

//! Listing and notice page extraction.
//!
//! Works on the same parsed [`Html`] that was fingerprinted, so a page is
//! parsed exactly once per visit.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Edital, EditalDetails, Link, SiteConfig};
use crate::utils::{normalize_whitespace, resolve_url};

const PUBLISHED_MARKER: &str = "Publicado em";
const UPDATED_MARKER: &str = "Última Atualização";
const UPDATED_PREFIX: &str = "Última Atualização em";

const FALLBACK_ENTITY: &str = "FAPEG";
const ENTITIES: [&str; 4] = ["FAPEG", "FINEP", "SEBRAE", "SECTI"];

const FOCUS_AREAS: [(&str, &[&str]); 5] = [
    ("Inovação", &["inovação", "empreendimentos"]),
    ("Pesquisa", &["pesquisa", "científico"]),
    ("Infraestrutura", &["laboratório", "equipamento"]),
    ("Mobilidade", &["mobilidade", "internacional"]),
    ("Energia", &["energia", "energética"]),
];

const RESULT_WORDS: [&str; 2] = ["resultado", "retificação"];
const ATTACHMENT_WORDS: [&str; 2] = ["anexo", "formulário"];

/// Extracts editais from listing pages and links from notice pages.
#[derive(Debug)]
pub struct ListingParser {
    base_url: Url,
    listing_url: String,
    article: Selector,
    headline_link: Selector,
    meta_date: Selector,
    date_span: Selector,
    date_link: Selector,
    content: Selector,
    anchor: Selector,
    number_pattern: Regex,
}

impl ListingParser {
    pub fn new(site: &SiteConfig) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(&site.base_url)?,
            listing_url: site.listing_url.clone(),
            article: Self::parse_selector("article.tease")?,
            headline_link: Self::parse_selector("h2.entry-title a")?,
            meta_date: Self::parse_selector("div.meta-date")?,
            date_span: Self::parse_selector("span.date")?,
            date_link: Self::parse_selector("a.meta-date-link")?,
            content: Self::parse_selector("section.entry-content")?,
            anchor: Self::parse_selector("a")?,
            number_pattern: Regex::new(r"(?i)n[oº°]\s*(\d+/\d+)")?,
        })
    }

    /// URL of listing page `page` (1-based).
    pub fn page_url(&self, page: u32) -> String {
        if page <= 1 {
            return self.listing_url.clone();
        }
        let sep = if self.listing_url.ends_with('/') { "" } else { "/" };
        format!("{}{}page/{}/", self.listing_url, sep, page)
    }

    /// Every edital announced on a listing page, in page order.
    pub fn parse_listing(&self, document: &Html) -> Vec<Edital> {
        document
            .select(&self.article)
            .filter_map(|article| self.parse_article(article))
            .collect()
    }

    fn parse_article(&self, article: ElementRef<'_>) -> Option<Edital> {
        let link = article.select(&self.headline_link).next()?;
        let title = normalize_whitespace(&link.text().collect::<String>());
        let href = link.value().attr("href")?;
        if title.is_empty() {
            return None;
        }

        let mut published = None;
        let mut updated = None;
        for meta in article.select(&self.meta_date) {
            let text: String = meta.text().collect();
            if text.contains(PUBLISHED_MARKER) {
                published = meta
                    .select(&self.date_span)
                    .next()
                    .map(text_of)
                    .filter(|s| !s.is_empty());
            } else if text.contains(UPDATED_MARKER) {
                updated = meta
                    .select(&self.date_link)
                    .next()
                    .map(|a| text_of(a).replace(UPDATED_PREFIX, "").trim().to_string())
                    .filter(|s| !s.is_empty());
            }
        }

        Some(Edital {
            number: self.notice_number(&title),
            entity: identify_entity(&title),
            focus_areas: identify_focus_areas(&title),
            support_type: identify_support_type(&title).to_string(),
            url: resolve_url(&self.base_url, href),
            title,
            published,
            updated,
            details: None,
            pdf: None,
            relevance: None,
            requirements: Vec::new(),
        })
    }

    /// Links and text of a notice page.
    ///
    /// Relative links resolve against `page_url`. Pages without an
    /// `entry-content` section yield empty details.
    pub fn parse_details(&self, document: &Html, page_url: &str) -> EditalDetails {
        let mut details = EditalDetails {
            url: page_url.to_string(),
            ..EditalDetails::default()
        };

        let Some(content) = document.select(&self.content).next() else {
            log::debug!("No entry-content section on {}", page_url);
            return details;
        };

        let base = Url::parse(page_url).unwrap_or_else(|_| self.base_url.clone());
        for anchor in content.select(&self.anchor) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let text = text_of(anchor);
            let lower = text.to_lowercase();
            let link = Link {
                url: resolve_url(&base, href),
                text,
            };

            if href.to_lowercase().ends_with(".pdf") {
                details.pdf_links.push(link);
            } else if RESULT_WORDS.iter().any(|w| lower.contains(w)) {
                details.result_links.push(link);
            } else if ATTACHMENT_WORDS.iter().any(|w| lower.contains(w)) {
                details.attachment_links.push(link);
            }
        }

        details.content_text = content
            .text()
            .map(normalize_whitespace)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        details
    }

    /// Notice number from a title, e.g. `28/2025` from "Chamada nº 28/2025".
    pub fn notice_number(&self, title: &str) -> Option<String> {
        self.number_pattern
            .captures(title)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

fn text_of(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Issuing entities named in a title, joined by `/`.
pub fn identify_entity(title: &str) -> String {
    let upper = title.to_uppercase();
    let found: Vec<&str> = ENTITIES
        .iter()
        .copied()
        .filter(|e| upper.contains(e))
        .collect();
    if found.is_empty() {
        FALLBACK_ENTITY.to_string()
    } else {
        found.join("/")
    }
}

pub fn identify_focus_areas(title: &str) -> Vec<String> {
    let lower = title.to_lowercase();
    let areas: Vec<String> = FOCUS_AREAS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(area, _)| area.to_string())
        .collect();
    if areas.is_empty() {
        vec!["Geral".to_string()]
    } else {
        areas
    }
}

pub fn identify_support_type(title: &str) -> &'static str {
    let lower = title.to_lowercase();
    if lower.contains("bolsa") {
        "Bolsa"
    } else if lower.contains("fomento") || lower.contains("auxílio") {
        "Financiamento"
    } else if lower.contains("infraestrutura") {
        "Infraestrutura"
    } else {
        "Apoio Geral"
    }
}
