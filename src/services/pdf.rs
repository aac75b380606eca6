// src/services/pdf.rs

//! PDF text extraction.
//!
//! The text layer comes from poppler's `pdftotext`. Scanned documents with
//! too little text fall back to OCR: pages are rasterised with `pdftoppm`
//! and read with `tesseract`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::ParseError;
use crate::models::{ExtractionMethod, OcrConfig};

type ParseResult<T> = std::result::Result<T, ParseError>;

const FORM_FEED: char = '\u{000C}';

/// Text pulled out of a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfText {
    pub text: String,
    pub method: ExtractionMethod,
    pub pages: usize,
}

#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    async fn extract_text(&self, bytes: &[u8]) -> ParseResult<PdfText>;
}

/// Extractor driving the poppler and tesseract command line tools.
#[derive(Debug, Clone)]
pub struct PopplerExtractor {
    ocr_enabled: bool,
    min_text_chars: usize,
    language: String,
    dpi: u32,
}

impl PopplerExtractor {
    pub fn new(config: &OcrConfig, ocr_enabled: bool) -> Self {
        Self {
            ocr_enabled,
            min_text_chars: config.min_text_chars,
            language: config.language.clone(),
            dpi: config.dpi,
        }
    }

    async fn text_layer(&self, pdf: &Path) -> ParseResult<String> {
        let out = run_tool(
            "pdftotext",
            &[OsStr::new("-layout"), pdf.as_os_str(), OsStr::new("-")],
        )
        .await?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    async fn ocr(&self, pdf: &Path, scratch: &Path) -> ParseResult<PdfText> {
        let dpi = self.dpi.to_string();
        let prefix = scratch.join("page");
        run_tool(
            "pdftoppm",
            &[
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-gray"),
                OsStr::new("-png"),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
        )
        .await?;

        let images = rendered_pages(scratch).await?;
        let mut text = String::new();
        for (i, image) in images.iter().enumerate() {
            log::debug!("OCR page {}/{}", i + 1, images.len());
            let out = run_tool(
                "tesseract",
                &[
                    image.as_os_str(),
                    OsStr::new("stdout"),
                    OsStr::new("-l"),
                    OsStr::new(&self.language),
                    OsStr::new("--psm"),
                    OsStr::new("6"),
                ],
            )
            .await?;
            text.push_str(&String::from_utf8_lossy(&out));
            text.push_str("\n\n");
        }

        Ok(PdfText {
            text,
            method: ExtractionMethod::Ocr,
            pages: images.len(),
        })
    }
}

#[async_trait]
impl PdfTextExtractor for PopplerExtractor {
    async fn extract_text(&self, bytes: &[u8]) -> ParseResult<PdfText> {
        if bytes.is_empty() {
            return Err(ParseError::Empty);
        }

        let scratch = tempfile::TempDir::new()?;
        let pdf = scratch.path().join("document.pdf");
        tokio::fs::write(&pdf, bytes).await?;

        let layer = self.text_layer(&pdf).await.map(|raw| {
            let pages = count_pages(&raw);
            PdfText {
                text: raw.replace(FORM_FEED, "\n"),
                method: ExtractionMethod::Text,
                pages,
            }
        });

        let layer_text = layer.as_ref().map_or("", |t| t.text.as_str());
        if !needs_ocr(layer_text, self.min_text_chars, self.ocr_enabled) {
            return non_empty(layer?);
        }

        log::info!("Text layer too short, running OCR");
        match self.ocr(&pdf, scratch.path()).await {
            Ok(ocr) if !ocr.text.trim().is_empty() => Ok(ocr),
            Ok(_) => non_empty(layer?),
            Err(e) => {
                log::warn!("OCR failed: {}", e);
                non_empty(layer?)
            }
        }
    }
}

/// Whether the text layer is too thin to trust.
pub fn needs_ocr(text: &str, min_text_chars: usize, ocr_enabled: bool) -> bool {
    ocr_enabled && text.trim().chars().count() < min_text_chars
}

/// Pages in `pdftotext` output, which ends every page with a form feed.
pub fn count_pages(text: &str) -> usize {
    let feeds = text.matches(FORM_FEED).count();
    let trailing = text
        .rsplit(FORM_FEED)
        .next()
        .is_some_and(|rest| !rest.trim().is_empty());
    feeds + usize::from(trailing)
}

fn non_empty(text: PdfText) -> ParseResult<PdfText> {
    if text.text.trim().is_empty() {
        Err(ParseError::Empty)
    } else {
        Ok(text)
    }
}

async fn rendered_pages(dir: &Path) -> ParseResult<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut pages = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "png") {
            pages.push(path);
        }
    }
    // pdftoppm zero-pads page numbers, so name order is page order
    pages.sort();
    Ok(pages)
}

async fn run_tool(tool: &str, args: &[&OsStr]) -> ParseResult<Vec<u8>> {
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|e| ParseError::tool(tool, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ParseError::tool(
            tool,
            format!("{} ({})", stderr.trim(), output.status),
        ));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_pages() {
        assert_eq!(count_pages(""), 0);
        assert_eq!(count_pages("one page without feed"), 1);
        assert_eq!(count_pages("page 1\u{c}page 2\u{c}"), 2);
        assert_eq!(count_pages("page 1\u{c}page 2\u{c}  \n"), 2);
        assert_eq!(count_pages("page 1\u{c}page 2"), 2);
    }

    #[test]
    fn test_needs_ocr() {
        assert!(needs_ocr("   short  ", 100, true));
        assert!(!needs_ocr("   short  ", 100, false));
        assert!(!needs_ocr(&"x".repeat(100), 100, true));
        assert!(needs_ocr(&"x".repeat(99), 100, true));
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let extractor = PopplerExtractor::new(&OcrConfig::default(), true);
        assert!(matches!(
            extractor.extract_text(b"").await,
            Err(ParseError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_missing_tool_is_a_tool_error() {
        let result = run_tool("editais-no-such-tool", &[OsStr::new("--version")]).await;
        match result {
            Err(ParseError::Tool { tool, .. }) => assert_eq!(tool, "editais-no-such-tool"),
            other => panic!("expected tool error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rendered_pages_sorted() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["page-02.png", "page-01.png", "document.pdf", "page-10.png"] {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        let pages = rendered_pages(dir.path()).await.unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["page-01.png", "page-02.png", "page-10.png"]);
    }
}
