// src/services/fingerprint.rs

//! Structure fingerprinting.
//!
//! Reduces a parsed page to a [`StructureSignature`]: exact counts for the
//! tracked `(tag, class)` keys plus the sorted sets of every class token and
//! id attribute on the page. The result depends only on document content.

use std::collections::BTreeSet;

use scraper::{ElementRef, Html};

use crate::models::{ElementKey, StructureSignature};

/// The document capabilities fingerprinting needs, and nothing more.
pub trait MarkupDocument {
    type Element<'a>: Copy
    where
        Self: 'a;

    /// Elements named `tag` carrying `class` among their class tokens.
    fn find_all<'a>(&'a self, tag: &str, class: Option<&str>) -> Vec<Self::Element<'a>>;

    /// Every element in document order.
    fn all_elements<'a>(&'a self) -> Vec<Self::Element<'a>>;

    fn classes_of<'a>(&'a self, element: Self::Element<'a>) -> Vec<&'a str>;

    fn id_of<'a>(&'a self, element: Self::Element<'a>) -> Option<&'a str>;
}

impl MarkupDocument for Html {
    type Element<'a> = ElementRef<'a>;

    fn find_all<'a>(&'a self, tag: &str, class: Option<&str>) -> Vec<ElementRef<'a>> {
        self.all_elements()
            .into_iter()
            .filter(|el| {
                let value = el.value();
                value.name().eq_ignore_ascii_case(tag)
                    && class.is_none_or(|c| value.classes().any(|token| token == c))
            })
            .collect()
    }

    fn all_elements<'a>(&'a self) -> Vec<ElementRef<'a>> {
        self.root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect()
    }

    fn classes_of<'a>(&'a self, element: ElementRef<'a>) -> Vec<&'a str> {
        element.value().classes().collect()
    }

    fn id_of<'a>(&'a self, element: ElementRef<'a>) -> Option<&'a str> {
        element.value().id()
    }
}

/// Computes structure signatures for a fixed list of tracked keys.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    tracked: Vec<ElementKey>,
}

impl Fingerprinter {
    pub fn new(tracked: Vec<ElementKey>) -> Self {
        Self { tracked }
    }

    pub fn tracked(&self) -> &[ElementKey] {
        &self.tracked
    }

    /// Fingerprint `document`. Never fails: an empty or unparseable page
    /// yields zero counts and empty sets.
    pub fn fingerprint<D: MarkupDocument>(&self, document: &D) -> StructureSignature {
        let counts = self
            .tracked
            .iter()
            .map(|key| {
                let count = document.find_all(key.tag(), Some(key.class())).len();
                (key.clone(), u32::try_from(count).unwrap_or(u32::MAX))
            })
            .collect();

        let mut classes = BTreeSet::new();
        let mut ids = BTreeSet::new();
        for element in document.all_elements() {
            classes.extend(document.classes_of(element).into_iter().map(str::to_string));
            if let Some(id) = document.id_of(element).filter(|id| !id.is_empty()) {
                ids.insert(id.to_string());
            }
        }

        StructureSignature::new(counts, classes, ids)
    }

    /// Parse raw bytes leniently and fingerprint the result.
    pub fn fingerprint_bytes(&self, bytes: &[u8]) -> (Html, StructureSignature) {
        let document = Html::parse_document(&String::from_utf8_lossy(bytes));
        let signature = self.fingerprint(&document);
        (document, signature)
    }
}
