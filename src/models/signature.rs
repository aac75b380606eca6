// src/models/signature.rs

//! Structural fingerprint data: element keys, signatures, stored records and
//! change reports.
//!
//! The on-disk layout of a [`SignatureRecord`] is a stable contract:
//!
//! ```text
//! {
//!   "url": "...",
//!   "timestamp": "2025-10-01T12:00:00Z",
//!   "structure": {
//!     "tag_counts": { "article.tease": 10, "h2.entry-title": 10 },
//!     "classes_principais": ["entry-title", "tease"],
//!     "ids_principais": ["main"]
//!   }
//! }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// A tracked `(tag, class)` pair, written as `tag.class`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ElementKey {
    tag: String,
    class: String,
}

impl ElementKey {
    pub fn new(tag: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            class: class.into(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn class(&self) -> &str {
        &self.class
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.tag, self.class)
    }
}

impl FromStr for ElementKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, class) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| AppError::validation(format!("element key '{s}' is not tag.class")))?;
        if tag.is_empty() || class.is_empty() {
            return Err(AppError::validation(format!(
                "element key '{s}' has an empty tag or class"
            )));
        }
        Ok(Self::new(tag.to_ascii_lowercase(), class))
    }
}

impl TryFrom<String> for ElementKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ElementKey> for String {
    fn from(key: ElementKey) -> Self {
        key.to_string()
    }
}

/// Per-key element counts, kept in the tracked enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagCounts(Vec<(ElementKey, u32)>);

impl TagCounts {
    /// Count for `key`; keys never recorded count as zero.
    pub fn get(&self, key: &ElementKey) -> u32 {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ElementKey, u32)> {
        self.0.iter().map(|(k, count)| (k, *count))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ElementKey> {
        self.0.iter().map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Project onto `tracked`, in that order. Keys missing here become 0 and
    /// keys no longer tracked are dropped.
    pub fn aligned_to(&self, tracked: &[ElementKey]) -> TagCounts {
        tracked
            .iter()
            .map(|key| (key.clone(), self.get(key)))
            .collect()
    }
}

impl FromIterator<(ElementKey, u32)> for TagCounts {
    fn from_iter<I: IntoIterator<Item = (ElementKey, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for TagCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(key, count)| (key.to_string(), count)))
    }
}

impl<'de> Deserialize<'de> for TagCounts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountsVisitor;

        impl<'de> Visitor<'de> for CountsVisitor {
            type Value = TagCounts;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of \"tag.class\" keys to element counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((key, count)) = map.next_entry::<ElementKey, u32>()? {
                    entries.push((key, count));
                }
                Ok(TagCounts(entries))
            }
        }

        deserializer.deserialize_map(CountsVisitor)
    }
}

/// Structural summary of one parsed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSignature {
    tag_counts: TagCounts,

    /// Every distinct class token, sorted
    #[serde(rename = "classes_principais", default)]
    classes: Vec<String>,

    /// Every distinct id attribute, sorted
    #[serde(rename = "ids_principais", default)]
    ids: Vec<String>,
}

impl StructureSignature {
    /// Build a signature; class and id sets are deduplicated and sorted.
    pub fn new(
        tag_counts: TagCounts,
        classes: impl IntoIterator<Item = String>,
        ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let classes: BTreeSet<String> = classes.into_iter().collect();
        let ids: BTreeSet<String> = ids.into_iter().collect();
        Self {
            tag_counts,
            classes: classes.into_iter().collect(),
            ids: ids.into_iter().collect(),
        }
    }

    /// Signature carrying only counts, with empty class and id sets.
    pub fn from_counts(counts: impl IntoIterator<Item = (ElementKey, u32)>) -> Self {
        Self::new(counts.into_iter().collect(), Vec::new(), Vec::new())
    }

    pub fn tag_counts(&self) -> &TagCounts {
        &self.tag_counts
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Same signature with its counts projected onto `tracked`.
    pub fn aligned_to(&self, tracked: &[ElementKey]) -> Self {
        Self {
            tag_counts: self.tag_counts.aligned_to(tracked),
            classes: self.classes.clone(),
            ids: self.ids.clone(),
        }
    }
}

/// The last structurally distinct signature seen for a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub url: String,

    /// When the layout last moved (or was first seen)
    #[serde(rename = "timestamp")]
    pub captured_at: DateTime<Utc>,

    #[serde(rename = "structure")]
    pub signature: StructureSignature,
}

impl SignatureRecord {
    pub fn new(url: impl Into<String>, signature: StructureSignature) -> Self {
        Self {
            url: url.into(),
            captured_at: Utc::now(),
            signature,
        }
    }
}

/// A tracked key whose count differs between two signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementCountChange {
    pub element_key: ElementKey,
    pub previous_count: u32,
    pub current_count: u32,
}

impl ElementCountChange {
    /// The element was present before and is gone now.
    pub fn vanished(&self) -> bool {
        self.current_count == 0
    }
}

impl fmt::Display for ElementCountChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.element_key, self.previous_count, self.current_count
        )
    }
}

/// Outcome of comparing a page against its stored signature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeReport {
    pub first_seen: bool,
    pub changes: Vec<ElementCountChange>,
    pub critical: bool,
}

impl ChangeReport {
    /// Report for a URL without any stored signature.
    pub fn first_visit() -> Self {
        Self {
            first_seen: true,
            changes: Vec::new(),
            critical: false,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> ElementKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_element_key_parse_and_display() {
        let k = key("article.tease");
        assert_eq!(k.tag(), "article");
        assert_eq!(k.class(), "tease");
        assert_eq!(k.to_string(), "article.tease");

        // Only the first dot separates tag from class
        let dotted = key("div.meta.date");
        assert_eq!(dotted.class(), "meta.date");
    }

    #[test]
    fn test_element_key_rejects_malformed() {
        assert!("article".parse::<ElementKey>().is_err());
        assert!(".tease".parse::<ElementKey>().is_err());
        assert!("article.".parse::<ElementKey>().is_err());
    }

    #[test]
    fn test_tag_counts_serialize_in_tracked_order() {
        let counts: TagCounts = vec![(key("h2.entry-title"), 3), (key("article.tease"), 5)]
            .into_iter()
            .collect();

        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"h2.entry-title":3,"article.tease":5}"#);

        let back: TagCounts = serde_json::from_str(&json).unwrap();
        assert_eq!(back, counts);
    }

    #[test]
    fn test_aligned_to_fills_missing_keys_with_zero() {
        let stored: TagCounts = vec![(key("article.tease"), 10)].into_iter().collect();
        let tracked = vec![key("article.tease"), key("div.meta-date")];

        let aligned = stored.aligned_to(&tracked);
        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned.get(&key("article.tease")), 10);
        assert_eq!(aligned.get(&key("div.meta-date")), 0);
    }

    #[test]
    fn test_signature_sets_are_sorted_and_unique() {
        let sig = StructureSignature::new(
            TagCounts::default(),
            vec!["tease".into(), "entry-title".into(), "tease".into()],
            vec!["main".into(), "footer".into()],
        );
        assert_eq!(sig.classes(), ["entry-title", "tease"]);
        assert_eq!(sig.ids(), ["footer", "main"]);
    }

    #[test]
    fn test_record_uses_stable_field_names() {
        let record = SignatureRecord::new(
            "https://example.com",
            StructureSignature::new(
                vec![(key("article.tease"), 2)].into_iter().collect(),
                vec!["tease".into()],
                vec!["main".into()],
            ),
        );
        let value = serde_json::to_value(&record).unwrap();

        assert!(value.get("timestamp").is_some());
        let structure = &value["structure"];
        assert_eq!(structure["tag_counts"]["article.tease"], 2);
        assert_eq!(structure["classes_principais"][0], "tease");
        assert_eq!(structure["ids_principais"][0], "main");
    }

    #[test]
    fn test_first_visit_report() {
        let report = ChangeReport::first_visit();
        assert!(report.first_seen);
        assert!(!report.critical);
        assert!(!report.has_changes());
    }
}
