//! Diff between two collections.
//!
//! Identifies new, updated, and removed editais between the previous run's
//! output and the current one, keyed by notice URL.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::models::Edital;

/// URLs that changed between two collections.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Diff {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

/// Diff plus the full records for added and updated editais.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    pub diff: Diff,
    pub added_editais: Vec<Edital>,
    pub updated_editais: Vec<Edital>,
}

impl DiffResult {
    pub fn has_changes(&self) -> bool {
        !self.diff.added.is_empty()
            || !self.diff.updated.is_empty()
            || !self.diff.removed.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.diff.added.len() + self.diff.updated.len() + self.diff.removed.len()
    }
}

/// Diff `previous` against `current`.
///
/// Added and updated entries follow the order of `current`, removed entries
/// the order of `previous`. An edital present in both is updated when its
/// update date or title moved.
pub fn calculate_diff(previous: &[Edital], current: &[Edital]) -> DiffResult {
    let prev_map: HashMap<&str, &Edital> = previous.iter().map(|e| (e.url.as_str(), e)).collect();
    let curr_urls: HashSet<&str> = current.iter().map(|e| e.url.as_str()).collect();

    let mut result = DiffResult::default();
    let mut seen = HashSet::new();
    for edital in current {
        if !seen.insert(edital.url.as_str()) {
            continue;
        }
        match prev_map.get(edital.url.as_str()) {
            None => {
                result.diff.added.push(edital.url.clone());
                result.added_editais.push(edital.clone());
            }
            Some(prev) if is_updated(prev, edital) => {
                result.diff.updated.push(edital.url.clone());
                result.updated_editais.push(edital.clone());
            }
            Some(_) => {}
        }
    }

    let mut removed_seen = HashSet::new();
    result.diff.removed = previous
        .iter()
        .map(|e| e.url.as_str())
        .filter(|url| !curr_urls.contains(url) && removed_seen.insert(*url))
        .map(str::to_string)
        .collect();

    result
}

fn is_updated(prev: &Edital, curr: &Edital) -> bool {
    prev.updated != curr.updated || prev.title != curr.title
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_edital(id: &str, title: &str, updated: Option<&str>) -> Edital {
        Edital {
            title: title.to_string(),
            url: format!("https://example.com/{}", id),
            published: Some("01/09/2025".into()),
            updated: updated.map(str::to_string),
            number: None,
            entity: "FAPEG".into(),
            focus_areas: vec!["Geral".into()],
            support_type: "Apoio Geral".into(),
            details: None,
            pdf: None,
            relevance: None,
            requirements: Vec::new(),
        }
    }

    fn url(id: &str) -> String {
        format!("https://example.com/{}", id)
    }

    #[test]
    fn test_no_changes() {
        let prev = vec![
            make_edital("001", "Edital 1", None),
            make_edital("002", "Edital 2", None),
        ];
        let curr = prev.clone();

        let result = calculate_diff(&prev, &curr);
        assert!(!result.has_changes());
        assert_eq!(result.change_count(), 0);
    }

    #[test]
    fn test_additions_keep_current_order() {
        let prev = vec![make_edital("001", "Edital 1", None)];
        let curr = vec![
            make_edital("003", "Edital 3", None),
            make_edital("001", "Edital 1", None),
            make_edital("002", "Edital 2", None),
        ];

        let result = calculate_diff(&prev, &curr);
        assert_eq!(result.diff.added, vec![url("003"), url("002")]);
        assert_eq!(result.added_editais.len(), 2);
        assert_eq!(result.added_editais[0].title, "Edital 3");
    }

    #[test]
    fn test_removals() {
        let prev = vec![
            make_edital("001", "Edital 1", None),
            make_edital("002", "Edital 2", None),
        ];
        let curr = vec![make_edital("001", "Edital 1", None)];

        let result = calculate_diff(&prev, &curr);
        assert_eq!(result.diff.removed, vec![url("002")]);
    }

    #[test]
    fn test_update_date_change_is_an_update() {
        let prev = vec![make_edital("001", "Edital 1", None)];
        let curr = vec![make_edital("001", "Edital 1", Some("12/09/2025"))];

        let result = calculate_diff(&prev, &curr);
        assert_eq!(result.diff.updated, vec![url("001")]);
        assert_eq!(
            result.updated_editais[0].updated.as_deref(),
            Some("12/09/2025")
        );
    }

    #[test]
    fn test_mixed_changes() {
        let prev = vec![
            make_edital("001", "Keep", None),
            make_edital("002", "Update Me", None),
            make_edital("003", "Remove Me", None),
        ];
        let curr = vec![
            make_edital("001", "Keep", None),
            make_edital("002", "Updated", None),
            make_edital("004", "New", None),
        ];

        let result = calculate_diff(&prev, &curr);
        assert!(result.has_changes());
        assert_eq!(result.change_count(), 3);
        assert_eq!(result.diff.added, vec![url("004")]);
        assert_eq!(result.diff.updated, vec![url("002")]);
        assert_eq!(result.diff.removed, vec![url("003")]);
    }

    #[test]
    fn test_duplicate_urls_reported_once() {
        let curr = vec![
            make_edital("001", "Edital 1", None),
            make_edital("001", "Edital 1", None),
        ];
        let result = calculate_diff(&[], &curr);
        assert_eq!(result.diff.added, vec![url("001")]);
    }
}
