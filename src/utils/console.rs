// src/utils/console.rs

//! Operator-facing output: headers, steps, summaries and drift alerts.
//!
//! Everything goes through the `log` facade so the binary's logger decides
//! where it lands.

use crate::models::ChangeReport;

const RULE_WIDTH: usize = 60;

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(RULE_WIDTH);
    log::info!("{border}");
    log::info!("  {title}");
    log::info!("{border}");
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    log::info!("[STEP {step_num}/{total}] {message}");
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    log::info!("    {message}");
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {title}");
    for (key, value) in items {
        log::info!("    {key}: {value}");
    }
}

/// Render the drift warning shown when a critical anchor vanished.
pub fn format_structure_alert(url: &str, report: &ChangeReport) -> Vec<String> {
    let border = "!".repeat(RULE_WIDTH);
    let mut lines = vec![
        border.clone(),
        "CRITICAL: page structure changed, extraction may be broken".to_string(),
        format!("URL: {url}"),
    ];
    lines.extend(report.changes.iter().map(|change| {
        let marker = if change.vanished() { " (vanished)" } else { "" };
        format!("  {change}{marker}")
    }));
    lines.push("The scraper selectors probably need updating.".to_string());
    lines.push(border);
    lines
}

/// Log the drift warning for a critical report.
pub fn structure_alert(url: &str, report: &ChangeReport) {
    for line in format_structure_alert(url, report) {
        log::warn!("{line}");
    }
}
