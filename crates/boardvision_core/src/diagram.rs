//! crates/boardvision_core/src/diagram.rs
//!
//! Cleans up Mermaid source returned by the model so a renderer accepts it.

use once_cell::sync::Lazy;
use regex::Regex;

static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^```(?:mermaid)?\s*").expect("valid fence regex"));
static CLOSING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*```$").expect("valid fence regex"));

const DIAGRAM_KEYWORDS: [&str; 8] = [
    "flowchart",
    "graph",
    "sequence",
    "class",
    "state",
    "erdiagram",
    "gantt",
    "pie",
];

/// Strips code fences and makes sure the source starts with a diagram keyword,
/// defaulting to a top-down flowchart.
pub fn normalize_diagram(source: &str) -> String {
    let trimmed = source.trim();
    let without_open = OPENING_FENCE.replace(trimmed, "");
    let cleaned = CLOSING_FENCE.replace(&without_open, "");
    let cleaned = cleaned.trim();

    let lowered = cleaned.to_lowercase();
    if DIAGRAM_KEYWORDS.iter().any(|k| lowered.starts_with(k)) {
        cleaned.to_string()
    } else {
        format!("flowchart TD\n{}", cleaned)
    }
}
