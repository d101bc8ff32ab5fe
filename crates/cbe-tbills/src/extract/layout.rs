//! The page layout as data.
//!
//! Every label and keyword the extractor depends on lives in [`PageLayout`].
//! When the CBE page drifts, the fix is a new layout value (or a JSON file
//! passed through `CBE_TBILLS_LAYOUT_FILE`), not a code change.

use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::dom::element_text;

/// How a piece of normalised text is compared against a fixed label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatch {
    Equals(String),
    Contains(String),
}

impl TextMatch {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            TextMatch::Equals(label) => text == label,
            TextMatch::Contains(needle) => text.contains(needle.as_str()),
        }
    }

    pub fn needle(&self) -> &str {
        match self {
            TextMatch::Equals(s) | TextMatch::Contains(s) => s,
        }
    }
}

/// Predicate over elements: tag name in `tags` (empty = any) and, optionally,
/// normalised text matching `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementMatch {
    pub tags: Vec<String>,
    #[serde(default)]
    pub text: Option<TextMatch>,
}

impl ElementMatch {
    pub fn tag(name: &str) -> Self {
        Self {
            tags: vec![name.to_string()],
            text: None,
        }
    }

    pub fn tags_containing(tags: &[&str], needle: &str) -> Self {
        Self {
            tags: tags.iter().map(|t| t.to_string()).collect(),
            text: Some(TextMatch::Contains(needle.to_string())),
        }
    }

    pub fn matches(&self, element: &ElementRef<'_>) -> bool {
        let name = element.value().name();
        if !self.tags.is_empty() && !self.tags.iter().any(|t| t.eq_ignore_ascii_case(name)) {
            return false;
        }
        match &self.text {
            Some(text) => text.matches(&element_text(element)),
            None => true,
        }
    }
}

/// Anchors for one auction-results page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLayout {
    /// Heading that opens each auction session block ("Results").
    pub results_heading: ElementMatch,
    /// Row in the results table holding one session date per tenor.
    pub session_date_row: TextMatch,
    /// Sub-heading above the accepted-bids table.
    pub accepted_bids_heading: ElementMatch,
    /// Row in the accepted-bids table holding the weighted-average yield.
    pub yield_row: TextMatch,
}

impl PageLayout {
    /// Layout of the CBE Arabic EGP T-bills page.
    pub fn cbe() -> Self {
        Self {
            results_heading: ElementMatch::tags_containing(&["h1", "h2", "h3", "h4"], "النتائج"),
            session_date_row: TextMatch::Equals("تاريخ الجلسة".to_string()),
            accepted_bids_heading: ElementMatch::tags_containing(
                &["p", "strong", "b", "span", "h3", "h4", "h5"],
                "العروض المقبولة",
            ),
            yield_row: TextMatch::Contains("متوسط العائد المرجح".to_string()),
        }
    }

    /// Load a layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, LayoutError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LayoutError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| LayoutError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        Self::cbe()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("failed to read layout file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid layout file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn test_text_match() {
        let eq = TextMatch::Equals("تاريخ الجلسة".into());
        assert!(eq.matches("تاريخ الجلسة"));
        assert!(!eq.matches("تاريخ الجلسة القادمة"));

        let contains = TextMatch::Contains("متوسط العائد المرجح".into());
        assert!(contains.matches("متوسط العائد المرجح (%)"));
        assert!(!contains.matches("أقل عائد"));
    }

    #[test]
    fn test_element_match_tag_and_text() {
        let doc = Html::parse_fragment("<div><h2> النتائج </h2><h3>النتائج</h3><p>النتائج</p></div>");
        let sel = Selector::parse("h2, h3, p").unwrap();
        let m = ElementMatch::tags_containing(&["h2", "h3"], "النتائج");
        let hits: Vec<&str> = doc
            .select(&sel)
            .filter(|e| m.matches(e))
            .map(|e| e.value().name())
            .collect();
        assert_eq!(hits, vec!["h2", "h3"]);
    }

    #[test]
    fn test_layout_json_roundtrip_via_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        let mut layout = PageLayout::cbe();
        layout.yield_row = TextMatch::Contains("Weighted average".into());
        std::fs::write(&path, serde_json::to_string_pretty(&layout).unwrap()).unwrap();

        let loaded = PageLayout::from_json_file(&path).unwrap();
        assert_eq!(loaded, layout);
    }

    #[test]
    fn test_layout_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            PageLayout::from_json_file(&missing),
            Err(LayoutError::Read { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(matches!(
            PageLayout::from_json_file(&bad),
            Err(LayoutError::Parse { .. })
        ));
    }
}
