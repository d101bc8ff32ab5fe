//! Document-order search over a parsed page.
//!
//! [`DocumentIndex`] flattens the element tree into pre-order so "the next
//! element after X matching P" becomes a scan over a position range. This is
//! the same traversal as a "find next" call in a DOM library, with explicit
//! bounds.

use scraper::{ElementRef, Html};
use std::ops::Range;

use super::layout::ElementMatch;

/// Elements of one document in pre-order.
pub struct DocumentIndex<'a> {
    elements: Vec<ElementRef<'a>>,
}

impl<'a> DocumentIndex<'a> {
    pub fn new(document: &'a Html) -> Self {
        let elements = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, pos: usize) -> ElementRef<'a> {
        self.elements[pos]
    }

    /// Position one past the last descendant of the element at `pos`.
    pub fn end_of(&self, pos: usize) -> usize {
        let id = self.elements[pos].id();
        let mut end = pos + 1;
        while end < self.elements.len()
            && self.elements[end].ancestors().any(|a| a.id() == id)
        {
            end += 1;
        }
        end
    }

    /// First position in `range` whose element satisfies `predicate`.
    pub fn find_in(&self, range: Range<usize>, predicate: &ElementMatch) -> Option<usize> {
        let end = range.end.min(self.elements.len());
        (range.start..end).find(|&pos| predicate.matches(&self.elements[pos]))
    }

    /// Positions of every outermost element satisfying `predicate`.
    ///
    /// A match nested inside an earlier match is skipped, so `<h2><b>X</b></h2>`
    /// counts once even when both tags are in the predicate.
    pub fn positions(&self, predicate: &ElementMatch) -> Vec<usize> {
        let mut found = Vec::new();
        let mut pos = 0;
        while let Some(hit) = self.find_in(pos..self.elements.len(), predicate) {
            found.push(hit);
            pos = self.end_of(hit);
        }
        found
    }
}

/// Rows of one table, each a list of normalised cell texts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableView {
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    /// Read the rows that belong to `table` itself (rows of nested tables are skipped).
    pub fn read(table: ElementRef<'_>) -> Self {
        let table_id = table.id();
        let rows = table
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "tr")
            .filter(|row| {
                row.ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|a| a.value().name() == "table")
                    .map(|owner| owner.id() == table_id)
                    .unwrap_or(false)
            })
            .map(|row| {
                row.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|cell| matches!(cell.value().name(), "td" | "th"))
                    .map(|cell| element_text(&cell))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// First row whose first cell satisfies `label`.
    pub fn row_labelled(&self, label: &super::layout::TextMatch) -> Option<&[String]> {
        self.rows
            .iter()
            .find(|row| row.first().map(|c| label.matches(c)).unwrap_or(false))
            .map(Vec::as_slice)
    }
}

/// Concatenated, whitespace-normalised text of an element.
pub fn element_text(element: &ElementRef<'_>) -> String {
    normalize_text(&element.text().collect::<String>())
}

/// Drop bidi/zero-width marks and collapse runs of whitespace.
pub fn normalize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !is_invisible_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_invisible_mark(c: char) -> bool {
    matches!(
        c,
        '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{200e}' | '\u{200f}' | '\u{feff}'
            | '\u{202a}'..='\u{202e}'
            | '\u{2066}'..='\u{2069}'
    )
}
