//! Reduce the rendered auction page to [`AuctionQuote`] rows.
//!
//! The page can publish several auction sessions, each opened by a results
//! heading. For every section:
//!
//! 1. the first table after the heading gives tenors (numeric header cells)
//!    and, in its session-date row, one published date per tenor;
//! 2. the first accepted-bids sub-heading after that table leads to a second
//!    table whose weighted-average row gives one yield per tenor.
//!
//! A section is emitted only when tenors, dates and yields have the same
//! non-zero length. Sections are processed top to bottom and concatenated, so
//! a tenor repeated by a later section ends up last; the store's keyed upsert
//! then keeps the later value.
//!
//! Failure policy: an extraction that accepts no section is an
//! [`ExtractionError`], never an empty `Ok`.

pub mod dom;
pub mod layout;
pub mod numeric;

use chrono::NaiveDate;
use scraper::Html;
use std::fmt;
use std::ops::Range;
use tracing::{debug, warn};

use crate::error::{ExtractionError, SectionRejection};
use crate::types::{AuctionQuote, UNKNOWN_SESSION_DATE};
use dom::{DocumentIndex, TableView};
pub use layout::{ElementMatch, LayoutError, PageLayout, TextMatch};

/// Why one results section was not emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionDefect {
    MissingResultsTable,
    NoTenors,
    MissingAcceptedBids,
    MissingAcceptedBidsTable,
    MissingYieldRow,
    CountMismatch {
        tenors: usize,
        session_dates: usize,
        yields: usize,
    },
}

impl fmt::Display for SectionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionDefect::MissingResultsTable => write!(f, "no table after the results heading"),
            SectionDefect::NoTenors => write!(f, "results table header has no numeric tenors"),
            SectionDefect::MissingAcceptedBids => write!(f, "no accepted-bids heading in section"),
            SectionDefect::MissingAcceptedBidsTable => {
                write!(f, "no table after the accepted-bids heading")
            }
            SectionDefect::MissingYieldRow => {
                write!(f, "accepted-bids table has no weighted-average yield row")
            }
            SectionDefect::CountMismatch {
                tenors,
                session_dates,
                yields,
            } => write!(
                f,
                "count mismatch: {tenors} tenors, {session_dates} session dates, {yields} yields"
            ),
        }
    }
}

/// One accepted auction session, columns aligned by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub tenors: Vec<u32>,
    pub session_dates: Vec<String>,
    pub yields: Vec<f64>,
}

impl Section {
    fn into_quotes(self, fetch_date: NaiveDate) -> impl Iterator<Item = AuctionQuote> {
        self.tenors
            .into_iter()
            .zip(self.yields)
            .zip(self.session_dates)
            .map(move |((tenor, yield_percent), session_date)| {
                AuctionQuote::new(tenor, yield_percent, session_date, fetch_date)
            })
    }
}

/// Stateless extractor parameterised by a [`PageLayout`].
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    layout: PageLayout,
}

impl Extractor {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    /// Extract every valid section, stamping rows with `fetch_date`.
    pub fn extract(
        &self,
        html: &str,
        fetch_date: NaiveDate,
    ) -> Result<Vec<AuctionQuote>, ExtractionError> {
        let document = Html::parse_document(html);
        let index = DocumentIndex::new(&document);

        let headings = index.positions(&self.layout.results_heading);
        if headings.is_empty() {
            return Err(ExtractionError::NoResultsSection {
                heading: self
                    .layout
                    .results_heading
                    .text
                    .as_ref()
                    .map(|t| t.needle().to_string())
                    .unwrap_or_default(),
            });
        }
        debug!(sections = headings.len(), "found results headings");

        let mut quotes = Vec::new();
        let mut rejected = Vec::new();

        for (n, &start) in headings.iter().enumerate() {
            let end = headings.get(n + 1).copied().unwrap_or(index.len());
            match self.read_section(&index, start + 1..end) {
                Ok(section) => {
                    debug!(section = n, tenors = ?section.tenors, "accepted section");
                    quotes.extend(section.into_quotes(fetch_date));
                }
                Err(defect) => {
                    warn!(section = n, reason = %defect, "skipping results section");
                    rejected.push(SectionRejection {
                        section: n,
                        reason: defect.to_string(),
                    });
                }
            }
        }

        if quotes.is_empty() {
            return Err(ExtractionError::NoValidSections { rejected });
        }
        Ok(quotes)
    }

    /// Read one section whose elements lie in `range` (after its heading,
    /// before the next results heading).
    pub fn read_section(
        &self,
        index: &DocumentIndex<'_>,
        range: Range<usize>,
    ) -> Result<Section, SectionDefect> {
        let table = ElementMatch::tag("table");

        let results_pos = index
            .find_in(range.clone(), &table)
            .ok_or(SectionDefect::MissingResultsTable)?;
        let results = TableView::read(index.get(results_pos));

        let tenors: Vec<u32> = results
            .header()
            .map(|cells| cells.iter().skip(1).filter_map(|c| numeric::parse_tenor(c)).collect())
            .unwrap_or_default();
        if tenors.is_empty() {
            return Err(SectionDefect::NoTenors);
        }
        let width = tenors.len();

        let session_dates: Vec<String> = match results.row_labelled(&self.layout.session_date_row) {
            Some(row) => row
                .iter()
                .skip(1)
                .take(width)
                .filter(|c| !c.is_empty())
                .cloned()
                .collect(),
            None => {
                debug!("no session-date row; recording dates as unknown");
                vec![UNKNOWN_SESSION_DATE.to_string(); width]
            }
        };

        let bids_pos = index
            .find_in(index.end_of(results_pos)..range.end, &self.layout.accepted_bids_heading)
            .ok_or(SectionDefect::MissingAcceptedBids)?;
        let bids_table_pos = index
            .find_in(index.end_of(bids_pos)..range.end, &table)
            .ok_or(SectionDefect::MissingAcceptedBidsTable)?;
        let bids = TableView::read(index.get(bids_table_pos));

        let yields: Vec<f64> = bids
            .row_labelled(&self.layout.yield_row)
            .ok_or(SectionDefect::MissingYieldRow)?
            .iter()
            .skip(1)
            .take(width)
            .filter_map(|c| numeric::parse_yield(c))
            .collect();

        if session_dates.len() != width || yields.len() != width {
            return Err(SectionDefect::CountMismatch {
                tenors: width,
                session_dates: session_dates.len(),
                yields: yields.len(),
            });
        }

        Ok(Section {
            tenors,
            session_dates,
            yields,
        })
    }
}

/// Extract with the built-in CBE layout.
pub fn extract(html: &str, fetch_date: NaiveDate) -> Result<Vec<AuctionQuote>, ExtractionError> {
    Extractor::default().extract(html, fetch_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 8).unwrap()
    }

    fn section_html(tenors: &[&str], dates: Option<&[&str]>, yields: &[&str]) -> String {
        let header: String = tenors.iter().map(|t| format!("<th>{t}</th>")).collect();
        let date_row = dates
            .map(|ds| {
                let cells: String = ds.iter().map(|d| format!("<td>{d}</td>")).collect();
                format!("<tr><td>تاريخ الجلسة</td>{cells}</tr>")
            })
            .unwrap_or_default();
        let yield_cells: String = yields.iter().map(|y| format!("<td>{y}</td>")).collect();
        format!(
            "<h2>النتائج</h2>\
             <table><thead><tr><th>البيان</th>{header}</tr></thead><tbody>{date_row}</tbody></table>\
             <p><strong>تفاصيل العروض المقبولة</strong></p>\
             <table><tbody>\
               <tr><td>أقل عائد</td>{yield_cells}</tr>\
               <tr><td>متوسط العائد المرجح</td>{yield_cells}</tr>\
             </tbody></table>"
        )
    }

    fn page(sections: &[String]) -> String {
        format!("<html><body>{}</body></html>", sections.concat())
    }

    #[test]
    fn test_single_section() {
        let html = page(&[section_html(
            &["91", "182"],
            Some(&["06/07/2025", "06/07/2025"]),
            &["27.5", "27.1"],
        )]);
        let quotes = extract(&html, fetch_day()).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0], AuctionQuote::new(91, 27.5, "06/07/2025", fetch_day()));
        assert_eq!(quotes[1].tenor_days, 182);
        assert_eq!(quotes[1].yield_percent, 27.1);
    }

    #[test]
    fn test_no_results_heading_is_error() {
        let err = extract("<html><body><h2>أخبار</h2></body></html>", fetch_day()).unwrap_err();
        assert!(matches!(err, ExtractionError::NoResultsSection { .. }));
    }

    #[test]
    fn test_yield_count_mismatch_rejects_section() {
        let html = page(&[section_html(
            &["91", "182"],
            Some(&["06/07/2025", "06/07/2025"]),
            &["27.5", "-"],
        )]);
        let err = extract(&html, fetch_day()).unwrap_err();
        match err {
            ExtractionError::NoValidSections { rejected } => {
                assert_eq!(rejected.len(), 1);
                assert!(rejected[0].reason.contains("2 tenors"));
                assert!(rejected[0].reason.contains("1 yields"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_section_skipped_good_section_kept() {
        let html = page(&[
            section_html(&["91", "182"], Some(&["06/07/2025"]), &["27.5", "27.1"]),
            section_html(&["273"], Some(&["07/07/2025"]), &["26.7"]),
        ]);
        let quotes = extract(&html, fetch_day()).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].tenor_days, 273);
        assert_eq!(quotes[0].session_date, "07/07/2025");
    }

    #[test]
    fn test_missing_session_row_records_unknown() {
        let html = page(&[section_html(&["91"], None, &["27.5"])]);
        let quotes = extract(&html, fetch_day()).unwrap();
        assert_eq!(quotes[0].session_date, UNKNOWN_SESSION_DATE);
    }

    #[test]
    fn test_non_numeric_headers_skipped() {
        let html = page(&[section_html(
            &["91", "ملاحظات", "364"],
            Some(&["06/07/2025", "06/07/2025"]),
            &["27.5", "25.0"],
        )]);
        let quotes = extract(&html, fetch_day()).unwrap();
        let tenors: Vec<u32> = quotes.iter().map(|q| q.tenor_days).collect();
        assert_eq!(tenors, vec![91, 364]);
    }

    #[test]
    fn test_yields_truncated_to_tenor_count() {
        let html = page(&[section_html(
            &["91"],
            Some(&["06/07/2025", "extra"]),
            &["27.5", "99.9"],
        )]);
        let quotes = extract(&html, fetch_day()).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].yield_percent, 27.5);
    }

    #[test]
    fn test_section_cannot_borrow_next_sections_bids_table() {
        let orphan = "<h2>النتائج</h2>\
            <table><tr><th>البيان</th><th>91</th></tr>\
            <tr><td>تاريخ الجلسة</td><td>05/07/2025</td></tr></table>"
            .to_string();
        let html = page(&[
            orphan,
            section_html(&["182"], Some(&["06/07/2025"]), &["27.1"]),
        ]);
        let quotes = extract(&html, fetch_day()).unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].tenor_days, 182);
    }

    #[test]
    fn test_duplicate_tenor_keeps_document_order() {
        let html = page(&[
            section_html(&["91"], Some(&["06/07/2025"]), &["27.0"]),
            section_html(&["91"], Some(&["07/07/2025"]), &["27.9"]),
        ]);
        let quotes = extract(&html, fetch_day()).unwrap();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes.last().unwrap().yield_percent, 27.9);
    }

    #[test]
    fn test_custom_layout() {
        let layout = PageLayout {
            results_heading: ElementMatch::tags_containing(&["h2"], "Results"),
            session_date_row: TextMatch::Equals("Session date".into()),
            accepted_bids_heading: ElementMatch::tags_containing(&["p"], "Accepted bids"),
            yield_row: TextMatch::Contains("Weighted average".into()),
        };
        let html = "<html><body><h2>Results</h2>\
            <table><tr><th>Item</th><th>182</th></tr>\
            <tr><td>Session date</td><td>2025-07-06</td></tr></table>\
            <p>Accepted bids details</p>\
            <table><tr><td>Weighted average yield (%)</td><td>27.192</td></tr></table>\
            </body></html>";
        let quotes = Extractor::new(layout).extract(html, fetch_day()).unwrap();
        assert_eq!(quotes, vec![AuctionQuote::new(182, 27.192, "2025-07-06", fetch_day())]);
    }
}
