//! Per-tenor yield series over stored history, for the historical chart.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::AuctionQuote;

/// Time-series bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregation {
    /// One point per fetch date.
    Raw,
    /// One point per ISO week (dated to its Monday).
    Weekly(AggFunc),
    /// One point per calendar month (dated to its first day).
    Monthly(AggFunc),
}

/// Aggregation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggFunc {
    Min,
    Max,
    Avg,
    Last,
}

/// A tenor's yields over time, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldSeries {
    pub tenor_days: u32,
    pub points: Vec<(NaiveDate, f64)>,
}

impl YieldSeries {
    /// Change from the first to the last point, in percentage points.
    pub fn change(&self) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some(last.1 - first.1)
    }
}

/// Group `history` into one series per tenor, ascending by tenor.
///
/// `tenor` limits the output to a single tenor.
pub fn series(history: &[AuctionQuote], tenor: Option<u32>, aggregation: Aggregation) -> Vec<YieldSeries> {
    let mut by_tenor: BTreeMap<u32, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for quote in history {
        if tenor.is_some_and(|t| t != quote.tenor_days) {
            continue;
        }
        // Later rows for the same key win, as in the store.
        by_tenor
            .entry(quote.tenor_days)
            .or_default()
            .insert(quote.fetch_date, quote.yield_percent);
    }

    by_tenor
        .into_iter()
        .map(|(tenor_days, points)| {
            let raw: Vec<(NaiveDate, f64)> = points.into_iter().collect();
            let points = match aggregation {
                Aggregation::Raw => raw,
                Aggregation::Weekly(func) => bucket(&raw, week_start, func),
                Aggregation::Monthly(func) => bucket(&raw, month_start, func),
            };
            YieldSeries { tenor_days, points }
        })
        .collect()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Aggregate ordered points by the bucket each date maps to.
fn bucket(
    points: &[(NaiveDate, f64)],
    key: fn(NaiveDate) -> NaiveDate,
    func: AggFunc,
) -> Vec<(NaiveDate, f64)> {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for &(date, value) in points {
        buckets.entry(key(date)).or_default().push(value);
    }
    buckets
        .into_iter()
        .filter_map(|(date, values)| apply_agg_func(&values, func).map(|v| (date, v)))
        .collect()
}

/// Apply an aggregation function to a list of values.
fn apply_agg_func(values: &[f64], func: AggFunc) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(match func {
        AggFunc::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
        AggFunc::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        AggFunc::Avg => values.iter().sum::<f64>() / values.len() as f64,
        AggFunc::Last => values[values.len() - 1],
    })
}
