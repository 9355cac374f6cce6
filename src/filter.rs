//! Filtering and aggregation over snapshot records
//!
//! These helpers back the dashboard's country and date-window filters and its
//! summary figures. They never mutate a snapshot; selections are borrowed.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::data::{Record, Snapshot};

/// A figure shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Revenue,
    NewCustomers,
    AdSpend,
    Cac,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Revenue,
        Metric::NewCustomers,
        Metric::AdSpend,
        Metric::Cac,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::NewCustomers => "New Customers",
            Metric::AdSpend => "Ad Spend",
            Metric::Cac => "CAC",
        }
    }

    /// Value of this metric for a single record
    pub fn value(&self, record: &Record) -> Option<f64> {
        match self {
            Metric::Revenue => Some(record.revenue),
            Metric::NewCustomers => Some(f64::from(record.new_customers)),
            Metric::AdSpend => Some(record.ad_spend),
            Metric::Cac => record.cac,
        }
    }

    /// The metric after this one, wrapping around
    pub fn next(&self) -> Metric {
        let index = Metric::ALL.iter().position(|m| m == self).unwrap_or(0);
        Metric::ALL[(index + 1) % Metric::ALL.len()]
    }
}

/// How a metric is reduced to a single figure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    /// Value on the latest date, added across countries
    Last,
}

/// Selection of records by country and inclusive date range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Countries to keep; empty keeps all
    pub countries: BTreeSet<String>,
    /// Countries to drop, applied after `countries`
    pub excluded: BTreeSet<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn matches(&self, record: &Record) -> bool {
        (self.countries.is_empty() || self.countries.contains(&record.country))
            && !self.excluded.contains(&record.country)
            && self.start.map_or(true, |start| record.date >= start)
            && self.end.map_or(true, |end| record.date <= end)
    }

    /// The same window one year earlier; needs both bounds
    pub fn year_earlier(&self) -> Option<RecordFilter> {
        Some(RecordFilter {
            countries: self.countries.clone(),
            excluded: self.excluded.clone(),
            start: Some(one_year_earlier(self.start?)?),
            end: Some(one_year_earlier(self.end?)?),
        })
    }

    /// Matching records in snapshot order
    pub fn apply<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a Record> {
        snapshot
            .records()
            .iter()
            .filter(|record| self.matches(record))
            .collect()
    }
}

/// Distinct countries, sorted
pub fn countries(snapshot: &Snapshot) -> Vec<String> {
    snapshot
        .records()
        .iter()
        .map(|record| record.country.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Most recent date with data
pub fn last_updated(snapshot: &Snapshot) -> Option<NaiveDate> {
    snapshot.records().iter().map(|record| record.date).max()
}

/// Earliest and latest dates with data
pub fn date_bounds(snapshot: &Snapshot) -> Option<(NaiveDate, NaiveDate)> {
    let first = snapshot.records().iter().map(|record| record.date).min()?;
    let last = last_updated(snapshot)?;
    Some((first, last))
}

/// Reduces a metric over a selection of records
///
/// Returns `None` when the selection is empty or the metric is undefined for
/// every record. CAC is never added across rows: `Sum` is total ad spend over
/// total new customers, and `Last` is the same ratio over the rows of the
/// latest date with new customers.
pub fn summarize(records: &[&Record], metric: Metric, aggregation: Aggregation) -> Option<f64> {
    if records.is_empty() {
        return None;
    }

    if metric == Metric::Cac && aggregation == Aggregation::Sum {
        return cac_of_totals(records);
    }

    match aggregation {
        Aggregation::Sum => Some(records.iter().filter_map(|r| metric.value(r)).sum()),
        Aggregation::Mean => {
            let values: Vec<f64> = records.iter().filter_map(|r| metric.value(r)).collect();
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        }
        Aggregation::Last => {
            let latest = records
                .iter()
                .filter(|record| metric.value(record).is_some())
                .map(|record| record.date)
                .max()?;
            let on_latest: Vec<&Record> = records
                .iter()
                .copied()
                .filter(|record| record.date == latest)
                .collect();
            if metric == Metric::Cac {
                return cac_of_totals(&on_latest);
            }
            Some(on_latest.iter().filter_map(|r| metric.value(r)).sum())
        }
    }
}

/// Total ad spend over total new customers, undefined without customers
fn cac_of_totals(records: &[&Record]) -> Option<f64> {
    let spend: f64 = records.iter().map(|record| record.ad_spend).sum();
    let customers: u64 = records
        .iter()
        .map(|record| u64::from(record.new_customers))
        .sum();
    if customers == 0 {
        None
    } else {
        Some(spend / customers as f64)
    }
}

/// Percentage of revenue earned outside `home`
///
/// Returns `None` for an empty selection or zero total revenue.
pub fn international_share(records: &[&Record], home: &str) -> Option<f64> {
    let total: f64 = records.iter().map(|record| record.revenue).sum();
    if records.is_empty() || total == 0.0 {
        return None;
    }
    let abroad: f64 = records
        .iter()
        .filter(|record| record.country != home)
        .map(|record| record.revenue)
        .sum();
    Some(abroad / total * 100.0)
}

/// Percent change of a summed metric against the same window a year earlier
///
/// Returns `None` when the filter has an open bound, either period has no
/// data, or the earlier figure is zero.
pub fn year_over_year(snapshot: &Snapshot, filter: &RecordFilter, metric: Metric) -> Option<f64> {
    let current = summarize(&filter.apply(snapshot), metric, Aggregation::Sum)?;
    let earlier = filter.year_earlier()?;
    let previous = summarize(&earlier.apply(snapshot), metric, Aggregation::Sum)?;
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous.abs() * 100.0)
}

/// Same day of the previous year, with Feb 29 mapped to Feb 28
fn one_year_earlier(date: NaiveDate) -> Option<NaiveDate> {
    date.with_year(date.year() - 1)
        .or_else(|| NaiveDate::from_ymd_opt(date.year() - 1, date.month(), 28))
}
