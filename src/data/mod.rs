//! Core data models for sheetdash
//!
//! This module contains the record and snapshot types produced by the sheet
//! loader, the loader contract used by the refresh controller, and the error
//! type shared by both.

pub mod parse;
pub mod sheet;

pub use parse::{parse_table, parse_table_as_of};
pub use sheet::{csv_export_url, Credentials, SheetLoader};

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading the sheet
#[derive(Debug, Error)]
pub enum LoadError {
    /// The remote table could not be reached or rejected the credentials
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// A row could not be coerced to the record shape
    #[error("Parse error at row {row}: {reason}")]
    ParseError {
        /// Sheet row number (the header is row 1)
        row: usize,
        reason: String,
    },
}

impl LoadError {
    /// Short label for banners and logs
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::SourceUnavailable(_) => "Source unavailable",
            LoadError::ParseError { .. } => "Parse error",
        }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::SourceUnavailable(err.to_string())
    }
}

/// One row of the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Day the figures belong to
    pub date: NaiveDate,
    /// Country or market identifier
    pub country: String,
    /// Net revenue
    pub revenue: f64,
    /// Number of first-time customers
    pub new_customers: u32,
    /// Advertising spend
    pub ad_spend: f64,
    /// Cost of acquisition, `None` when there were no new customers
    pub cac: Option<f64>,
}

impl Record {
    /// Builds a record and derives its cost of acquisition
    pub fn new(
        date: NaiveDate,
        country: impl Into<String>,
        revenue: f64,
        new_customers: u32,
        ad_spend: f64,
    ) -> Self {
        Self {
            date,
            country: country.into(),
            revenue,
            new_customers,
            ad_spend,
            cac: cost_of_acquisition(ad_spend, new_customers),
        }
    }
}

/// Ad spend divided by new customers, undefined for zero customers
pub fn cost_of_acquisition(ad_spend: f64, new_customers: u32) -> Option<f64> {
    if new_customers == 0 {
        None
    } else {
        Some(ad_spend / f64::from(new_customers))
    }
}

/// Immutable capture of every row returned by a single source read
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    records: Vec<Record>,
    fetched_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            records,
            fetched_at,
        }
    }

    /// Records in source row order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// When the source read completed
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Something that can produce a fresh snapshot of the source table
///
/// Implementations perform exactly one read per call and never retry; the
/// caller decides what to do with a failure.
pub trait DataLoader {
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, LoadError>>;
}
