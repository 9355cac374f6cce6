//! Sheet table parsing
//!
//! Turns the CSV export of the sheet into normalized [`Record`]s. Columns are
//! located by header name, so their order does not matter and unrecognized
//! columns are ignored.

use chrono::{Datelike, Duration, Local, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim};

use super::{LoadError, Record};

/// Cell contents the sheet uses for "no value"
const PLACEHOLDERS: [&str; 7] = ["-", "—", "N/A", "n/a", "#DIV/0!", "#VALUE!", "#REF!"];

/// Date layouts seen in the sheet, tried in order
const DATE_FORMATS: [&str; 6] = [
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%m/%d/%y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATE_ALIASES: &[&str] = &["date", "day"];
const COUNTRY_ALIASES: &[&str] = &["country", "market"];
const REVENUE_ALIASES: &[&str] = &["revenue", "netrevenue", "netrevenueshipping"];
const NEW_CUSTOMER_ALIASES: &[&str] = &["newcustomers", "customers"];
const AD_SPEND_ALIASES: &[&str] = &["adspend", "spend"];

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        let row = err
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or_default();
        LoadError::ParseError {
            row,
            reason: err.to_string(),
        }
    }
}

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    date: usize,
    country: usize,
    revenue: usize,
    new_customers: Option<usize>,
    ad_spend: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, LoadError> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.contains(&normalize_header(h).as_str()))
        };
        let require = |aliases: &[&str], name: &str| {
            find(aliases).ok_or_else(|| LoadError::ParseError {
                row: 1,
                reason: format!("missing required column '{}'", name),
            })
        };

        Ok(Self {
            date: require(DATE_ALIASES, "date")?,
            country: require(COUNTRY_ALIASES, "country")?,
            revenue: require(REVENUE_ALIASES, "revenue")?,
            new_customers: find(NEW_CUSTOMER_ALIASES),
            ad_spend: find(AD_SPEND_ALIASES),
        })
    }
}

/// Lowercases a header and drops everything but letters and digits
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses the full CSV export of the sheet, as of the local date
///
/// # Returns
/// * `Ok(Vec<Record>)` - Records in source row order
/// * `Err(LoadError::ParseError)` - If a required column is missing or a row
///   cannot be coerced to a record
pub fn parse_table(text: &str) -> Result<Vec<Record>, LoadError> {
    parse_table_as_of(text, Local::now().date_naive())
}

/// Parses the CSV export, skipping rows dated after `today`
///
/// Sheets are laid out ahead of time, so days that have not happened yet
/// carry blanks or zeros rather than figures.
pub fn parse_table_as_of(text: &str, today: NaiveDate) -> Result<Vec<Record>, LoadError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result?;
        let line = row
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(index + 2);

        if let Some(record) = parse_row(&row, &columns, line, today)? {
            records.push(record);
        }
    }

    Ok(records)
}

/// Parses one data row, returning `None` for rows that carry no figures yet
fn parse_row(
    row: &StringRecord,
    columns: &ColumnMap,
    line: usize,
    today: NaiveDate,
) -> Result<Option<Record>, LoadError> {
    let cell = |index: usize| row.get(index).unwrap_or("");
    let optional_cell = |index: Option<usize>| index.map(cell).unwrap_or("");
    let fail = |reason: String| LoadError::ParseError { row: line, reason };

    if row.iter().all(|field| field.trim().is_empty()) {
        return Ok(None);
    }

    let country = cell(columns.country).trim();
    if country.is_empty() {
        return Ok(None);
    }

    let revenue = parse_number(cell(columns.revenue))
        .map_err(|raw| fail(format!("non-numeric revenue '{}'", raw)))?;
    let new_customers = parse_number(optional_cell(columns.new_customers))
        .map_err(|raw| fail(format!("non-numeric new customers '{}'", raw)))?;
    let ad_spend = parse_number(optional_cell(columns.ad_spend))
        .map_err(|raw| fail(format!("non-numeric ad spend '{}'", raw)))?;

    // Unfilled days hold blanks or zeros in every figure
    let figures = [revenue, new_customers, ad_spend];
    if figures.iter().all(|value| value.map_or(true, |v| v == 0.0)) {
        return Ok(None);
    }

    let raw_date = cell(columns.date).trim();
    if raw_date.is_empty() {
        return Err(fail(format!("missing date for {}", country)));
    }
    let date = parse_date(raw_date).ok_or_else(|| fail(format!("invalid date '{}'", raw_date)))?;
    if date > today {
        return Ok(None);
    }

    let revenue = revenue.ok_or_else(|| fail(format!("missing revenue for {}", country)))?;

    let new_customers = match new_customers {
        Some(value) => to_count(value)
            .ok_or_else(|| fail(format!("new customers must be a whole count, got {}", value)))?,
        None => 0,
    };

    Ok(Some(Record::new(
        date,
        country,
        revenue,
        new_customers,
        ad_spend.unwrap_or(0.0),
    )))
}

/// Converts a raw cell to a number
///
/// Handles currency symbols, thousands separators, percent signs and
/// parenthesised negatives.
///
/// # Returns
/// * `Ok(None)` - The cell is blank or a placeholder
/// * `Ok(Some(f64))` - The parsed value
/// * `Err(String)` - The trimmed cell text, if it is not a number
pub fn parse_number(raw: &str) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed) {
        return Ok(None);
    }

    let mut cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '%'))
        .collect();
    if cleaned.starts_with('(') && cleaned.ends_with(')') && cleaned.len() > 2 {
        cleaned = format!("-{}", &cleaned[1..cleaned.len() - 1]);
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(trimmed.to_string()),
    }
}

/// Parses a date cell in any of the layouts the sheet uses
///
/// Falls back to a spreadsheet serial number (days since 1899-12-30).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    // A two-digit year also satisfies %Y, so require a four-digit result
    let parsed = DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .filter(|date| date.year() >= 1000)
    });
    if parsed.is_some() {
        return parsed;
    }

    if (4..=6).contains(&value.len()) && value.chars().all(|c| c.is_ascii_digit()) {
        let serial: i64 = value.parse().ok()?;
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        return epoch.checked_add_signed(Duration::days(serial));
    }

    None
}

/// Accepts non-negative whole numbers that fit a `u32`
fn to_count(value: f64) -> Option<u32> {
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        None
    } else {
        Some(value as u32)
    }
}
