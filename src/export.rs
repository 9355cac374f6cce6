//! CSV export of dashboard rows

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::WriterBuilder;

use crate::data::Record;

const HEADER: [&str; 6] = ["date", "country", "revenue", "new_customers", "ad_spend", "cac"];

/// Writes records as CSV, header first, even when there are no rows
pub fn write_csv<W: io::Write>(writer: W, records: &[&Record]) -> Result<(), csv::Error> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// File name for an export covering `range`, e.g. `sheetdash_2026-03-01_2026-03-31.csv`
pub fn file_name(range: Option<(NaiveDate, NaiveDate)>) -> String {
    match range {
        Some((start, end)) => format!(
            "sheetdash_{}_{}.csv",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        ),
        None => "sheetdash_all.csv".to_string(),
    }
}

/// Writes the export into `dir` and returns the file path
pub fn write_to_dir(
    dir: &Path,
    range: Option<(NaiveDate, NaiveDate)>,
    records: &[&Record],
) -> Result<PathBuf, csv::Error> {
    let path = dir.join(file_name(range));
    let file = std::fs::File::create(&path)?;
    write_csv(file, records)?;
    Ok(path)
}
