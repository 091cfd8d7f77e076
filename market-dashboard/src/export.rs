//! CSV rendering of augmented tables
//!
//! One row per timestamp, base OHLCV columns first and indicator columns in
//! table order. Undefined values become empty fields.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use common::{Bar, DashboardError, Result};
use csv::Writer;
use tracing::info;

use crate::pipeline::{AugmentedTable, ColumnValues, BASE_COLUMNS};

/// Index column header
pub const DATE_COLUMN: &str = "Date";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// Suggested download name for a symbol's export
pub fn csv_file_name(symbol: &str) -> String {
    format!("{}_stock_data.csv", symbol)
}

fn csv_error(err: impl ToString) -> DashboardError {
    DashboardError::CsvError(err.to_string())
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn format_value(v: f64) -> String {
    if v.is_finite() {
        v.to_string()
    } else {
        String::new()
    }
}

fn base_fields(bar: &Bar) -> [String; 6] {
    [
        format_timestamp(bar.timestamp),
        bar.open.to_string(),
        bar.high.to_string(),
        bar.low.to_string(),
        bar.close.to_string(),
        bar.volume.to_string(),
    ]
}

fn header<'a>(extra: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    std::iter::once(DATE_COLUMN)
        .chain(BASE_COLUMNS.iter().copied())
        .chain(extra)
        .collect()
}

/// Write the full table as CSV into `writer`
pub fn write_table<W: Write>(table: &AugmentedTable, writer: W) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(header(table.columns().iter().map(|c| c.name.as_str())))
        .map_err(csv_error)?;

    for (row, bar) in table.bars().iter().enumerate() {
        let mut record: Vec<String> = base_fields(bar).into();
        for column in table.columns() {
            record.push(match &column.values {
                ColumnValues::Float(v) => format_value(v[row]),
                ColumnValues::Crossover(v) => v[row].to_string(),
            });
        }
        wtr.write_record(&record).map_err(csv_error)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render the table as a UTF-8 CSV document
pub fn to_csv(table: &AugmentedTable) -> Result<String> {
    let mut buf = Vec::new();
    write_table(table, &mut buf)?;
    String::from_utf8(buf).map_err(csv_error)
}

/// Render raw bars with the same leading columns as [`to_csv`]
pub fn bars_to_csv(bars: &[Bar]) -> Result<String> {
    let mut wtr = Writer::from_writer(Vec::new());
    wtr.write_record(header(std::iter::empty()))
        .map_err(csv_error)?;
    for bar in bars {
        wtr.write_record(base_fields(bar)).map_err(csv_error)?;
    }
    let buf = wtr.into_inner().map_err(csv_error)?;
    String::from_utf8(buf).map_err(csv_error)
}

/// Export the table to `path`
pub fn save_csv(table: &AugmentedTable, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_table(table, file)?;
    info!(symbol = table.symbol(), path = %path.display(), rows = table.len(), "table exported");
    Ok(())
}
