use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use common::{Bar, DashboardError, ProviderError, Result, StockInfo};
use tracing::debug;

use super::provider::{MarketDataProvider, ProviderResult};
use crate::pipeline::period::{Interval, Span};

/// Load bars from CSV file
///
/// Expected columns: timestamp, open, high, low, close, volume. Extra
/// columns (for example indicators from a previous export) are ignored.
pub fn load_csv(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).map_err(|e| DashboardError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut bars = Vec::new();

    for result in csv_reader.records() {
        let record = result.map_err(|e| DashboardError::CsvError(e.to_string()))?;

        if record.len() < 6 {
            continue;
        }

        let timestamp = parse_timestamp(&record[0])?;
        let open = parse_field(&record[1], "open")?;
        let high = parse_field(&record[2], "high")?;
        let low = parse_field(&record[3], "low")?;
        let close = parse_field(&record[4], "close")?;
        // Exports may write volume as a float
        let volume = parse_field(&record[5], "volume")?;
        if volume < 0.0 {
            return Err(DashboardError::CsvError("Negative volume".to_string()));
        }

        bars.push(Bar::new(timestamp, open, high, low, close, volume.round() as u64));
    }

    Ok(bars)
}

fn parse_field(raw: &str, name: &str) -> Result<f64> {
    raw.trim()
        .parse()
        .map_err(|_| DashboardError::CsvError(format!("Invalid {} value: {}", name, raw)))
}

/// Load bars from JSON file
pub fn load_json(path: &Path) -> Result<Vec<Bar>> {
    let file = File::open(path).map_err(|e| DashboardError::DataLoadError(e.to_string()))?;
    let reader = BufReader::new(file);
    let bars: Vec<Bar> = serde_json::from_reader(reader)?;
    Ok(bars)
}

/// Load bars from file, detecting format from extension
pub fn load_file(path: &Path) -> Result<Vec<Bar>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        _ => Err(DashboardError::DataLoadError(format!(
            "Unsupported file format: {}",
            ext
        ))),
    }
}

/// Parse timestamp from various formats
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();

    // RFC 3339 and our own export format carry an offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];
    for fmt in &datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d"];
    for fmt in &date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
        }
    }

    // Unix timestamp (seconds)
    if let Ok(ts) = s.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(ts, 0) {
            return Ok(dt);
        }
    }

    Err(DashboardError::CsvError(format!(
        "Unable to parse timestamp: {}",
        s
    )))
}

/// Provider reading `<SYMBOL>.csv` or `<SYMBOL>.json` bar files from a
/// directory, plus an optional `<SYMBOL>.info.json` fundamentals record.
///
/// A symbol with neither file is unknown (`Ok(None)` / empty history).
#[derive(Debug, Clone)]
pub struct FileProvider {
    dir: PathBuf,
}

impl FileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn history_path(&self, symbol: &str) -> Option<PathBuf> {
        ["csv", "json"]
            .iter()
            .map(|ext| self.dir.join(format!("{}.{}", symbol, ext)))
            .find(|p| p.is_file())
    }

    fn parse_error(&self, err: DashboardError) -> ProviderError {
        ProviderError::Parse {
            provider: self.name().to_string(),
            detail: err.to_string(),
        }
    }
}

impl MarketDataProvider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_info(&self, symbol: &str) -> ProviderResult<Option<StockInfo>> {
        let info_path = self.dir.join(format!("{}.info.json", symbol));
        if info_path.is_file() {
            let file = File::open(&info_path)
                .map_err(|e| self.parse_error(DashboardError::IoError(e)))?;
            let info: StockInfo = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| self.parse_error(DashboardError::JsonError(e)))?;
            return Ok(Some(info));
        }

        // Bars without a fundamentals file: known symbol, unknown fields
        Ok(self.history_path(symbol).map(|_| StockInfo::default()))
    }

    fn fetch_history(
        &self,
        symbol: &str,
        span: Span,
        interval: Interval,
    ) -> ProviderResult<Vec<Bar>> {
        let Some(path) = self.history_path(symbol) else {
            return Ok(vec![]);
        };
        let mut bars = load_file(&path).map_err(|e| self.parse_error(e))?;
        bars.sort_by_key(|b| b.timestamp);

        // Files keep their own sampling; only the span is applied
        debug!(symbol, path = %path.display(), %interval, "loaded bars from file");
        if let Some(start) = bars.last().and_then(|b| span.start_from(b.timestamp)) {
            bars.retain(|b| b.timestamp >= start);
        }
        Ok(bars)
    }
}
