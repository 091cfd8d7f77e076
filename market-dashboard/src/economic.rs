use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate};
use common::{DashboardError, ProviderError, Result, StockInfo};
use serde::Serialize;
use tracing::warn;

use crate::data::ProviderResult;

/// Sectors with a dedicated set of macro series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sector {
    Technology,
    Finance,
    Energy,
    Healthcare,
    Consumer,
}

impl Sector {
    /// Match a provider sector name; anything unrecognised is `Consumer`
    pub fn from_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "technology" | "information technology" | "communication services" => {
                Sector::Technology
            }
            "finance" | "financial" | "financial services" | "financials" => Sector::Finance,
            "energy" => Sector::Energy,
            "healthcare" | "health care" => Sector::Healthcare,
            _ => Sector::Consumer,
        }
    }

    pub fn of(info: &StockInfo) -> Self {
        info.sector
            .as_deref()
            .map(Sector::from_name)
            .unwrap_or(Sector::Consumer)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// FRED series codes relevant to a sector
pub fn relevant_economic_indicators(sector: Sector) -> &'static [&'static str] {
    match sector {
        Sector::Technology => &["CPIAUCSL", "UMCSENT", "UNRATE"],
        Sector::Finance => &["DFF", "T10Y2Y", "MORTGAGE30US"],
        Sector::Energy => &["DCOILWTICO", "TOTALSA", "IPG211111CN"],
        Sector::Healthcare => &["CPIMEDSL", "RXPUSW", "HLTHFCSA"],
        Sector::Consumer => &["CPIAUCSL", "PCE", "UMCSENT"],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Source of macroeconomic time series keyed by series code
pub trait EconomicSource: Send + Sync {
    fn name(&self) -> &str;

    fn series(&self, code: &str, start: NaiveDate, end: NaiveDate)
        -> ProviderResult<Vec<Observation>>;
}

/// Series read from FRED csv downloads stored as `<dir>/fred/<CODE>.csv`
///
/// The first column is the observation date, the second the value; `.` marks
/// a missing observation. A series without a file has no observations.
#[derive(Debug, Clone)]
pub struct CsvEconomicSource {
    dir: PathBuf,
}

impl CsvEconomicSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into().join("fred"),
        }
    }
}

impl EconomicSource for CsvEconomicSource {
    fn name(&self) -> &str {
        "fred-file"
    }

    fn series(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ProviderResult<Vec<Observation>> {
        let path = self.dir.join(format!("{}.csv", code));
        if !path.is_file() {
            return Ok(vec![]);
        }
        let parse_error = |detail: String| ProviderError::Parse {
            provider: self.name().to_string(),
            detail,
        };

        let mut reader = csv::Reader::from_path(&path).map_err(|e| parse_error(e.to_string()))?;
        let mut observations = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| parse_error(e.to_string()))?;
            let (Some(date), Some(value)) = (record.get(0), record.get(1)) else {
                continue;
            };
            let value = value.trim();
            if value == "." || value.is_empty() {
                continue;
            }
            let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
                .map_err(|e| parse_error(format!("{} {}: {}", code, date, e)))?;
            let value: f64 = value
                .parse()
                .map_err(|_| parse_error(format!("{}: invalid value {}", code, value)))?;
            if (start..=end).contains(&date) {
                observations.push(Observation { date, value });
            }
        }
        Ok(observations)
    }
}

/// One year back from `end`
pub fn default_window(end: NaiveDate) -> (NaiveDate, NaiveDate) {
    (end - Duration::days(365), end)
}

/// Fetch each series; failing series are logged and left out. Fails only
/// when every series failed.
pub fn fetch_indicators(
    source: &dyn EconomicSource,
    codes: &[&str],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<BTreeMap<String, Vec<Observation>>> {
    let mut data = BTreeMap::new();
    let mut last_error = None;

    for code in codes {
        match source.series(code, start, end) {
            Ok(observations) => {
                data.insert(code.to_string(), observations);
            }
            Err(e) => {
                warn!(source = source.name(), series = code, error = %e, "economic series unavailable");
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if data.is_empty() => Err(DashboardError::from(e)),
        _ => Ok(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProviderError;

    struct StubSource;

    impl EconomicSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        fn series(
            &self,
            code: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> ProviderResult<Vec<Observation>> {
            if code == "PCE" {
                return Err(ProviderError::Api {
                    provider: "stub".to_string(),
                    code: "400".to_string(),
                    description: "bad series".to_string(),
                });
            }
            Ok(vec![Observation {
                date: start,
                value: 1.0,
            }])
        }
    }

    #[test]
    fn test_sector_mapping() {
        assert_eq!(Sector::from_name("Technology"), Sector::Technology);
        assert_eq!(Sector::from_name(" financial services "), Sector::Finance);
        assert_eq!(Sector::from_name("Utilities"), Sector::Consumer);
        assert_eq!(Sector::of(&StockInfo::default()), Sector::Consumer);
        assert_eq!(
            relevant_economic_indicators(Sector::Energy),
            &["DCOILWTICO", "TOTALSA", "IPG211111CN"]
        );
    }

    #[test]
    fn test_fetch_skips_failing_series() {
        let (start, end) = default_window(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(start, NaiveDate::from_ymd_opt(2023, 7, 1).unwrap());

        let codes = relevant_economic_indicators(Sector::Consumer);
        let data = fetch_indicators(&StubSource, codes, start, end).unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["CPIAUCSL", "UMCSENT"]);
    }

    #[test]
    fn test_fetch_all_failing_is_unavailable() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        assert!(matches!(
            fetch_indicators(&StubSource, &["PCE"], day, day),
            Err(DashboardError::ProviderUnavailable { .. })
        ));
        assert!(fetch_indicators(&StubSource, &[], day, day).unwrap().is_empty());
    }

    #[test]
    fn test_csv_source_reads_window() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("fred")).unwrap();
        std::fs::write(
            dir.path().join("fred").join("DFF.csv"),
            "observation_date,DFF\n2023-05-01,5.08\n2023-08-01,5.33\n2024-01-02,.\n2024-03-01,5.33\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("fred").join("T10Y2Y.csv"),
            "observation_date,T10Y2Y\nyesterday,0.1\n",
        )
        .unwrap();
        let source = CsvEconomicSource::new(dir.path());

        let (start, end) = default_window(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        let data = fetch_indicators(
            &source,
            relevant_economic_indicators(Sector::Finance),
            start,
            end,
        )
        .unwrap();

        // Malformed T10Y2Y is left out, missing MORTGAGE30US is empty
        assert_eq!(
            data.keys().collect::<Vec<_>>(),
            vec!["DFF", "MORTGAGE30US"]
        );
        let dff = &data["DFF"];
        assert_eq!(dff.len(), 2);
        assert_eq!(dff[0].date, NaiveDate::from_ymd_opt(2023, 8, 1).unwrap());
        assert_eq!(dff[1].value, 5.33);
        assert!(data["MORTGAGE30US"].is_empty());
    }
}
