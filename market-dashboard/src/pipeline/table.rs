use std::borrow::Cow;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{Bar, Crossover, DashboardError, IndicatorError, Result, StockInfo};
use serde::Serialize;

use super::validator::Series;

/// Names of the OHLCV columns every table starts with
pub const BASE_COLUMNS: [&str; 5] = ["Open", "High", "Low", "Close", "Volume"];

/// Values of one derived column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValues {
    /// NaN marks an undefined value
    Float(Vec<f64>),
    Crossover(Vec<Crossover>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Crossover(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named indicator column aligned with the table index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Float(values),
        }
    }

    /// Same value on every row
    pub fn broadcast(name: impl Into<String>, value: f64, len: usize) -> Self {
        Self::float(name, vec![value; len])
    }

    pub fn crossover(name: impl Into<String>, values: Vec<Crossover>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Crossover(values),
        }
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match &self.values {
            ColumnValues::Float(v) => Some(v),
            ColumnValues::Crossover(_) => None,
        }
    }

    pub fn as_crossover(&self) -> Option<&[Crossover]> {
        match &self.values {
            ColumnValues::Crossover(v) => Some(v),
            ColumnValues::Float(_) => None,
        }
    }

    /// Number of rows holding a defined value
    pub fn defined_count(&self) -> usize {
        match &self.values {
            ColumnValues::Float(v) => v.iter().filter(|x| x.is_finite()).count(),
            ColumnValues::Crossover(v) => v.len(),
        }
    }
}

/// An indicator that failed while the rest of the table was built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorFailure {
    pub indicator: String,
    pub reason: String,
}

/// OHLCV series plus every derived column, keyed by the same timestamps
///
/// Only the pipeline mutates a table; callers receive it read-only.
#[derive(Debug, Clone, Serialize)]
pub struct AugmentedTable {
    symbol: String,
    info: StockInfo,
    bars: Vec<Bar>,
    columns: Vec<Column>,
    failures: Vec<IndicatorFailure>,
}

impl AugmentedTable {
    pub(crate) fn new(series: Series) -> Self {
        let (symbol, info, bars) = series.into_parts();
        Self {
            symbol,
            info,
            bars,
            columns: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn info(&self) -> &StockInfo {
        &self.info
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.bars.iter().map(|b| b.timestamp)
    }

    /// Derived columns in merge order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All column names: the OHLCV base first, then derived columns
    pub fn column_names(&self) -> Vec<&str> {
        BASE_COLUMNS
            .iter()
            .copied()
            .chain(self.columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Numeric values of a base or derived float column
    pub fn values(&self, name: &str) -> Option<Cow<'_, [f64]>> {
        match name {
            "Open" => Some(self.base_values(|b| b.open)),
            "High" => Some(self.base_values(|b| b.high)),
            "Low" => Some(self.base_values(|b| b.low)),
            "Close" => Some(self.base_values(|b| b.close)),
            "Volume" => Some(self.base_values(|b| b.volume as f64)),
            _ => self
                .column(name)
                .and_then(Column::as_float)
                .map(Cow::Borrowed),
        }
    }

    fn base_values(&self, f: impl Fn(&Bar) -> f64) -> Cow<'_, [f64]> {
        Cow::Owned(self.bars.iter().map(f).collect())
    }

    /// Bars at which the named crossover column reports a cross
    pub fn crossover_points(&self, name: &str) -> Vec<(&Bar, Crossover)> {
        let Some(events) = self.column(name).and_then(Column::as_crossover) else {
            return vec![];
        };
        self.bars
            .iter()
            .zip(events)
            .filter(|(_, c)| c.is_cross())
            .map(|(b, c)| (b, *c))
            .collect()
    }

    pub fn failures(&self) -> &[IndicatorFailure] {
        &self.failures
    }

    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// `Err(ComputationDegraded)` when any indicator failed during the build
    pub fn status(&self) -> Result<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        Err(DashboardError::ComputationDegraded {
            symbol: self.symbol.clone(),
            failed: self.failures.iter().map(|f| f.indicator.clone()).collect(),
        })
    }

    /// Merge the columns of one indicator; all of them or none
    pub(crate) fn insert_all(
        &mut self,
        columns: Vec<Column>,
    ) -> std::result::Result<(), IndicatorError> {
        {
            let rows = self.len();
            let mut seen: HashSet<&str> = self.column_names().into_iter().collect();
            for column in &columns {
                if column.values.len() != rows {
                    return Err(IndicatorError::Misaligned {
                        column: column.name.clone(),
                        expected: rows,
                        actual: column.values.len(),
                    });
                }
                if !seen.insert(column.name.as_str()) {
                    return Err(IndicatorError::DuplicateColumn(column.name.clone()));
                }
            }
        }
        self.columns.extend(columns);
        Ok(())
    }

    pub(crate) fn record_failure(&mut self, indicator: &str, error: &IndicatorError) {
        self.failures.push(IndicatorFailure {
            indicator: indicator.to_string(),
            reason: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validator::tests::series_of;

    #[test]
    fn test_insert_checks_alignment() {
        let mut table = AugmentedTable::new(series_of("AAPL", &[1.0, 2.0, 3.0]));
        let err = table
            .insert_all(vec![Column::float("RSI", vec![1.0, 2.0])])
            .unwrap_err();
        assert!(matches!(err, IndicatorError::Misaligned { expected: 3, actual: 2, .. }));
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicates_atomically() {
        let mut table = AugmentedTable::new(series_of("AAPL", &[1.0, 2.0]));
        table
            .insert_all(vec![Column::float("MACD", vec![0.0, 0.1])])
            .unwrap();

        let err = table
            .insert_all(vec![
                Column::float("Signal", vec![0.0, 0.0]),
                Column::float("MACD", vec![0.0, 0.0]),
            ])
            .unwrap_err();
        assert_eq!(err, IndicatorError::DuplicateColumn("MACD".to_string()));
        assert_eq!(table.columns().len(), 1);

        let err = table
            .insert_all(vec![Column::float("Close", vec![0.0, 0.0])])
            .unwrap_err();
        assert_eq!(err, IndicatorError::DuplicateColumn("Close".to_string()));
    }

    #[test]
    fn test_values_for_base_and_derived() {
        let mut table = AugmentedTable::new(series_of("AAPL", &[1.0, 2.0]));
        table
            .insert_all(vec![Column::broadcast("Support", 0.5, 2)])
            .unwrap();

        assert_eq!(table.values("Close").unwrap().as_ref(), &[1.0, 2.0]);
        assert_eq!(table.values("Support").unwrap().as_ref(), &[0.5, 0.5]);
        assert!(table.values("Nope").is_none());
        assert_eq!(
            table.column_names(),
            vec!["Open", "High", "Low", "Close", "Volume", "Support"]
        );
    }

    #[test]
    fn test_status_reports_degradation() {
        let mut table = AugmentedTable::new(series_of("AAPL", &[1.0]));
        assert!(table.status().is_ok());

        table.record_failure(
            "MACD",
            &IndicatorError::InvalidParameter {
                indicator: "MACD",
                reason: "fast span must be below slow span".to_string(),
            },
        );
        assert!(table.is_degraded());
        match table.status() {
            Err(DashboardError::ComputationDegraded { symbol, failed }) => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(failed, vec!["MACD".to_string()]);
            }
            other => panic!("unexpected status: {:?}", other),
        }
    }

    #[test]
    fn test_crossover_points() {
        let mut table = AugmentedTable::new(series_of("AAPL", &[1.0, 2.0, 3.0]));
        table
            .insert_all(vec![Column::crossover(
                "SMA_Crossover",
                vec![Crossover::None, Crossover::Up, Crossover::None],
            )])
            .unwrap();

        let points = table.crossover_points("SMA_Crossover");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].0.close, 2.0);
        assert_eq!(points[0].1, Crossover::Up);
    }
}
