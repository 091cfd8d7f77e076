use common::{DashboardError, Result};
use serde::Serialize;

use crate::pipeline::AugmentedTable;

/// Columns correlated when the caller does not choose
pub const DEFAULT_COLUMNS: [&str; 6] = ["Close", "Volume", "MACD", "RSI", "SMA_50", "SMA_200"];

/// Symmetric Pearson correlation matrix over named table columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// Row-major, `columns.len()` squared entries; NaN where undefined
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        Some(self.values[i][j])
    }
}

/// Correlate `columns` of `table` pairwise, using only rows where both
/// values are defined
pub fn correlation_matrix(table: &AugmentedTable, columns: &[&str]) -> Result<CorrelationMatrix> {
    let series = columns
        .iter()
        .map(|name| {
            table.values(name).map(|v| v.into_owned()).ok_or_else(|| {
                DashboardError::InvalidParameter(format!(
                    "{} has no numeric column named {}",
                    table.symbol(),
                    name
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let n = series.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let mut r = pearson(&series[i], &series[j]);
            // Diagonal is exactly 1 wherever it is defined
            if i == j && r.is_finite() {
                r = 1.0;
            }
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        values,
    })
}

/// Pearson correlation over pairwise complete observations
///
/// NaN with fewer than two pairs or when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }

    let count = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / count;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / count;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return f64::NAN;
    }
    (cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validator::tests::series_of;
    use crate::pipeline::Column;
    use approx::assert_relative_eq;

    #[test]
    fn test_pearson_perfect() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        let zs = [8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(pearson(&xs, &ys), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&xs, &zs), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_skips_undefined_rows() {
        let xs = [1.0, f64::NAN, 3.0, 4.0];
        let ys = [1.0, 100.0, 3.0, f64::NAN];
        assert_relative_eq!(pearson(&xs, &ys), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_degenerate() {
        assert!(pearson(&[1.0], &[2.0]).is_nan());
        assert!(pearson(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(pearson(&[f64::NAN; 3], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_matrix_over_table() {
        let mut table = AugmentedTable::new(series_of("AAPL", &[1.0, 2.0, 4.0, 3.0]));
        table
            .insert_all(vec![
                Column::float("RSI", vec![f64::NAN, 20.0, 40.0, 30.0]),
                Column::broadcast("Support", 0.5, 4),
            ])
            .unwrap();

        let matrix = correlation_matrix(&table, &["Close", "RSI", "Support"]).unwrap();
        assert_eq!(matrix.values.len(), 3);
        assert_eq!(matrix.get("Close", "Close"), Some(1.0));
        assert_eq!(matrix.get("RSI", "RSI"), Some(1.0));
        assert_relative_eq!(matrix.get("Close", "RSI").unwrap(), 1.0, epsilon = 1e-12);
        assert_eq!(
            matrix.get("RSI", "Close").unwrap().to_bits(),
            matrix.get("Close", "RSI").unwrap().to_bits()
        );
        assert!(matrix.get("Support", "Support").unwrap().is_nan());
        assert!(matrix.get("Close", "Nope").is_none());
    }

    #[test]
    fn test_unknown_column() {
        let table = AugmentedTable::new(series_of("AAPL", &[1.0, 2.0]));
        assert!(matches!(
            correlation_matrix(&table, &["Close", "MACD"]),
            Err(DashboardError::InvalidParameter(_))
        ));
    }
}
