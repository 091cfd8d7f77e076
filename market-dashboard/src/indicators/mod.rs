pub mod bollinger;
pub mod ema;
pub mod fibonacci;
pub mod levels;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::{calculate_bollinger_bands, BollingerBands};
pub use ema::calculate_ema;
pub use fibonacci::{calculate_fibonacci_levels, FibLevel};
pub use levels::{calculate_support_resistance, rolling_max, rolling_min, SupportResistance};
pub use macd::{calculate_macd, Macd};
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, calculate_sma_filled, detect_crossovers};

use common::{Bar, IndicatorError, IndicatorParameters};

use crate::pipeline::table::{AugmentedTable, Column};

/// Name of the crossover column
pub const CROSSOVER_COLUMN: &str = "SMA_Crossover";

/// Price columns shared read-only by every indicator
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    pub closes: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
}

impl PriceSeries {
    pub fn from_bars(bars: &[Bar]) -> Self {
        Self {
            closes: bars.iter().map(|b| b.close).collect(),
            highs: bars.iter().map(|b| b.high).collect(),
            lows: bars.iter().map(|b| b.low).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }
}

/// Indicators that depend only on the price series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    Macd,
    Rsi,
    Bollinger,
    SmaShort,
    SmaLong,
    Fibonacci,
    SupportResistance,
}

impl IndicatorKind {
    /// Merge order of the table columns
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Macd,
        IndicatorKind::Rsi,
        IndicatorKind::Bollinger,
        IndicatorKind::SmaShort,
        IndicatorKind::SmaLong,
        IndicatorKind::Fibonacci,
        IndicatorKind::SupportResistance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Macd => "MACD",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Bollinger => "Bollinger",
            IndicatorKind::SmaShort => "SMA short",
            IndicatorKind::SmaLong => "SMA long",
            IndicatorKind::Fibonacci => "Fibonacci",
            IndicatorKind::SupportResistance => "Support/Resistance",
        }
    }

    /// Compute the columns of this indicator, each aligned with `prices`
    pub fn compute(
        &self,
        prices: &PriceSeries,
        params: &IndicatorParameters,
    ) -> Result<Vec<Column>, IndicatorError> {
        let n = prices.len();
        match self {
            IndicatorKind::Macd => {
                let macd = calculate_macd(
                    &prices.closes,
                    params.macd_fast,
                    params.macd_slow,
                    params.macd_signal,
                )
                .ok_or_else(|| self.invalid(format!(
                    "spans {}/{}/{} must be positive with fast below slow",
                    params.macd_fast, params.macd_slow, params.macd_signal
                )))?;
                Ok(vec![
                    Column::float("MACD", macd.macd),
                    Column::float("Signal", macd.signal),
                    Column::float("Histogram", macd.histogram),
                ])
            }
            IndicatorKind::Rsi => {
                self.require_window(params.rsi_period)?;
                Ok(vec![Column::float(
                    "RSI",
                    calculate_rsi(&prices.closes, params.rsi_period),
                )])
            }
            IndicatorKind::Bollinger => {
                self.require_window(params.bb_period)?;
                if !params.bb_std_dev.is_finite() || params.bb_std_dev < 0.0 {
                    return Err(self.invalid(format!(
                        "width multiplier {} must be a non-negative number",
                        params.bb_std_dev
                    )));
                }
                let bb =
                    calculate_bollinger_bands(&prices.closes, params.bb_period, params.bb_std_dev);
                Ok(vec![
                    Column::float("BB_Middle", bb.middle),
                    Column::float("BB_Upper", bb.upper),
                    Column::float("BB_Lower", bb.lower),
                ])
            }
            IndicatorKind::SmaShort => {
                self.require_window(params.sma_short)?;
                Ok(vec![Column::float(
                    params.sma_short_name(),
                    calculate_sma_filled(&prices.closes, params.sma_short),
                )])
            }
            IndicatorKind::SmaLong => {
                self.require_window(params.sma_long)?;
                Ok(vec![Column::float(
                    params.sma_long_name(),
                    calculate_sma_filled(&prices.closes, params.sma_long),
                )])
            }
            IndicatorKind::Fibonacci => {
                if let Some(bad) = params.fib_levels.iter().find(|r| !r.is_finite()) {
                    return Err(self.invalid(format!("level {} is not a number", bad)));
                }
                Ok(
                    calculate_fibonacci_levels(&prices.highs, &prices.lows, &params.fib_levels)
                        .into_iter()
                        .map(|level| Column::broadcast(level.column_name(), level.price, n))
                        .collect(),
                )
            }
            IndicatorKind::SupportResistance => {
                self.require_window(params.level_window)?;
                let levels =
                    calculate_support_resistance(&prices.highs, &prices.lows, params.level_window);
                Ok(vec![
                    Column::broadcast("Support", levels.support, n),
                    Column::broadcast("Resistance", levels.resistance, n),
                ])
            }
        }
    }

    fn require_window(&self, window: usize) -> Result<(), IndicatorError> {
        if window == 0 {
            return Err(self.invalid("window must be positive".to_string()));
        }
        Ok(())
    }

    fn invalid(&self, reason: String) -> IndicatorError {
        IndicatorError::InvalidParameter {
            indicator: self.name(),
            reason,
        }
    }
}

/// Crossover events between the two SMA columns already merged into `table`
pub fn compute_crossover(
    table: &AugmentedTable,
    params: &IndicatorParameters,
) -> Result<Column, IndicatorError> {
    let lookup = |name: String| {
        table
            .column(&name)
            .and_then(Column::as_float)
            .ok_or(IndicatorError::MissingColumn {
                indicator: CROSSOVER_COLUMN,
                column: name,
            })
    };
    let short = lookup(params.sma_short_name())?;
    let long = lookup(params.sma_long_name())?;

    Ok(Column::crossover(
        CROSSOVER_COLUMN,
        detect_crossovers(short, long),
    ))
}
