use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// Indicator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParameters {
    // MACD
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    // RSI
    pub rsi_period: usize,
    // Bollinger Bands
    pub bb_period: usize,
    pub bb_std_dev: f64,
    // Moving averages
    pub sma_short: usize,
    pub sma_long: usize,
    // Support/Resistance
    pub level_window: usize,
    // Fibonacci retracement ratios, anchored at the series high
    pub fib_levels: Vec<f64>,
}

impl Default for IndicatorParameters {
    fn default() -> Self {
        Self {
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            bb_period: 20,
            bb_std_dev: 2.0,
            sma_short: 50,
            sma_long: 200,
            level_window: 14,
            fib_levels: vec![0.0, 0.236, 0.382, 0.5, 0.618, 1.0],
        }
    }
}

impl IndicatorParameters {
    pub fn with_macd(mut self, fast: usize, slow: usize, signal: usize) -> Self {
        self.macd_fast = fast;
        self.macd_slow = slow;
        self.macd_signal = signal;
        self
    }

    pub fn with_rsi_period(mut self, period: usize) -> Self {
        self.rsi_period = period;
        self
    }

    pub fn with_bollinger(mut self, period: usize, std_dev: f64) -> Self {
        self.bb_period = period;
        self.bb_std_dev = std_dev;
        self
    }

    pub fn with_sma_periods(mut self, short: usize, long: usize) -> Self {
        self.sma_short = short;
        self.sma_long = long;
        self
    }

    pub fn with_level_window(mut self, window: usize) -> Self {
        self.level_window = window;
        self
    }

    /// Column name of the short moving average, e.g. `SMA_50`
    pub fn sma_short_name(&self) -> String {
        format!("SMA_{}", self.sma_short)
    }

    /// Column name of the long moving average, e.g. `SMA_200`
    pub fn sma_long_name(&self) -> String {
        format!("SMA_{}", self.sma_long)
    }

    /// Reject parameter sets no indicator could run with
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("rsi_period", self.rsi_period),
            ("bb_period", self.bb_period),
            ("sma_short", self.sma_short),
            ("sma_long", self.sma_long),
            ("level_window", self.level_window),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(DashboardError::InvalidParameter(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(DashboardError::InvalidParameter(
                "macd_fast must be below macd_slow".to_string(),
            ));
        }
        if self.sma_short == self.sma_long {
            return Err(DashboardError::InvalidParameter(
                "sma_short and sma_long must differ".to_string(),
            ));
        }
        if !self.bb_std_dev.is_finite() || self.bb_std_dev < 0.0 {
            return Err(DashboardError::InvalidParameter(
                "bb_std_dev must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP market data settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 10,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Top-level dashboard configuration, usually read from a JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub indicators: IndicatorParameters,
    pub provider: ProviderConfig,
    pub watchlist_path: PathBuf,
    /// Directory of `<SYMBOL>.csv` / `<SYMBOL>.json` files, used instead of HTTP when set
    pub data_dir: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorParameters::default(),
            provider: ProviderConfig::default(),
            watchlist_path: PathBuf::from("watchlist.json"),
            data_dir: None,
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            DashboardError::DataLoadError(format!("{}: {}", path.display(), e))
        })?;
        let config: DashboardConfig = serde_json::from_reader(BufReader::new(file))?;
        config.indicators.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters_are_canonical() {
        let params = IndicatorParameters::default();
        assert_eq!(
            (params.macd_fast, params.macd_slow, params.macd_signal),
            (12, 26, 9)
        );
        assert_eq!(params.rsi_period, 14);
        assert_eq!(params.bb_period, 20);
        assert_eq!(params.bb_std_dev, 2.0);
        assert_eq!(params.sma_short_name(), "SMA_50");
        assert_eq!(params.sma_long_name(), "SMA_200");
        assert_eq!(params.level_window, 14);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let params = IndicatorParameters::default().with_rsi_period(0);
        assert!(matches!(
            params.validate(),
            Err(DashboardError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_validate_rejects_equal_smas() {
        let params = IndicatorParameters::default().with_sma_periods(20, 20);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "indicators": { "rsi_period": 7 }, "provider": { "timeout_secs": 3 } }"#;
        let config: DashboardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.indicators.rsi_period, 7);
        assert_eq!(config.indicators.macd_slow, 26);
        assert_eq!(config.provider.timeout_secs, 3);
        assert_eq!(config.watchlist_path, PathBuf::from("watchlist.json"));
        assert!(config.data_dir.is_none());
    }
}
