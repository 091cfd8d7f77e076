use common::{Bar, DashboardError, ProviderError, RejectReason, Result, StockInfo};
use tracing::{debug, warn};

/// Longest accepted ticker
pub const MAX_SYMBOL_LEN: usize = 10;

/// A non-empty OHLCV series with a strictly increasing index and finite,
/// non-negative prices. Only [`validate`] builds one.
#[derive(Debug, Clone)]
pub struct Series {
    symbol: String,
    info: StockInfo,
    bars: Vec<Bar>,
}

impl Series {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn info(&self) -> &StockInfo {
        &self.info
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, StockInfo, Vec<Bar>) {
        (self.symbol, self.info, self.bars)
    }
}

/// Trim and upper-case a ticker, rejecting empty or non-alphabetic input
pub fn check_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty()
        || symbol.len() > MAX_SYMBOL_LEN
        || !symbol.chars().all(|c| c.is_ascii_alphabetic())
    {
        debug!(symbol = raw, "rejected symbol format");
        return Err(DashboardError::invalid_symbol(raw.trim(), RejectReason::BadFormat));
    }
    Ok(symbol)
}

/// Validate the provider's answers for `symbol`
///
/// Every provider failure is reported as `InvalidSymbol`; the raw error is
/// only logged.
pub fn validate(
    symbol: &str,
    info: std::result::Result<Option<StockInfo>, ProviderError>,
    history: std::result::Result<Vec<Bar>, ProviderError>,
) -> Result<Series> {
    let symbol = check_symbol(symbol)?;

    let info = match info {
        Ok(Some(info)) => info,
        Ok(None) => return Err(reject(&symbol, RejectReason::NoInfo)),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "provider failed fetching stock info");
            return Err(reject(&symbol, RejectReason::NoInfo));
        }
    };

    let bars = match history {
        Ok(bars) if bars.is_empty() => return Err(reject(&symbol, RejectReason::EmptySeries)),
        Ok(bars) => bars,
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "provider failed fetching price history");
            return Err(reject(&symbol, RejectReason::EmptySeries));
        }
    };

    if let Some(idx) = find_malformed(&bars) {
        warn!(symbol = %symbol, row = idx, "malformed observation in price history");
        return Err(reject(&symbol, RejectReason::MalformedSeries));
    }

    let inconsistent = bars.iter().filter(|b| !b.is_consistent()).count();
    if inconsistent > 0 {
        warn!(
            symbol = %symbol,
            rows = inconsistent,
            "bars violate low <= open, close <= high; indicators use them as-is"
        );
    }

    Ok(Series { symbol, info, bars })
}

fn reject(symbol: &str, reason: RejectReason) -> DashboardError {
    warn!(symbol = %symbol, reason = %reason, "symbol rejected");
    DashboardError::invalid_symbol(symbol, reason)
}

/// Index of the first bar with an unusable value or out-of-order timestamp
fn find_malformed(bars: &[Bar]) -> Option<usize> {
    bars.iter().enumerate().position(|(i, bar)| {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        let bad_price = prices.iter().any(|p| !p.is_finite() || *p < 0.0);
        let out_of_order = i > 0 && bars[i - 1].timestamp >= bar.timestamp;
        bad_price || out_of_order
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    pub(crate) fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    start + Duration::days(i as i64),
                    c,
                    c + 1.0,
                    (c - 1.0).max(0.0),
                    c,
                    1_000 + i as u64,
                )
            })
            .collect()
    }

    pub(crate) fn series_of(symbol: &str, closes: &[f64]) -> Series {
        validate(
            symbol,
            Ok(Some(StockInfo::default())),
            Ok(bars_from_closes(closes)),
        )
        .unwrap()
    }

    fn transport_error() -> ProviderError {
        ProviderError::Transport {
            provider: "test".to_string(),
            detail: "connection reset".to_string(),
        }
    }

    #[test]
    fn test_check_symbol_normalises() {
        assert_eq!(check_symbol(" aapl ").unwrap(), "AAPL");
    }

    #[test]
    fn test_check_symbol_rejects_bad_format() {
        for raw in ["", "   ", "BRK.B", "123", "TOOLONGSYMBOL"] {
            match check_symbol(raw) {
                Err(DashboardError::InvalidSymbol { reason, .. }) => {
                    assert_eq!(reason, RejectReason::BadFormat)
                }
                other => panic!("{:?} accepted: {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_validate_accepts_series() {
        let series = series_of("msft", &[1.0, 2.0, 3.0]);
        assert_eq!(series.symbol(), "MSFT");
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_missing_info_is_invalid_symbol() {
        let err = validate("ZZZZZZ", Ok(None), Ok(bars_from_closes(&[1.0]))).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InvalidSymbol { reason: RejectReason::NoInfo, .. }
        ));
    }

    #[test]
    fn test_empty_history_is_invalid_symbol() {
        let err = validate("AAPL", Ok(Some(StockInfo::default())), Ok(vec![])).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InvalidSymbol { reason: RejectReason::EmptySeries, .. }
        ));
    }

    #[test]
    fn test_provider_errors_normalised() {
        let err = validate("AAPL", Err(transport_error()), Ok(vec![])).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidSymbol { .. }));
        assert!(!err.to_string().contains("connection reset"));

        let err = validate("AAPL", Ok(Some(StockInfo::default())), Err(transport_error()))
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidSymbol { .. }));
    }

    #[test]
    fn test_malformed_series_rejected() {
        let mut bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        bars[1].close = f64::NAN;
        let err = validate("AAPL", Ok(Some(StockInfo::default())), Ok(bars)).unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InvalidSymbol { reason: RejectReason::MalformedSeries, .. }
        ));

        let mut bars = bars_from_closes(&[1.0, 2.0, 3.0]);
        bars[2].timestamp = bars[1].timestamp;
        assert!(validate("AAPL", Ok(Some(StockInfo::default())), Ok(bars)).is_err());
    }

    #[test]
    fn test_inconsistent_bars_are_kept() {
        let mut bars = bars_from_closes(&[5.0, 6.0]);
        bars[0].high = 1.0;
        let series = validate("AAPL", Ok(Some(StockInfo::default())), Ok(bars)).unwrap();
        assert_eq!(series.bars()[0].high, 1.0);
    }
}
