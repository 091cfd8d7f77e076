use super::ema::calculate_ema;

/// MACD result
#[derive(Debug, Clone)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Calculate Moving Average Convergence Divergence
///
/// `MACD = EMA(fast) - EMA(slow)`, `Signal = EMA(MACD, signal)` and
/// `Histogram = MACD - Signal`. All three lines are defined from the first
/// bar on because the EMAs have no warm-up.
///
/// Returns `None` when `fast >= slow` or any span is zero.
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || signal == 0 || fast >= slow {
        return None;
    }

    let fast_ema = calculate_ema(prices, fast);
    let slow_ema = calculate_ema(prices, slow);

    let macd: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = calculate_ema(&macd, signal);
    let histogram = macd
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Some(Macd {
        macd,
        signal: signal_line,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn trending_prices(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.3).sin() * 2.0)
            .collect()
    }

    #[test]
    fn test_histogram_is_macd_minus_signal() {
        let prices = trending_prices(120);
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();

        assert_eq!(macd.macd.len(), prices.len());
        for i in 0..prices.len() {
            assert_abs_diff_eq!(
                macd.histogram[i],
                macd.macd[i] - macd.signal[i],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_macd_first_value_is_zero() {
        // Both EMAs seed from the first close
        let macd = calculate_macd(&trending_prices(10), 12, 26, 9).unwrap();
        assert_eq!(macd.macd[0], 0.0);
        assert_eq!(macd.signal[0], 0.0);
        assert!(macd.macd.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let prices: Vec<f64> = (0..60).map(|i| 50.0 + i as f64).collect();
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert!(macd.macd[59] > 0.0);
        assert!(macd.histogram[59] > 0.0);
    }

    #[test]
    fn test_macd_rejects_bad_spans() {
        let prices = trending_prices(30);
        assert!(calculate_macd(&prices, 26, 12, 9).is_none());
        assert!(calculate_macd(&prices, 0, 26, 9).is_none());
        assert!(calculate_macd(&prices, 12, 26, 0).is_none());
    }
}
