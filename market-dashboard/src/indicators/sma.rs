use std::cmp::Ordering;

use common::Crossover;

/// Calculate Simple Moving Average
///
/// # Arguments
/// * `prices` - Slice of prices
/// * `period` - SMA period
///
/// # Returns
/// Vector of Option<f64>, None for values before enough data is available
pub fn calculate_sma(prices: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut sma = vec![None; n];

    if n < period || period == 0 {
        return sma;
    }

    let mut sum: f64 = prices[..period].iter().sum();
    sma[period - 1] = Some(sum / period as f64);

    // Sliding window for subsequent values
    for i in period..n {
        sum = sum - prices[i - period] + prices[i];
        sma[i] = Some(sum / period as f64);
    }

    sma
}

/// Calculate Simple Moving Average with NaN for unavailable values
pub fn calculate_sma_filled(prices: &[f64], period: usize) -> Vec<f64> {
    calculate_sma(prices, period)
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect()
}

/// Detect changes in relative order between a short and a long moving average
///
/// A crossover is reported at `t` when the sign (-1, 0 or +1) of
/// `short - long` differs from the sign at `t - 1`. A rising sign is `Up` and
/// a falling sign is `Down`, so moving onto the long average from above is
/// `Down` and leaving it upwards is `Up`. Undefined values on either side
/// never register, and the first timestamp is never a crossover.
pub fn detect_crossovers(short: &[f64], long: &[f64]) -> Vec<Crossover> {
    let n = short.len().min(long.len());
    let mut out = vec![Crossover::None; n];
    let mut prev_sign: Option<i8> = None;

    for i in 0..n {
        let (s, l) = (short[i], long[i]);
        if !s.is_finite() || !l.is_finite() {
            prev_sign = None;
            continue;
        }

        let sign = match s.partial_cmp(&l) {
            Some(Ordering::Greater) => 1,
            Some(Ordering::Less) => -1,
            _ => 0,
        };

        out[i] = match prev_sign {
            Some(prev) if sign > prev => Crossover::Up,
            Some(prev) if sign < prev => Crossover::Down,
            _ => Crossover::None,
        };
        prev_sign = Some(sign);
    }

    out
}
