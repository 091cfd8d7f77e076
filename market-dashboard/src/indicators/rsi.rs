/// Calculate RSI using Wilder's Smoothing (Exponential Moving Average)
///
/// `RSI = 100 * avg_gain / (avg_gain + avg_loss)`, with the averages seeded by
/// the simple mean of the first `period` deltas and smoothed with
/// `alpha = 1 / period` afterwards. A zero average loss yields 100.
///
/// # Arguments
/// * `prices` - Slice of closing prices
/// * `period` - RSI period (typically 14)
///
/// # Returns
/// Vector of RSI values (same length as input, NaN for the first `period` bars)
pub fn calculate_rsi(prices: &[f64], period: usize) -> Vec<f64> {
    let n = prices.len();
    let mut rsi = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return rsi;
    }

    let alpha = 1.0 / period as f64;

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let delta = prices[i] - prices[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss += delta.abs();
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    rsi[period] = rsi_value(avg_gain, avg_loss);

    for i in (period + 1)..n {
        let delta = prices[i] - prices[i - 1];
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = avg_gain * (1.0 - alpha) + gain * alpha;
        avg_loss = avg_loss * (1.0 - alpha) + loss * alpha;
        rsi[i] = rsi_value(avg_gain, avg_loss);
    }

    rsi
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    (100.0 * avg_gain / (avg_gain + avg_loss)).clamp(0.0, 100.0)
}
