/// Calculate Exponential Moving Average
///
/// Recursive weighting with `alpha = 2 / (span + 1)`, seeded from the first
/// value. There is no warm-up: every output is defined as long as the input
/// is.
///
/// # Arguments
/// * `values` - Slice of values (usually closing prices)
/// * `span` - EMA span
///
/// # Returns
/// Vector of EMA values, empty when `values` is empty or `span` is zero
pub fn calculate_ema(values: &[f64], span: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 || span == 0 {
        return vec![];
    }

    let mut ema = vec![0.0; n];
    let alpha = 2.0 / (span as f64 + 1.0);

    ema[0] = values[0];
    for i in 1..n {
        ema[i] = (values[i] - ema[i - 1]) * alpha + ema[i - 1];
    }

    ema
}
