/// One retracement level broadcast over the whole series
#[derive(Debug, Clone, PartialEq)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

impl FibLevel {
    /// Column name with the integer-truncated percentage, e.g. `Fib_23` for 0.236
    pub fn column_name(&self) -> String {
        format!("Fib_{}", (self.ratio * 100.0 + 1e-9).floor() as i64)
    }
}

/// Fibonacci retracement levels over the full series range
///
/// Each level is anchored at the series high: `high - ratio * (high - low)`,
/// so ratio 0 is the highest high and ratio 1 the lowest low. Levels are
/// static, not rolling. Returns an empty vector when there is no price data.
pub fn calculate_fibonacci_levels(highs: &[f64], lows: &[f64], ratios: &[f64]) -> Vec<FibLevel> {
    let high = highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let low = lows.iter().copied().fold(f64::INFINITY, f64::min);
    if !high.is_finite() || !low.is_finite() {
        return vec![];
    }

    let range = high - low;
    ratios
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: high - ratio * range,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const RATIOS: [f64; 6] = [0.0, 0.236, 0.382, 0.5, 0.618, 1.0];

    #[test]
    fn test_levels_anchor_high_to_low() {
        let highs = vec![105.0, 110.0, 108.0];
        let lows = vec![100.0, 102.0, 90.0];
        let levels = calculate_fibonacci_levels(&highs, &lows, &RATIOS);

        assert_eq!(levels.len(), 6);
        assert_eq!(levels[0].price, 110.0);
        assert_eq!(levels[5].price, 90.0);
        assert_relative_eq!(levels[3].price, 100.0);
        assert_relative_eq!(levels[1].price, 110.0 - 0.236 * 20.0);
    }

    #[test]
    fn test_single_point_levels_equal() {
        let levels = calculate_fibonacci_levels(&[50.0], &[50.0], &RATIOS);
        assert!(levels.iter().all(|l| l.price == 50.0));
    }

    #[test]
    fn test_column_names() {
        let names: Vec<String> = RATIOS
            .iter()
            .map(|&ratio| FibLevel { ratio, price: 0.0 }.column_name())
            .collect();
        assert_eq!(
            names,
            vec!["Fib_0", "Fib_23", "Fib_38", "Fib_50", "Fib_61", "Fib_100"]
        );
    }

    #[test]
    fn test_empty_series() {
        assert!(calculate_fibonacci_levels(&[], &[], &RATIOS).is_empty());
    }
}
