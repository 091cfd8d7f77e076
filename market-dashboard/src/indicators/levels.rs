/// Support and resistance as flat levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportResistance {
    pub support: f64,
    pub resistance: f64,
}

/// Rolling minimum over `window` points; NaN until the window is full
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, f64::INFINITY, f64::min)
}

/// Rolling maximum over `window` points; NaN until the window is full
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, f64::NEG_INFINITY, f64::max)
}

fn rolling(values: &[f64], window: usize, init: f64, f: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if window == 0 || n < window {
        return out;
    }
    for i in (window - 1)..n {
        out[i] = values[i + 1 - window..=i].iter().copied().fold(init, f);
    }
    out
}

/// Mean of the defined values, NaN when there are none
fn mean_defined(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Support = mean of the rolling `window` low minimum,
/// resistance = mean of the rolling `window` high maximum.
///
/// Either level is NaN when the series never fills a window.
pub fn calculate_support_resistance(
    highs: &[f64],
    lows: &[f64],
    window: usize,
) -> SupportResistance {
    SupportResistance {
        support: mean_defined(&rolling_min(lows, window)),
        resistance: mean_defined(&rolling_max(highs, window)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rolling_min_max() {
        let values = vec![3.0, 1.0, 4.0, 1.5, 5.0];
        let min = rolling_min(&values, 3);
        let max = rolling_max(&values, 3);

        assert!(min[0].is_nan() && min[1].is_nan());
        assert_eq!(&min[2..], &[1.0, 1.0, 1.5]);
        assert_eq!(&max[2..], &[4.0, 4.0, 5.0]);
    }

    #[test]
    fn test_support_resistance_means() {
        let highs = vec![10.0, 12.0, 11.0, 13.0];
        let lows = vec![8.0, 9.0, 7.0, 10.0];
        let levels = calculate_support_resistance(&highs, &lows, 2);

        // Rolling mins: 8, 7, 7 ; rolling maxes: 12, 12, 13
        assert_relative_eq!(levels.support, 22.0 / 3.0);
        assert_relative_eq!(levels.resistance, 37.0 / 3.0);
        assert!(levels.support <= levels.resistance);
    }

    #[test]
    fn test_short_series_is_undefined() {
        let levels = calculate_support_resistance(&[1.0, 2.0], &[0.5, 1.5], 14);
        assert!(levels.support.is_nan());
        assert!(levels.resistance.is_nan());
    }
}
