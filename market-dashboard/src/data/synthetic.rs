use chrono::{DateTime, Duration, NaiveTime, Utc};
use common::{Bar, StockInfo};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{MarketDataProvider, ProviderResult};
use crate::pipeline::period::{Interval, Span};

/// Upper bound on generated bars per request
const MAX_BARS: usize = 5_000;

/// Generate random-walk OHLCV bars ending at `end`, one every `step`
pub fn generate_synthetic_bars(
    rng: &mut impl Rng,
    count: usize,
    initial_price: f64,
    end: DateTime<Utc>,
    step: Duration,
) -> Vec<Bar> {
    let mut bars = Vec::with_capacity(count);
    let mut price = initial_price;

    let daily_volatility = 0.02;
    let drift = 0.0003;

    for i in 0..count {
        let timestamp = end - step * (count - 1 - i) as i32;

        let random_return: f64 = rng.gen_range(-1.0..1.0);
        let daily_return = drift + daily_volatility * random_return;
        let new_price = (price * (1.0 + daily_return)).max(0.01);

        let intraday_range = price * rng.gen_range(0.005..0.03);
        let open = (price + rng.gen_range(-intraday_range / 2.0..intraday_range / 2.0)).max(0.01);
        let close = new_price;

        let high = open.max(close) + rng.gen_range(0.0..intraday_range / 2.0);
        let low = (open.min(close) - rng.gen_range(0.0..intraday_range / 2.0)).max(0.0);

        // Volume rises on volatile bars
        let base_volume = 20_000_000u64;
        let volume_multiplier = 1.0 + daily_return.abs() * 10.0;
        let volume = (base_volume as f64 * volume_multiplier * rng.gen_range(0.8..1.2)) as u64;

        bars.push(Bar::new(timestamp, open, high, low, close, volume));
        price = new_price;
    }

    bars
}

/// Deterministic provider for demos and tests: every symbol is known and
/// the same symbol always yields the same bars for the same `end`.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    seed: u64,
    end: DateTime<Utc>,
    initial_price: f64,
}

impl SyntheticProvider {
    /// History ends at today's midnight (UTC)
    pub fn new(seed: u64) -> Self {
        let today = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        Self::with_end(seed, today)
    }

    pub fn with_end(seed: u64, end: DateTime<Utc>) -> Self {
        Self {
            seed,
            end,
            initial_price: 100.0,
        }
    }

    pub fn with_initial_price(mut self, price: f64) -> Self {
        self.initial_price = price;
        self
    }

    fn rng_for(&self, symbol: &str) -> StdRng {
        // FNV-1a so the stream does not depend on the std hasher
        let hash = symbol.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });
        StdRng::seed_from_u64(self.seed ^ hash)
    }
}

fn step_of(interval: Interval) -> Duration {
    match interval {
        Interval::Minute5 => Duration::minutes(5),
        Interval::Minute15 => Duration::minutes(15),
        Interval::Hour1 => Duration::hours(1),
        Interval::Daily => Duration::days(1),
    }
}

impl MarketDataProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch_info(&self, symbol: &str) -> ProviderResult<Option<StockInfo>> {
        Ok(Some(StockInfo {
            name: Some(format!("{} (synthetic)", symbol)),
            ..Default::default()
        }))
    }

    fn fetch_history(
        &self,
        symbol: &str,
        span: Span,
        interval: Interval,
    ) -> ProviderResult<Vec<Bar>> {
        let step = step_of(interval);
        let start = span
            .start_from(self.end)
            .unwrap_or_else(|| self.end - Duration::days(365 * 20));
        let steps = ((self.end - start).num_seconds() / step.num_seconds()).max(0) as usize;
        let count = (steps + 1).min(MAX_BARS);

        let mut rng = self.rng_for(symbol);
        Ok(generate_synthetic_bars(
            &mut rng,
            count,
            self.initial_price,
            self.end,
            step,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn provider() -> SyntheticProvider {
        SyntheticProvider::with_end(7, Utc.with_ymd_and_hms(2024, 6, 28, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_generate_synthetic_bars() {
        let mut rng = StdRng::seed_from_u64(1);
        let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = generate_synthetic_bars(&mut rng, 100, 50.0, end, Duration::days(1));

        assert_eq!(bars.len(), 100);
        assert_eq!(bars[99].timestamp, end);
        for bar in &bars {
            assert!(bar.high >= bar.low);
            assert!(bar.high >= bar.open);
            assert!(bar.high >= bar.close);
            assert!(bar.low <= bar.open);
            assert!(bar.low <= bar.close);
            assert!(bar.volume > 0);
        }
        for pair in bars.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn test_same_symbol_same_bars() {
        let a = provider()
            .fetch_history("AAPL", Span::Months(3), Interval::Daily)
            .unwrap();
        let b = provider()
            .fetch_history("AAPL", Span::Months(3), Interval::Daily)
            .unwrap();
        let c = provider()
            .fetch_history("MSFT", Span::Months(3), Interval::Daily)
            .unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_span_controls_bar_count() {
        // 2024-05-28 .. 2024-06-28 inclusive
        let bars = provider()
            .fetch_history("AAPL", Span::Months(1), Interval::Daily)
            .unwrap();
        assert_eq!(bars.len(), 32);

        let hourly = provider()
            .fetch_history("AAPL", Span::Days(60), Interval::Hour1)
            .unwrap();
        assert_eq!(hourly.len(), 60 * 24 + 1);

        let max = provider()
            .fetch_history("AAPL", Span::Max, Interval::Daily)
            .unwrap();
        assert_eq!(max.len(), MAX_BARS);
    }
}
