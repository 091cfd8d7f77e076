//! Tracked symbols
//!
//! Stores keep symbols unique and in insertion order. Every mutation runs
//! under the store's write lock, so concurrent adds of the same symbol
//! cannot produce duplicates.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use common::{Crossover, DashboardError, ProviderError, Result};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::MarketDataProvider;
use crate::indicators::CROSSOVER_COLUMN;
use crate::pipeline::{build_many, check_symbol, resolve, Interval, Pipeline, Span};

pub trait WatchlistStore: Send + Sync {
    /// Track `symbol`; `Ok(false)` if it was already tracked
    fn add(&self, symbol: &str) -> Result<bool>;

    /// Stop tracking `symbol`; `Ok(false)` if it was not tracked
    fn remove(&self, symbol: &str) -> Result<bool>;

    fn list(&self) -> Result<Vec<String>>;
}

/// Split comma separated user input into normalised symbols
///
/// Blank entries are skipped and repeats collapsed; the first bad entry
/// fails the whole input.
pub fn parse_symbols(input: &str) -> Result<Vec<String>> {
    let mut symbols: Vec<String> = Vec::new();
    for raw in input.split(',').filter(|s| !s.trim().is_empty()) {
        let symbol = check_symbol(raw)?;
        if !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}

fn insert(symbols: &mut Vec<String>, symbol: String) -> bool {
    if symbols.contains(&symbol) {
        return false;
    }
    symbols.push(symbol);
    true
}

fn delete(symbols: &mut Vec<String>, symbol: &str) -> bool {
    let before = symbols.len();
    symbols.retain(|s| s != symbol);
    symbols.len() != before
}

#[derive(Debug, Default)]
pub struct MemoryWatchlist {
    symbols: RwLock<Vec<String>>,
}

impl MemoryWatchlist {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WatchlistStore for MemoryWatchlist {
    fn add(&self, symbol: &str) -> Result<bool> {
        let symbol = check_symbol(symbol)?;
        Ok(insert(&mut self.symbols.write(), symbol))
    }

    fn remove(&self, symbol: &str) -> Result<bool> {
        let symbol = check_symbol(symbol)?;
        Ok(delete(&mut self.symbols.write(), &symbol))
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.symbols.read().clone())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WatchlistFile {
    symbols: Vec<String>,
}

/// Watchlist persisted as a JSON document
#[derive(Debug)]
pub struct JsonWatchlist {
    path: PathBuf,
    symbols: RwLock<Vec<String>>,
}

impl JsonWatchlist {
    /// Open the store at `path`; a missing file is an empty watchlist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let symbols = if path.is_file() {
            let file = File::open(&path)?;
            let stored: WatchlistFile = serde_json::from_reader(BufReader::new(file))?;
            stored.symbols
        } else {
            Vec::new()
        };
        debug!(path = %path.display(), count = symbols.len(), "watchlist opened");

        Ok(Self {
            path,
            symbols: RwLock::new(symbols),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write through a sibling temp file so a crash never leaves half a document
    fn persist(&self, symbols: &[String]) -> Result<()> {
        let doc = WatchlistFile {
            symbols: symbols.to_vec(),
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&doc)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn mutate(&self, f: impl FnOnce(&mut Vec<String>) -> bool) -> Result<bool> {
        let mut symbols = self.symbols.write();
        let mut next = symbols.clone();
        let changed = f(&mut next);
        if changed {
            self.persist(&next)?;
            *symbols = next;
        }
        Ok(changed)
    }
}

impl WatchlistStore for JsonWatchlist {
    fn add(&self, symbol: &str) -> Result<bool> {
        let symbol = check_symbol(symbol)?;
        let added = self.mutate(|s| insert(s, symbol.clone()))?;
        if added {
            info!(symbol = %symbol, "added to watchlist");
        }
        Ok(added)
    }

    fn remove(&self, symbol: &str) -> Result<bool> {
        let symbol = check_symbol(symbol)?;
        let removed = self.mutate(|s| delete(s, &symbol))?;
        if removed {
            info!(symbol = %symbol, "removed from watchlist");
        }
        Ok(removed)
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.symbols.read().clone())
    }
}

/// Latest price line for one tracked symbol; fields are `None` when unknown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub name: Option<String>,
    pub last_close: Option<f64>,
    /// Percent change between the two latest closes
    pub change_pct: Option<f64>,
}

impl WatchlistEntry {
    fn unknown(symbol: String) -> Self {
        Self {
            symbol,
            name: None,
            last_close: None,
            change_pct: None,
        }
    }
}

fn snapshot_one(
    provider: &dyn MarketDataProvider,
    symbol: &str,
) -> std::result::Result<WatchlistEntry, ProviderError> {
    let name = provider.fetch_info(symbol)?.and_then(|info| info.name);
    let bars = provider.fetch_history(symbol, Span::Days(5), Interval::Daily)?;

    let last = bars.last().map(|b| b.close);
    let prev = bars.len().checked_sub(2).map(|i| bars[i].close);
    let change_pct = match (last, prev) {
        (Some(l), Some(p)) if p != 0.0 => Some((l - p) / p * 100.0),
        _ => None,
    };

    Ok(WatchlistEntry {
        symbol: symbol.to_string(),
        name,
        last_close: last,
        change_pct,
    })
}

/// Price line for every tracked symbol, in watchlist order
///
/// A symbol the provider fails on is listed with unknown fields. If the
/// provider fails on every symbol it is reported as unavailable.
pub fn watchlist_snapshot(
    provider: &dyn MarketDataProvider,
    store: &dyn WatchlistStore,
) -> Result<Vec<WatchlistEntry>> {
    let symbols = store.list()?;
    let results: Vec<_> = symbols
        .into_par_iter()
        .map(|symbol| {
            let outcome = snapshot_one(provider, &symbol);
            (symbol, outcome)
        })
        .collect();

    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 && failed == results.len() {
        if let Some((_, Err(e))) = results.into_iter().next() {
            warn!(provider = provider.name(), error = %e, "watchlist snapshot failed for every symbol");
            return Err(DashboardError::from(e));
        }
        return Ok(vec![]);
    }

    Ok(results
        .into_iter()
        .map(|(symbol, outcome)| match outcome {
            Ok(entry) => entry,
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "no quote for watchlist symbol");
                WatchlistEntry::unknown(symbol)
            }
        })
        .collect())
}

/// Indicator summary for one tracked symbol
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistSignal {
    pub symbol: String,
    /// RSI at the latest bar
    pub rsi: Option<f64>,
    pub last_crossover: Option<(DateTime<Utc>, Crossover)>,
    /// Why no table could be built
    pub error: Option<String>,
}

/// Latest RSI and most recent SMA crossover for every tracked symbol over
/// `period`, in watchlist order
pub fn watchlist_signals(
    pipeline: &Pipeline,
    store: &dyn WatchlistStore,
    period: &str,
) -> Result<Vec<WatchlistSignal>> {
    resolve(period)?;
    let symbols = store.list()?;

    Ok(build_many(pipeline, &symbols, period)
        .into_iter()
        .map(|(symbol, outcome)| match outcome {
            Ok(table) => WatchlistSignal {
                rsi: table
                    .values("RSI")
                    .and_then(|v| v.last().copied())
                    .filter(|v| v.is_finite()),
                last_crossover: table
                    .crossover_points(CROSSOVER_COLUMN)
                    .last()
                    .map(|(bar, direction)| (bar.timestamp, *direction)),
                symbol,
                error: None,
            },
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "no signals for watchlist symbol");
                WatchlistSignal {
                    symbol,
                    rsi: None,
                    last_crossover: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ProviderResult, SyntheticProvider};
    use chrono::{TimeZone, Utc};
    use common::{Bar, IndicatorParameters, StockInfo};
    use std::sync::Arc;

    #[test]
    fn test_parse_symbols() {
        assert_eq!(
            parse_symbols("aapl, msft,,AAPL , goog").unwrap(),
            vec!["AAPL", "MSFT", "GOOG"]
        );
        assert!(parse_symbols("aapl, brk.b").is_err());
        assert!(parse_symbols(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_is_idempotent() {
        let store = MemoryWatchlist::new();
        assert!(store.add("aapl").unwrap());
        assert!(!store.add("AAPL").unwrap());
        assert!(store.add("MSFT").unwrap());
        assert_eq!(store.list().unwrap(), vec!["AAPL", "MSFT"]);

        assert!(store.remove("aapl").unwrap());
        assert!(!store.remove("aapl").unwrap());
        assert_eq!(store.list().unwrap(), vec!["MSFT"]);
        assert!(store.add("TOOLONGSYMBOL").is_err());
    }

    #[test]
    fn test_concurrent_adds_do_not_duplicate() {
        let store = Arc::new(MemoryWatchlist::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for s in ["AAPL", "MSFT", "NVDA"] {
                        store.add(s).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn test_json_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchlist.json");

        let store = JsonWatchlist::open(&path).unwrap();
        assert!(store.list().unwrap().is_empty());
        store.add("nvda").unwrap();
        store.add("amd").unwrap();
        store.add("NVDA").unwrap();
        store.remove("AMD").unwrap();
        store.add("intc").unwrap();

        let reopened = JsonWatchlist::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap(), vec!["NVDA", "INTC"]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_snapshot_reports_change() {
        let store = MemoryWatchlist::new();
        store.add("AAPL").unwrap();
        store.add("MSFT").unwrap();
        let provider =
            SyntheticProvider::with_end(3, Utc.with_ymd_and_hms(2024, 6, 28, 0, 0, 0).unwrap());

        let entries = watchlist_snapshot(&provider, &store).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].symbol, "AAPL");
        assert_eq!(entries[1].symbol, "MSFT");
        for entry in &entries {
            assert!(entry.last_close.is_some());
            assert!(entry.change_pct.is_some());
        }
    }

    struct FlakyProvider;

    impl MarketDataProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        fn fetch_info(&self, symbol: &str) -> ProviderResult<Option<StockInfo>> {
            if symbol == "DOWN" {
                return Err(ProviderError::Timeout {
                    provider: "flaky".to_string(),
                });
            }
            Ok(Some(StockInfo::default()))
        }

        fn fetch_history(&self, _: &str, _: Span, _: Interval) -> ProviderResult<Vec<Bar>> {
            let t = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
            Ok(vec![Bar::new(t, 10.0, 10.0, 10.0, 10.0, 1)])
        }
    }

    #[test]
    fn test_snapshot_keeps_failing_symbol() {
        let store = MemoryWatchlist::new();
        store.add("DOWN").unwrap();
        store.add("UP").unwrap();

        let entries = watchlist_snapshot(&FlakyProvider, &store).unwrap();
        assert_eq!(entries[0], WatchlistEntry::unknown("DOWN".to_string()));
        assert_eq!(entries[1].last_close, Some(10.0));
        assert_eq!(entries[1].change_pct, None);
    }

    #[test]
    fn test_snapshot_all_failing_is_unavailable() {
        let store = MemoryWatchlist::new();
        store.add("DOWN").unwrap();
        assert!(matches!(
            watchlist_snapshot(&FlakyProvider, &store),
            Err(DashboardError::ProviderUnavailable { .. })
        ));
    }

    #[test]
    fn test_signals_per_symbol() {
        let store = MemoryWatchlist::new();
        store.add("DOWN").unwrap();
        store.add("UP").unwrap();
        let pipeline = Pipeline::new(Arc::new(FlakyProvider), IndicatorParameters::default()).unwrap();

        let signals = watchlist_signals(&pipeline, &store, "1mo").unwrap();
        let symbols: Vec<_> = signals.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["DOWN", "UP"]);
        assert!(signals[0].error.is_some());
        // A single bar has no RSI and no crossover
        assert_eq!(signals[1].error, None);
        assert_eq!(signals[1].rsi, None);
        assert_eq!(signals[1].last_crossover, None);
    }

    #[test]
    fn test_signals_over_long_period() {
        let store = MemoryWatchlist::new();
        store.add("AAPL").unwrap();
        store.add("MSFT").unwrap();
        let provider =
            SyntheticProvider::with_end(7, Utc.with_ymd_and_hms(2024, 6, 28, 0, 0, 0).unwrap());
        let pipeline = Pipeline::new(Arc::new(provider), IndicatorParameters::default()).unwrap();

        let signals = watchlist_signals(&pipeline, &store, "2y").unwrap();
        assert_eq!(signals.len(), 2);
        for signal in &signals {
            assert!(signal.error.is_none());
            let rsi = signal.rsi.unwrap();
            assert!((0.0..=100.0).contains(&rsi));
            if let Some((_, direction)) = signal.last_crossover {
                assert!(direction.is_cross());
            }
        }

        assert!(matches!(
            watchlist_signals(&pipeline, &store, "1century"),
            Err(DashboardError::InvalidPeriod { .. })
        ));
    }
}
