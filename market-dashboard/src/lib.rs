pub mod correlation;
pub mod data;
pub mod economic;
pub mod export;
pub mod indicators;
pub mod news;
pub mod pipeline;
pub mod watchlist;

pub use correlation::{correlation_matrix, CorrelationMatrix, DEFAULT_COLUMNS};
pub use data::{FileProvider, MarketDataProvider, SyntheticProvider, YahooProvider};
pub use export::{bars_to_csv, csv_file_name, save_csv, to_csv};
pub use pipeline::{resolve, AugmentedTable, Column, ColumnValues, Pipeline, PeriodSpec, Series};
pub use watchlist::{
    parse_symbols, watchlist_signals, watchlist_snapshot, JsonWatchlist, MemoryWatchlist,
    WatchlistEntry, WatchlistSignal, WatchlistStore,
};

// Re-export common types
pub use common::{
    Bar, Crossover, DashboardConfig, DashboardError, IndicatorParameters, ProviderConfig,
    RejectReason, Result, StockInfo,
};
