pub mod loader;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use loader::{load_csv, load_file, load_json, FileProvider};
pub use provider::{MarketDataProvider, ProviderResult};
pub use synthetic::{generate_synthetic_bars, SyntheticProvider};
pub use yahoo::YahooProvider;
