pub mod config;
pub mod error;
pub mod types;

pub use config::{DashboardConfig, IndicatorParameters, ProviderConfig};
pub use error::{DashboardError, IndicatorError, ProviderError, RejectReason, Result};
pub use types::*;
