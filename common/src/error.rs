use std::fmt;

use thiserror::Error;

/// Why a symbol was rejected before any indicator ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Empty, too long, or not purely alphabetic
    BadFormat,
    /// Provider had no informational record (or could not be reached)
    NoInfo,
    /// Provider returned no observations
    EmptySeries,
    /// Observations with non-finite/negative values or a non-increasing index
    MalformedSeries,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::BadFormat => "symbols must be 1-10 letters",
            RejectReason::NoInfo => "no stock information is available",
            RejectReason::EmptySeries => "no price history is available",
            RejectReason::MalformedSeries => "the price history is malformed",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Unable to fetch stock data for '{symbol}': {reason}. Please check the stock symbol and try again.")]
    InvalidSymbol { symbol: String, reason: RejectReason },

    #[error("Unknown time period '{label}'. Please choose one of the listed periods.")]
    InvalidPeriod { label: String },

    #[error("Some indicators for {symbol} could not be computed: {}", failed.join(", "))]
    ComputationDegraded { symbol: String, failed: Vec<String> },

    #[error("The {provider} data source is currently unavailable. Please try again later.")]
    ProviderUnavailable { provider: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Data loading error: {0}")]
    DataLoadError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DashboardError {
    pub fn invalid_symbol(symbol: impl Into<String>, reason: RejectReason) -> Self {
        DashboardError::InvalidSymbol {
            symbol: symbol.into(),
            reason,
        }
    }
}

/// Failures raised inside a data provider.
///
/// These carry raw transport detail for the logs and never reach the end
/// user verbatim: the validator folds them into `InvalidSymbol`, and other
/// collaborator paths convert them into `ProviderUnavailable`.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("{provider}: request failed: {detail}")]
    Transport { provider: String, detail: String },

    #[error("{provider}: request timed out")]
    Timeout { provider: String },

    #[error("{provider}: failed to parse response: {detail}")]
    Parse { provider: String, detail: String },

    #[error("{provider}: API error [{code}]: {description}")]
    Api {
        provider: String,
        code: String,
        description: String,
    },
}

impl ProviderError {
    pub fn provider(&self) -> &str {
        match self {
            ProviderError::Transport { provider, .. }
            | ProviderError::Timeout { provider }
            | ProviderError::Parse { provider, .. }
            | ProviderError::Api { provider, .. } => provider,
        }
    }
}

impl From<ProviderError> for DashboardError {
    fn from(err: ProviderError) -> Self {
        DashboardError::ProviderUnavailable {
            provider: err.provider().to_string(),
        }
    }
}

/// Failure of a single indicator; the pipeline keeps going without it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("{indicator}: invalid parameter: {reason}")]
    InvalidParameter {
        indicator: &'static str,
        reason: String,
    },

    #[error("{indicator}: required column '{column}' is missing")]
    MissingColumn {
        indicator: &'static str,
        column: String,
    },

    #[error("column '{column}' has {actual} rows, table has {expected}")]
    Misaligned {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("column '{0}' already exists")]
    DuplicateColumn(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
