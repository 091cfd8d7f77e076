use std::sync::Arc;

use common::{Bar, ProviderError, StockInfo};

use crate::pipeline::period::{Interval, Span};

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Source of fundamentals and price history.
///
/// Empty answers (`Ok(None)`, `Ok(vec![])`) are valid outcomes, not errors.
/// Implementations bound their own I/O with a timeout and never retry.
pub trait MarketDataProvider: Send + Sync {
    /// Provider name, used in logs and user-facing messages
    fn name(&self) -> &str;

    fn fetch_info(&self, symbol: &str) -> ProviderResult<Option<StockInfo>>;

    /// Bars in increasing timestamp order
    fn fetch_history(
        &self,
        symbol: &str,
        span: Span,
        interval: Interval,
    ) -> ProviderResult<Vec<Bar>>;
}

impl<P: MarketDataProvider + ?Sized> MarketDataProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_info(&self, symbol: &str) -> ProviderResult<Option<StockInfo>> {
        (**self).fetch_info(symbol)
    }

    fn fetch_history(
        &self,
        symbol: &str,
        span: Span,
        interval: Interval,
    ) -> ProviderResult<Vec<Bar>> {
        (**self).fetch_history(symbol, span, interval)
    }
}
