pub mod period;
pub mod table;
pub mod validator;

pub use period::{resolve, Interval, PeriodSpec, Span};
pub use table::{AugmentedTable, Column, ColumnValues, IndicatorFailure, BASE_COLUMNS};
pub use validator::{check_symbol, validate, Series};

use std::sync::Arc;
use std::time::Instant;

use common::{IndicatorParameters, Result};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::data::MarketDataProvider;
use crate::indicators::{compute_crossover, IndicatorKind, PriceSeries, CROSSOVER_COLUMN};

/// Builds augmented tables for a symbol and period label
pub struct Pipeline {
    provider: Arc<dyn MarketDataProvider>,
    params: IndicatorParameters,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn MarketDataProvider>, params: IndicatorParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { provider, params })
    }

    /// Pipeline with parameters taken as given
    #[cfg(test)]
    pub(crate) fn new_unchecked(
        provider: Arc<dyn MarketDataProvider>,
        params: IndicatorParameters,
    ) -> Self {
        Self { provider, params }
    }

    pub fn provider(&self) -> &dyn MarketDataProvider {
        self.provider.as_ref()
    }

    pub fn params(&self) -> &IndicatorParameters {
        &self.params
    }

    /// Fetch, validate and augment the series of `symbol` over `period`
    ///
    /// The period is resolved and the symbol format checked before any
    /// provider call. A table with failed indicators is still returned; see
    /// [`AugmentedTable::status`].
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub fn build(&self, symbol: &str, period: &str) -> Result<AugmentedTable> {
        let spec = resolve(period)?;
        let symbol = check_symbol(symbol)?;

        let info = self.provider.fetch_info(&symbol);
        // No point asking for history of a symbol the provider does not know
        let history = match &info {
            Ok(Some(_)) => self.provider.fetch_history(&symbol, spec.span, spec.interval),
            _ => Ok(vec![]),
        };

        let series = validate(&symbol, info, history)?;
        debug!(rows = series.len(), interval = %spec.interval, "series validated");
        Ok(self.compute(series))
    }

    /// Run every indicator over a validated series and merge the columns
    pub fn compute(&self, series: Series) -> AugmentedTable {
        let start = Instant::now();
        let prices = PriceSeries::from_bars(series.bars());
        let mut table = AugmentedTable::new(series);

        let results: Vec<_> = IndicatorKind::ALL
            .par_iter()
            .map(|kind| (*kind, kind.compute(&prices, &self.params)))
            .collect();

        for (kind, result) in results {
            let merged = result.and_then(|columns| table.insert_all(columns));
            if let Err(e) = merged {
                warn!(symbol = table.symbol(), indicator = kind.name(), error = %e, "indicator failed");
                table.record_failure(kind.name(), &e);
            }
        }

        // Needs both SMA columns in the table
        let crossover =
            compute_crossover(&table, &self.params).and_then(|column| table.insert_all(vec![column]));
        if let Err(e) = crossover {
            warn!(symbol = table.symbol(), error = %e, "crossover not computed");
            table.record_failure(CROSSOVER_COLUMN, &e);
        }

        info!(
            symbol = table.symbol(),
            rows = table.len(),
            columns = table.columns().len(),
            failed = table.failures().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "table built"
        );
        table
    }

    /// Like [`Pipeline::build`], but a degraded table is an error
    pub fn build_strict(&self, symbol: &str, period: &str) -> Result<AugmentedTable> {
        let table = self.build(symbol, period)?;
        table.status()?;
        Ok(table)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("provider", &self.provider.name())
            .field("params", &self.params)
            .finish()
    }
}

/// Build tables for several symbols, keeping per-symbol outcomes in order
pub(crate) fn build_many(
    pipeline: &Pipeline,
    symbols: &[String],
    period: &str,
) -> Vec<(String, Result<AugmentedTable>)> {
    symbols
        .par_iter()
        .map(|s| (s.clone(), pipeline.build(s, period)))
        .collect()
}
