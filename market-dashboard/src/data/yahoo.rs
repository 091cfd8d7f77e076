//! Yahoo Finance provider
//!
//! Fetches fundamentals from the quote endpoint and OHLCV history from the
//! chart endpoint using a blocking client with a request timeout.

use std::time::Duration;

use chrono::DateTime;
use common::{Bar, ProviderConfig, ProviderError, StockInfo};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::provider::{MarketDataProvider, ProviderResult};
use crate::pipeline::period::{Interval, Span};

const PROVIDER: &str = "yahoo";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    quote_response: QuoteResult,
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
    #[serde(default)]
    result: Vec<QuoteInfo>,
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteInfo {
    long_name: Option<String>,
    short_name: Option<String>,
    sector: Option<String>,
    market_cap: Option<f64>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<f64>,
    eps_trailing_twelve_months: Option<f64>,
    trailing_annual_dividend_yield: Option<f64>,
}

/// Yahoo Finance client
#[derive(Debug, Clone)]
pub struct YahooProvider {
    base_url: String,
    client: Client,
}

impl YahooProvider {
    pub fn new(config: &ProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER.to_string(),
                detail: e.to_string(),
            })?;

        debug!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "YahooProvider initialised");

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn chart_url(&self, symbol: &str, span: Span, interval: Interval) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval={}",
            self.base_url,
            symbol,
            span.as_yahoo_str(),
            interval.as_yahoo_str()
        )
    }

    fn quote_url(&self, symbol: &str) -> String {
        format!("{}/v7/finance/quote?symbols={}", self.base_url, symbol)
    }

    /// GET `url`; `Ok(None)` on 404
    fn get_text(&self, url: &str) -> ProviderResult<Option<String>> {
        let response = self.client.get(url).send().map_err(transport_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = response.text().map_err(transport_error)?;
        if !status.is_success() {
            return Err(ProviderError::Api {
                provider: PROVIDER.to_string(),
                code: status.as_u16().to_string(),
                description: body.chars().take(200).collect(),
            });
        }
        Ok(Some(body))
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout {
            provider: PROVIDER.to_string(),
        }
    } else {
        ProviderError::Transport {
            provider: PROVIDER.to_string(),
            detail: err.to_string(),
        }
    }
}

fn parse_error(detail: impl ToString) -> ProviderError {
    ProviderError::Parse {
        provider: PROVIDER.to_string(),
        detail: detail.to_string(),
    }
}

fn api_error(body: ApiErrorBody) -> ProviderError {
    ProviderError::Api {
        provider: PROVIDER.to_string(),
        code: body.code,
        description: body.description,
    }
}

/// Parse a chart response; rows with a missing field are skipped
fn parse_chart_response(json: &str) -> ProviderResult<Vec<Bar>> {
    let response: ChartResponse = serde_json::from_str(json).map_err(parse_error)?;

    if let Some(error) = response.chart.error {
        // Unknown tickers are an empty answer, not a failure
        if error.code == "Not Found" {
            return Ok(vec![]);
        }
        return Err(api_error(error));
    }

    let Some(data) = response.chart.result.as_ref().and_then(|r| r.first()) else {
        return Ok(vec![]);
    };
    let Some(quote) = data.indicators.quote.first() else {
        return Ok(vec![]);
    };

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let field = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        if let (Some(o), Some(h), Some(l), Some(c), Some(v), Some(timestamp)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
            volume,
            DateTime::from_timestamp(ts, 0),
        ) {
            bars.push(Bar::new(timestamp, o, h, l, c, v));
        }
    }

    Ok(bars)
}

fn parse_quote_response(json: &str) -> ProviderResult<Option<StockInfo>> {
    let response: QuoteResponse = serde_json::from_str(json).map_err(parse_error)?;
    if let Some(error) = response.quote_response.error {
        return Err(api_error(error));
    }

    Ok(response
        .quote_response
        .result
        .into_iter()
        .next()
        .map(|q| StockInfo {
            name: q.long_name.or(q.short_name),
            sector: q.sector,
            market_cap: q.market_cap,
            trailing_pe: q.trailing_pe,
            trailing_eps: q.eps_trailing_twelve_months,
            dividend_yield: q.trailing_annual_dividend_yield,
        }))
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(skip(self), name = "yahoo::fetch_info")]
    fn fetch_info(&self, symbol: &str) -> ProviderResult<Option<StockInfo>> {
        match self.get_text(&self.quote_url(symbol))? {
            Some(body) => parse_quote_response(&body),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), name = "yahoo::fetch_history")]
    fn fetch_history(
        &self,
        symbol: &str,
        span: Span,
        interval: Interval,
    ) -> ProviderResult<Vec<Bar>> {
        let Some(body) = self.get_text(&self.chart_url(symbol, span, interval))? else {
            return Ok(vec![]);
        };
        let bars = parse_chart_response(&body)?;
        if bars.is_empty() {
            warn!(symbol, "chart endpoint returned no complete rows");
        }
        Ok(bars)
    }
}
