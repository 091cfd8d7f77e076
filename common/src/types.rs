use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DashboardError, Result};

/// Marker shown wherever an upstream field is missing
pub const UNKNOWN: &str = "N/A";

/// OHLCV bar data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `low <= open, close <= high`
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }
}

/// Fundamentals record for a ticker; every field may be unknown upstream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockInfo {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub dividend_yield: Option<f64>,
}

impl StockInfo {
    pub fn market_cap_display(&self) -> String {
        match self.market_cap {
            Some(cap) if cap.is_finite() => format!("${}", group_thousands(cap.round())),
            _ => UNKNOWN.to_string(),
        }
    }

    pub fn pe_display(&self) -> String {
        fmt_or_unknown(self.trailing_pe, |v| format!("{:.2}", v))
    }

    pub fn eps_display(&self) -> String {
        fmt_or_unknown(self.trailing_eps, |v| format!("${:.2}", v))
    }

    /// Upstream reports yield as a fraction (0.0051 -> "0.51%")
    pub fn dividend_yield_display(&self) -> String {
        fmt_or_unknown(self.dividend_yield, |v| format!("{:.2}%", v * 100.0))
    }
}

fn fmt_or_unknown(value: Option<f64>, f: impl Fn(f64) -> String) -> String {
    match value {
        Some(v) if v.is_finite() => f(v),
        _ => UNKNOWN.to_string(),
    }
}

fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0.0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Change in relative order of the short and long SMA at one timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crossover {
    /// Short SMA moved above the long SMA (golden cross)
    Up,
    /// Short SMA moved below the long SMA (death cross)
    Down,
    #[default]
    None,
}

impl Crossover {
    pub fn is_cross(self) -> bool {
        !matches!(self, Crossover::None)
    }
}

impl fmt::Display for Crossover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Crossover::Up => "up",
            Crossover::Down => "down",
            Crossover::None => "none",
        };
        f.pad(s)
    }
}

/// News article reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// Sentiment of one text: compound in [-1, 1], proportions summing to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub compound: f64,
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentScores {
    /// Validate a raw score and renormalise the proportions to sum to 1
    pub fn new(compound: f64, positive: f64, negative: f64, neutral: f64) -> Result<Self> {
        if !compound.is_finite() || !(-1.0..=1.0).contains(&compound) {
            return Err(DashboardError::InvalidParameter(format!(
                "compound sentiment {} outside [-1, 1]",
                compound
            )));
        }
        let parts = [positive, negative, neutral];
        if parts.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(DashboardError::InvalidParameter(
                "sentiment proportions must be non-negative".to_string(),
            ));
        }
        let total: f64 = parts.iter().sum();
        if total == 0.0 {
            return Err(DashboardError::InvalidParameter(
                "sentiment proportions are all zero".to_string(),
            ));
        }

        Ok(Self {
            compound,
            positive: positive / total,
            negative: negative / total,
            neutral: neutral / total,
        })
    }

    pub fn label(&self) -> &'static str {
        if self.compound >= 0.05 {
            "positive"
        } else if self.compound <= -0.05 {
            "negative"
        } else {
            "neutral"
        }
    }
}

/// Article enriched with its sentiment, when scoring succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredArticle {
    #[serde(flatten)]
    pub article: Article,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentScores>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    #[test]
    fn test_bar_consistency() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(Bar::new(ts, 10.0, 12.0, 9.0, 11.0, 100).is_consistent());
        assert!(!Bar::new(ts, 10.0, 10.5, 9.0, 11.0, 100).is_consistent());
    }

    #[test]
    fn test_stock_info_displays() {
        let info = StockInfo {
            market_cap: Some(2_950_000_123.4),
            trailing_pe: Some(31.456),
            trailing_eps: Some(6.1),
            dividend_yield: Some(0.0051),
            ..Default::default()
        };
        assert_eq!(info.market_cap_display(), "$2,950,000,123");
        assert_eq!(info.pe_display(), "31.46");
        assert_eq!(info.eps_display(), "$6.10");
        assert_eq!(info.dividend_yield_display(), "0.51%");
    }

    #[test]
    fn test_stock_info_unknown_marker() {
        let info = StockInfo::default();
        assert_eq!(info.market_cap_display(), UNKNOWN);
        assert_eq!(info.pe_display(), UNKNOWN);
        assert_eq!(info.dividend_yield_display(), UNKNOWN);
    }

    #[test]
    fn test_group_thousands_small() {
        assert_eq!(group_thousands(999.0), "999");
        assert_eq!(group_thousands(1000.0), "1,000");
    }

    #[test]
    fn test_sentiment_normalises() {
        let s = SentimentScores::new(0.4, 2.0, 1.0, 1.0).unwrap();
        assert_relative_eq!(s.positive + s.negative + s.neutral, 1.0);
        assert_relative_eq!(s.positive, 0.5);
        assert_eq!(s.label(), "positive");
    }

    #[test]
    fn test_sentiment_rejects_out_of_range() {
        assert!(SentimentScores::new(1.5, 0.1, 0.1, 0.8).is_err());
        assert!(SentimentScores::new(0.0, 0.0, 0.0, 0.0).is_err());
        assert!(SentimentScores::new(0.0, -0.1, 0.5, 0.6).is_err());
    }

    #[test]
    fn test_crossover_display() {
        assert_eq!(Crossover::Up.to_string(), "up");
        assert!(!Crossover::None.is_cross());
        assert!(Crossover::Down.is_cross());
    }
}
