use std::fmt;

use chrono::{DateTime, Days, Months, Utc};
use common::{DashboardError, Result};
use serde::{Deserialize, Serialize};

/// How far back the history request reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Span {
    Days(u32),
    Months(u32),
    Years(u32),
    Max,
}

impl Span {
    /// Yahoo Finance `range` query value
    pub fn as_yahoo_str(&self) -> String {
        match self {
            Span::Days(n) => format!("{}d", n),
            Span::Months(n) => format!("{}mo", n),
            Span::Years(n) => format!("{}y", n),
            Span::Max => "max".to_string(),
        }
    }

    /// Earliest timestamp covered when the span ends at `end`; `None` for `Max`
    pub fn start_from(&self, end: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            Span::Days(n) => end.checked_sub_days(Days::new(n as u64)),
            Span::Months(n) => end.checked_sub_months(Months::new(n)),
            Span::Years(n) => end.checked_sub_months(Months::new(n.saturating_mul(12))),
            Span::Max => None,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Span::Days(n) => write!(f, "{} day(s)", n),
            Span::Months(n) => write!(f, "{} month(s)", n),
            Span::Years(n) => write!(f, "{} year(s)", n),
            Span::Max => write!(f, "all available history"),
        }
    }
}

/// Sampling interval of the history request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    /// 5 minute bars
    Minute5,
    /// 15 minute bars
    Minute15,
    /// 1 hour bars
    Hour1,
    /// Daily bars
    Daily,
}

impl Interval {
    /// Yahoo Finance `interval` query value
    pub fn as_yahoo_str(&self) -> &'static str {
        match self {
            Interval::Minute5 => "5m",
            Interval::Minute15 => "15m",
            Interval::Hour1 => "1h",
            Interval::Daily => "1d",
        }
    }

    pub fn is_intraday(&self) -> bool {
        matches!(self, Interval::Minute5 | Interval::Minute15 | Interval::Hour1)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Interval::Minute5 => "5 Minutes",
            Interval::Minute15 => "15 Minutes",
            Interval::Hour1 => "1 Hour",
            Interval::Daily => "Daily",
        };
        f.write_str(s)
    }
}

/// Concrete history request resolved from a period label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSpec {
    pub span: Span,
    pub interval: Interval,
}

const fn spec(span: Span, interval: Interval) -> PeriodSpec {
    PeriodSpec { span, interval }
}

/// Every accepted label. Intraday sampling is only served upstream over a
/// short recent window, hence the bounded spans on the first three rows.
/// Every other label samples daily bars.
const PERIODS: &[(&str, PeriodSpec)] = &[
    ("1d", spec(Span::Days(1), Interval::Minute5)),
    ("1day", spec(Span::Days(1), Interval::Minute5)),
    ("5d", spec(Span::Days(5), Interval::Minute15)),
    ("5day", spec(Span::Days(5), Interval::Minute15)),
    ("1hr", spec(Span::Days(60), Interval::Hour1)),
    ("1mo", spec(Span::Months(1), Interval::Daily)),
    ("1month", spec(Span::Months(1), Interval::Daily)),
    ("3mo", spec(Span::Months(3), Interval::Daily)),
    ("3month", spec(Span::Months(3), Interval::Daily)),
    ("6mo", spec(Span::Months(6), Interval::Daily)),
    ("6month", spec(Span::Months(6), Interval::Daily)),
    ("1y", spec(Span::Years(1), Interval::Daily)),
    ("1year", spec(Span::Years(1), Interval::Daily)),
    ("2y", spec(Span::Years(2), Interval::Daily)),
    ("2year", spec(Span::Years(2), Interval::Daily)),
    ("5y", spec(Span::Years(5), Interval::Daily)),
    ("5year", spec(Span::Years(5), Interval::Daily)),
    ("max", spec(Span::Max, Interval::Daily)),
];

/// Map a user-facing period label to its span and interval
///
/// Labels match exactly after trimming; anything else is `InvalidPeriod`.
pub fn resolve(label: &str) -> Result<PeriodSpec> {
    let key = label.trim();
    PERIODS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, spec)| *spec)
        .ok_or_else(|| DashboardError::InvalidPeriod {
            label: label.to_string(),
        })
}

/// Accepted labels in display order
pub fn labels() -> impl Iterator<Item = &'static str> {
    PERIODS.iter().map(|(name, _)| *name)
}
