use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Billing month
// ============================================================================

/// A calendar month, the unit subscriptions are billed in.
///
/// Internally held as the first day of the month, so two values built from
/// different days of the same month compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BillingMonth(NaiveDate);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthParseError {
    #[error("expected MM-YYYY, got {0:?}")]
    Format(String),
    #[error("month out of range: {0}")]
    Month(u32),
}

impl BillingMonth {
    /// Stand-in end for open-ended subscriptions. Far enough out that no
    /// realistic period is truncated, close enough to keep month counts small.
    pub const FAR_FUTURE: BillingMonth = match NaiveDate::from_ymd_opt(3000, 1, 1) {
        Some(d) => BillingMonth(d),
        None => panic!("invalid sentinel date"),
    };

    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Normalize any date to the month containing it.
    pub fn from_date(date: NaiveDate) -> Self {
        // Day 1 always exists for a month that already holds `date`.
        Self(date - TimeDelta::days(i64::from(date.day0())))
    }

    pub fn from_datetime(ts: NaiveDateTime) -> Self {
        Self::from_date(ts.date())
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// Midnight on the first day of the month.
    pub fn first_instant(&self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }

    /// Last representable instant of the month at microsecond precision.
    pub fn last_instant(&self) -> NaiveDateTime {
        let next = self
            .0
            .checked_add_months(Months::new(1))
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX);
        next - TimeDelta::microseconds(1)
    }

    /// Months elapsed since year 0, used for month-granularity differences.
    fn index(&self) -> i64 {
        i64::from(self.year()) * 12 + i64::from(self.0.month0())
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month(), self.year())
    }
}

impl FromStr for BillingMonth {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || MonthParseError::Format(s.to_string());

        let (mm, yyyy) = s.split_once('-').ok_or_else(format_err)?;
        if mm.len() != 2
            || yyyy.len() != 4
            || !mm.bytes().all(|b| b.is_ascii_digit())
            || !yyyy.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(format_err());
        }

        let month: u32 = mm.parse().map_err(|_| format_err())?;
        let year: i32 = yyyy.parse().map_err(|_| format_err())?;
        Self::new(year, month).ok_or(MonthParseError::Month(month))
    }
}

impl TryFrom<String> for BillingMonth {
    type Error = MonthParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BillingMonth> for String {
    fn from(value: BillingMonth) -> Self {
        value.to_string()
    }
}

// ============================================================================
// Overlap arithmetic
// ============================================================================

/// Number of whole calendar months shared by the inclusive ranges
/// `[a_start, a_end]` and `[b_start, b_end]`.
///
/// An inverted input range, or ranges that do not meet, yield zero.
pub fn months_overlap(
    a_start: BillingMonth,
    a_end: BillingMonth,
    b_start: BillingMonth,
    b_end: BillingMonth,
) -> u32 {
    if a_end < a_start || b_end < b_start {
        return 0;
    }

    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if end < start {
        return 0;
    }

    let months = end.index() - start.index() + 1;
    u32::try_from(months).unwrap_or(0)
}
