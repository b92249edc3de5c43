//! # Local Date-Range Resolver
//!
//! Turns a named preset and "now" into an inclusive `[start, end]` pair of
//! LOCAL calendar dates.
//!
//! ## Why Local Dates?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale recorded 2024-05-31 23:30 at UTC+07:00                            │
//! │                                                                         │
//! │  As a UTC instant:  2024-05-31T16:30Z  ──► fine here, but a sale at     │
//! │  06:30 local on 06-01 is 05-31T23:30Z ──► lands in MAY ❌               │
//! │                                                                         │
//! │  As a local day:    "2024-06-01"       ──► lands in JUNE ✅              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Records are bucketed with [`local_day`], ranges are plain `NaiveDate`s, and
//! membership is a date comparison. No instant is ever compared to a bound.
//!
//! ## Presets
//! | preset          | start                         | end                    |
//! |-----------------|-------------------------------|------------------------|
//! | `today`         | today                         | today                  |
//! | `last-N-days`   | today − (N−1), N ∈ {3, 7}     | today                  |
//! | `this-week`     | Monday of this week           | Sunday of this week    |
//! | `last-week`     | Monday of last week           | Sunday of last week    |
//! | `this-month`    | 1st of this month             | today                  |
//! | `month-N`       | 1st of month N                | last day of month N    |
//! | `quarter-N`     | 1st of month 3(N−1)+1         | last day of month +2   |
//! | `year`          | Jan 1                         | today                  |
//! | `custom`        | as given                      | as given               |

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Preset
// =============================================================================

/// Rolling windows accepted as `last-N-days`.
pub const LAST_DAYS_WINDOWS: &[u32] = &[3, 7];

/// A named reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangePreset {
    Today,
    /// Today and the N−1 days before it.
    LastDays(u32),
    ThisWeek,
    LastWeek,
    /// Month to date.
    ThisMonth,
    /// Whole calendar month N (1-12) of the current year.
    Month(u32),
    /// Whole quarter N (1-4) of the current year.
    Quarter(u32),
    /// Year to date.
    Year,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for RangePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangePreset::Today => write!(f, "today"),
            RangePreset::LastDays(n) => write!(f, "last-{}-days", n),
            RangePreset::ThisWeek => write!(f, "this-week"),
            RangePreset::LastWeek => write!(f, "last-week"),
            RangePreset::ThisMonth => write!(f, "this-month"),
            RangePreset::Month(m) => write!(f, "month-{}", m),
            RangePreset::Quarter(q) => write!(f, "quarter-{}", q),
            RangePreset::Year => write!(f, "year"),
            RangePreset::Custom { start, end } => write!(f, "custom:{}:{}", start, end),
        }
    }
}

impl FromStr for RangePreset {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let unknown = || CoreError::UnknownPreset(s.to_string());

        match lowered.as_str() {
            "today" => return Ok(RangePreset::Today),
            "this-week" => return Ok(RangePreset::ThisWeek),
            "last-week" => return Ok(RangePreset::LastWeek),
            "this-month" => return Ok(RangePreset::ThisMonth),
            "year" | "this-year" => return Ok(RangePreset::Year),
            _ => {}
        }

        if let Some(n) = lowered
            .strip_prefix("last-")
            .and_then(|rest| rest.strip_suffix("-days"))
        {
            return match n.parse::<u32>() {
                Ok(n) if LAST_DAYS_WINDOWS.contains(&n) => Ok(RangePreset::LastDays(n)),
                _ => Err(unknown()),
            };
        }

        if let Some(n) = lowered.strip_prefix("month-") {
            return match n.parse::<u32>() {
                Ok(m @ 1..=12) => Ok(RangePreset::Month(m)),
                _ => Err(unknown()),
            };
        }

        if let Some(n) = lowered.strip_prefix("quarter-") {
            return match n.parse::<u32>() {
                Ok(q @ 1..=4) => Ok(RangePreset::Quarter(q)),
                _ => Err(unknown()),
            };
        }

        if let Some(bounds) = lowered.strip_prefix("custom:") {
            let (start, end) = bounds.split_once(':').ok_or_else(unknown)?;
            let parse = |v: &str| {
                parse_local_date(v).ok_or_else(|| CoreError::InvalidDateRange {
                    reason: format!("cannot parse '{}' as a date", v),
                })
            };
            return Ok(RangePreset::Custom {
                start: parse(start)?,
                end: parse(end)?,
            });
        }

        Err(unknown())
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive range of local calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: NaiveDate,
    #[ts(as = "String")]
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// A single day.
    pub fn day(day: NaiveDate) -> Self {
        DateRange { start: day, end: day }
    }

    #[inline]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Number of days covered (0 for a reversed range).
    pub fn len_days(&self) -> usize {
        usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
    }

    /// Every day from `start` to `end`, inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

// =============================================================================
// Resolution & Diagnostics
// =============================================================================

/// Why the resolver did not use the requested bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeDiagnostic {
    EndBeforeStart {
        #[ts(as = "String")]
        start: NaiveDate,
        #[ts(as = "String")]
        end: NaiveDate,
    },
    UnparseableBound { value: String },
    MonthOutOfRange { month: u32 },
    QuarterOutOfRange { quarter: u32 },
    DaysOutOfRange { days: u32 },
}

impl fmt::Display for RangeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeDiagnostic::EndBeforeStart { start, end } => {
                write!(f, "end {} is before start {}", end, start)
            }
            RangeDiagnostic::UnparseableBound { value } => {
                write!(f, "cannot parse '{}' as a date", value)
            }
            RangeDiagnostic::MonthOutOfRange { month } => write!(f, "month {} is not 1-12", month),
            RangeDiagnostic::QuarterOutOfRange { quarter } => {
                write!(f, "quarter {} is not 1-4", quarter)
            }
            RangeDiagnostic::DaysOutOfRange { days } => {
                write!(f, "{} days back leaves the calendar", days)
            }
        }
    }
}

/// Resolved bounds plus the reason for a fallback, if one happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Resolution {
    pub range: DateRange,
    pub diagnostic: Option<RangeDiagnostic>,
}

impl Resolution {
    fn exact(range: DateRange) -> Self {
        Resolution {
            range,
            diagnostic: None,
        }
    }

    fn fallback(today: NaiveDate, diagnostic: RangeDiagnostic) -> Self {
        warn!(%diagnostic, "Invalid date range, falling back to this month");
        Resolution {
            range: month_to_date(today),
            diagnostic: Some(diagnostic),
        }
    }

    /// Whether the requested bounds were replaced by "this month".
    pub fn is_fallback(&self) -> bool {
        self.diagnostic.is_some()
    }

    /// Converts a fallback into an error for callers that cannot accept one.
    pub fn into_strict(self) -> CoreResult<DateRange> {
        match self.diagnostic {
            None => Ok(self.range),
            Some(d) => Err(CoreError::InvalidDateRange {
                reason: d.to_string(),
            }),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves a preset relative to `now`. The local day is `now`'s own date in
/// its offset.
///
/// ```rust
/// use chrono::{DateTime, Datelike, Weekday};
/// use repairdesk_core::date_range::{resolve, RangePreset};
///
/// // A Sunday evening.
/// let now = DateTime::parse_from_rfc3339("2024-06-09T21:00:00+07:00").unwrap();
/// let week = resolve(&RangePreset::ThisWeek, now).range;
/// assert_eq!(week.start.weekday(), Weekday::Mon);
/// assert_eq!(week.start.to_string(), "2024-06-03");
/// assert_eq!(week.end.to_string(), "2024-06-09");
/// ```
pub fn resolve(preset: &RangePreset, now: DateTime<FixedOffset>) -> Resolution {
    resolve_for_day(preset, now.date_naive())
}

/// Same as [`resolve`], with "today" given directly.
pub fn resolve_for_day(preset: &RangePreset, today: NaiveDate) -> Resolution {
    match *preset {
        RangePreset::Today => Resolution::exact(DateRange::day(today)),
        RangePreset::LastDays(days) => {
            let back = u64::from(days.max(1)) - 1;
            match today.checked_sub_days(Days::new(back)) {
                Some(start) => Resolution::exact(DateRange::new(start, today)),
                None => Resolution::fallback(today, RangeDiagnostic::DaysOutOfRange { days }),
            }
        }
        RangePreset::ThisWeek => Resolution::exact(week_of(today, 0)),
        RangePreset::LastWeek => Resolution::exact(week_of(today, 1)),
        RangePreset::ThisMonth => Resolution::exact(month_to_date(today)),
        RangePreset::Month(month) => match whole_months(today.year(), month, 1) {
            Some(range) => Resolution::exact(range),
            None => Resolution::fallback(today, RangeDiagnostic::MonthOutOfRange { month }),
        },
        RangePreset::Quarter(quarter) => {
            let range = (1..=4)
                .contains(&quarter)
                .then(|| whole_months(today.year(), (quarter - 1) * 3 + 1, 3))
                .flatten();
            match range {
                Some(range) => Resolution::exact(range),
                None => Resolution::fallback(today, RangeDiagnostic::QuarterOutOfRange { quarter }),
            }
        }
        RangePreset::Year => {
            let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
            Resolution::exact(DateRange::new(start, today))
        }
        RangePreset::Custom { start, end } => {
            if end < start {
                Resolution::fallback(today, RangeDiagnostic::EndBeforeStart { start, end })
            } else {
                Resolution::exact(DateRange::new(start, end))
            }
        }
    }
}

/// Resolves custom bounds given as text (`YYYY-MM-DD` or `DD/MM/YYYY`).
pub fn resolve_custom_strs(start: &str, end: &str, today: NaiveDate) -> Resolution {
    let parsed_start = match parse_local_date(start) {
        Some(d) => d,
        None => {
            return Resolution::fallback(
                today,
                RangeDiagnostic::UnparseableBound {
                    value: start.to_string(),
                },
            )
        }
    };
    let parsed_end = match parse_local_date(end) {
        Some(d) => d,
        None => {
            return Resolution::fallback(
                today,
                RangeDiagnostic::UnparseableBound {
                    value: end.to_string(),
                },
            )
        }
    };
    resolve_for_day(
        &RangePreset::Custom {
            start: parsed_start,
            end: parsed_end,
        },
        today,
    )
}

// =============================================================================
// Local Day Helpers
// =============================================================================

/// The calendar day of `ts` as seen in `zone`.
#[inline]
pub fn local_day(ts: &DateTime<FixedOffset>, zone: &FixedOffset) -> NaiveDate {
    ts.with_timezone(zone).date_naive()
}

/// `YYYY-MM-DD` of [`local_day`].
pub fn local_day_string(ts: &DateTime<FixedOffset>, zone: &FixedOffset) -> String {
    local_day(ts, zone).format("%Y-%m-%d").to_string()
}

/// Parses a bare calendar date.
pub fn parse_local_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

fn month_to_date(today: NaiveDate) -> DateRange {
    DateRange::new(today.with_day(1).unwrap_or(today), today)
}

/// Monday-to-Sunday week containing `today`, shifted back `weeks_back` weeks.
fn week_of(today: NaiveDate, weeks_back: i64) -> DateRange {
    // number_from_monday: Mon=1 .. Sun=7
    let offset = i64::from(today.weekday().number_from_monday()) - 1;
    let start = today - Duration::days(offset + 7 * weeks_back);
    DateRange::new(start, start + Duration::days(6))
}

/// From the 1st of `month` through the last day of `month + span − 1`.
fn whole_months(year: i32, month: u32, span: u32) -> Option<DateRange> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let last_month = month + span - 1;
    let after = if last_month >= 12 {
        NaiveDate::from_ymd_opt(year + 1, last_month - 11, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, last_month + 1, 1)?
    };
    Some(DateRange::new(start, after.pred_opt()?))
}

// =============================================================================
// Unit Tests
// =============================================================================
