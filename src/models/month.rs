//! Calendar month windows used to scope record queries.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::query::blank_as_none;

/// Optional month/year pair as supplied by a client (month is 1-based).
/// Blank values fall back to the current month like missing ones.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MonthQuery {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub month: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub year: Option<i32>,
}

/// Inclusive date range covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    /// Build the window for a 1-based month. `None` when the pair is not a real month.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };
        Some(Self {
            year,
            month,
            start,
            end: next.pred_opt()?,
        })
    }

    /// Window containing the given date.
    pub fn containing(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let end = Self::new(date.year(), date.month())
            .map(|w| w.end)
            .unwrap_or(date);
        Self {
            year: date.year(),
            month: date.month(),
            start,
            end,
        }
    }

    /// Resolve a client month query, defaulting missing parts to `today`'s month.
    ///
    /// Months outside 1..=12 are rejected instead of being rolled into a
    /// neighbouring year.
    pub fn resolve(query: MonthQuery, today: NaiveDate) -> Result<Self, AppError> {
        let month = query.month.unwrap_or_else(|| today.month());
        let year = query.year.unwrap_or_else(|| today.year());

        if !(1..=12).contains(&month) {
            return Err(AppError::Validation(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }

        Self::new(year, month)
            .ok_or_else(|| AppError::Validation(format!("year {year} is out of range")))
    }

    /// Number of calendar days in the month (28–31).
    pub fn days(&self) -> u32 {
        self.end.day()
    }

    /// The month immediately before this one; January wraps to December of the prior year.
    pub fn previous(&self) -> Self {
        let prev_end = self.start.pred_opt().unwrap_or(self.start);
        Self::containing(prev_end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether this month is the current month or lies in the future.
    pub fn is_current_or_future(&self, today: NaiveDate) -> bool {
        (self.year, self.month) >= (today.year(), today.month())
    }
}
