//! Business-day sequences: weekdays of a month that are not holidays.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::dates::YearMonth;
use crate::error::{ReservationError, Result};
use crate::holidays::{HolidayResolver, HolidaySet};

/// Which business day of the month a reservation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BusinessDayType {
    First,
    Last,
}

impl FromStr for BusinessDayType {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" => Ok(BusinessDayType::First),
            "last" => Ok(BusinessDayType::Last),
            other => Err(ReservationError::validation(format!(
                "invalid business day type '{other}', expected 'first' or 'last'"
            ))),
        }
    }
}

impl fmt::Display for BusinessDayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusinessDayType::First => f.write_str("first"),
            BusinessDayType::Last => f.write_str("last"),
        }
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Ascending weekdays of `month` that are not in `holidays`.
pub fn business_days(month: YearMonth, holidays: &HolidaySet) -> Vec<NaiveDate> {
    month
        .days()
        .filter(|date| !is_weekend(*date) && !holidays.contains(*date))
        .collect()
}

/// Business-day queries backed by live holiday resolution. Nothing is cached.
pub struct BusinessDayCalculator<'a> {
    resolver: HolidayResolver<'a>,
    holiday_calendar_id: String,
}

impl<'a> BusinessDayCalculator<'a> {
    pub fn new(resolver: HolidayResolver<'a>, holiday_calendar_id: impl Into<String>) -> Self {
        Self {
            resolver,
            holiday_calendar_id: holiday_calendar_id.into(),
        }
    }

    pub fn business_days(&self, month: YearMonth) -> Vec<NaiveDate> {
        let holidays = self.resolver.all_holidays(month, &self.holiday_calendar_id);
        business_days(month, &holidays)
    }

    pub fn business_day_count(&self, month: YearMonth) -> usize {
        self.business_days(month).len()
    }

    /// The first or last business day of `month`.
    ///
    /// # Errors
    /// Returns `ReservationError::Validation` when the month has no business day.
    pub fn resolve_business_day(&self, month: YearMonth, which: BusinessDayType) -> Result<NaiveDate> {
        let days = self.business_days(month);
        let picked = match which {
            BusinessDayType::First => days.first(),
            BusinessDayType::Last => days.last(),
        };
        picked
            .copied()
            .ok_or_else(|| ReservationError::validation(format!("no business days in {month}")))
    }
}
