//! Reservation requests as they arrive from configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::business_days::BusinessDayType;
use crate::dates::YearMonth;
use crate::error::{ReservationError, Result};
use crate::reminder::ReminderSpec;

/// The closed set of reservation kinds the engine can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReservationKind {
    /// Explicit start/end instants, or start/end dates for all-day events.
    Basic,
    /// Year, month, day and optional `HH:mm` times.
    ByDate,
    /// First or last business day of a month, always all-day.
    BusinessDay,
}

impl ReservationKind {
    /// Parse a request's type tag. Accepts `basic`, `date`/`byDate`, `businessDay`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "basic" => Ok(ReservationKind::Basic),
            "date" | "byDate" => Ok(ReservationKind::ByDate),
            "businessDay" => Ok(ReservationKind::BusinessDay),
            other => Err(ReservationError::UnknownReservationType(other.to_string())),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ReservationKind::Basic => "basic",
            ReservationKind::ByDate => "date",
            ReservationKind::BusinessDay => "businessDay",
        }
    }
}

impl FromStr for ReservationKind {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

impl fmt::Display for ReservationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One reservation to create.
///
/// Which time fields are required depends on the type tag and `all_day`:
///
/// | kind          | all-day                          | timed                           |
/// |---------------|----------------------------------|---------------------------------|
/// | `basic`       | `startDate` (+ optional `endDate`) | `startTime`, `endTime`        |
/// | `date`        | `year`, `month`, `day`           | + `startTimeStr`, `endTimeStr`  |
/// | `businessDay` | `yearMonth`, `businessDayType`   | n/a                             |
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReservationRequest {
    /// Raw type tag; parsed with [`ReservationKind::from_tag`] when the request runs.
    #[serde(rename = "type")]
    pub type_tag: String,
    pub title: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub all_day: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time_str: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time_str: Option<String>,

    /// `YYYY-MM`; parsed when the reservation runs so a bad value fails only its own item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_month: Option<String>,
    /// `first` or `last`; parsed when the reservation runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_day_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holiday_calendar_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guests: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder: Option<ReminderSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
}

impl ReservationRequest {
    pub fn new(kind: ReservationKind, title: impl Into<String>) -> Self {
        Self {
            type_tag: kind.tag().to_string(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Timed `basic` reservation between two date-time inputs.
    pub fn timed(title: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start_time: Some(start.into()),
            end_time: Some(end.into()),
            ..Self::new(ReservationKind::Basic, title)
        }
    }

    /// All-day `date` reservation.
    pub fn on_date(title: impl Into<String>, year: i32, month: u32, day: u32) -> Self {
        Self {
            all_day: true,
            year: Some(year),
            month: Some(month),
            day: Some(day),
            ..Self::new(ReservationKind::ByDate, title)
        }
    }

    /// Timed `date` reservation with `HH:mm` times.
    pub fn on_date_at(
        title: impl Into<String>,
        (year, month, day): (i32, u32, u32),
        start: &str,
        end: &str,
    ) -> Self {
        Self {
            all_day: false,
            start_time_str: Some(start.to_string()),
            end_time_str: Some(end.to_string()),
            ..Self::on_date(title, year, month, day)
        }
    }

    /// All-day reservation on the first or last business day of `month`.
    pub fn business_day(title: impl Into<String>, month: YearMonth, which: BusinessDayType) -> Self {
        Self {
            all_day: true,
            year_month: Some(month.to_string()),
            business_day_type: Some(which.to_string()),
            ..Self::new(ReservationKind::BusinessDay, title)
        }
    }

    pub fn kind(&self) -> Result<ReservationKind> {
        ReservationKind::from_tag(&self.type_tag)
    }
}
