//! Calendar host collaborator: the external calendar the engine reads and writes.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dates::{local_date, start_of_day};
use crate::error::HostError;

pub type HostResult<T> = std::result::Result<T, HostError>;

/// When an event takes place.
///
/// All-day ends are exclusive: a single-day event on `D` ends on `D + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventWhen {
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    AllDay {
        start: NaiveDate,
        end: NaiveDate,
    },
}

impl EventWhen {
    pub fn is_all_day(&self) -> bool {
        matches!(self, EventWhen::AllDay { .. })
    }

    /// The calendar date the event starts on, as seen in `tz`.
    pub fn start_date(&self, tz: Tz) -> NaiveDate {
        match self {
            EventWhen::Timed { start, .. } => local_date(*start, tz),
            EventWhen::AllDay { start, .. } => *start,
        }
    }

    /// The event as a half-open instant range; all-day dates map to local midnight in `tz`.
    pub fn instant_range(&self, tz: Tz) -> HostResult<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            EventWhen::Timed { start, end } => Ok((*start, *end)),
            EventWhen::AllDay { start, end } => {
                let start = start_of_day(*start, tz).map_err(|e| HostError::new(e.to_string()))?;
                let end = start_of_day(*end, tz).map_err(|e| HostError::new(e.to_string()))?;
                Ok((start, end))
            }
        }
    }
}

/// Read-only view of an event as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingEvent {
    pub id: String,
    pub title: String,
    pub when: EventWhen,
}

impl ExistingEvent {
    pub fn is_all_day(&self) -> bool {
        self.when.is_all_day()
    }
}

/// Optional attributes attached to a new event. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub guests: Vec<String>,
}

impl EventOptions {
    pub fn new(description: Option<&str>, location: Option<&str>, guests: &[String]) -> Self {
        let present = |s: Option<&str>| s.filter(|v| !v.is_empty()).map(str::to_string);
        Self {
            description: present(description),
            location: present(location),
            guests: guests.iter().filter(|g| !g.is_empty()).cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.location.is_none() && self.guests.is_empty()
    }
}

/// A freshly created event whose reminders can still be adjusted.
pub trait HostEvent {
    fn id(&self) -> String;
    fn remove_all_reminders(&mut self) -> HostResult<()>;
    fn add_email_reminder(&mut self, minutes_before: u32) -> HostResult<()>;
    fn add_popup_reminder(&mut self, minutes_before: u32) -> HostResult<()>;
}

/// One calendar on the host.
pub trait Calendar {
    /// Events overlapping `[start, end]`, in host order.
    fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> HostResult<Vec<ExistingEvent>>;

    fn create_event(
        &self,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        options: &EventOptions,
    ) -> HostResult<Box<dyn HostEvent + '_>>;

    /// `end` is exclusive; `None` creates a single-day event.
    fn create_all_day_event(
        &self,
        title: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        options: &EventOptions,
    ) -> HostResult<Box<dyn HostEvent + '_>>;
}

/// Entry point to the host.
pub trait CalendarHost {
    /// `Ok(None)` when no calendar with that id is visible.
    fn calendar_by_id(&self, id: &str) -> HostResult<Option<Box<dyn Calendar + '_>>>;
}
