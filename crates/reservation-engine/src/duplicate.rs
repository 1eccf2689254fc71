//! Duplicate detection against the host calendar.
//!
//! The host's own event list is the only idempotency record: before every create
//! the target window is re-queried and compared field by field.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::dates::{format_date_time, start_of_day};
use crate::error::Result;
use crate::host::{CalendarHost, EventWhen, ExistingEvent};

/// Slack added on both sides of the query window.
const SEARCH_MARGIN_MINUTES: i64 = 1;

/// The reservation about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCandidate {
    pub title: String,
    pub timing: CandidateTiming,
    pub calendar_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateTiming {
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    AllDay {
        date: NaiveDate,
    },
}

pub struct DuplicateDetector<'a> {
    host: &'a dyn CalendarHost,
    timezone: Tz,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(host: &'a dyn CalendarHost, timezone: Tz) -> Self {
        Self { host, timezone }
    }

    /// The first host event equal to `candidate`, if any.
    ///
    /// Fails open: host errors and missing calendars are logged and reported as
    /// "no duplicate".
    pub fn check_duplicate(&self, candidate: &DuplicateCandidate) -> Option<ExistingEvent> {
        match self.find_match(candidate) {
            Ok(found) => found,
            Err(err) => {
                warn!(title = %candidate.title, error = %err, "duplicate check failed, assuming none");
                None
            }
        }
    }

    fn find_match(&self, candidate: &DuplicateCandidate) -> Result<Option<ExistingEvent>> {
        let Some(calendar) = self.host.calendar_by_id(&candidate.calendar_id)? else {
            warn!(calendar_id = %candidate.calendar_id, "calendar not found for duplicate check");
            return Ok(None);
        };

        let (start, end) = match candidate.timing {
            CandidateTiming::Timed { start, end } => (start, end),
            CandidateTiming::AllDay { date } => {
                let start = start_of_day(date, self.timezone)?;
                (start, start)
            }
        };
        let margin = Duration::minutes(SEARCH_MARGIN_MINUTES);
        let events = calendar.events(start - margin, end + margin)?;

        let found = events.into_iter().find(|event| self.matches(event, candidate));
        if let Some(event) = &found {
            debug!(
                title = %candidate.title,
                existing_id = %event.id,
                when = %self.describe(candidate.timing),
                "duplicate event found"
            );
        }
        Ok(found)
    }

    fn matches(&self, event: &ExistingEvent, candidate: &DuplicateCandidate) -> bool {
        if event.title != candidate.title {
            return false;
        }
        match (event.when, candidate.timing) {
            (EventWhen::AllDay { .. }, CandidateTiming::AllDay { date }) => {
                event.when.start_date(self.timezone) == date
            }
            (EventWhen::Timed { start, end }, CandidateTiming::Timed { start: s, end: e }) => {
                start == s && end == e
            }
            _ => false,
        }
    }

    fn describe(&self, timing: CandidateTiming) -> String {
        match timing {
            CandidateTiming::Timed { start, end } => format!(
                "{} - {}",
                format_date_time(start, self.timezone),
                format_date_time(end, self.timezone)
            ),
            CandidateTiming::AllDay { date } => date.format("%Y-%m-%d").to_string(),
        }
    }
}
