//! Reservation execution: validate a request, skip it if the host already has an
//! identical event, otherwise create the event and install its reminders.
//!
//! Each [`ReservationKind`] maps to a [`CreateReservation`] handler; the mapping
//! is an exhaustive match so a new kind cannot be added without a handler.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::business_days::{BusinessDayCalculator, BusinessDayType};
use crate::dates::{
    format_date_time, parse_date, parse_date_time, parse_time, resolve_local,
    YearMonth,
};
use crate::duplicate::{CandidateTiming, DuplicateCandidate, DuplicateDetector};
use crate::error::{ReservationError, Result};
use crate::holidays::{CompanyHolidays, HolidayResolver};
use crate::host::{CalendarHost, EventOptions, HostEvent};
use crate::reminder::{normalize_reminders, Reminder, ReminderChannel, ReminderSpec};
use crate::request::{ReservationKind, ReservationRequest};
use crate::settings::{CalendarSettings, SettingsProvider};

/// Attempts at replacing the reminders of a freshly created event.
const REMINDER_ATTEMPTS: u32 = 3;

/// Successful result of one reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Created {
    /// A new event was written.
    #[serde(rename_all = "camelCase")]
    New { event_id: String },
    /// An identical event already existed; nothing was written.
    #[serde(rename_all = "camelCase")]
    Skipped { existing_event_id: String },
}

impl Created {
    pub fn event_id(&self) -> &str {
        match self {
            Created::New { event_id } => event_id,
            Created::Skipped { existing_event_id } => existing_event_id,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Created::Skipped { .. })
    }
}

/// Shared capability of every reservation handler.
pub trait CreateReservation {
    fn create(&self, executor: &ReservationExecutor<'_>, request: &ReservationRequest) -> Result<Created>;
}

pub struct BasicReservation;
pub struct ByDateReservation;
pub struct BusinessDayReservation;

impl CreateReservation for BasicReservation {
    fn create(&self, executor: &ReservationExecutor<'_>, request: &ReservationRequest) -> Result<Created> {
        executor.create_event(request)
    }
}

impl CreateReservation for ByDateReservation {
    fn create(&self, executor: &ReservationExecutor<'_>, request: &ReservationRequest) -> Result<Created> {
        executor.create_event_by_date(request)
    }
}

impl CreateReservation for BusinessDayReservation {
    fn create(&self, executor: &ReservationExecutor<'_>, request: &ReservationRequest) -> Result<Created> {
        executor.create_business_day_event(request)
    }
}

impl ReservationKind {
    pub fn handler(self) -> &'static dyn CreateReservation {
        match self {
            ReservationKind::Basic => &BasicReservation,
            ReservationKind::ByDate => &ByDateReservation,
            ReservationKind::BusinessDay => &BusinessDayReservation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DraftTiming {
    Timed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// `end` is the inclusive last day of a multi-day event.
    AllDay {
        start: NaiveDate,
        end: Option<NaiveDate>,
    },
}

/// A validated event ready for duplicate check and creation.
struct EventDraft<'r> {
    title: &'r str,
    timing: DraftTiming,
    options: EventOptions,
    reminder: Option<&'r ReminderSpec>,
    calendar_id: Option<&'r str>,
}

impl<'r> EventDraft<'r> {
    fn from_request(request: &'r ReservationRequest, timing: DraftTiming) -> Self {
        Self {
            title: &request.title,
            timing,
            options: EventOptions::new(
                request.description.as_deref(),
                request.location.as_deref(),
                &request.guests,
            ),
            reminder: request.reminder.as_ref(),
            calendar_id: request.calendar_id.as_deref().filter(|id| !id.is_empty()),
        }
    }
}

/// Creates reservations against one host, reading defaults from the settings store.
pub struct ReservationExecutor<'a> {
    host: &'a dyn CalendarHost,
    settings: &'a dyn SettingsProvider,
    company_holidays: &'a CompanyHolidays,
}

impl<'a> ReservationExecutor<'a> {
    pub fn new(
        host: &'a dyn CalendarHost,
        settings: &'a dyn SettingsProvider,
        company_holidays: &'a CompanyHolidays,
    ) -> Self {
        Self {
            host,
            settings,
            company_holidays,
        }
    }

    /// Dispatch on the request's type tag.
    pub fn execute(&self, request: &ReservationRequest) -> Result<Created> {
        request.kind()?.handler().create(self, request)
    }

    /// Create from explicit instants (timed) or dates (all-day).
    pub fn create_event(&self, request: &ReservationRequest) -> Result<Created> {
        require_title(request)?;
        let settings = CalendarSettings::load(self.settings)?;
        let tz = settings.default_timezone;

        let timing = if request.all_day {
            let raw_start = request
                .start_date
                .as_deref()
                .or(request.start_time.as_deref())
                .ok_or_else(|| ReservationError::validation("all-day events require a start date"))?;
            let start = parse_date(raw_start, tz)?;
            let end = request
                .end_date
                .as_deref()
                .map(|raw| parse_date(raw, tz))
                .transpose()?;
            DraftTiming::AllDay { start, end }
        } else {
            let raw_start = request
                .start_time
                .as_deref()
                .ok_or_else(|| ReservationError::validation("start time is required"))?;
            let raw_end = request
                .end_time
                .as_deref()
                .ok_or_else(|| ReservationError::validation("end time is required"))?;
            DraftTiming::Timed {
                start: parse_date_time(raw_start, tz)?,
                end: parse_date_time(raw_end, tz)?,
            }
        };

        self.create_draft(EventDraft::from_request(request, timing), &settings)
    }

    /// Create from year/month/day and optional `HH:mm` times.
    pub fn create_event_by_date(&self, request: &ReservationRequest) -> Result<Created> {
        let (Some(year), Some(month), Some(day)) = (request.year, request.month, request.day) else {
            return Err(ReservationError::validation("year, month and day are required"));
        };
        require_title(request)?;
        if !request.all_day
            && (request.start_time_str.is_none() || request.end_time_str.is_none())
        {
            return Err(ReservationError::validation(
                "start and end times are required for timed events",
            ));
        }
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            ReservationError::validation(format!("invalid date: {year:04}-{month:02}-{day:02}"))
        })?;

        let settings = CalendarSettings::load(self.settings)?;
        let timing = if request.all_day {
            DraftTiming::AllDay {
                start: date,
                end: None,
            }
        } else {
            let start = parse_hh_mm(request.start_time_str.as_deref(), "start")?;
            let end = parse_hh_mm(request.end_time_str.as_deref(), "end")?;
            let tz = settings.default_timezone;
            DraftTiming::Timed {
                start: resolve_local(date.and_time(start), tz)?,
                end: resolve_local(date.and_time(end), tz)?,
            }
        };

        self.create_draft(EventDraft::from_request(request, timing), &settings)
    }

    /// Create an all-day event on the first or last business day of a month.
    pub fn create_business_day_event(&self, request: &ReservationRequest) -> Result<Created> {
        require_title(request)?;
        let month: YearMonth = request
            .year_month
            .as_deref()
            .ok_or_else(|| ReservationError::validation("yearMonth is required"))?
            .parse()?;
        let which: BusinessDayType = request
            .business_day_type
            .as_deref()
            .ok_or_else(|| ReservationError::validation("businessDayType is required"))?
            .parse()?;

        let calculator = self.business_day_calculator(request.holiday_calendar_id.as_deref())?;
        let date = calculator.resolve_business_day(month, which)?;
        info!(title = %request.title, %month, business_day = %which, %date, "resolved business day");

        let by_date = ReservationRequest {
            type_tag: ReservationKind::ByDate.tag().to_string(),
            all_day: true,
            year: Some(date.year()),
            month: Some(date.month()),
            day: Some(date.day()),
            start_time_str: None,
            end_time_str: None,
            year_month: None,
            business_day_type: None,
            ..request.clone()
        };
        self.create_event_by_date(&by_date)
    }

    /// Business-day calculator over the given holiday calendar, or the configured one.
    pub fn business_day_calculator(&self, holiday_calendar_id: Option<&str>) -> Result<BusinessDayCalculator<'a>> {
        let settings = CalendarSettings::load(self.settings)?;
        let calendar_id = holiday_calendar_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or(settings.holiday_calendar_id);
        let resolver = HolidayResolver::new(self.host, self.company_holidays, settings.default_timezone);
        Ok(BusinessDayCalculator::new(resolver, calendar_id))
    }

    pub fn business_day_count(&self, month: YearMonth, holiday_calendar_id: Option<&str>) -> Result<usize> {
        Ok(self
            .business_day_calculator(holiday_calendar_id)?
            .business_day_count(month))
    }

    fn create_draft(&self, draft: EventDraft<'_>, settings: &CalendarSettings) -> Result<Created> {
        let tz = settings.default_timezone;
        let candidate_timing = match draft.timing {
            DraftTiming::Timed { start, end } => {
                if start >= end {
                    return Err(ReservationError::validation(format!(
                        "start ({}) must be before end ({})",
                        format_date_time(start, tz),
                        format_date_time(end, tz)
                    )));
                }
                CandidateTiming::Timed { start, end }
            }
            DraftTiming::AllDay { start, end } => {
                if end.is_some_and(|end| end < start) {
                    return Err(ReservationError::validation("all-day end date is before start date"));
                }
                CandidateTiming::AllDay { date: start }
            }
        };

        let calendar_id = draft
            .calendar_id
            .unwrap_or(settings.default_calendar_id.as_str());
        let calendar = self
            .host
            .calendar_by_id(calendar_id)?
            .ok_or_else(|| ReservationError::validation(format!("calendar not found: {calendar_id}")))?;

        let detector = DuplicateDetector::new(self.host, tz);
        let candidate = DuplicateCandidate {
            title: draft.title.to_string(),
            timing: candidate_timing,
            calendar_id: calendar_id.to_string(),
        };
        if let Some(existing) = detector.check_duplicate(&candidate) {
            info!(title = draft.title, existing_id = %existing.id, "skipping duplicate reservation");
            return Ok(Created::Skipped {
                existing_event_id: existing.id,
            });
        }

        let mut event = match draft.timing {
            DraftTiming::Timed { start, end } => {
                calendar.create_event(draft.title, start, end, &draft.options)?
            }
            // The host treats all-day ends as exclusive.
            DraftTiming::AllDay { start, end: Some(end) } => calendar.create_all_day_event(
                draft.title,
                start,
                Some(end + Duration::days(1)),
                &draft.options,
            )?,
            DraftTiming::AllDay { start, end: None } => {
                calendar.create_all_day_event(draft.title, start, None, &draft.options)?
            }
        };

        // The event exists from here on; a reminder failure must not re-run the create.
        let event_id = event.id();
        let reminders = normalize_reminders(draft.reminder, settings.default_reminder_minutes);
        let mut attempt = 1;
        while let Err(err) = install_reminders(event.as_mut(), &reminders) {
            if attempt >= REMINDER_ATTEMPTS {
                warn!(%event_id, attempts = attempt, error = %err, "could not install reminders");
                break;
            }
            debug!(%event_id, attempt, error = %err, "reminder install failed, retrying");
            attempt += 1;
        }
        info!(title = draft.title, %event_id, calendar_id, "created event");
        Ok(Created::New { event_id })
    }
}

/// Replace whatever reminders the host applied with `reminders`. Safe to repeat.
fn install_reminders(event: &mut dyn HostEvent, reminders: &[Reminder]) -> Result<()> {
    event.remove_all_reminders()?;
    for reminder in reminders {
        match reminder.channel {
            ReminderChannel::Email => event.add_email_reminder(reminder.minutes_before)?,
            ReminderChannel::Popup => event.add_popup_reminder(reminder.minutes_before)?,
        }
    }
    debug!(count = reminders.len(), "installed reminders");
    Ok(())
}

fn require_title(request: &ReservationRequest) -> Result<()> {
    if request.title.trim().is_empty() {
        return Err(ReservationError::validation("title is required"));
    }
    Ok(())
}

fn parse_hh_mm(raw: Option<&str>, which: &str) -> Result<NaiveTime> {
    let raw = raw.ok_or_else(|| ReservationError::validation(format!("{which} time is required")))?;
    parse_time(raw).ok_or_else(|| {
        ReservationError::validation(format!("invalid {which} time '{raw}', expected HH:mm"))
    })
}
