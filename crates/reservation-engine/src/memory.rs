//! In-memory calendar host for dry runs and tests.
//!
//! Calendars exist as soon as they are looked up unless explicitly marked missing.
//! Event ids are sequential (`evt-1`, `evt-2`, ...). Failures can be injected per
//! operation to exercise retry and fail-open paths.

use std::cell::RefCell;
use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::HostError;
use crate::host::{
    Calendar, CalendarHost, EventOptions, EventWhen, ExistingEvent, HostEvent, HostResult,
};
use crate::reminder::Reminder;

/// An event held by [`MemoryCalendarHost`], including what the engine attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub calendar_id: String,
    #[serde(flatten)]
    pub event: ExistingEvent,
    pub options: EventOptions,
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Default)]
struct Store {
    events: Vec<StoredEvent>,
    next_id: u64,
    create_calls: usize,
    missing: BTreeSet<String>,
    failing_creates: u32,
    failing_queries: u32,
    failing_lookups: u32,
    failing_reminder_adds: u32,
    auto_reminder: Option<u32>,
}

impl Store {
    fn take_failure(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
pub struct MemoryCalendarHost {
    timezone: Tz,
    store: RefCell<Store>,
}

impl MemoryCalendarHost {
    /// `timezone` places all-day events on the instant axis for range queries.
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            store: RefCell::new(Store::default()),
        }
    }

    /// Make `calendar_by_id` report no calendar for `id`.
    pub fn without_calendar(self, id: &str) -> Self {
        self.store.borrow_mut().missing.insert(id.to_string());
        self
    }

    /// Attach a popup reminder to every new event, the way real hosts apply
    /// calendar-level defaults.
    pub fn with_auto_reminder(self, minutes_before: u32) -> Self {
        self.store.borrow_mut().auto_reminder = Some(minutes_before);
        self
    }

    /// The next `n` event creations fail.
    pub fn fail_next_creates(&self, n: u32) {
        self.store.borrow_mut().failing_creates = n;
    }

    /// The next `n` range queries fail.
    pub fn fail_next_queries(&self, n: u32) {
        self.store.borrow_mut().failing_queries = n;
    }

    /// The next `n` calendar lookups fail.
    pub fn fail_next_lookups(&self, n: u32) {
        self.store.borrow_mut().failing_lookups = n;
    }

    /// The next `n` reminder additions fail.
    pub fn fail_next_reminder_adds(&self, n: u32) {
        self.store.borrow_mut().failing_reminder_adds = n;
    }

    /// Insert an event directly, bypassing the engine. Returns its id.
    pub fn seed(&self, calendar_id: &str, title: &str, when: EventWhen) -> String {
        self.insert(calendar_id, title, when, EventOptions::default())
    }

    pub fn events(&self) -> Vec<StoredEvent> {
        self.store.borrow().events.clone()
    }

    pub fn events_in(&self, calendar_id: &str) -> Vec<StoredEvent> {
        self.store
            .borrow()
            .events
            .iter()
            .filter(|e| e.calendar_id == calendar_id)
            .cloned()
            .collect()
    }

    pub fn event(&self, id: &str) -> Option<StoredEvent> {
        self.store
            .borrow()
            .events
            .iter()
            .find(|e| e.event.id == id)
            .cloned()
    }

    /// Number of create calls that reached the host, failed ones included.
    pub fn create_calls(&self) -> usize {
        self.store.borrow().create_calls
    }

    fn insert(&self, calendar_id: &str, title: &str, when: EventWhen, options: EventOptions) -> String {
        let mut store = self.store.borrow_mut();
        store.next_id += 1;
        let id = format!("evt-{}", store.next_id);
        let reminders = store
            .auto_reminder
            .map(|minutes| vec![Reminder::popup(minutes)])
            .unwrap_or_default();
        store.events.push(StoredEvent {
            calendar_id: calendar_id.to_string(),
            event: ExistingEvent {
                id: id.clone(),
                title: title.to_string(),
                when,
            },
            options,
            reminders,
        });
        id
    }

    fn create(
        &self,
        calendar_id: &str,
        title: &str,
        when: EventWhen,
        options: &EventOptions,
    ) -> HostResult<Box<dyn HostEvent + '_>> {
        {
            let mut store = self.store.borrow_mut();
            store.create_calls += 1;
            if Store::take_failure(&mut store.failing_creates) {
                return Err(HostError::new("service invoked too many times"));
            }
        }
        let id = self.insert(calendar_id, title, when, options.clone());
        Ok(Box::new(MemoryEvent { host: self, id }))
    }

    fn add_reminder(&self, id: &str, reminder: Reminder) -> HostResult<()> {
        if Store::take_failure(&mut self.store.borrow_mut().failing_reminder_adds) {
            return Err(HostError::new("reminder update failed"));
        }
        self.with_reminders(id, |reminders| reminders.push(reminder))
    }

    fn with_reminders(&self, id: &str, f: impl FnOnce(&mut Vec<Reminder>)) -> HostResult<()> {
        let mut store = self.store.borrow_mut();
        let event = store
            .events
            .iter_mut()
            .find(|e| e.event.id == id)
            .ok_or_else(|| HostError::new(format!("event {id} not found")))?;
        f(&mut event.reminders);
        Ok(())
    }
}

impl CalendarHost for MemoryCalendarHost {
    fn calendar_by_id(&self, id: &str) -> HostResult<Option<Box<dyn Calendar + '_>>> {
        let mut store = self.store.borrow_mut();
        if Store::take_failure(&mut store.failing_lookups) {
            return Err(HostError::new("calendar service unavailable"));
        }
        if id.is_empty() || store.missing.contains(id) {
            return Ok(None);
        }
        Ok(Some(Box::new(MemoryCalendar {
            host: self,
            id: id.to_string(),
        })))
    }
}

struct MemoryCalendar<'h> {
    host: &'h MemoryCalendarHost,
    id: String,
}

impl Calendar for MemoryCalendar<'_> {
    fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> HostResult<Vec<ExistingEvent>> {
        let mut store = self.host.store.borrow_mut();
        if Store::take_failure(&mut store.failing_queries) {
            return Err(HostError::new("event query failed"));
        }
        let mut found = Vec::new();
        for stored in store.events.iter().filter(|e| e.calendar_id == self.id) {
            let (event_start, event_end) = stored.event.when.instant_range(self.host.timezone)?;
            if event_start <= end && event_end >= start {
                found.push(stored.event.clone());
            }
        }
        Ok(found)
    }

    fn create_event(
        &self,
        title: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        options: &EventOptions,
    ) -> HostResult<Box<dyn HostEvent + '_>> {
        self.host
            .create(&self.id, title, EventWhen::Timed { start, end }, options)
    }

    fn create_all_day_event(
        &self,
        title: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        options: &EventOptions,
    ) -> HostResult<Box<dyn HostEvent + '_>> {
        let end = end.unwrap_or(start + Duration::days(1));
        if end <= start {
            return Err(HostError::new("all-day end must be after start"));
        }
        self.host
            .create(&self.id, title, EventWhen::AllDay { start, end }, options)
    }
}

struct MemoryEvent<'h> {
    host: &'h MemoryCalendarHost,
    id: String,
}

impl HostEvent for MemoryEvent<'_> {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn remove_all_reminders(&mut self) -> HostResult<()> {
        self.host.with_reminders(&self.id, Vec::clear)
    }

    fn add_email_reminder(&mut self, minutes_before: u32) -> HostResult<()> {
        self.host.add_reminder(&self.id, Reminder::email(minutes_before))
    }

    fn add_popup_reminder(&mut self, minutes_before: u32) -> HostResult<()> {
        self.host.add_reminder(&self.id, Reminder::popup(minutes_before))
    }
}
