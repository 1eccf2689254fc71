//! Holiday resolution: public holidays from a host calendar merged with a static
//! company-holiday table.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, warn};

use crate::dates::{start_of_day, YearMonth};
use crate::error::{ReservationError, Result};
use crate::host::CalendarHost;

/// Static company holidays keyed by year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyHolidays {
    by_year: BTreeMap<i32, Vec<NaiveDate>>,
}

impl CompanyHolidays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from ISO `YYYY-MM-DD` strings grouped by year.
    ///
    /// # Errors
    /// Returns `ReservationError::Validation` for an unparsable date or a date
    /// filed under the wrong year.
    pub fn from_iso_table<I, S>(table: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i32, Vec<S>)>,
        S: AsRef<str>,
    {
        let mut by_year = BTreeMap::new();
        for (year, dates) in table {
            let mut parsed = Vec::with_capacity(dates.len());
            for raw in dates {
                let raw = raw.as_ref();
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    ReservationError::validation(format!("invalid company holiday '{raw}'"))
                })?;
                if date.year() != year {
                    return Err(ReservationError::validation(format!(
                        "company holiday {raw} listed under year {year}"
                    )));
                }
                parsed.push(date);
            }
            parsed.sort();
            parsed.dedup();
            by_year.insert(year, parsed);
        }
        Ok(Self { by_year })
    }

    /// Parse a JSON object such as `{"2025": ["2025-12-29", "2025-12-30"]}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: BTreeMap<i32, Vec<String>> = serde_json::from_str(json).map_err(|e| {
            ReservationError::validation(format!("invalid company holiday table: {e}"))
        })?;
        Self::from_iso_table(table)
    }

    /// All holidays of `year`; empty for years not in the table.
    pub fn for_year(&self, year: i32) -> &[NaiveDate] {
        self.by_year.get(&year).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn in_month(&self, month: YearMonth) -> Vec<NaiveDate> {
        self.for_year(month.year())
            .iter()
            .copied()
            .filter(|d| month.contains(*d))
            .collect()
    }

    pub fn is_company_holiday(&self, date: NaiveDate) -> bool {
        self.for_year(date.year()).contains(&date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HolidaySource {
    Public,
    Company,
}

/// Holidays of one month, keyed by calendar date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidaySet {
    dates: BTreeMap<NaiveDate, HolidaySource>,
}

impl HolidaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a date unless it is already present; the first source wins.
    pub fn insert(&mut self, date: NaiveDate, source: HolidaySource) -> bool {
        match self.dates.entry(date) {
            Entry::Vacant(slot) => {
                slot.insert(source);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains_key(&date)
    }

    pub fn source(&self, date: NaiveDate) -> Option<HolidaySource> {
        self.dates.get(&date).copied()
    }

    /// Dates in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Collects bare dates as [`HolidaySource::Public`] entries. Use
/// [`HolidaySet::insert`] to record another source.
impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<T: IntoIterator<Item = NaiveDate>>(iter: T) -> Self {
        let mut set = HolidaySet::new();
        for date in iter {
            set.insert(date, HolidaySource::Public);
        }
        set
    }
}

/// Merges the host's public-holiday calendar with the company table.
pub struct HolidayResolver<'a> {
    host: &'a dyn CalendarHost,
    company: &'a CompanyHolidays,
    timezone: Tz,
}

impl<'a> HolidayResolver<'a> {
    pub fn new(host: &'a dyn CalendarHost, company: &'a CompanyHolidays, timezone: Tz) -> Self {
        Self {
            host,
            company,
            timezone,
        }
    }

    /// Dates of the holiday-calendar entries in `month`.
    ///
    /// Never fails: a missing calendar or a host error yields an empty set.
    pub fn public_holidays(&self, month: YearMonth, calendar_id: &str) -> BTreeSet<NaiveDate> {
        match self.lookup_public(month, calendar_id) {
            Ok(dates) => dates,
            Err(err) => {
                warn!(calendar_id, %month, error = %err, "public holiday lookup failed");
                BTreeSet::new()
            }
        }
    }

    fn lookup_public(&self, month: YearMonth, calendar_id: &str) -> Result<BTreeSet<NaiveDate>> {
        let Some(calendar) = self.host.calendar_by_id(calendar_id)? else {
            warn!(calendar_id, "holiday calendar not found");
            return Ok(BTreeSet::new());
        };
        let start = start_of_day(month.first_day(), self.timezone)?;
        let end = start_of_day(month.last_day() + Duration::days(1), self.timezone)?
            - Duration::seconds(1);
        let dates = calendar
            .events(start, end)?
            .iter()
            .map(|event| event.when.start_date(self.timezone))
            .filter(|date| month.contains(*date))
            .collect();
        Ok(dates)
    }

    pub fn company_holidays(&self, month: YearMonth) -> Vec<NaiveDate> {
        self.company.in_month(month)
    }

    /// Public and company holidays of `month`, public entries taking precedence.
    pub fn all_holidays(&self, month: YearMonth, calendar_id: &str) -> HolidaySet {
        let mut set = HolidaySet::new();
        for date in self.public_holidays(month, calendar_id) {
            set.insert(date, HolidaySource::Public);
        }
        for date in self.company_holidays(month) {
            set.insert(date, HolidaySource::Company);
        }
        debug!(%month, count = set.len(), "resolved holidays");
        set
    }

    pub fn is_company_holiday(&self, date: NaiveDate) -> bool {
        self.company.is_company_holiday(date)
    }
}
