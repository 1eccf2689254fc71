//! Key-value settings store and the typed calendar settings read from it.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HostError, ReservationError, Result};

pub const DEFAULT_CALENDAR_ID_KEY: &str = "DEFAULT_CALENDAR_ID";
pub const DEFAULT_TIMEZONE_KEY: &str = "DEFAULT_TIMEZONE";
pub const HOLIDAY_CALENDAR_ID_KEY: &str = "HOLIDAY_CALENDAR_ID";
pub const DEFAULT_REMINDER_MINUTES_KEY: &str = "DEFAULT_REMINDER_MINUTES";

pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Tokyo;
pub const DEFAULT_HOLIDAY_CALENDAR_ID: &str = "ja.japanese#holiday@group.v.calendar.google.com";
pub const DEFAULT_REMINDER_MINUTES: u32 = 30;

/// String key-value store the engine reads its defaults from.
pub trait SettingsProvider {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, HostError>;
    fn set(&self, key: &str, value: &str) -> std::result::Result<(), HostError>;
}

/// In-process settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RefCell<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON object whose values are strings or numbers.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| ReservationError::validation(format!("invalid settings JSON: {e}")))?;
        let mut values = BTreeMap::new();
        for (key, value) in map {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                other => {
                    return Err(ReservationError::validation(format!(
                        "setting '{key}' must be a string or number, got {other}"
                    )))
                }
            };
            values.insert(key, value);
        }
        Ok(Self {
            values: RefCell::new(values),
        })
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl SettingsProvider for MemorySettings {
    fn get(&self, key: &str) -> std::result::Result<Option<String>, HostError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> std::result::Result<(), HostError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Resolved engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSettings {
    pub default_calendar_id: String,
    #[serde(serialize_with = "serialize_tz")]
    pub default_timezone: Tz,
    pub holiday_calendar_id: String,
    pub default_reminder_minutes: u32,
}

fn serialize_tz<S: serde::Serializer>(tz: &Tz, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(tz.name())
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            default_calendar_id: DEFAULT_CALENDAR_ID.to_string(),
            default_timezone: DEFAULT_TIMEZONE,
            holiday_calendar_id: DEFAULT_HOLIDAY_CALENDAR_ID.to_string(),
            default_reminder_minutes: DEFAULT_REMINDER_MINUTES,
        }
    }
}

impl CalendarSettings {
    /// Read settings, filling unset keys with defaults.
    ///
    /// # Errors
    /// `HostUnavailable` if the store cannot be read, `Validation` if the
    /// configured timezone is not an IANA identifier.
    pub fn load(provider: &dyn SettingsProvider) -> Result<Self> {
        let default_calendar_id = non_empty(provider.get(DEFAULT_CALENDAR_ID_KEY)?)
            .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string());

        let default_timezone = match non_empty(provider.get(DEFAULT_TIMEZONE_KEY)?) {
            Some(name) => name.parse::<Tz>().map_err(|_| {
                ReservationError::validation(format!("invalid timezone setting '{name}'"))
            })?,
            None => DEFAULT_TIMEZONE,
        };

        let holiday_calendar_id = non_empty(provider.get(HOLIDAY_CALENDAR_ID_KEY)?)
            .unwrap_or_else(|| DEFAULT_HOLIDAY_CALENDAR_ID.to_string());

        let default_reminder_minutes = match non_empty(provider.get(DEFAULT_REMINDER_MINUTES_KEY)?) {
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
                warn!(value = %raw, "unparsable reminder minutes setting, using default");
                DEFAULT_REMINDER_MINUTES
            }),
            None => DEFAULT_REMINDER_MINUTES,
        };

        Ok(Self {
            default_calendar_id,
            default_timezone,
            holiday_calendar_id,
            default_reminder_minutes,
        })
    }

    /// Write every field back to the store.
    pub fn store(&self, provider: &dyn SettingsProvider) -> Result<()> {
        provider.set(DEFAULT_CALENDAR_ID_KEY, &self.default_calendar_id)?;
        provider.set(DEFAULT_TIMEZONE_KEY, self.default_timezone.name())?;
        provider.set(HOLIDAY_CALENDAR_ID_KEY, &self.holiday_calendar_id)?;
        provider.set(
            DEFAULT_REMINDER_MINUTES_KEY,
            &self.default_reminder_minutes.to_string(),
        )?;
        Ok(())
    }

    /// Write only the fields present in `update`, then reload.
    ///
    /// # Errors
    /// `Validation` if `update` names an unknown timezone; nothing is written then.
    pub fn update(provider: &dyn SettingsProvider, update: &SettingsUpdate) -> Result<Self> {
        if let Some(name) = update.default_timezone.as_deref() {
            name.parse::<Tz>().map_err(|_| {
                ReservationError::validation(format!("invalid timezone setting '{name}'"))
            })?;
        }
        let fields = [
            (DEFAULT_CALENDAR_ID_KEY, update.default_calendar_id.clone()),
            (DEFAULT_TIMEZONE_KEY, update.default_timezone.clone()),
            (HOLIDAY_CALENDAR_ID_KEY, update.holiday_calendar_id.clone()),
            (
                DEFAULT_REMINDER_MINUTES_KEY,
                update.default_reminder_minutes.map(|m| m.to_string()),
            ),
        ];
        for (key, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                provider.set(key, &value)?;
            }
        }
        info!("calendar settings updated");
        Self::load(provider)
    }

    /// Reset the store to the built-in defaults.
    pub fn initialize(provider: &dyn SettingsProvider) -> Result<Self> {
        let settings = Self::default();
        settings.store(provider)?;
        info!("calendar settings reset to defaults");
        Ok(settings)
    }

    /// Multi-line summary for display.
    pub fn describe(&self) -> String {
        format!(
            "Current Calendar Settings:\n  Default Calendar ID: {}\n  Default Timezone: {}\n  Holiday Calendar ID: {}\n  Default Reminder: {} minutes",
            self.default_calendar_id,
            self.default_timezone.name(),
            self.holiday_calendar_id,
            self.default_reminder_minutes
        )
    }
}

/// Partial settings change; `None` fields are left as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub default_calendar_id: Option<String>,
    pub default_timezone: Option<String>,
    pub holiday_calendar_id: Option<String>,
    pub default_reminder_minutes: Option<u32>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
