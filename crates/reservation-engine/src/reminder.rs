//! Reminder specs and their normalization into an ordered reminder list.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReminderChannel {
    Email,
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub channel: ReminderChannel,
    pub minutes_before: u32,
}

impl Reminder {
    pub fn email(minutes_before: u32) -> Self {
        Self {
            channel: ReminderChannel::Email,
            minutes_before,
        }
    }

    pub fn popup(minutes_before: u32) -> Self {
        Self {
            channel: ReminderChannel::Popup,
            minutes_before,
        }
    }
}

/// Reminder request as written in a reservation: each channel takes a single
/// minute count or a list of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSpec {
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub email: Vec<u32>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub popup: Vec<u32>,
}

impl ReminderSpec {
    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.popup.is_empty()
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(u32),
        Many(Vec<u32>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(minutes) => vec![minutes],
        OneOrMany::Many(list) => list,
    })
}

/// Flatten a spec into the reminders to install.
///
/// Email entries come first, then popup entries, each in input order. A missing
/// or empty spec yields a single popup reminder of `default_minutes`.
pub fn normalize_reminders(spec: Option<&ReminderSpec>, default_minutes: u32) -> Vec<Reminder> {
    match spec {
        Some(spec) if !spec.is_empty() => spec
            .email
            .iter()
            .map(|&m| Reminder::email(m))
            .chain(spec.popup.iter().map(|&m| Reminder::popup(m)))
            .collect(),
        _ => vec![Reminder::popup(default_minutes)],
    }
}
