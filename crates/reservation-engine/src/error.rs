//! Error types for reservation operations.

use serde::Serialize;
use thiserror::Error;

/// Failure reported by an external collaborator (calendar host or settings store).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ReservationError {
    /// A request field is missing or malformed.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The calendar host or settings store could not serve the call.
    #[error("Host unavailable: {0}")]
    HostUnavailable(String),

    #[error("Unknown reservation type: {0}")]
    UnknownReservationType(String),

    /// Every attempt failed; `message` is the last underlying error.
    #[error("Gave up after {attempts} attempts: {message}")]
    RetryExhausted { attempts: u32, message: String },
}

impl ReservationError {
    /// Only host-side failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReservationError::HostUnavailable(_))
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ReservationError::Validation(message.into())
    }
}

impl From<HostError> for ReservationError {
    fn from(err: HostError) -> Self {
        ReservationError::HostUnavailable(err.0)
    }
}

pub type Result<T> = std::result::Result<T, ReservationError>;
