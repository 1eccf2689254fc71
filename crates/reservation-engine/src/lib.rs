//! # reservation-engine
//!
//! Batch creation of calendar reservations that is safe to re-run.
//!
//! Before every write the engine re-queries the host calendar for an identical
//! event and skips the write if one exists, so the host itself is the
//! idempotency record. Business-day targets are resolved against public
//! holidays from a host calendar merged with a static company table. Transient
//! host failures are retried with exponential backoff, and batches pause
//! periodically to stay under host rate limits.
//!
//! ## Modules
//!
//! - [`holidays`] - public + company holiday resolution
//! - [`business_days`] - business-day sequences and first/last queries
//! - [`duplicate`] - duplicate detection against the host
//! - [`executor`] - request validation, event creation, reminders
//! - [`retry`] - bounded retries with backoff, injectable sleeper
//! - [`batch`] - ordered batch processing and outcome aggregation
//! - [`runner`] - the scheduled entry point and default monthly plan
//! - [`host`] / [`settings`] - collaborator traits
//! - [`memory`] - in-memory calendar host
//! - [`dates`] / [`reminder`] / [`request`] - value types and parsing
//! - [`error`] - error types

pub mod batch;
pub mod business_days;
pub mod dates;
pub mod duplicate;
pub mod error;
pub mod executor;
pub mod holidays;
pub mod host;
pub mod memory;
pub mod reminder;
pub mod request;
pub mod retry;
pub mod runner;
pub mod settings;

pub use batch::{BatchOptions, BatchOutcome, BatchProcessor, BatchResult, Outcome};
pub use business_days::{business_days, BusinessDayCalculator, BusinessDayType};
pub use dates::{is_valid_date, is_valid_time_format, YearMonth};
pub use duplicate::{CandidateTiming, DuplicateCandidate, DuplicateDetector};
pub use error::{HostError, ReservationError};
pub use executor::{CreateReservation, Created, ReservationExecutor};
pub use holidays::{CompanyHolidays, HolidayResolver, HolidaySet, HolidaySource};
pub use host::{Calendar, CalendarHost, EventOptions, EventWhen, ExistingEvent, HostEvent};
pub use memory::MemoryCalendarHost;
pub use reminder::{normalize_reminders, Reminder, ReminderChannel, ReminderSpec};
pub use request::{ReservationKind, ReservationRequest};
pub use retry::{NoSleep, RetryExecutor, RetryPolicy, Sleeper, ThreadSleeper};
pub use runner::{monthly_expense_reservations, run_reservation_batch, ReservationContext};
pub use settings::{CalendarSettings, MemorySettings, SettingsProvider, SettingsUpdate};
