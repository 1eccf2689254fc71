//! The externally callable batch run and the default monthly plan.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::batch::{BatchOptions, BatchProcessor, BatchResult};
use crate::business_days::BusinessDayType;
use crate::dates::YearMonth;
use crate::executor::ReservationExecutor;
use crate::holidays::CompanyHolidays;
use crate::host::CalendarHost;
use crate::request::ReservationRequest;
use crate::retry::Sleeper;
use crate::settings::SettingsProvider;

pub const EXPENSE_REPORT_TITLE: &str = "Expense report";

/// Everything one scheduled run needs, passed explicitly.
pub struct ReservationContext<'a> {
    pub host: &'a dyn CalendarHost,
    pub settings: &'a dyn SettingsProvider,
    pub company_holidays: &'a CompanyHolidays,
    pub sleeper: &'a dyn Sleeper,
    pub requests: Vec<ReservationRequest>,
    pub options: BatchOptions,
}

/// Run every request in `context` and log a summary. Never fails.
pub fn run_reservation_batch(context: &ReservationContext<'_>) -> BatchResult {
    if context.requests.is_empty() {
        info!("no reservations configured");
        return BatchResult {
            overall_success: true,
            ..BatchResult::default()
        };
    }

    let executor = ReservationExecutor::new(context.host, context.settings, context.company_holidays);
    let processor = BatchProcessor::new(&executor, context.sleeper);
    let result = processor.process_batch(&context.requests, &context.options);

    info!(
        success = result.success_count,
        failure = result.failure_count,
        "reservation run complete"
    );
    for failed in result.failures() {
        if let Some(error) = failed.outcome.error() {
            warn!(index = failed.index, title = %failed.request.title, %error, "failed reservation");
        }
    }
    result
}

/// All-day reservations on the last business day of the month containing
/// `today` and of the following month.
pub fn monthly_expense_reservations(today: NaiveDate) -> Vec<ReservationRequest> {
    let current = YearMonth::current(today);
    [current, current.next()]
        .into_iter()
        .map(|month| ReservationRequest::business_day(EXPENSE_REPORT_TITLE, month, BusinessDayType::Last))
        .collect()
}
