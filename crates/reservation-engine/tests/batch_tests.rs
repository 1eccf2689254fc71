//! Tests for batch processing, throttling, and the scheduled run entry point.

use std::cell::RefCell;
use std::time::Duration;

use chrono::NaiveDate;
use reservation_engine::runner::EXPENSE_REPORT_TITLE;
use reservation_engine::{
    monthly_expense_reservations, run_reservation_batch, BatchOptions, BatchProcessor,
    BusinessDayType, CompanyHolidays, MemoryCalendarHost, MemorySettings, NoSleep, Outcome,
    Reminder, ReservationContext, ReservationError, ReservationExecutor, ReservationRequest,
    Sleeper, YearMonth,
};

const BATCH_DELAY: Duration = Duration::from_millis(700);
const RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Default)]
struct RecordingSleeper {
    waits: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    fn count(&self, duration: Duration) -> usize {
        self.waits.borrow().iter().filter(|d| **d == duration).count()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.waits.borrow_mut().push(duration);
    }
}

fn options() -> BatchOptions {
    BatchOptions::default()
        .with_batch_delay(BATCH_DELAY)
        .with_retry_delay(RETRY_DELAY)
}

fn numbered(n: usize) -> Vec<ReservationRequest> {
    (1..=n)
        .map(|i| ReservationRequest::on_date(format!("Task {i}"), 2025, 3, 3))
        .collect()
}

fn host() -> MemoryCalendarHost {
    MemoryCalendarHost::new(chrono_tz::Asia::Tokyo)
}

#[test]
fn one_bad_item_does_not_abort_the_batch() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    let sleeper = RecordingSleeper::default();
    let requests = vec![
        ReservationRequest::on_date("First", 2025, 3, 3),
        ReservationRequest {
            type_tag: "weekly".into(),
            ..ReservationRequest::on_date("Second", 2025, 3, 4)
        },
        ReservationRequest::on_date("Third", 2025, 3, 5),
    ];

    let result = BatchProcessor::new(&executor, &sleeper).process_batch(&requests, &options());

    assert!(!result.overall_success);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 1);
    assert_eq!(result.results.len(), 3);
    assert_eq!(
        result.results[1].outcome.error(),
        Some(&ReservationError::UnknownReservationType("weekly".into()))
    );
    // The unknown tag is not retried.
    assert_eq!(sleeper.count(RETRY_DELAY), 0);
    assert_eq!(host.events().len(), 2);
}

#[test]
fn outcomes_keep_input_order() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    let requests = numbered(4);

    let result = BatchProcessor::new(&executor, &NoSleep).process_batch(&requests, &options());

    for (i, outcome) in result.results.iter().enumerate() {
        assert_eq!(outcome.index, i);
        assert_eq!(outcome.request, requests[i]);
    }
    assert!(result.overall_success);
}

#[test]
fn pauses_between_full_batches_only() {
    for (total, expected_pauses) in [(25, 2), (20, 1), (10, 0), (9, 0)] {
        let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
        let executor = ReservationExecutor::new(&host, &settings, &company);
        let sleeper = RecordingSleeper::default();

        let result =
            BatchProcessor::new(&executor, &sleeper).process_batch(&numbered(total), &options());

        assert_eq!(result.success_count, total);
        assert_eq!(
            sleeper.count(BATCH_DELAY),
            expected_pauses,
            "{total} items should pause {expected_pauses} times"
        );
    }
}

#[test]
fn transient_failures_are_retried_per_item() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    let sleeper = RecordingSleeper::default();
    host.fail_next_creates(2);

    let result = BatchProcessor::new(&executor, &sleeper).process_batch(&numbered(1), &options());

    assert!(result.overall_success);
    assert!(matches!(result.results[0].outcome, Outcome::Success { .. }));
    assert_eq!(host.create_calls(), 3);
    assert_eq!(*sleeper.waits.borrow(), vec![RETRY_DELAY, RETRY_DELAY * 2]);
}

#[test]
fn exhausted_item_fails_and_the_next_one_runs() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    host.fail_next_creates(3);

    let result = BatchProcessor::new(&executor, &NoSleep).process_batch(&numbered(2), &options());

    assert_eq!(result.failure_count, 1);
    assert!(matches!(
        result.results[0].outcome.error(),
        Some(ReservationError::RetryExhausted { attempts: 3, .. })
    ));
    assert!(result.results[1].outcome.is_success());
}

#[test]
fn validation_failures_are_not_retried() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    let sleeper = RecordingSleeper::default();
    let requests = vec![ReservationRequest::on_date("Bad date", 2025, 2, 30)];

    let result = BatchProcessor::new(&executor, &sleeper).process_batch(&requests, &options());

    assert!(matches!(
        result.results[0].outcome.error(),
        Some(ReservationError::Validation(_))
    ));
    assert!(sleeper.waits.borrow().is_empty());
}

#[test]
fn rerun_reports_skipped_duplicates() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    let processor = BatchProcessor::new(&executor, &NoSleep);
    let requests = numbered(3);

    let first = processor.process_batch(&requests, &options());
    let second = processor.process_batch(&requests, &options());

    assert!(first
        .results
        .iter()
        .all(|r| matches!(r.outcome, Outcome::Success { .. })));
    assert!(second
        .results
        .iter()
        .all(|r| matches!(r.outcome, Outcome::SuccessSkipped { .. })));
    assert_eq!(host.events().len(), 3);
}

#[test]
fn outcome_serializes_with_status_tag() {
    let success = serde_json::to_value(Outcome::Success {
        event_id: "evt-1".into(),
    })
    .unwrap();
    assert_eq!(success, serde_json::json!({"status": "success", "eventId": "evt-1"}));

    let failure = serde_json::to_value(Outcome::Failure {
        error: ReservationError::Validation("title is required".into()),
    })
    .unwrap();
    assert_eq!(
        failure,
        serde_json::json!({
            "status": "failure",
            "error": {"kind": "validation", "detail": "title is required"}
        })
    );
}

#[test]
fn reminder_failure_after_create_still_reports_a_new_event() {
    let host = host().with_auto_reminder(10);
    let (settings, company) = (MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    host.fail_next_reminder_adds(1);
    let requests = vec![ReservationRequest::on_date("Fresh", 2025, 3, 3)];

    let result = BatchProcessor::new(&executor, &NoSleep).process_batch(&requests, &options());

    assert_eq!(
        result.results[0].outcome,
        Outcome::Success {
            event_id: "evt-1".into()
        }
    );
    assert_eq!(host.create_calls(), 1);
    let events = host.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].reminders, vec![Reminder::popup(30)]);
}

#[test]
fn bad_business_day_fields_fail_only_their_item() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let executor = ReservationExecutor::new(&host, &settings, &company);
    let december = YearMonth::new(2025, 12).unwrap();
    let requests = vec![
        ReservationRequest::business_day("Expense report", december, BusinessDayType::Last),
        ReservationRequest {
            business_day_type: Some("middle".into()),
            ..ReservationRequest::business_day("Review", december, BusinessDayType::First)
        },
        ReservationRequest {
            year_month: Some("2025-13".into()),
            ..ReservationRequest::business_day("Planning", december, BusinessDayType::First)
        },
        ReservationRequest::on_date("Kickoff", 2026, 1, 5),
    ];

    let result = BatchProcessor::new(&executor, &NoSleep).process_batch(&requests, &options());

    assert_eq!(result.results.len(), 4);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 2);
    for failed in &result.results[1..3] {
        assert!(matches!(
            failed.outcome.error(),
            Some(ReservationError::Validation(_))
        ));
    }
}

// ── Runner ──────────────────────────────────────────────────────────────────

#[test]
fn empty_run_is_a_success() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let context = ReservationContext {
        host: &host,
        settings: &settings,
        company_holidays: &company,
        sleeper: &NoSleep,
        requests: Vec::new(),
        options: BatchOptions::default(),
    };

    let result = run_reservation_batch(&context);

    assert!(result.overall_success);
    assert_eq!(result.success_count + result.failure_count, 0);
    assert_eq!(host.create_calls(), 0);
}

#[test]
fn counts_always_cover_every_request() {
    let (host, settings, company) = (host(), MemorySettings::new(), CompanyHolidays::new());
    let mut requests = numbered(5);
    requests.push(ReservationRequest::new(
        reservation_engine::ReservationKind::Basic,
        "",
    ));
    let context = ReservationContext {
        host: &host,
        settings: &settings,
        company_holidays: &company,
        sleeper: &NoSleep,
        requests,
        options: BatchOptions::default(),
    };

    let result = run_reservation_batch(&context);

    assert_eq!(result.success_count + result.failure_count, 6);
    assert_eq!(result.failures().count(), 1);
}

#[test]
fn monthly_plan_covers_current_and_next_month() {
    let today = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
    let plan = monthly_expense_reservations(today);

    let months: Vec<_> = plan.iter().map(|r| r.year_month.as_deref()).collect();
    assert_eq!(months, vec![Some("2025-12"), Some("2026-01")]);
    for request in &plan {
        assert_eq!(request.title, EXPENSE_REPORT_TITLE);
        assert_eq!(request.business_day_type.as_deref(), Some("last"));
        assert!(request.all_day);
    }
}

#[test]
fn monthly_plan_runs_end_to_end_and_is_idempotent() {
    let host = host();
    let settings = MemorySettings::new();
    let company =
        CompanyHolidays::from_json(r#"{"2025": ["2025-12-29", "2025-12-30", "2025-12-31"]}"#)
            .unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 12, 15).unwrap();
    let context = ReservationContext {
        host: &host,
        settings: &settings,
        company_holidays: &company,
        sleeper: &NoSleep,
        requests: monthly_expense_reservations(today),
        options: BatchOptions::default(),
    };

    let first = run_reservation_batch(&context);
    let second = run_reservation_batch(&context);

    assert_eq!(first.success_count, 2);
    assert_eq!(second.success_count, 2);
    let dates: Vec<_> = host
        .events()
        .iter()
        .map(|e| e.event.when.start_date(chrono_tz::Asia::Tokyo))
        .collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2025, 12, 26).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 30).unwrap(),
        ]
    );
}
