//! Integration tests for the `reserve` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the business-days,
//! run, plan, and settings subcommands through the actual binary, including
//! stdin/stdout piping, fixture files, and error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

/// Helper: path to a fixture file.
fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn reserve() -> Command {
    Command::cargo_bin("reserve").unwrap()
}

/// Helper: run `reserve` with `args` and parse stdout as JSON.
fn run_json(args: &[&str]) -> Value {
    let output = reserve().args(args).output().unwrap();
    assert!(
        output.status.success(),
        "reserve {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

// ─────────────────────────────────────────────────────────────────────────────
// business-days subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn business_days_skip_company_holidays() {
    let holidays = fixture("holidays.json");
    let output = reserve()
        .args(["business-days", "2025-12", "--holidays", &holidays])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let days: Vec<&str> = stdout.lines().collect();
    assert_eq!(days.len(), 20);
    assert_eq!(days.first(), Some(&"2025-12-01"));
    assert_eq!(days.last(), Some(&"2025-12-26"));
    assert!(!stdout.contains("2025-12-29"));
}

#[test]
fn business_days_count_with_public_holidays() {
    reserve()
        .args(["business-days", "2025-01", "--count", "--public", &fixture("public.json")])
        .assert()
        .success()
        .stdout("21\n");
}

#[test]
fn business_days_without_holidays_counts_weekdays() {
    reserve()
        .args(["business-days", "2025-01", "--count"])
        .assert()
        .success()
        .stdout("23\n");
}

#[test]
fn first_business_day_skips_both_sources() {
    reserve()
        .args([
            "business-days",
            "2026-01",
            "--which",
            "first",
            "--holidays",
            &fixture("holidays.json"),
            "--public",
            &fixture("public.json"),
        ])
        .assert()
        .success()
        .stdout("2026-01-05\n");
}

#[test]
fn last_business_day_of_year_end() {
    reserve()
        .args(["business-days", "2025-12", "--which", "last", "--holidays", &fixture("holidays.json")])
        .assert()
        .success()
        .stdout("2025-12-26\n");
}

#[test]
fn invalid_month_is_rejected() {
    reserve()
        .args(["business-days", "2025-13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2025-13"));
}

#[test]
fn invalid_business_day_type_is_rejected() {
    reserve()
        .args(["business-days", "2025-12", "--which", "middle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("first"));
}

// ─────────────────────────────────────────────────────────────────────────────
// run subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn run_creates_every_reservation() {
    let result = run_json(&[
        "run",
        "--no-delay",
        "-i",
        &fixture("reservations.json"),
        "--holidays",
        &fixture("holidays.json"),
    ]);

    assert_eq!(result["overallSuccess"], true);
    assert_eq!(result["successCount"], 3);
    assert_eq!(result["failureCount"], 0);
    let statuses: Vec<&str> = result["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["outcome"]["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["success", "success", "success"]);
    assert_eq!(result["results"][0]["outcome"]["eventId"], "evt-1");
}

#[test]
fn run_reads_reservations_from_stdin() {
    let input = r#"[{"type": "date", "title": "Kickoff", "allDay": true, "year": 2026, "month": 1, "day": 5}]"#;

    reserve()
        .args(["run", "--no-delay"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"overallSuccess\": true"))
        .stdout(predicate::str::contains("\"eventId\": \"evt-1\""));
}

#[test]
fn run_skips_existing_events() {
    let result = run_json(&[
        "run",
        "--no-delay",
        "-i",
        &fixture("reservations.json"),
        "--holidays",
        &fixture("holidays.json"),
        "--existing",
        &fixture("existing.json"),
    ]);

    let first = &result["results"][0]["outcome"];
    assert_eq!(first["status"], "successSkipped");
    assert_eq!(first["existingEventId"], "evt-1");
    assert_eq!(result["successCount"], 3);
}

#[test]
fn run_reports_failures_without_aborting() {
    let result = run_json(&["run", "--no-delay", "-i", &fixture("mixed.json")]);

    assert_eq!(result["overallSuccess"], false);
    assert_eq!(result["successCount"], 1);
    assert_eq!(result["failureCount"], 2);

    let results = result["results"].as_array().unwrap();
    assert_eq!(results[0]["outcome"]["status"], "success");
    assert_eq!(results[1]["outcome"]["error"]["kind"], "unknownReservationType");
    assert_eq!(results[1]["outcome"]["error"]["detail"], "weekly");
    assert_eq!(results[2]["outcome"]["error"]["kind"], "validation");
    assert_eq!(results[2]["index"], 2);
}

#[test]
fn run_fails_bad_business_day_fields_per_item() {
    let result = run_json(&["run", "--no-delay", "-i", &fixture("bad_business_day.json")]);

    assert_eq!(result["successCount"], 2);
    assert_eq!(result["failureCount"], 2);

    let results = result["results"].as_array().unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0]["outcome"]["status"], "success");
    for failed in &results[1..3] {
        assert_eq!(failed["outcome"]["status"], "failure");
        assert_eq!(failed["outcome"]["error"]["kind"], "validation");
    }
    assert!(results[1]["outcome"]["error"]["detail"]
        .as_str()
        .unwrap()
        .contains("middle"));
    assert!(results[2]["outcome"]["error"]["detail"]
        .as_str()
        .unwrap()
        .contains("2025-13"));
    assert_eq!(results[3]["outcome"]["status"], "success");
}

#[test]
fn run_empty_list_is_a_success() {
    reserve()
        .args(["run", "--no-delay"])
        .write_stdin("[]")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"overallSuccess\": true"))
        .stdout(predicate::str::contains("\"successCount\": 0"));
}

#[test]
fn run_writes_result_to_file() {
    let output_path = std::env::temp_dir().join("reserve-test-run-output.json");
    let _ = std::fs::remove_file(&output_path);

    reserve()
        .args(["run", "--no-delay", "-i", &fixture("mixed.json"), "-o"])
        .arg(&output_path)
        .assert()
        .success()
        .stdout("");

    let content = std::fs::read_to_string(&output_path).expect("output file must exist");
    let result: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(result["failureCount"], 2);

    let _ = std::fs::remove_file(&output_path);
}

#[test]
fn run_rejects_malformed_input() {
    reserve()
        .args(["run", "--no-delay"])
        .write_stdin("{not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse reservation list"));
}

#[test]
fn run_reports_missing_file() {
    reserve()
        .args(["run", "-i", "/nonexistent/reservations.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn run_rejects_bad_company_table() {
    reserve()
        .args(["run", "--no-delay", "--holidays", &fixture("public.json")])
        .write_stdin("[]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse company holidays"));
}

// ─────────────────────────────────────────────────────────────────────────────
// plan subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn plan_covers_current_and_next_month() {
    let plan = run_json(&["plan", "--today", "2025-12-15"]);

    let plan = plan.as_array().unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0]["type"], "businessDay");
    assert_eq!(plan[0]["yearMonth"], "2025-12");
    assert_eq!(plan[1]["yearMonth"], "2026-01");
    assert!(plan.iter().all(|r| r["businessDayType"] == "last"));
    assert!(plan.iter().all(|r| r["title"] == "Expense report"));
}

#[test]
fn plan_output_runs_as_a_batch() {
    let plan = reserve()
        .args(["plan", "--today", "2025-12-15"])
        .output()
        .unwrap()
        .stdout;

    reserve()
        .args(["run", "--no-delay", "--holidays", &fixture("holidays.json")])
        .write_stdin(plan)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"successCount\": 2"));
}

// ─────────────────────────────────────────────────────────────────────────────
// settings subcommand
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn settings_defaults_summary() {
    reserve()
        .arg("settings")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current Calendar Settings:"))
        .stdout(predicate::str::contains("Default Calendar ID: primary"))
        .stdout(predicate::str::contains("Default Timezone: Asia/Tokyo"))
        .stdout(predicate::str::contains("Default Reminder: 30 minutes"));
}

#[test]
fn settings_from_file_as_json() {
    let settings = run_json(&["settings", "--settings", &fixture("settings.json"), "--json"]);

    assert_eq!(settings["defaultCalendarId"], "work");
    assert_eq!(settings["defaultTimezone"], "Europe/Berlin");
    assert_eq!(settings["defaultReminderMinutes"], 15);
    assert_eq!(
        settings["holidayCalendarId"],
        "ja.japanese#holiday@group.v.calendar.google.com"
    );
}

#[test]
fn settings_update_keeps_unspecified_fields() {
    let settings = run_json(&[
        "settings",
        "--settings",
        &fixture("settings.json"),
        "--reminder",
        "45",
        "--json",
    ]);

    assert_eq!(settings["defaultReminderMinutes"], 45);
    assert_eq!(settings["defaultCalendarId"], "work");
}

#[test]
fn settings_init_resets_to_defaults() {
    let settings = run_json(&["settings", "--settings", &fixture("settings.json"), "--init", "--json"]);

    assert_eq!(settings["defaultCalendarId"], "primary");
    assert_eq!(settings["defaultTimezone"], "Asia/Tokyo");
    assert_eq!(settings["defaultReminderMinutes"], 30);
}

#[test]
fn settings_reject_unknown_timezone() {
    reserve()
        .args(["settings", "--timezone", "Mars/Olympus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mars/Olympus"));
}

// ─────────────────────────────────────────────────────────────────────────────
// General
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn help_lists_subcommands() {
    reserve()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("business-days"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("settings"));
}

#[test]
fn missing_subcommand_is_an_error() {
    reserve().assert().failure();
}
