//! `reserve` CLI: dry-run reservation batches and inspect business days.
//!
//! Every command works against an in-memory calendar host, so nothing is
//! written to a real calendar. Logs go to stderr; stdout carries only the
//! command output.
//!
//! ## Usage
//!
//! ```sh
//! # Business days of a month, skipping company and public holidays
//! reserve business-days 2025-12 --holidays holidays.json --public public.json
//!
//! # Just the last one
//! reserve business-days 2025-12 --holidays holidays.json --which last
//!
//! # Dry-run a batch (stdin → stdout), without the rate-limit pauses
//! reserve run --no-delay < reservations.json
//!
//! # Seed pre-existing events to see which reservations would be skipped
//! reserve run -i reservations.json --existing existing.json
//!
//! # The default monthly plan for a given day
//! reserve plan --today 2025-12-15
//!
//! # Resolved settings, optionally updated first
//! reserve settings --settings settings.json --reminder 15 --json
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::io::{self, Read};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use reservation_engine::{
    monthly_expense_reservations, run_reservation_batch, BatchOptions, BusinessDayType,
    CalendarSettings, CompanyHolidays, EventWhen, MemoryCalendarHost, MemorySettings, NoSleep,
    ReservationContext, ReservationExecutor, ReservationRequest, SettingsUpdate, Sleeper,
    ThreadSleeper, YearMonth,
};

#[derive(Parser)]
#[command(
    name = "reserve",
    version,
    about = "Dry-run calendar reservation batches against an in-memory calendar"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine activity to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the business days of a month
    BusinessDays {
        /// Month as YYYY-MM
        month: YearMonth,
        /// Company holiday table, e.g. {"2025": ["2025-12-29"]}
        #[arg(long)]
        holidays: Option<String>,
        /// Public holidays as a JSON array of YYYY-MM-DD dates
        #[arg(long)]
        public: Option<String>,
        /// Settings JSON object
        #[arg(long)]
        settings: Option<String>,
        /// Print only the number of business days
        #[arg(long, conflicts_with = "which")]
        count: bool,
        /// Print only the first or last business day
        #[arg(long)]
        which: Option<BusinessDayType>,
    },
    /// Run a reservation batch against an in-memory calendar
    Run {
        /// Reservation list JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file for the batch result (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Company holiday table JSON
        #[arg(long)]
        holidays: Option<String>,
        /// Public holidays as a JSON array of YYYY-MM-DD dates
        #[arg(long)]
        public: Option<String>,
        /// Settings JSON object
        #[arg(long)]
        settings: Option<String>,
        /// Events to seed before the run: [{"calendarId", "title", "when"}]
        #[arg(long)]
        existing: Option<String>,
        /// Items between rate-limit pauses
        #[arg(long, default_value_t = 10)]
        batch_size: usize,
        /// Attempts per item
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
        /// Skip rate-limit pauses and retry backoff
        #[arg(long)]
        no_delay: bool,
    },
    /// Print the default monthly reservation plan
    Plan {
        /// Day the plan is computed for (defaults to today in the configured timezone)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Settings JSON object
        #[arg(long)]
        settings: Option<String>,
    },
    /// Show the resolved calendar settings, optionally changing them first
    Settings {
        /// Settings JSON object
        #[arg(long)]
        settings: Option<String>,
        /// Reset every setting to its default
        #[arg(long, conflicts_with_all = ["calendar", "timezone", "holiday_calendar", "reminder"])]
        init: bool,
        /// Default calendar id
        #[arg(long)]
        calendar: Option<String>,
        /// Default IANA timezone
        #[arg(long)]
        timezone: Option<String>,
        /// Public holiday calendar id
        #[arg(long)]
        holiday_calendar: Option<String>,
        /// Default popup reminder in minutes
        #[arg(long)]
        reminder: Option<u32>,
        /// Print JSON instead of the summary text
        #[arg(long)]
        json: bool,
    },
}

/// A pre-existing event to place on the in-memory host.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedEvent {
    calendar_id: Option<String>,
    title: String,
    when: EventWhen,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::BusinessDays {
            month,
            holidays,
            public,
            settings,
            count,
            which,
        } => {
            let settings = load_settings(settings.as_deref())?;
            let resolved = CalendarSettings::load(&settings).context("Failed to load settings")?;
            let company = load_company_holidays(holidays.as_deref())?;
            let host = MemoryCalendarHost::new(resolved.default_timezone);
            seed_public_holidays(&host, &resolved.holiday_calendar_id, public.as_deref())?;

            let executor = ReservationExecutor::new(&host, &settings, &company);
            let calculator = executor
                .business_day_calculator(None)
                .context("Failed to build business-day calculator")?;

            if count {
                println!("{}", calculator.business_day_count(month));
            } else if let Some(which) = which {
                let day = calculator
                    .resolve_business_day(month, which)
                    .with_context(|| format!("No {} business day in {}", which, month))?;
                println!("{}", day);
            } else {
                for day in calculator.business_days(month) {
                    println!("{}", day);
                }
            }
        }
        Commands::Run {
            input,
            output,
            holidays,
            public,
            settings,
            existing,
            batch_size,
            max_retries,
            no_delay,
        } => {
            let raw = read_input(input.as_deref())?;
            let requests: Vec<ReservationRequest> =
                serde_json::from_str(&raw).context("Failed to parse reservation list")?;
            info!(count = requests.len(), "loaded reservations");

            let settings = load_settings(settings.as_deref())?;
            let resolved = CalendarSettings::load(&settings).context("Failed to load settings")?;
            let company = load_company_holidays(holidays.as_deref())?;
            let host = MemoryCalendarHost::new(resolved.default_timezone);
            seed_public_holidays(&host, &resolved.holiday_calendar_id, public.as_deref())?;
            seed_existing_events(&host, &resolved.default_calendar_id, existing.as_deref())?;

            let mut options = BatchOptions::default()
                .with_batch_size(batch_size)
                .with_max_retries(max_retries);
            let sleeper: &dyn Sleeper = if no_delay {
                options = options
                    .with_batch_delay(Duration::ZERO)
                    .with_retry_delay(Duration::ZERO);
                &NoSleep
            } else {
                &ThreadSleeper
            };

            let context = ReservationContext {
                host: &host,
                settings: &settings,
                company_holidays: &company,
                sleeper,
                requests,
                options,
            };
            let result = run_reservation_batch(&context);
            let json = serde_json::to_string_pretty(&result)?;
            write_output(output.as_deref(), &format!("{}\n", json))?;
        }
        Commands::Plan { today, settings } => {
            let today = match today {
                Some(day) => day,
                None => {
                    let settings = load_settings(settings.as_deref())?;
                    let tz = CalendarSettings::load(&settings)
                        .context("Failed to load settings")?
                        .default_timezone;
                    Utc::now().with_timezone(&tz).date_naive()
                }
            };
            let plan = monthly_expense_reservations(today);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Settings {
            settings,
            init,
            calendar,
            timezone,
            holiday_calendar,
            reminder,
            json,
        } => {
            let store = load_settings(settings.as_deref())?;
            let update = SettingsUpdate {
                default_calendar_id: calendar,
                default_timezone: timezone,
                holiday_calendar_id: holiday_calendar,
                default_reminder_minutes: reminder,
            };
            let resolved = if init {
                CalendarSettings::initialize(&store)
            } else if update == SettingsUpdate::default() {
                CalendarSettings::load(&store)
            } else {
                CalendarSettings::update(&store, &update)
            }
            .context("Failed to resolve settings")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                println!("{}", resolved.describe());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_settings(path: Option<&str>) -> Result<MemorySettings> {
    match path {
        Some(path) => {
            let json = read_file(path)?;
            MemorySettings::from_json(&json)
                .with_context(|| format!("Failed to parse settings: {}", path))
        }
        None => Ok(MemorySettings::new()),
    }
}

fn load_company_holidays(path: Option<&str>) -> Result<CompanyHolidays> {
    match path {
        Some(path) => {
            let json = read_file(path)?;
            CompanyHolidays::from_json(&json)
                .with_context(|| format!("Failed to parse company holidays: {}", path))
        }
        None => Ok(CompanyHolidays::new()),
    }
}

/// Place each public holiday as an all-day event on the holiday calendar.
fn seed_public_holidays(
    host: &MemoryCalendarHost,
    calendar_id: &str,
    path: Option<&str>,
) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let dates: Vec<NaiveDate> = serde_json::from_str(&read_file(path)?)
        .with_context(|| format!("Failed to parse public holidays: {}", path))?;
    for date in dates {
        let end = date
            .succ_opt()
            .with_context(|| format!("Public holiday out of range: {}", date))?;
        host.seed(calendar_id, "Public holiday", EventWhen::AllDay { start: date, end });
    }
    info!(calendar_id, "seeded public holidays");
    Ok(())
}

fn seed_existing_events(
    host: &MemoryCalendarHost,
    default_calendar: &str,
    path: Option<&str>,
) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let events: Vec<SeedEvent> = serde_json::from_str(&read_file(path)?)
        .with_context(|| format!("Failed to parse existing events: {}", path))?;
    for event in events {
        let calendar_id = event.calendar_id.as_deref().unwrap_or(default_calendar);
        host.seed(calendar_id, &event.title, event.when);
    }
    Ok(())
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => read_file(path),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
