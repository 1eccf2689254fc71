//! Ordered batch processing with per-item retry and rate-limit pauses.
//!
//! Every request yields exactly one outcome record; errors never abort the batch.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ReservationError;
use crate::executor::{Created, ReservationExecutor};
use crate::request::ReservationRequest;
use crate::retry::{RetryExecutor, RetryPolicy, Sleeper};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Pause after every `batch_size` items.
    pub batch_size: usize,
    pub batch_delay: Duration,
    /// Attempts per item, passed to the retry executor.
    pub max_retries: u32,
    /// Base backoff between attempts.
    pub retry_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(1000),
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl BatchOptions {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_batch_delay(mut self, batch_delay: Duration) -> Self {
        self.batch_delay = batch_delay;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
    #[serde(rename_all = "camelCase")]
    Success { event_id: String },
    #[serde(rename_all = "camelCase")]
    SuccessSkipped { existing_event_id: String },
    Failure { error: ReservationError },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failure { .. })
    }

    pub fn error(&self) -> Option<&ReservationError> {
        match self {
            Outcome::Failure { error } => Some(error),
            _ => None,
        }
    }
}

impl From<crate::error::Result<Created>> for Outcome {
    fn from(result: crate::error::Result<Created>) -> Self {
        match result {
            Ok(Created::New { event_id }) => Outcome::Success { event_id },
            Ok(Created::Skipped { existing_event_id }) => Outcome::SuccessSkipped { existing_event_id },
            Err(error) => Outcome::Failure { error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub index: usize,
    pub request: ReservationRequest,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub overall_success: bool,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<BatchOutcome>,
}

impl BatchResult {
    pub fn failures(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.results.iter().filter(|r| !r.outcome.is_success())
    }
}

pub struct BatchProcessor<'a> {
    executor: &'a ReservationExecutor<'a>,
    sleeper: &'a dyn Sleeper,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(executor: &'a ReservationExecutor<'a>, sleeper: &'a dyn Sleeper) -> Self {
        Self { executor, sleeper }
    }

    /// Process `requests` in order.
    ///
    /// An unknown type tag fails its item without entering the retry loop.
    pub fn process_batch(&self, requests: &[ReservationRequest], options: &BatchOptions) -> BatchResult {
        let retry = RetryExecutor::new(
            RetryPolicy::new(options.max_retries, options.retry_delay),
            self.sleeper,
        );
        let total = requests.len();
        let mut result = BatchResult::default();

        info!(total, "starting reservation batch");

        for (index, request) in requests.iter().enumerate() {
            let outcome: Outcome = match request.kind() {
                Ok(kind) => retry
                    .run(|| kind.handler().create(self.executor, request))
                    .into(),
                Err(error) => Outcome::Failure { error },
            };

            match &outcome {
                Outcome::Failure { error } => {
                    result.failure_count += 1;
                    warn!(item = index + 1, total, title = %request.title, %error, "reservation failed");
                }
                _ => {
                    result.success_count += 1;
                    info!(item = index + 1, total, title = %request.title, "reservation succeeded");
                }
            }

            result.results.push(BatchOutcome {
                index,
                request: request.clone(),
                outcome,
            });

            let processed = index + 1;
            if options.batch_size > 0 && processed % options.batch_size == 0 && processed < total {
                info!(delay_ms = options.batch_delay.as_millis() as u64, "pausing between batches");
                self.sleeper.sleep(options.batch_delay);
            }
        }

        result.overall_success = result.failure_count == 0;
        info!(
            success = result.success_count,
            failure = result.failure_count,
            "reservation batch finished"
        );
        result
    }
}
