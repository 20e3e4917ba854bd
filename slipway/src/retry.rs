use std::{fmt, thread, time::Duration};

use log::{debug, info, warn};
use time::OffsetDateTime;

use crate::image_ref::ImageRef;

/// Backoff grows by this much per completed attempt: the sleep before attempt `k + 1` is
/// `k × BACKOFF_UNIT`. Linear on purpose, not exponential.
pub const BACKOFF_UNIT: Duration = Duration::from_secs(10);

/// The backoff slept after a failed attempt with the given 1-based index.
pub fn backoff_delay(attempt_index: u32) -> Duration {
    BACKOFF_UNIT * attempt_index
}

/// One timed attempt. Logged for diagnostics and aggregated into [`BuildResult`], never
/// persisted beyond the run.
#[derive(Debug, Clone)]
pub struct BuildAttempt {
    pub index: u32,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
    pub succeeded: bool,
}

impl BuildAttempt {
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at).unsigned_abs()
    }
}

#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The final recorded attempt succeeded and produced `value`.
    Succeeded {
        value: T,
        attempts: Vec<BuildAttempt>,
    },
    /// Every attempt up to the configured limit failed.
    Exhausted { attempts: Vec<BuildAttempt> },
}

/// Bounded-retry executor. Attempts are strictly sequential: attempt `k + 1` only starts after
/// attempt `k` has failed and the backoff has elapsed. A running attempt is never cancelled.
pub struct Retry {
    pub limit: u32,
}

impl Retry {
    pub fn run<T, E>(&self, op: impl FnMut(u32) -> Result<T, E>) -> RetryOutcome<T>
    where
        E: fmt::Display,
    {
        self.run_with_sleep(op, thread::sleep)
    }

    /// Sleeping is injected so tests can observe the backoff schedule without waiting it out.
    fn run_with_sleep<T, E>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, E>,
        mut sleep: impl FnMut(Duration),
    ) -> RetryOutcome<T>
    where
        E: fmt::Display,
    {
        let mut attempts = Vec::new();
        let mut index = 1;

        loop {
            info!("build attempt {index} of {limit}...", limit = self.limit);

            let started_at = OffsetDateTime::now_utc();
            let result = op(index);
            let finished_at = OffsetDateTime::now_utc();

            let attempt = BuildAttempt {
                index,
                started_at,
                finished_at,
                succeeded: result.is_ok(),
            };
            debug!(
                "attempt {index} took {duration:.1?}",
                index = attempt.index,
                duration = attempt.duration()
            );
            attempts.push(attempt);

            match result {
                Ok(value) => return RetryOutcome::Succeeded { value, attempts },
                Err(error) => {
                    warn!("build attempt {index} failed: {error}");

                    if index >= self.limit {
                        return RetryOutcome::Exhausted { attempts };
                    }

                    let delay = backoff_delay(index);
                    info!(
                        "retrying in {delay} seconds ({remaining} attempts left)...",
                        delay = delay.as_secs(),
                        remaining = self.limit - index,
                    );
                    sleep(delay);
                    index += 1;
                }
            }
        }
    }
}

/// Final outcome of a run, produced exactly once and consumed by the reporter.
#[derive(Debug)]
pub struct BuildResult {
    pub image: ImageRef,
    pub succeeded: bool,
    pub attempts_consumed: u32,
    /// Wall-clock duration of the last attempt, the winning one on success.
    pub final_attempt_duration: Duration,
    pub finished_at: OffsetDateTime,
    /// Image identity captured from the engine, when available: the buildx metadata digest or
    /// the classic builder's image ID.
    pub identity: Option<String>,
}

impl BuildResult {
    pub fn new(
        image: ImageRef,
        succeeded: bool,
        attempts: &[BuildAttempt],
        identity: Option<String>,
    ) -> Self {
        BuildResult {
            image,
            succeeded,
            attempts_consumed: attempts.len() as u32,
            final_attempt_duration: attempts
                .last()
                .map(BuildAttempt::duration)
                .unwrap_or_default(),
            finished_at: attempts
                .last()
                .map(|attempt| attempt.finished_at)
                .unwrap_or_else(OffsetDateTime::now_utc),
            identity,
        }
    }
}
