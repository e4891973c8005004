//! The polling engine.
//!
//! One run drives a single operation through a small state machine:
//!
//! ```text
//!              retryable code
//!            +---------------+
//!            v               |
//! start -> Retrying ---------+
//!            |  success code        other code
//!            +-------------> Success
//!            +----------------------------> Error
//! ```
//!
//! Attempts are strictly sequential. Before each retry the engine waits for
//! the poll interval (jittered on long budgets) and gives up once the next
//! attempt would start past the overall timeout. The cancellation token and
//! the remaining budget are raced against every wait and every attempt.

use core::fmt;
use core::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::PollBackoff;
use crate::diag::Diagnostics;
use crate::error::PollError;
use crate::operation::OperationResponse;
use crate::policy::{PollState, RetryTiming};
use crate::sleep::Sleeper;
use crate::status::{StatusClass, StatusSets};

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryState {
    /// Waiting for another attempt (non-terminal).
    #[default]
    Retrying,
    /// Terminal: a success code was observed.
    Success,
    /// Terminal: a non-retryable code was observed.
    Error,
}

impl RetryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryState::Retrying => "retrying",
            RetryState::Success => "success",
            RetryState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RetryState::Retrying)
    }
}

impl fmt::Display for RetryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest attempt's body and diagnostics plus the state they led to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryOutcome {
    pub body: Vec<u8>,
    pub diagnostics: Diagnostics,
    pub state: RetryState,
}

impl RetryOutcome {
    /// Decode the JSON body into an API model.
    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Fold one attempt into the outcome and report how it was classified.
    ///
    /// The body is always kept so that rejected responses remain inspectable.
    /// Diagnostics are only kept when the attempt is fatal; on a retryable or
    /// successful attempt they are dropped.
    pub(crate) fn refresh(
        &mut self,
        response: OperationResponse,
        statuses: &StatusSets,
    ) -> StatusClass {
        self.body = response.body;

        let class = statuses.classify(response.status);
        match class {
            StatusClass::Retrying => self.state = RetryState::Retrying,
            StatusClass::Success => self.state = RetryState::Success,
            StatusClass::Fatal => {
                self.state = RetryState::Error;
                self.diagnostics.append(response.diagnostics);
            }
        }
        class
    }
}

/// Drive the operation held in `state` to a terminal state.
///
/// The budget covers the initial delay and every attempt: an attempt still
/// running when it runs out is dropped and reported as a timeout.
pub(crate) async fn poll(
    name: &str,
    statuses: &StatusSets,
    timing: RetryTiming,
    state: PollState,
    context: &CancellationToken,
) -> Result<RetryOutcome, PollError> {
    let PollState {
        mut operation,
        sleeper,
        clock,
    } = state;

    let backoff = PollBackoff::new(timing.poll_interval, timing.timeout);
    let mut rng = match StdRng::try_from_os_rng() {
        Ok(rng) => Some(rng),
        Err(err) => {
            warn!(operation = name, error = %err, "Entropy source unavailable, no jitter.");
            None
        }
    };
    let mut outcome = RetryOutcome::default();
    let mut attempts: u32 = 0;
    let mut last_error = None;
    let start = clock.now();

    if !timing.initial_delay.is_zero() {
        let delay = timing.initial_delay.min(timing.timeout);
        debug!(operation = name, ?delay, "Waiting before first attempt.");
        if !wait(sleeper.as_ref(), delay, context).await {
            return Err(cancelled(name, attempts));
        }
        if timing.initial_delay >= timing.timeout {
            let elapsed = clock.now().saturating_duration_since(start);
            return Err(timed_out(name, attempts, elapsed, timing.timeout, last_error));
        }
    }

    loop {
        if context.is_cancelled() {
            return Err(cancelled(name, attempts));
        }

        attempts = attempts.saturating_add(1);
        let remaining = timing
            .timeout
            .saturating_sub(clock.now().saturating_duration_since(start));
        let response = tokio::select! {
            biased;
            _ = context.cancelled() => return Err(cancelled(name, attempts)),
            response = operation() => response,
            _ = sleeper.sleep(remaining) => {
                let elapsed = clock.now().saturating_duration_since(start);
                return Err(timed_out(name, attempts, elapsed, timing.timeout, last_error));
            }
        };

        let status = response.status;
        match outcome.refresh(response, statuses) {
            StatusClass::Success => {
                if attempts > 1 {
                    info!(operation = name, attempts, status, "Operation succeeded after retries.");
                } else {
                    debug!(operation = name, status, "Operation succeeded.");
                }
                return Ok(outcome);
            }
            StatusClass::Fatal => {
                warn!(operation = name, attempts, status, "Non-retryable status, giving up.");
                return Err(PollError::NonRetryableStatus {
                    status,
                    operation: name.to_string(),
                    outcome: Box::new(outcome),
                });
            }
            StatusClass::Retrying => {
                last_error = Some(format!("retryable HTTP status {status} for {name}"));
            }
        }

        let delay = backoff.next_delay(rng.as_mut());
        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed.saturating_add(delay) > timing.timeout {
            return Err(timed_out(name, attempts, elapsed, timing.timeout, last_error));
        }

        debug!(operation = name, attempt = attempts, status, ?delay, "Retryable status, waiting.");
        if !wait(sleeper.as_ref(), delay, context).await {
            return Err(cancelled(name, attempts));
        }
    }
}

/// Sleep unless cancelled first. Returns `false` when cancelled.
async fn wait(sleeper: &dyn Sleeper, duration: Duration, context: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = context.cancelled() => false,
        _ = sleeper.sleep(duration) => true,
    }
}

fn timed_out(
    name: &str,
    attempts: u32,
    elapsed: Duration,
    timeout: Duration,
    last_error: Option<String>,
) -> PollError {
    warn!(operation = name, attempts, ?elapsed, ?timeout, "Retry budget exhausted.");
    PollError::Timeout {
        operation: name.to_string(),
        elapsed,
        timeout,
        last_error,
    }
}

fn cancelled(name: &str, attempts: u32) -> PollError {
    warn!(operation = name, attempts, "Context is not active, aborting.");
    PollError::Cancelled {
        operation: name.to_string(),
        attempts,
    }
}
