//! Validated, single-use retry policies.
//!
//! A [`RetryPolicy`] bundles everything one polling run needs: the
//! operation, the status code sets it is classified against, the timing
//! budget, the cancellation token, and the injectable sleep/clock sources.
//! Policies are assembled through [`RetryPolicyBuilder`], which validates all
//! timing inputs up front and reports every problem at once.

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::config::RetrySettings;
use crate::diag::Diagnostics;
use crate::duration::duration_from_secs;
use crate::operation::RetryOperationFn;
use crate::sleep::{Sleeper, TokioSleeper};
use crate::status::StatusSets;

/// Overall retry budget when none is given (30 minutes).
pub const DEFAULT_RETRY_TIMEOUT_SECS: i64 = 1800;

/// Spacing between attempts when none is given.
pub const DEFAULT_RETRY_DELAY_SECS: i64 = 5;

/// Wait before the first attempt when none is given.
pub const DEFAULT_RETRY_INITIAL_DELAY_SECS: i64 = 2;

const CONFIGURE_SUMMARY: &str = "Error configuring retry";
const UNABLE_RETRY_SUMMARY: &str = "Unable to retry";

/// Timing budget of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTiming {
    /// Overall budget, measured from the start of the run.
    pub timeout: Duration,
    /// Wait before the very first attempt.
    pub initial_delay: Duration,
    /// Minimum spacing between subsequent attempts.
    pub poll_interval: Duration,
}

/// The part of a policy the polling loop consumes.
pub(crate) struct PollState {
    pub(crate) operation: RetryOperationFn,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// A validated policy for one logical operation.
///
/// The polling state is handed to the engine on the first run; running the
/// same policy again fails with
/// [`RetryError::StateNotInitialized`](crate::error::RetryError::StateNotInitialized).
pub struct RetryPolicy {
    name: String,
    context: Option<CancellationToken>,
    statuses: StatusSets,
    timing: RetryTiming,
    pub(crate) state: Option<PollState>,
}

impl RetryPolicy {
    /// Start building a policy for the operation called `name`.
    pub fn builder(name: impl Into<String>) -> RetryPolicyBuilder {
        RetryPolicyBuilder::new(name)
    }

    /// Operation name used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Option<&CancellationToken> {
        self.context.as_ref()
    }

    pub fn statuses(&self) -> &StatusSets {
        &self.statuses
    }

    pub fn timing(&self) -> RetryTiming {
        self.timing
    }

    /// Whether the polling state is still available, i.e. the policy has not run yet.
    pub fn is_ready(&self) -> bool {
        self.state.is_some()
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("statuses", &self.statuses)
            .field("timing", &self.timing)
            .field("ready", &self.state.is_some())
            .finish()
    }
}

/// Builder for [`RetryPolicy`].
///
/// Durations are given in whole seconds as signed integers, exactly as they
/// arrive from resource configuration, and validated by [`build`](Self::build).
///
/// # Example
///
/// ```rust
/// use aap_retry::operation::{operation_fn, OperationResponse};
/// use aap_retry::policy::RetryPolicy;
/// use tokio_util::sync::CancellationToken;
///
/// let policy = RetryPolicy::builder("delete host")
///     .operation(operation_fn(|| async { OperationResponse::new(204) }))
///     .retryable_codes([409])
///     .timeout_secs(300)
///     .initial_delay_secs(0)
///     .poll_interval_secs(5)
///     .context(CancellationToken::new())
///     .build()
///     .expect("valid policy");
///
/// assert_eq!(policy.name(), "delete host");
/// ```
pub struct RetryPolicyBuilder {
    name: String,
    operation: Option<RetryOperationFn>,
    success_codes: Vec<u16>,
    retryable_codes: Vec<u16>,
    timeout_secs: i64,
    initial_delay_secs: i64,
    poll_interval_secs: i64,
    context: Option<CancellationToken>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl RetryPolicyBuilder {
    /// Create a builder with default timing and status sets.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation: None,
            success_codes: Vec::new(),
            retryable_codes: Vec::new(),
            timeout_secs: DEFAULT_RETRY_TIMEOUT_SECS,
            initial_delay_secs: DEFAULT_RETRY_INITIAL_DELAY_SECS,
            poll_interval_secs: DEFAULT_RETRY_DELAY_SECS,
            context: None,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the operation to drive.
    pub fn operation(mut self, operation: RetryOperationFn) -> Self {
        self.operation = Some(operation);
        self
    }

    /// Status codes that end the run successfully. Empty means the defaults.
    pub fn success_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    /// Status codes that schedule another attempt. Empty means the defaults.
    pub fn retryable_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_codes = codes.into_iter().collect();
        self
    }

    /// Overall budget in seconds.
    pub fn timeout_secs(mut self, secs: i64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Wait before the first attempt, in seconds.
    pub fn initial_delay_secs(mut self, secs: i64) -> Self {
        self.initial_delay_secs = secs;
        self
    }

    /// Spacing between attempts, in seconds.
    pub fn poll_interval_secs(mut self, secs: i64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// Cancellation token observed before and during the run.
    pub fn context(mut self, context: CancellationToken) -> Self {
        self.context = Some(context);
        self
    }

    /// Replace the sleep implementation.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Apply timing and status code settings.
    pub fn settings(self, settings: &RetrySettings) -> Self {
        self.timeout_secs(settings.timeout_secs)
            .initial_delay_secs(settings.initial_delay_secs)
            .poll_interval_secs(settings.poll_interval_secs)
            .success_codes(settings.success_status_codes.iter().copied())
            .retryable_codes(settings.retryable_status_codes.iter().copied())
    }

    /// Validate the inputs and produce the policy.
    ///
    /// A missing operation is reported on its own. Otherwise every invalid
    /// duration is reported, each tagged with the parameter it came from.
    pub fn build(self) -> Result<RetryPolicy, Diagnostics> {
        let mut diags = Diagnostics::new();

        let Some(operation) = self.operation else {
            diags.add_error(CONFIGURE_SUMMARY, "retry operation is not defined");
            return Err(diags);
        };

        let timeout = validate_secs(&mut diags, "invalid retry timeout", self.timeout_secs);
        let initial_delay =
            validate_secs(&mut diags, "invalid initial delay", self.initial_delay_secs);
        let poll_interval =
            validate_secs(&mut diags, "invalid retry delay", self.poll_interval_secs);

        let (Some(timeout), Some(initial_delay), Some(poll_interval)) =
            (timeout, initial_delay, poll_interval)
        else {
            return Err(diags);
        };

        Ok(RetryPolicy {
            name: self.name,
            context: self.context,
            statuses: StatusSets::new(self.success_codes, self.retryable_codes),
            timing: RetryTiming {
                timeout,
                initial_delay,
                poll_interval,
            },
            state: Some(PollState {
                operation,
                sleeper: self.sleeper,
                clock: self.clock,
            }),
        })
    }
}

fn validate_secs(diags: &mut Diagnostics, label: &str, secs: i64) -> Option<Duration> {
    match duration_from_secs(secs) {
        Ok(duration) => Some(duration),
        Err(err) => {
            diags.add_error(UNABLE_RETRY_SUMMARY, format!("{label}: {err}"));
            None
        }
    }
}
