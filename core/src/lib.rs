//! aap-retry - Status-code driven polling and retry engine
//!
//! This crate drives one idempotent remote operation (typically an HTTP call
//! against an automation controller API) through a bounded polling loop until
//! it reaches a terminal outcome.
//!
//! # Features
//!
//! - **Three-way classification**: every status code is retryable, success,
//!   or fatal; retryable wins when a code is in both sets
//! - **Validated timing**: second counts are range-checked up front and every
//!   invalid input is reported together
//! - **Jitter**: long budgets add a random offset from a CSPRNG so that
//!   clients recovering from a shared outage do not retry in lockstep
//! - **Cancellation**: a `CancellationToken` aborts pending sleeps and
//!   in-flight attempts immediately
//! - **Testable**: sleep and clock sources are injectable
//!
//! # Example
//!
//! ```rust
//! use aap_retry::{OperationResponse, RetryPolicy, RetryState, operation_fn};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut policy = RetryPolicy::builder("delete host")
//!     .operation(operation_fn(|| async { OperationResponse::new(204) }))
//!     .timeout_secs(60)
//!     .initial_delay_secs(0)
//!     .poll_interval_secs(5)
//!     .context(CancellationToken::new())
//!     .build()?;
//!
//! let outcome = policy.execute().await?;
//! assert_eq!(outcome.state, RetryState::Success);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod clock;
pub mod config;
pub mod diag;
pub mod duration;
pub mod error;
pub mod job;
pub mod operation;
pub mod policy;
pub mod report;
pub mod retry;
pub mod sleep;
pub mod status;

pub use backoff::PollBackoff;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RetrySettings;
pub use diag::{Diagnostic, Diagnostics, Severity};
pub use duration::{MAX_DURATION_SECS, duration_from_secs, retry_timeout_for};
pub use error::{DurationError, PollError, RetryError};
pub use job::{JobCompletion, JobStatus, JobWaitError, wait_for_job_completion};
pub use operation::{Operation, OperationResponse, RetryOperationFn, operation_fn, wrap_operation};
pub use policy::{
    DEFAULT_RETRY_DELAY_SECS, DEFAULT_RETRY_INITIAL_DELAY_SECS, DEFAULT_RETRY_TIMEOUT_SECS,
    RetryPolicy, RetryPolicyBuilder, RetryTiming,
};
pub use report::retry_with_policy;
pub use retry::{RetryOutcome, RetryState};
pub use sleep::{FnSleeper, Sleeper, TokioSleeper};
pub use status::{
    DEFAULT_RETRYABLE_STATUS_CODES, DEFAULT_SUCCESS_STATUS_CODES, StatusClass, StatusSets, classify,
};
