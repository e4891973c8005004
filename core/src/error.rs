//! Error types for policy construction and execution.

use core::time::Duration;

use thiserror::Error;

use crate::retry::{RetryOutcome, RetryState};

/// Rejected second count handed to [`duration_from_secs`](crate::duration::duration_from_secs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration must be non-negative, got: {0} seconds")]
    Negative(i64),

    #[error("duration overflow: {0} seconds exceeds maximum allowed duration")]
    Overflow(i64),
}

/// Why the polling loop stopped without reaching success.
#[derive(Debug, Error)]
pub enum PollError {
    /// The status code was in neither the success nor the retryable set.
    ///
    /// `outcome` holds the rejected attempt's body and diagnostics.
    #[error("non-retryable HTTP status {status} for {operation}")]
    NonRetryableStatus {
        status: u16,
        operation: String,
        outcome: Box<RetryOutcome>,
    },

    /// The budget ran out before a success or fatal code was seen.
    ///
    /// `last_error` is `None` when no attempt completed in time.
    #[error(
        "timeout waiting for '{operation}' after {elapsed:?} of {timeout:?}, last error: {}",
        .last_error.as_deref().unwrap_or("none")
    )]
    Timeout {
        operation: String,
        elapsed: Duration,
        timeout: Duration,
        last_error: Option<String>,
    },

    /// The cancellation token fired during a wait or an attempt.
    #[error("context is not active, aborted '{operation}' after {attempts} attempt(s)")]
    Cancelled { operation: String, attempts: u32 },
}

/// Error returned by [`retry_with_policy`](crate::report::retry_with_policy).
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("retry configuration cannot be nil")]
    MissingPolicy,

    #[error("retry operation '{operation}': state configuration is not initialized")]
    StateNotInitialized { operation: String },

    #[error("retry operation '{operation}': context cannot be nil")]
    MissingContext { operation: String },

    #[error("retry operation '{operation}': context is not active")]
    ContextInactive { operation: String },

    #[error("retry operation '{operation}' failed: {source}")]
    Failed {
        operation: String,
        #[source]
        source: PollError,
    },

    /// A success-classified outcome still carried error diagnostics.
    #[error("retry operation '{operation}' returned errors with retry state '{state}'")]
    UnexpectedDiagnostics {
        operation: String,
        state: RetryState,
        outcome: Box<RetryOutcome>,
    },
}

impl RetryError {
    /// The last attempt's outcome, when the error retained one.
    pub fn outcome(&self) -> Option<&RetryOutcome> {
        match self {
            RetryError::Failed {
                source: PollError::NonRetryableStatus { outcome, .. },
                ..
            }
            | RetryError::UnexpectedDiagnostics { outcome, .. } => Some(outcome.as_ref()),
            _ => None,
        }
    }

    /// Whether the run ended because its time budget was exhausted.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RetryError::Failed {
                source: PollError::Timeout { .. },
                ..
            }
        )
    }

    /// Whether the run was stopped by its cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            RetryError::ContextInactive { .. }
                | RetryError::Failed {
                    source: PollError::Cancelled { .. },
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_error_messages() {
        let err = PollError::Timeout {
            operation: "delete host".to_string(),
            elapsed: Duration::from_secs(3),
            timeout: Duration::from_secs(3),
            last_error: Some("retryable HTTP status 409".to_string()),
        };
        let message = err.to_string();
        assert!(message.starts_with("timeout waiting for 'delete host' after 3s of 3s"));
        assert!(message.contains("last error: retryable HTTP status 409"));

        let err = PollError::Timeout {
            operation: "x".to_string(),
            elapsed: Duration::ZERO,
            timeout: Duration::ZERO,
            last_error: None,
        };
        assert!(err.to_string().contains("last error: none"));
    }

    #[test]
    fn test_failed_wraps_source() {
        let err = RetryError::Failed {
            operation: "delete host".to_string(),
            source: PollError::Cancelled {
                operation: "delete host".to_string(),
                attempts: 1,
            },
        };

        assert!(err.is_cancelled());
        assert!(!err.is_timeout());
        assert!(err.outcome().is_none());
        assert_eq!(
            err.to_string(),
            "retry operation 'delete host' failed: \
             context is not active, aborted 'delete host' after 1 attempt(s)"
        );
        let source = std::error::Error::source(&err).expect("source should be set");
        assert!(source.to_string().starts_with("context is not active"));
    }
}
