//! Turning a polling run into the caller-facing result.

use tracing::{Span, field, instrument, warn};

use crate::error::RetryError;
use crate::policy::RetryPolicy;
use crate::retry::{self, RetryOutcome, RetryState};

/// Run `policy` and report its outcome.
///
/// Preconditions are checked in order, each failing with its own error:
/// a missing policy, a policy whose polling state was already consumed, a
/// missing cancellation token, and a token that is already cancelled. No
/// attempt is made when any of them fails.
///
/// After the run, an outcome that carries error diagnostics without being in
/// the [`RetryState::Error`] state is reported as
/// [`RetryError::UnexpectedDiagnostics`].
#[instrument(skip_all, fields(operation = field::Empty))]
pub async fn retry_with_policy(
    policy: Option<&mut RetryPolicy>,
) -> Result<RetryOutcome, RetryError> {
    let Some(policy) = policy else {
        return Err(RetryError::MissingPolicy);
    };

    let operation = policy.name().to_string();
    Span::current().record("operation", operation.as_str());

    if policy.state.is_none() {
        return Err(RetryError::StateNotInitialized { operation });
    }
    let Some(context) = policy.context().cloned() else {
        return Err(RetryError::MissingContext { operation });
    };
    if context.is_cancelled() {
        warn!("Context is not active, we cannot continue with the execution.");
        return Err(RetryError::ContextInactive { operation });
    }

    let Some(state) = policy.state.take() else {
        return Err(RetryError::StateNotInitialized { operation });
    };

    let result = retry::poll(&operation, policy.statuses(), policy.timing(), state, &context).await;
    match result {
        Ok(outcome) => check_outcome(operation, outcome),
        Err(source) => Err(RetryError::Failed { operation, source }),
    }
}

/// Reject outcomes that carry error diagnostics outside the error state.
fn check_outcome(operation: String, outcome: RetryOutcome) -> Result<RetryOutcome, RetryError> {
    if outcome.diagnostics.has_error() && outcome.state != RetryState::Error {
        warn!(
            state = %outcome.state,
            "Operation returned error diagnostics despite a non-error state."
        );
        return Err(RetryError::UnexpectedDiagnostics {
            operation,
            state: outcome.state,
            outcome: Box::new(outcome),
        });
    }

    Ok(outcome)
}

impl RetryPolicy {
    /// Run this policy; shorthand for [`retry_with_policy`].
    pub async fn execute(&mut self) -> Result<RetryOutcome, RetryError> {
        retry_with_policy(Some(self)).await
    }
}
