//! Waiting for an asynchronous job to reach a final state.
//!
//! Launching a job template returns immediately; the job itself runs on the
//! controller. This module polls the job document with the regular engine,
//! mapping job states onto status classes: a final state ends the run, any
//! other state schedules another poll. Transient HTTP failures of the poll
//! itself are retried like any other operation.

use std::future::Future;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diag::Diagnostics;
use crate::error::RetryError;
use crate::operation::{OperationResponse, operation_fn};
use crate::policy::RetryPolicyBuilder;
use crate::status::DEFAULT_RETRYABLE_STATUS_CODES;

/// Code a fetch reports when the job document was retrieved.
const JOB_DOCUMENT_STATUS: u16 = 200;

/// Code a job in a final state is classified with.
const JOB_FINISHED_STATUS: u16 = 200;

/// Code a job still in flight is classified with.
const JOB_IN_PROGRESS_STATUS: u16 = 202;

/// Code an undecodable job document is classified with.
const JOB_UNPROCESSABLE_STATUS: u16 = 422;

/// Lifecycle state of a controller job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    New,
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Whether the job has stopped running.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            JobStatus::Successful | JobStatus::Failed | JobStatus::Error | JobStatus::Canceled
        )
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, JobStatus::Successful)
    }
}

#[derive(Debug, Deserialize)]
struct JobDocument {
    status: JobStatus,
}

/// A job that reached a final state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCompletion {
    pub status: JobStatus,
    /// The final job document.
    pub body: Vec<u8>,
}

impl JobCompletion {
    pub fn is_successful(&self) -> bool {
        self.status.is_successful()
    }
}

#[derive(Debug, Error)]
pub enum JobWaitError {
    #[error("invalid job wait configuration: {0}")]
    Config(#[from] Diagnostics),

    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error("unable to decode job status: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Map a fetched job document onto the engine's status classes.
fn classify_job_response(response: OperationResponse) -> OperationResponse {
    if response.status != JOB_DOCUMENT_STATUS {
        return response;
    }

    match serde_json::from_slice::<JobDocument>(&response.body) {
        Ok(document) if document.status.is_final() => OperationResponse {
            status: JOB_FINISHED_STATUS,
            ..response
        },
        Ok(_) => OperationResponse {
            status: JOB_IN_PROGRESS_STATUS,
            ..response
        },
        Err(err) => {
            let mut diagnostics = response.diagnostics;
            diagnostics.add_error("Error parsing status response", err.to_string());
            OperationResponse {
                body: response.body,
                diagnostics,
                status: JOB_UNPROCESSABLE_STATUS,
            }
        }
    }
}

/// Poll a job until it reaches a final state.
///
/// `fetch` performs one GET of the job document. Timing, cancellation, and
/// the sleep/clock sources come from `builder`; its operation and status
/// code sets are replaced. A failed or canceled job is still a completed
/// job: check [`JobCompletion::is_successful`].
pub async fn wait_for_job_completion<F, Fut>(
    builder: RetryPolicyBuilder,
    mut fetch: F,
) -> Result<JobCompletion, JobWaitError>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = OperationResponse> + Send + 'static,
{
    let retryable = std::iter::once(JOB_IN_PROGRESS_STATUS)
        .chain(DEFAULT_RETRYABLE_STATUS_CODES.iter().copied());

    let mut policy = builder
        .operation(operation_fn(move || fetch().map(classify_job_response)))
        .success_codes([JOB_FINISHED_STATUS])
        .retryable_codes(retryable)
        .build()?;

    let outcome = policy.execute().await?;
    let document: JobDocument = outcome.parse_body()?;

    Ok(JobCompletion {
        status: document.status,
        body: outcome.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::PollError;
    use crate::policy::RetryPolicy;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    fn job_builder() -> RetryPolicyBuilder {
        let clock = Arc::new(ManualClock::new());
        RetryPolicy::builder("wait for job")
            .timeout_secs(60)
            .initial_delay_secs(0)
            .poll_interval_secs(1)
            .context(CancellationToken::new())
            .sleeper(clock.clone())
            .clock(clock)
    }

    fn job(status: &str) -> OperationResponse {
        OperationResponse::new(200).with_body(format!(r#"{{"id": 7, "status": "{status}"}}"#))
    }

    fn fetcher(
        responses: Vec<OperationResponse>,
        calls: Arc<AtomicUsize>,
    ) -> impl FnMut() -> futures::future::Ready<OperationResponse> + Send + 'static {
        let script = Arc::new(Mutex::new(VecDeque::from(responses)));
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut script = script.lock().unwrap();
            let response = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            };
            futures::future::ready(response)
        }
    }

    #[test]
    fn test_final_states() {
        for status in [
            JobStatus::Successful,
            JobStatus::Failed,
            JobStatus::Error,
            JobStatus::Canceled,
        ] {
            assert!(status.is_final(), "{status:?}");
        }
        for status in [
            JobStatus::New,
            JobStatus::Pending,
            JobStatus::Waiting,
            JobStatus::Running,
            JobStatus::Unknown,
        ] {
            assert!(!status.is_final(), "{status:?}");
        }
    }

    #[test]
    fn test_status_decoding() {
        let status: JobStatus = serde_json::from_str(r#""canceled""#).unwrap();
        assert_eq!(status, JobStatus::Canceled);
        let status: JobStatus = serde_json::from_str(r#""something_new""#).unwrap();
        assert_eq!(status, JobStatus::Unknown);
    }

    #[test]
    fn test_classify_job_response() {
        assert_eq!(classify_job_response(job("running")).status, JOB_IN_PROGRESS_STATUS);
        assert_eq!(classify_job_response(job("failed")).status, JOB_FINISHED_STATUS);
        assert_eq!(classify_job_response(OperationResponse::new(503)).status, 503);

        let garbled = classify_job_response(OperationResponse::new(200).with_body("<html>"));
        assert_eq!(garbled.status, JOB_UNPROCESSABLE_STATUS);
        assert!(garbled.diagnostics.has_error());
    }

    #[tokio::test]
    async fn test_waits_until_successful() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = fetcher(
            vec![job("pending"), job("running"), job("successful")],
            calls.clone(),
        );

        let completion = wait_for_job_completion(job_builder(), fetch).await.unwrap();

        assert_eq!(completion.status, JobStatus::Successful);
        assert!(completion.is_successful());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_job_is_completed() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = fetcher(vec![job("running"), job("failed")], calls.clone());

        let completion = wait_for_job_completion(job_builder(), fetch).await.unwrap();

        assert_eq!(completion.status, JobStatus::Failed);
        assert!(!completion.is_successful());
        assert!(String::from_utf8_lossy(&completion.body).contains("failed"));
    }

    #[tokio::test]
    async fn test_transient_fetch_errors_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = fetcher(
            vec![OperationResponse::new(503), job("successful")],
            calls.clone(),
        );

        let completion = wait_for_job_completion(job_builder(), fetch).await.unwrap();
        assert!(completion.is_successful());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_undecodable_document_is_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = fetcher(vec![OperationResponse::new(200).with_body("<html>")], calls.clone());

        let err = wait_for_job_completion(job_builder(), fetch).await.unwrap_err();

        match err {
            JobWaitError::Retry(RetryError::Failed {
                source: PollError::NonRetryableStatus { status, outcome, .. },
                ..
            }) => {
                assert_eq!(status, JOB_UNPROCESSABLE_STATUS);
                assert!(outcome.diagnostics.has_error());
            }
            other => panic!("expected non-retryable status, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_job_is_fatal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetch = fetcher(vec![OperationResponse::new(404)], calls.clone());

        let err = wait_for_job_completion(job_builder(), fetch).await.unwrap_err();
        assert!(err.to_string().contains("non-retryable HTTP status 404"));
    }

    #[tokio::test]
    async fn test_invalid_timing_is_reported() {
        let fetch = fetcher(vec![job("successful")], Arc::new(AtomicUsize::new(0)));

        let err = wait_for_job_completion(job_builder().timeout_secs(-1), fetch)
            .await
            .unwrap_err();
        assert!(matches!(err, JobWaitError::Config(_)));
        assert!(err.to_string().contains("invalid retry timeout"));
    }
}
