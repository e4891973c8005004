//! The unit of work driven by the polling engine.
//!
//! An operation performs one network attempt and reports what it saw: the
//! raw response body, any diagnostics, and the HTTP status code. The engine
//! never looks inside; it only classifies the status code.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::diag::Diagnostics;

/// Result of one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationResponse {
    /// Raw response payload, possibly empty.
    pub body: Vec<u8>,
    pub diagnostics: Diagnostics,
    /// HTTP status code, or whatever code the attempt chose to report.
    pub status: u16,
}

impl OperationResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl From<(Vec<u8>, Diagnostics, u16)> for OperationResponse {
    fn from((body, diagnostics, status): (Vec<u8>, Diagnostics, u16)) -> Self {
        Self {
            body,
            diagnostics,
            status,
        }
    }
}

/// Boxed operation as stored in a [`RetryPolicy`](crate::policy::RetryPolicy).
///
/// Each call starts one fresh attempt.
pub type RetryOperationFn = Box<dyn FnMut() -> BoxFuture<'static, OperationResponse> + Send>;

/// Object-style operation, mostly useful for hand-written test doubles.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Perform one attempt.
    async fn execute(&self) -> OperationResponse;
}

/// Adapt an [`Operation`] object into a [`RetryOperationFn`].
pub fn wrap_operation<O>(operation: Arc<O>) -> RetryOperationFn
where
    O: Operation + ?Sized + 'static,
{
    Box::new(move || {
        let operation = Arc::clone(&operation);
        async move { operation.execute().await }.boxed()
    })
}

/// Box an async closure into a [`RetryOperationFn`].
///
/// The closure is called once per attempt, so it must build a fresh request
/// every time (a consumed request body cannot be replayed).
///
/// ```rust
/// use aap_retry::operation::{operation_fn, OperationResponse};
///
/// let mut op = operation_fn(|| async { OperationResponse::new(204) });
/// # let _ = &mut op;
/// ```
pub fn operation_fn<F, Fut>(mut operation: F) -> RetryOperationFn
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = OperationResponse> + Send + 'static,
{
    Box::new(move || operation().boxed())
}
