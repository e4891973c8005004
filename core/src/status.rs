//! Classification of HTTP status codes into retry buckets.

use std::collections::BTreeSet;

/// Status codes that mean the operation completed: `202 Accepted`, `204 No Content`.
pub const DEFAULT_SUCCESS_STATUS_CODES: &[u16] = &[202, 204];

/// Status codes worth another attempt.
///
/// - `408` request timeout
/// - `409` conflict (e.g. a host still referenced by running jobs)
/// - `429` rate limited
/// - `500`, `502`, `503`, `504` transient server-side failures
pub const DEFAULT_RETRYABLE_STATUS_CODES: &[u16] = &[408, 409, 429, 500, 502, 503, 504];

/// Bucket a status code falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    /// Another attempt should be scheduled.
    Retrying,
    /// The operation reached its goal.
    Success,
    /// The code is in neither set; stop with an error.
    Fatal,
}

/// Classify `code` against explicit success and retryable lists.
///
/// Retryable membership wins over success membership, so the two lists do
/// not need to be disjoint.
///
/// ```rust
/// use aap_retry::status::{classify, StatusClass};
///
/// assert_eq!(classify(409, &[200, 409], &[409]), StatusClass::Retrying);
/// assert_eq!(classify(200, &[200], &[409]), StatusClass::Success);
/// assert_eq!(classify(400, &[200], &[409]), StatusClass::Fatal);
/// ```
pub fn classify(code: u16, success_codes: &[u16], retryable_codes: &[u16]) -> StatusClass {
    class_of(success_codes.contains(&code), retryable_codes.contains(&code))
}

fn class_of(is_success: bool, is_retryable: bool) -> StatusClass {
    if is_retryable {
        StatusClass::Retrying
    } else if is_success {
        StatusClass::Success
    } else {
        StatusClass::Fatal
    }
}

/// The pair of status code sets a policy classifies against.
///
/// Both sets are non-empty: an empty input is replaced by the matching default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSets {
    success: BTreeSet<u16>,
    retryable: BTreeSet<u16>,
}

impl StatusSets {
    /// Build the sets, substituting defaults for empty inputs.
    pub fn new<S, R>(success: S, retryable: R) -> Self
    where
        S: IntoIterator<Item = u16>,
        R: IntoIterator<Item = u16>,
    {
        let mut success: BTreeSet<u16> = success.into_iter().collect();
        if success.is_empty() {
            success.extend(DEFAULT_SUCCESS_STATUS_CODES);
        }

        let mut retryable: BTreeSet<u16> = retryable.into_iter().collect();
        if retryable.is_empty() {
            retryable.extend(DEFAULT_RETRYABLE_STATUS_CODES);
        }

        Self { success, retryable }
    }

    /// Codes classified as success.
    pub fn success(&self) -> &BTreeSet<u16> {
        &self.success
    }

    /// Codes classified as retryable.
    pub fn retryable(&self) -> &BTreeSet<u16> {
        &self.retryable
    }

    /// Classify `code`; see [`classify`] for the precedence rule.
    pub fn classify(&self, code: u16) -> StatusClass {
        class_of(self.success.contains(&code), self.retryable.contains(&code))
    }
}

impl Default for StatusSets {
    fn default() -> Self {
        Self::new([], [])
    }
}
