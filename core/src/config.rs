//! Serializable retry settings.
//!
//! Resources expose their retry knobs as plain attributes; `RetrySettings`
//! is the deserialized form of those attributes. Values are kept as the raw
//! signed second counts so that validation (and its error reporting) stays in
//! [`RetryPolicyBuilder::build`](crate::policy::RetryPolicyBuilder::build).

use serde::{Deserialize, Serialize};

use crate::duration::retry_timeout_for;
use crate::policy::{
    DEFAULT_RETRY_DELAY_SECS, DEFAULT_RETRY_INITIAL_DELAY_SECS, DEFAULT_RETRY_TIMEOUT_SECS,
};

/// Retry knobs as supplied by configuration.
///
/// Missing fields take their defaults; empty status code lists mean the
/// default sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub timeout_secs: i64,
    pub initial_delay_secs: i64,
    pub poll_interval_secs: i64,
    pub success_status_codes: Vec<u16>,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_RETRY_TIMEOUT_SECS,
            initial_delay_secs: DEFAULT_RETRY_INITIAL_DELAY_SECS,
            poll_interval_secs: DEFAULT_RETRY_DELAY_SECS,
            success_status_codes: Vec::new(),
            retryable_status_codes: Vec::new(),
        }
    }
}

impl RetrySettings {
    /// Default settings with the budget derived from the surrounding
    /// operation's timeout (see [`retry_timeout_for`]).
    pub fn for_operation_timeout(operation_timeout_secs: i64) -> Self {
        Self {
            timeout_secs: retry_timeout_for(operation_timeout_secs),
            ..Self::default()
        }
    }
}
