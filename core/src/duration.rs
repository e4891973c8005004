//! Conversion of caller-supplied second counts into [`Duration`] values.
//!
//! Timing knobs arrive as signed 64-bit second counts (typically straight
//! from resource configuration). Durations are bounded to what a signed
//! 64-bit nanosecond counter can hold, which keeps every deadline the engine
//! derives from them well inside the range of the runtime's timers.

use core::time::Duration;

use crate::error::DurationError;

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Largest second count accepted by [`duration_from_secs`] (roughly 292 years).
pub const MAX_DURATION_SECS: i64 = i64::MAX / NANOS_PER_SEC;

/// Smallest retry timeout handed out by [`retry_timeout_for`], in seconds.
pub const MIN_RETRY_TIMEOUT_SECS: i64 = 5;

/// Headroom left between an operation's own timeout and the retry budget.
pub const RETRY_TIMEOUT_BUFFER_SECS: i64 = 60;

/// Convert a signed second count into a [`Duration`].
///
/// Zero is valid and yields [`Duration::ZERO`].
///
/// # Errors
///
/// - [`DurationError::Negative`] when `seconds < 0`
/// - [`DurationError::Overflow`] when `seconds > MAX_DURATION_SECS`
///
/// # Example
///
/// ```rust
/// use aap_retry::duration::duration_from_secs;
/// use std::time::Duration;
///
/// assert_eq!(duration_from_secs(30).unwrap(), Duration::from_secs(30));
/// assert!(duration_from_secs(-1).is_err());
/// ```
pub fn duration_from_secs(seconds: i64) -> Result<Duration, DurationError> {
    if seconds < 0 {
        return Err(DurationError::Negative(seconds));
    }
    if seconds > MAX_DURATION_SECS {
        return Err(DurationError::Overflow(seconds));
    }

    Ok(Duration::from_secs(seconds.unsigned_abs()))
}

/// Derive a retry budget from the timeout of the surrounding resource operation.
///
/// Leaves [`RETRY_TIMEOUT_BUFFER_SECS`] of headroom so the retry loop gives up
/// before the caller's own deadline does, but never returns less than
/// [`MIN_RETRY_TIMEOUT_SECS`]. A non-positive input means the deadline has
/// already passed and also yields the minimum.
pub fn retry_timeout_for(operation_timeout_secs: i64) -> i64 {
    if operation_timeout_secs <= 0 {
        return MIN_RETRY_TIMEOUT_SECS;
    }

    operation_timeout_secs
        .saturating_sub(RETRY_TIMEOUT_BUFFER_SECS)
        .max(MIN_RETRY_TIMEOUT_SECS)
}
