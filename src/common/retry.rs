use std::time::Duration;

/// Maximum number of attempts for any single HTTP operation.
pub const MAX_ATTEMPTS: u32 = 5;

/// Base delay for the exponential backoff, doubled per attempt.
const BACKOFF_BASE_MS: u64 = 500;

/// Upper bound on the backoff delay, before jitter.
const BACKOFF_CAP_MS: u64 = 8_000;

/// Upper bound honored from a `Retry-After` hint.
const RETRY_AFTER_CAP: Duration = Duration::from_secs(30);

/// Computes the backoff delay before the given 1-based retry attempt.
/// `retry_after`, when present, overrides the computed delay (clamped).
pub fn backoff_delay(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(hint) = retry_after {
        return hint.min(RETRY_AFTER_CAP);
    }
    let exp = attempt.saturating_sub(1).min(4);
    let base = BACKOFF_BASE_MS.saturating_mul(1u64 << exp).min(BACKOFF_CAP_MS);
    let jitter_frac = fastrand::f64() * 0.4 - 0.2; // ±20%
    let jittered = (base as f64) * (1.0 + jitter_frac);
    Duration::from_millis(jittered.max(0.0) as u64)
}

/// Whether an HTTP status code is worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500 | 502 | 503 | 504)
}

/// Whether a status code carries a `Retry-After` hint we should honor.
pub fn honors_retry_after(status: u16) -> bool {
    matches!(status, 429 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_exponential_growth() {
        for attempt in 1..=MAX_ATTEMPTS {
            let delay = backoff_delay(attempt, None);
            assert!(delay <= Duration::from_millis((BACKOFF_CAP_MS as f64 * 1.2) as u64));
        }
    }

    #[test]
    fn retry_after_overrides_and_clamps() {
        let delay = backoff_delay(1, Some(Duration::from_secs(120)));
        assert_eq!(delay, RETRY_AFTER_CAP);
    }

    #[test]
    fn status_classification() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(429));
        assert!(!is_retryable_status(404));
        assert!(honors_retry_after(429));
        assert!(!honors_retry_after(500));
    }
}
