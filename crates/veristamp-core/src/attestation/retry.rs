//! Retry policy for callers that re-run the pipeline.
//!
//! The pipeline itself never retries. A host that wants to can re-invoke
//! `attest_and_annotate` for results this module classifies as retryable,
//! waiting [`backoff_duration`] between attempts.

use std::time::Duration;

use crate::types::PipelineResult;

/// Whether re-running the same capture could succeed.
///
/// Only transport failures qualify: rejections and local processing errors
/// would fail the same way again.
pub fn is_retryable(result: &PipelineResult) -> bool {
    result
        .failure_kind()
        .map(|kind| kind.is_transient())
        .unwrap_or(false)
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;

    #[test]
    fn test_transport_failure_is_retryable() {
        let result = PipelineResult::failure(FailureKind::Transport, "timed out");
        assert!(is_retryable(&result));
    }

    #[test]
    fn test_rejection_not_retryable() {
        let result = PipelineResult::failure(FailureKind::Rejected, "declined");
        assert!(!is_retryable(&result));
    }

    #[test]
    fn test_local_failures_not_retryable() {
        for kind in [
            FailureKind::Encoding,
            FailureKind::CodeGeneration,
            FailureKind::Composition,
            FailureKind::Cancelled,
            FailureKind::Persistence,
        ] {
            let result = PipelineResult::failure(kind, "local");
            assert!(!is_retryable(&result), "{kind} should not retry");
        }
    }

    #[test]
    fn test_backoff_exponential() {
        assert_eq!(backoff_duration(0, 1000), Duration::from_millis(1000));
        assert_eq!(backoff_duration(1, 1000), Duration::from_millis(2000));
        assert_eq!(backoff_duration(2, 1000), Duration::from_millis(4000));
        assert_eq!(backoff_duration(3, 1000), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_capped_at_30s() {
        assert_eq!(backoff_duration(10, 1000), Duration::from_millis(30_000));
        assert_eq!(backoff_duration(u32::MAX, u64::MAX), Duration::from_millis(30_000));
    }
}
