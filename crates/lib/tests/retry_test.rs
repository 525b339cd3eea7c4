//! # Retry Policy Tests
//!
//! Attempt counting and termination for both adapters. Tests run with a
//! millisecond base delay so the 1-2-4 backoff sequence costs no wall-clock
//! time; the production defaults are asserted separately.

mod common;

use common::setup_tracing;
use feedrag::retry::RetryPolicy;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

#[test]
fn test_default_policy_configuration() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.base_delay, Duration::from_secs(1));
}

#[tokio::test]
async fn test_retryable_failure_exhausts_three_attempts() {
    setup_tracing();
    let attempts = AtomicU32::new(0);

    let result: Result<(), _> = fast_policy()
        .run(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("rate limit exceeded")
        })
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    let failure = result.expect_err("exhausted retries must fail");
    assert_eq!(failure.0, "rate limit exceeded");
}

#[tokio::test]
async fn test_single_transient_failure_then_success() {
    setup_tracing();
    let attempts = AtomicU32::new(0);

    let result = fast_policy()
        .run(|| async {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err("timeout while connecting".to_string())
            } else {
                Ok(42)
            }
        })
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(result.expect("second attempt succeeds"), 42);
}

#[tokio::test]
async fn test_non_retryable_failure_propagates_immediately() {
    setup_tracing();
    let attempts = AtomicU32::new(0);

    let result: Result<(), _> = fast_policy()
        .run(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("invalid api key")
        })
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(result.expect_err("must fail").0, "invalid api key");
}

#[tokio::test]
async fn test_classification_is_case_insensitive() {
    setup_tracing();
    let attempts = AtomicU32::new(0);

    let _: Result<(), _> = fast_policy()
        .run(|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("HTTP 503: Service OVERLOADED")
        })
        .await;

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[test]
fn test_blocking_adapter_matches_async_behavior() {
    setup_tracing();
    let policy = fast_policy();

    // Exhaustion.
    let mut attempts = 0;
    let result: Result<(), _> = policy.run_blocking(|| {
        attempts += 1;
        Err::<(), _>("too many requests")
    });
    assert_eq!(attempts, 3);
    assert!(result.is_err());

    // Fail once, then succeed.
    let mut attempts = 0;
    let result = policy.run_blocking(|| {
        attempts += 1;
        if attempts == 1 {
            Err("429".to_string())
        } else {
            Ok("done")
        }
    });
    assert_eq!(attempts, 2);
    assert_eq!(result.expect("second attempt succeeds"), "done");

    // Non-retryable.
    let mut attempts = 0;
    let result: Result<(), _> = policy.run_blocking(|| {
        attempts += 1;
        Err::<(), _>("model not found")
    });
    assert_eq!(attempts, 1);
    assert!(result.is_err());
}
