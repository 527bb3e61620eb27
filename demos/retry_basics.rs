//! Retry Basics
//!
//! Demonstrates the core retry flow:
//! - Building a config with backoff and classification rules
//! - Named instances shared through a registry
//! - Driving calls with `Retry::call`
//! - Reading outcome metrics

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use steadfast::{IntervalFn, RetryConfig, RetryRegistry};

#[derive(Debug, PartialEq)]
enum FetchError {
    Timeout,
    NotFound,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "timed out"),
            FetchError::NotFound => write!(f, "not found"),
        }
    }
}

fn example_transient_recovery(registry: &RetryRegistry<String, FetchError>) {
    println!("\n=== Example 1: Transient failure recovered ===");

    let retry = registry.retry("catalog");
    let attempts = AtomicU32::new(0);

    let result = retry.call(|| {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        println!("  attempt {}", n);
        if n < 3 {
            Err(FetchError::Timeout)
        } else {
            Ok("catalog payload".to_string())
        }
    });

    println!("  result: {:?}", result);
    println!("  metrics: {:?}", retry.metrics());
}

fn example_non_retryable(registry: &RetryRegistry<String, FetchError>) {
    println!("\n=== Example 2: Non-retryable error fails fast ===");

    let retry = registry.retry("catalog");
    let attempts = AtomicU32::new(0);

    let result = retry.call(|| {
        println!("  attempt {}", attempts.fetch_add(1, Ordering::SeqCst) + 1);
        Err::<String, _>(FetchError::NotFound)
    });

    println!("  result: {:?} (no retries for a 404)", result);
}

fn main() {
    let config = RetryConfig::builder()
        .max_attempts(4)
        .interval(
            IntervalFn::exponential(Duration::from_millis(50)).with_cap(Duration::from_millis(200)),
        )
        .retry_on(|e: &FetchError| matches!(e, FetchError::Timeout))
        .build()
        .expect("valid config");

    let registry = RetryRegistry::new(config);

    example_transient_recovery(&registry);
    example_non_retryable(&registry);
}
