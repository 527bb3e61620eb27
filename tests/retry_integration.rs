//! End-to-end tests across the registry, engine, events, and fallback.

use steadfast::{
    EventKind, Fallback, IntervalFn, RetryConfig, RetryRegistry,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, PartialEq, Clone, Copy)]
enum ServiceError {
    Timeout,
    RateLimited,
    BadCredentials,
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Timeout => write!(f, "request timed out"),
            ServiceError::RateLimited => write!(f, "rate limited"),
            ServiceError::BadCredentials => write!(f, "bad credentials"),
        }
    }
}

fn service_config() -> RetryConfig<String, ServiceError> {
    RetryConfig::builder()
        .max_attempts(3)
        .interval(IntervalFn::fixed(Duration::ZERO))
        .retry_on(|e: &ServiceError| {
            matches!(e, ServiceError::Timeout | ServiceError::RateLimited)
        })
        .ignore(|e: &ServiceError| matches!(e, ServiceError::BadCredentials))
        .build()
        .unwrap()
}

#[test]
fn test_full_flow_success_after_retries() {
    let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();
    let retry = registry.retry_with_config("orders", service_config());

    let attempts = AtomicU32::new(0);
    let result = retry.call(|| {
        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(ServiceError::Timeout)
        } else {
            Ok("order list".to_string())
        }
    });

    assert_eq!(result.unwrap(), "order list");

    // Event history is readable through the registry's consumer sink.
    let events = registry.event_consumers().recent_events("orders");
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0].kind, EventKind::Retry { .. }));
    assert!(matches!(events[1].kind, EventKind::Retry { .. }));
    assert!(matches!(events[2].kind, EventKind::Success));
    assert_eq!(events[2].attempt, 3);
}

#[test]
fn test_fallback_substitutes_after_exhaustion_only() {
    let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();
    let retry = registry.retry_with_config("profile", service_config());

    let fallback_calls = Arc::new(AtomicU32::new(0));
    let calls = fallback_calls.clone();
    let fallback = Fallback::new().on(
        |e: &ServiceError| matches!(e, ServiceError::Timeout),
        move |_: &ServiceError| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("cached profile".to_string())
        },
    );

    let attempts = AtomicU32::new(0);
    let result = retry.call_with_fallback(
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Timeout)
        },
        &fallback,
    );

    assert_eq!(result.unwrap(), "cached profile");
    // All three attempts ran before the fallback was consulted once.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unmatched_fallback_reraises_original_error() {
    let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();
    let retry = registry.retry_with_config("search", service_config());

    let fallback = Fallback::new().on(
        |e: &ServiceError| matches!(e, ServiceError::Timeout),
        |_: &ServiceError| Ok("cached".to_string()),
    );

    let result = retry.call_with_fallback(|| Err(ServiceError::RateLimited), &fallback);
    assert_eq!(result, Err(ServiceError::RateLimited));
}

#[test]
fn test_ignored_error_reaches_fallback_without_retry() {
    let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();
    let retry = registry.retry_with_config("login", service_config());

    let fallback = Fallback::new().on(
        |e: &ServiceError| matches!(e, ServiceError::BadCredentials),
        |_: &ServiceError| Ok("guest session".to_string()),
    );

    let attempts = AtomicU32::new(0);
    let result = retry.call_with_fallback(
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::BadCredentials)
        },
        &fallback,
    );

    assert_eq!(result.unwrap(), "guest session");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    let events = registry.event_consumers().recent_events("login");
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].kind, EventKind::IgnoredError { .. }));
}

#[test]
fn test_many_threads_one_named_instance() {
    let registry: Arc<RetryRegistry<String, ServiceError>> = Arc::new(RetryRegistry::of_defaults());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                let retry = registry.retry_with_config("shared", service_config());
                let attempts = AtomicU32::new(0);
                let result = retry.call(|| {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 1 {
                        Err(ServiceError::Timeout)
                    } else {
                        Ok("ok".to_string())
                    }
                });
                assert!(result.is_ok());
                retry
            })
        })
        .collect();

    let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for instance in &instances[1..] {
        assert!(Arc::ptr_eq(&instances[0], instance));
    }

    // Every sequence retried exactly once and succeeded.
    assert_eq!(instances[0].metrics().succeeded_with_retry, 16);
    assert_eq!(instances[0].metrics().failed_with_retry, 0);
}

#[test]
fn test_event_subscription_through_registry_sink() {
    let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    registry
        .event_consumers()
        .subscribe("inventory", move |event| {
            sink.lock().unwrap().push(event.kind.clone());
        });

    let retry = registry.retry_with_config("inventory", service_config());
    let _ = retry.call(|| Err(ServiceError::Timeout));

    let kinds = seen.lock().unwrap();
    assert_eq!(kinds.len(), 3); // 2 RETRY + 1 ERROR, in emission order
    assert!(matches!(kinds[0], EventKind::Retry { .. }));
    assert!(matches!(kinds[2], EventKind::Error { .. }));
}

#[test]
fn test_bounded_consumer_keeps_most_recent() {
    let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();
    registry.event_consumers().consumer_with_capacity("noisy", 3);

    let retry = registry.retry_with_config("noisy", service_config());
    let _ = retry.call(|| Err(ServiceError::Timeout)); // 2 RETRY + 1 ERROR
    let _ = retry.call(|| Ok("fine".to_string())); // 1 SUCCESS

    let events = registry.event_consumers().recent_events("noisy");
    assert_eq!(events.len(), 3);
    // Oldest (the first RETRY) was evicted; the terminal trio remains.
    assert!(matches!(events[0].kind, EventKind::Retry { .. }));
    assert!(matches!(events[1].kind, EventKind::Error { .. }));
    assert!(matches!(events[2].kind, EventKind::Success));
}

#[test]
fn test_removed_instance_keeps_working_for_holders() {
    let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();
    let held = registry.retry_with_config("legacy", service_config());

    registry.remove("legacy");

    let result = held.call(|| Ok("still alive".to_string()));
    assert_eq!(result.unwrap(), "still alive");
}

#[cfg(feature = "serde")]
mod settings_boundary {
    use super::*;
    use steadfast::RetrySettings;

    #[test]
    fn test_settings_driven_registry() {
        let settings: RetrySettings = serde_json::from_str(
            r#"{
                "max_attempts": 2,
                "wait_millis": 0
            }"#,
        )
        .unwrap();

        let registry: RetryRegistry<String, ServiceError> =
            RetryRegistry::new(settings.to_config().unwrap());

        let attempts = AtomicU32::new(0);
        let result = registry.retry("configured").call(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(ServiceError::Timeout)
        });

        assert_eq!(result, Err(ServiceError::Timeout));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}

#[cfg(feature = "async")]
mod async_flow {
    use super::*;

    #[tokio::test]
    async fn test_async_flow_with_fallback() {
        let registry: RetryRegistry<String, ServiceError> = RetryRegistry::of_defaults();
        let retry = registry.retry_with_config("async-orders", service_config());

        let fallback = Fallback::new().on(
            |e: &ServiceError| matches!(e, ServiceError::Timeout),
            |_: &ServiceError| Ok("cached orders".to_string()),
        );

        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let result = retry
            .call_async_with_fallback(
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(ServiceError::Timeout) }
                },
                &fallback,
            )
            .await;

        assert_eq!(result.unwrap(), "cached orders");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
