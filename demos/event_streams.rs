//! Event Streams
//!
//! Demonstrates the observability surface:
//! - Live listeners on a named retry
//! - The bounded per-name buffer of recent events
//! - Reading history after the fact

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use steadfast::{RetryConfig, RetryRegistry};

fn main() {
    let registry: RetryRegistry<String, String> = RetryRegistry::new(
        RetryConfig::builder()
            .max_attempts(3)
            .wait(Duration::from_millis(10))
            .build()
            .expect("valid config"),
    );

    // Live listener: fires for every subsequent event on this name.
    registry
        .event_consumers()
        .subscribe("inventory", |event| println!("  [listener] {}", event));

    let retry = registry.retry("inventory");

    println!("=== A failing call sequence ===");
    let _ = retry.call(|| Err::<String, _>("warehouse offline".to_string()));

    println!("\n=== A recovering call sequence ===");
    let attempts = AtomicU32::new(0);
    let _ = retry.call(|| {
        if attempts.fetch_add(1, Ordering::SeqCst) < 1 {
            Err("warehouse offline".to_string())
        } else {
            Ok("37 pallets".to_string())
        }
    });

    println!("\n=== Buffered history (most recent last) ===");
    for event in registry.event_consumers().recent_events("inventory") {
        println!("  {}", event);
    }
}
