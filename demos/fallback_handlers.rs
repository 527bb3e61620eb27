//! Fallback Handlers
//!
//! Demonstrates fallback substitution after retries are exhausted:
//! - Registering handlers per error kind, most specific first
//! - Decorating an operation into a same-shaped callable
//! - Unmatched errors propagating unchanged

use std::sync::Arc;
use std::time::Duration;

use steadfast::{decorate, Fallback, Retry, RetryConfig};

#[derive(Debug, PartialEq)]
enum QuoteError {
    Unavailable,
    Rejected,
}

impl std::fmt::Display for QuoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuoteError::Unavailable => write!(f, "pricing service unavailable"),
            QuoteError::Rejected => write!(f, "quote request rejected"),
        }
    }
}

fn main() {
    let retry: Arc<Retry<u64, QuoteError>> = Arc::new(Retry::new(
        "pricing",
        RetryConfig::builder()
            .max_attempts(3)
            .wait(Duration::from_millis(20))
            .build()
            .expect("valid config"),
    ));

    let fallback = Fallback::new().on(
        |e: &QuoteError| matches!(e, QuoteError::Unavailable),
        |_: &QuoteError| {
            println!("  -> serving last known price");
            Ok(9_950)
        },
    );

    println!("=== Handled kind: service down, cached price substituted ===");
    let mut quote = decorate(retry.clone(), fallback.clone(), || {
        println!("  calling pricing service");
        Err(QuoteError::Unavailable)
    });
    println!("  quote: {:?}", quote());

    println!("\n=== Unhandled kind: rejection propagates unchanged ===");
    let mut rejected = decorate(retry, fallback, || Err(QuoteError::Rejected));
    println!("  quote: {:?}", rejected());
}
