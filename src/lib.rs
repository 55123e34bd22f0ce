//! # Call Pacing Utilities
//!
//! Shared wrappers that control *when* and *how often* a caller-supplied
//! function runs, for use across the integrations.
//!
//! ## Features
//!
//! - Debouncing: collapse bursts of calls into one trailing invocation
//! - Throttling: leading-edge invocation capped to once per window, with a
//!   coalesced trailing call
//! - Memoization: argument-keyed result caching with a pluggable key
//!   strategy
//! - Single-flight: exactly one underlying invocation per wrapper lifetime
//! - Retry: fixed-delay re-attempts for fallible asynchronous operations
//! - Rate limiting: FIFO call serialization with an inter-call cooldown
//!
//! Every wrapper owns its own private state (timer handle, cache, queue);
//! independently constructed wrappers around the same function never
//! interfere.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_pacer::{Debouncer, RetryConfig, RetryExecutor};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Collapse keystroke bursts into one search.
//!     let search = Debouncer::new(Duration::from_millis(250), |query: String| {
//!         println!("searching for {query}");
//!     });
//!     search.call("rust debou".to_string());
//!     search.call("rust debounce".to_string());
//!
//!     // Re-attempt a flaky fetch up to three times, one second apart.
//!     let executor = RetryExecutor::new(RetryConfig::default());
//!     let value: Result<u32, std::io::Error> =
//!         executor.execute("fetch", || async { Ok(42) }).await;
//!     let _ = value;
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `debounce` - Trailing-edge burst collapsing
//! - `throttle` - Frequency capping with leading and trailing edges
//! - `memo` - Argument-keyed result caching
//! - `single_flight` - Exactly-once invocation
//! - `retry` - Fixed-delay retry execution
//! - `rate_limit` - FIFO queue with cooldown
//! - `errors` - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod debounce;
pub mod errors;
pub mod memo;
pub mod rate_limit;
pub mod retry;
pub mod single_flight;
pub mod throttle;


// Re-exports for convenience
pub use debounce::Debouncer;
pub use errors::QueueError;
pub use memo::Memoizer;
pub use rate_limit::RateLimiter;
pub use retry::{retry, RetryConfig, RetryContext, RetryDecision, RetryExecutor, RetryHook};
pub use single_flight::SingleFlight;
pub use throttle::Throttler;

use std::time::Duration;

/// The default number of retries after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// The default delay between retry attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
