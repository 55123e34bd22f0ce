//! Error types for the pacer wrappers.
//!
//! A wrapped function's own errors are never folded into a crate-level
//! taxonomy; they flow back to the caller with their original type. The only
//! failure mode a wrapper adds on top of the wrapped function's is the rate
//! limiter's closed queue, captured by [`QueueError`].

mod error;

pub use error::QueueError;
