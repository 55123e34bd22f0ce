//! Failure modes for queued, rate-limited calls.

use thiserror::Error;

/// Error returned by [`RateLimiter::call`](crate::RateLimiter::call).
///
/// Distinguishes the wrapped function failing (isolated to the one queued
/// call that ran it) from the limiter's worker being gone entirely, in which
/// case no queued call can ever settle again.
#[derive(Error, Debug)]
pub enum QueueError<E> {
    /// The worker task is gone: every handle to the limiter was dropped
    /// while this call was in flight, or the wrapped function panicked and
    /// took the worker down with it.
    #[error("rate limiter queue is closed")]
    Closed,

    /// The wrapped function itself failed. Other queued calls are
    /// unaffected; the worker moves on after the cooldown.
    #[error("rate-limited call failed: {0}")]
    Call(E),
}

impl<E> QueueError<E> {
    /// Returns true when the limiter's worker is gone, as opposed to the
    /// wrapped function having failed.
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::Closed)
    }

    /// Extracts the wrapped function's error, when that is what failed.
    pub fn into_call(self) -> Option<E> {
        match self {
            QueueError::Call(e) => Some(e),
            QueueError::Closed => None,
        }
    }
}
