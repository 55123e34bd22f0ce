//! Leading-plus-trailing-edge throttling.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Caps invocation frequency to at most once per window.
///
/// The first call (or any call arriving after a full window of quiet)
/// invokes the wrapped function immediately on the caller's task. Calls
/// arriving inside the window are coalesced: only the most recent one
/// survives, and it fires once at the end of the window as a trailing
/// invocation. Intermediate calls are dropped.
///
/// [`cancel`](Throttler::cancel) discards the trailing candidate and resets
/// the window, so the next call fires immediately. Dropping the throttler
/// cancels any pending trailing invocation.
pub struct Throttler<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    window: Duration,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    state: Mutex<State<T>>,
}

struct State<T> {
    last_run: Option<Instant>,
    trailing: Option<T>,
    sleeper: Option<JoinHandle<()>>,
    epoch: u64,
}

impl<T: Send + 'static> Throttler<T> {
    /// Create a throttler around the given function.
    pub fn new(window: Duration, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                window,
                callback: Arc::new(callback),
                state: Mutex::new(State {
                    last_run: None,
                    trailing: None,
                    sleeper: None,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Invoke immediately when the window is clear, otherwise stage these
    /// arguments for the trailing invocation (replacing any earlier staged
    /// arguments) and arm the window timer if it is not already armed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn call(&self, args: T) {
        let now = Instant::now();
        let mut state = self.inner.state.lock();

        let remaining = match state.last_run {
            None => Duration::ZERO,
            Some(prev) => {
                let elapsed = now.duration_since(prev);
                if elapsed >= self.inner.window {
                    Duration::ZERO
                } else {
                    self.inner.window - elapsed
                }
            }
        };

        if remaining.is_zero() {
            state.last_run = Some(now);
            drop(state);
            trace!("throttle leading edge fired");
            (self.inner.callback)(args);
            return;
        }

        state.trailing = Some(args);
        if state.sleeper.is_none() {
            let epoch = state.epoch;
            let inner = Arc::clone(&self.inner);
            state.sleeper = Some(tokio::spawn(async move {
                tokio::time::sleep(remaining).await;
                let mut state = inner.state.lock();
                if state.epoch != epoch {
                    return;
                }
                state.sleeper = None;
                state.last_run = Some(Instant::now());
                let args = state.trailing.take();
                drop(state);
                if let Some(args) = args {
                    trace!("throttle trailing edge fired");
                    (inner.callback)(args);
                }
            }));
        }
    }

    /// Discard the trailing candidate and reset the window, allowing the
    /// next call to fire immediately. Safe to call when nothing is pending.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        state.trailing = None;
        state.last_run = None;
        if let Some(handle) = state.sleeper.take() {
            handle.abort();
            debug!("throttle cancelled");
        }
    }

    /// Whether a trailing invocation is currently scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().sleeper.is_some()
    }
}

impl<T> Drop for Throttler<T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        state.trailing = None;
        if let Some(handle) = state.sleeper.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_throttler(window: Duration) -> (Throttler<u32>, Arc<AtomicU32>, Arc<Mutex<Vec<u32>>>) {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let count_clone = count.clone();
        let seen_clone = seen.clone();
        let throttler = Throttler::new(window, move |args: u32| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            seen_clone.lock().push(args);
        });
        (throttler, count, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_edge_fires_immediately() {
        let (throttler, count, seen) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        // Leading edge is synchronous, no timer involved.
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), vec![1]);
        assert!(!throttler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_edge_carries_second_args() {
        let (throttler, count, seen) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttler.call(2);
        assert!(throttler.is_pending());

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert!(!throttler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_intermediate_calls_are_coalesced() {
        let (throttler, count, seen) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttler.call(2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttler.call(3);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttler.call(4);

        tokio::time::sleep(Duration::from_millis(60)).await;

        // One leading, one trailing with the last call's arguments.
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock(), vec![1, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_fire_opens_a_new_window() {
        let (throttler, count, seen) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttler.call(2);
        // Trailing fires at t=50 and stamps the window.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        // t=70: still inside the window opened at t=50, so this defers.
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttler.call(3);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(throttler.is_pending());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(*seen.lock(), vec![1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_after_quiet_window_fires_immediately() {
        let (throttler, count, seen) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        throttler.call(2);

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_trailing_and_resets_window() {
        let (throttler, count, seen) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        throttler.call(2);
        throttler.cancel();

        tokio::time::sleep(Duration::from_millis(100)).await;
        // The staged trailing invocation never ran.
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // The window was reset, so the next call is a fresh leading edge.
        throttler.call(3);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_immediately_after_leading_resets_window() {
        let (throttler, count, _) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        throttler.cancel();
        throttler.call(2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_trailing() {
        let (throttler, count, _) = counting_throttler(Duration::from_millis(50));

        throttler.call(1);
        throttler.call(2);
        drop(throttler);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
