//! Trailing-edge debouncing for bursty call sites.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Collapses bursts of calls into a single trailing invocation.
///
/// Every [`call`](Debouncer::call) discards any previously scheduled
/// invocation and arms a fresh timer for the full wait period, carrying that
/// call's arguments. Only the most recent call in a burst survives to the
/// actual invocation, which fires once the burst has been quiet for the
/// configured wait.
///
/// The wrapped function runs on a spawned task and its return value is
/// discarded; callers that need a result must arrange their own side
/// channel. A wait of zero still defers to the scheduler; the invocation
/// never happens synchronously inside `call`.
///
/// Dropping the debouncer cancels any pending invocation.
pub struct Debouncer<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    wait: Duration,
    callback: Arc<dyn Fn(T) + Send + Sync>,
    state: Mutex<State<T>>,
}

/// Instance state. `epoch` invalidates a sleeper that already woke but has
/// not yet fired, so cancellation never races the timer.
struct State<T> {
    args: Option<T>,
    sleeper: Option<JoinHandle<()>>,
    epoch: u64,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer around the given function.
    pub fn new(wait: Duration, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                wait,
                callback: Arc::new(callback),
                state: Mutex::new(State {
                    args: None,
                    sleeper: None,
                    epoch: 0,
                }),
            }),
        }
    }

    /// Schedule an invocation with these arguments after the wait period,
    /// replacing any invocation scheduled by an earlier call.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn call(&self, args: T) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        let epoch = state.epoch;
        state.args = Some(args);
        if let Some(handle) = state.sleeper.take() {
            handle.abort();
            trace!("debounce timer reset");
        }

        let inner = Arc::clone(&self.inner);
        state.sleeper = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.wait).await;
            let mut state = inner.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.sleeper = None;
            let args = state.args.take();
            drop(state);
            if let Some(args) = args {
                trace!("debounce trailing edge fired");
                (inner.callback)(args);
            }
        }));
    }

    /// Discard any pending invocation without running it. Safe to call when
    /// nothing is pending.
    pub fn cancel(&self) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        state.args = None;
        if let Some(handle) = state.sleeper.take() {
            handle.abort();
            debug!("debounce cancelled");
        }
    }

    /// Run the pending invocation immediately with its captured arguments
    /// and clear the timer. No-op when nothing is pending.
    pub fn flush(&self) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        let args = state.args.take();
        if let Some(handle) = state.sleeper.take() {
            handle.abort();
        }
        drop(state);
        if let Some(args) = args {
            debug!("debounce flushed");
            (self.inner.callback)(args);
        }
    }

    /// Whether an invocation is currently scheduled.
    pub fn is_pending(&self) -> bool {
        self.inner.state.lock().sleeper.is_some()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        state.epoch += 1;
        state.args = None;
        if let Some(handle) = state.sleeper.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_debouncer(wait: Duration) -> (Debouncer<u32>, Arc<AtomicU32>, Arc<Mutex<Vec<u32>>>) {
        let count = Arc::new(AtomicU32::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let count_clone = count.clone();
        let seen_clone = seen.clone();
        let debouncer = Debouncer::new(wait, move |args: u32| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            seen_clone.lock().push(args);
        });
        (debouncer, count, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_last_call() {
        let (debouncer, count, seen) = counting_debouncer(Duration::from_millis(50));

        debouncer.call(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.call(2);
        tokio::time::sleep(Duration::from_millis(10)).await;
        debouncer.call(3);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_invocation() {
        let (debouncer, count, _) = counting_debouncer(Duration::from_millis(50));

        debouncer.call(1);
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (debouncer, count, _) = counting_debouncer(Duration::from_millis(50));

        debouncer.cancel();
        debouncer.call(1);
        debouncer.cancel();
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_each_fire() {
        let (debouncer, count, seen) = counting_debouncer(Duration::from_millis(50));

        debouncer.call(1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        debouncer.call(2);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_wait_still_defers() {
        let (debouncer, count, _) = counting_debouncer(Duration::ZERO);

        debouncer.call(1);
        // Nothing has run synchronously.
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_fires_immediately() {
        let (debouncer, count, seen) = counting_debouncer(Duration::from_secs(60));

        debouncer.call(7);
        assert!(debouncer.is_pending());

        debouncer.flush();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock(), vec![7]);
        assert!(!debouncer.is_pending());

        // The cancelled timer must not fire a second time.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_without_pending_is_noop() {
        let (debouncer, count, _) = counting_debouncer(Duration::from_millis(50));

        debouncer.flush();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_pending_tracks_timer() {
        let (debouncer, _, _) = counting_debouncer(Duration::from_millis(50));

        assert!(!debouncer.is_pending());
        debouncer.call(1);
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let (debouncer, count, _) = counting_debouncer(Duration::from_millis(50));

        debouncer.call(1);
        drop(debouncer);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
