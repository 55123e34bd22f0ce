//! FIFO call serialization with an inter-call cooldown.

use crate::errors::QueueError;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, trace};

struct Job<A, R, E> {
    args: A,
    reply: oneshot::Sender<Result<R, E>>,
}

/// Serializes calls through a FIFO queue with a cooldown between them.
///
/// Every [`call`](RateLimiter::call) enqueues its arguments and resolves
/// when that specific request has been processed. A single worker task
/// drains the queue: invocations run strictly in submission order, never
/// concurrently, and the worker waits the configured minimum delay after
/// each settlement (success or failure) before starting the next.
///
/// One queued call's failure settles only that call; the worker moves on to
/// the rest of the queue. There is no cancellation: a call that has been
/// accepted runs to settlement. Dropping the limiter closes the queue; the
/// worker finishes the calls already accepted, then exits.
pub struct RateLimiter<A, R, E> {
    tx: mpsc::UnboundedSender<Job<A, R, E>>,
    in_flight: Arc<AtomicUsize>,
    min_delay: Duration,
}

impl<A, R, E> RateLimiter<A, R, E>
where
    A: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    /// Create a rate limiter around the given asynchronous function,
    /// spawning the worker task that owns the queue.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new<F, Fut>(min_delay: Duration, func: F) -> Self
    where
        F: Fn(A) -> Fut + Send + 'static,
        Fut: Future<Output = Result<R, E>> + Send,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job<A, R, E>>();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker_in_flight = Arc::clone(&in_flight);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let result = func(job.args).await;
                if job.reply.send(result).is_err() {
                    trace!("rate-limited caller went away before settlement");
                }
                worker_in_flight.fetch_sub(1, Ordering::SeqCst);
                sleep(min_delay).await;
            }
            debug!("rate limiter queue drained; worker exiting");
        });

        Self {
            tx,
            in_flight,
            min_delay,
        }
    }

    /// Enqueue a call and return a future that resolves with its
    /// settlement.
    ///
    /// The request joins the queue immediately, in call order, not when
    /// the returned future is first polled. Dropping the returned future
    /// does not withdraw the request: the invocation still runs in its
    /// queue position, its result discarded.
    pub fn call(&self, args: A) -> impl Future<Output = Result<R, QueueError<E>>> + Send {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.in_flight.fetch_add(1, Ordering::SeqCst);

        let sent = self
            .tx
            .send(Job {
                args,
                reply: reply_tx,
            })
            .is_ok();
        if !sent {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        async move {
            if !sent {
                return Err(QueueError::Closed);
            }
            match reply_rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(QueueError::Call(e)),
                Err(_) => Err(QueueError::Closed),
            }
        }
    }

    /// Number of accepted calls not yet settled.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The configured minimum gap between the end of one invocation and the
    /// start of the next.
    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}
