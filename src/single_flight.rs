//! Exactly-once invocation with a permanently stored result.

use parking_lot::Mutex;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Guarantees at most one successful invocation of the wrapped function for
/// the lifetime of the wrapper.
///
/// The first call invokes the function and stores its result permanently;
/// every later call returns a clone of the stored result without invoking,
/// regardless of how its arguments differ from the first call's. There is
/// no reset.
///
/// A failed first call is **not** memoized: the error goes back to that
/// caller, the slot stays empty, and the next call invokes again. Once a
/// call succeeds the guarantee is permanent.
///
/// The slot lock is held across the invocation so racing first calls cannot
/// both invoke; as a consequence the wrapped function must not call back
/// into the same wrapper.
pub struct SingleFlight<A, R, E = Infallible> {
    func: Arc<dyn Fn(A) -> Result<R, E> + Send + Sync>,
    slot: Mutex<Option<R>>,
}

impl<A, R: Clone> SingleFlight<A, R> {
    /// Wrap an infallible function.
    pub fn new(func: impl Fn(A) -> R + Send + Sync + 'static) -> Self {
        Self::fallible(move |args| Ok(func(args)))
    }

    /// Invoke on the first call; return the stored result on every call
    /// after that.
    pub fn call(&self, args: A) -> R {
        match self.try_call(args) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<A, R: Clone, E> SingleFlight<A, R, E> {
    /// Wrap a fallible function. Only a successful result is stored.
    pub fn fallible(func: impl Fn(A) -> Result<R, E> + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
            slot: Mutex::new(None),
        }
    }

    /// Invoke on the first successful call; return the stored result on
    /// every call after that. A failure leaves the wrapper unset.
    pub fn try_call(&self, args: A) -> Result<R, E> {
        let mut slot = self.slot.lock();
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }

        let value = (self.func)(args)?;
        *slot = Some(value.clone());
        debug!("single-flight result stored");
        Ok(value)
    }

    /// Whether the wrapped function has already run successfully.
    pub fn is_called(&self) -> bool {
        self.slot.lock().is_some()
    }
}
