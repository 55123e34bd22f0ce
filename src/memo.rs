//! Argument-keyed result caching.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{trace, warn};

type KeyFn<A> = Arc<dyn Fn(&A) -> Option<String> + Send + Sync>;

/// Caches a function's results keyed by its arguments.
///
/// The default key is the `serde_json` serialization of the argument
/// payload: order-sensitive and type-distinguishing (`1` and `"1"` produce
/// different keys). Callers whose argument type has an unstable or
/// unserializable shape supply an explicit key function via
/// [`keyed`](Memoizer::keyed) instead.
///
/// A cache hit returns a clone of the stored result without invoking the
/// wrapped function; entries are never evicted or expired, only cleared
/// explicitly through [`cache_clear`](Memoizer::cache_clear). Errors from a
/// fallible function are never cached, so the next call with the same key
/// invokes again.
///
/// If the default key serialization fails for a particular value, the call
/// bypasses the cache entirely: the function still runs and its result is
/// returned, just not stored.
///
/// Not suited to functions with side effects beyond their return value,
/// since repeated calls after the first are suppressed. Concurrent first calls
/// with the same key may both invoke; the cache keeps one of the results.
pub struct Memoizer<A, R, E = Infallible> {
    func: Arc<dyn Fn(&A) -> Result<R, E> + Send + Sync>,
    key_fn: KeyFn<A>,
    cache: Mutex<HashMap<String, R>>,
}

impl<A: Serialize, R: Clone> Memoizer<A, R> {
    /// Memoize an infallible function under the default argument key.
    pub fn new(func: impl Fn(&A) -> R + Send + Sync + 'static) -> Self {
        Self::fallible(move |args| Ok(func(args)))
    }
}

impl<A: Serialize, R: Clone, E> Memoizer<A, R, E> {
    /// Memoize a fallible function under the default argument key. Only
    /// `Ok` results are cached.
    pub fn fallible(func: impl Fn(&A) -> Result<R, E> + Send + Sync + 'static) -> Self {
        Self {
            func: Arc::new(func),
            key_fn: Arc::new(|args: &A| default_key(args)),
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl<A, R: Clone> Memoizer<A, R> {
    /// Memoize an infallible function under an explicit key function.
    pub fn keyed(
        func: impl Fn(&A) -> R + Send + Sync + 'static,
        key_fn: impl Fn(&A) -> String + Send + Sync + 'static,
    ) -> Self {
        Self::keyed_fallible(move |args| Ok(func(args)), key_fn)
    }
}

impl<A, R: Clone, E> Memoizer<A, R, E> {
    /// Memoize a fallible function under an explicit key function.
    pub fn keyed_fallible(
        func: impl Fn(&A) -> Result<R, E> + Send + Sync + 'static,
        key_fn: impl Fn(&A) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Arc::new(func),
            key_fn: Arc::new(move |args: &A| Some(key_fn(args))),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached result for these arguments, or invoke the wrapped
    /// function, cache an `Ok` result, and return it.
    pub fn try_call(&self, args: &A) -> Result<R, E> {
        let Some(key) = (self.key_fn)(args) else {
            return (self.func)(args);
        };

        if let Some(hit) = self.cache.lock().get(&key) {
            trace!(%key, "memoize cache hit");
            return Ok(hit.clone());
        }

        let value = (self.func)(args)?;
        self.cache.lock().insert(key, value.clone());
        Ok(value)
    }

    /// Number of cached entries.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Whether a result is cached for these arguments.
    pub fn cache_contains(&self, args: &A) -> bool {
        match (self.key_fn)(args) {
            Some(key) => self.cache.lock().contains_key(&key),
            None => false,
        }
    }

    /// The cached result for these arguments, if present.
    pub fn cache_get(&self, args: &A) -> Option<R> {
        let key = (self.key_fn)(args)?;
        self.cache.lock().get(&key).cloned()
    }

    /// Drop every cached entry.
    pub fn cache_clear(&self) {
        self.cache.lock().clear();
    }
}

impl<A, R: Clone> Memoizer<A, R> {
    /// Return the cached result for these arguments, or invoke the wrapped
    /// function, cache the result, and return it.
    pub fn call(&self, args: &A) -> R {
        match self.try_call(args) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

fn default_key<A: Serialize>(args: &A) -> Option<String> {
    match serde_json::to_string(args) {
        Ok(key) => Some(key),
        Err(err) => {
            warn!(%err, "memoize key derivation failed; bypassing cache for this call");
            None
        }
    }
}
