//! Memoization Wrapper
//!
//! Higher-order functions that wrap a function with a cache. The wrapped
//! closure takes the same argument as the original (use a tuple for several
//! arguments) and can replace it at every call site.
//!
//! # Example
//! ```ignore
//! let cache = factory.create::<Profile>(CacheKind::Memory, CacheConfig::default(), None);
//! let load_profile = with_cache_async(
//!     |(user_id, locale): (u64, String)| api.fetch_profile(user_id, locale),
//!     cache,
//! );
//! let profile = load_profile((42, "en".to_string())).await?;
//! ```
//!
//! Concurrent misses on the same key are not coalesced: each caller runs the
//! function and the last result written wins.

use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::SharedCache;

// == Default Key ==
/// Serializes call arguments into a cache key (compact JSON).
///
/// Returns `None` when the arguments cannot be serialized, in which case
/// the wrappers call straight through without caching.
///
/// Keys are only stable when the serialized form is. Arguments holding a
/// `HashMap` or `HashSet` serialize in iteration order and can produce
/// different keys for equal values; use `with_cache_by` with an explicit key
/// for those, or pass a `BTreeMap`.
pub fn default_key<A: Serialize + ?Sized>(args: &A) -> Option<String> {
    match serde_json::to_string(args) {
        Ok(key) => Some(key),
        Err(err) => {
            warn!(error = %err, "arguments not serializable, bypassing cache");
            None
        }
    }
}

// == Sync Wrappers ==
/// Caches the results of `f`, keyed by its serialized arguments.
pub fn with_cache<A, T, F>(f: F, cache: SharedCache<T>) -> impl Fn(A) -> T
where
    A: Serialize,
    T: Clone,
    F: Fn(A) -> T,
{
    memoize(f, cache, default_key::<A>)
}

/// Like `with_cache`, with a caller-supplied key function.
pub fn with_cache_by<A, T, F, K>(f: F, cache: SharedCache<T>, key_fn: K) -> impl Fn(A) -> T
where
    T: Clone,
    F: Fn(A) -> T,
    K: Fn(&A) -> String,
{
    memoize(f, cache, move |args: &A| Some(key_fn(args)))
}

fn memoize<A, T, F, K>(f: F, cache: SharedCache<T>, key_fn: K) -> impl Fn(A) -> T
where
    T: Clone,
    F: Fn(A) -> T,
    K: Fn(&A) -> Option<String>,
{
    move |args: A| -> T {
        let Some(key) = key_fn(&args) else {
            return f(args);
        };
        if let Some(hit) = cache.get(&key) {
            debug!(%key, "memoized hit");
            return hit;
        }

        let value = f(args);
        cache.set(&key, value.clone(), None);
        value
    }
}

/// Caches the `Ok` results of a fallible `f`; errors pass through uncached.
pub fn try_with_cache<A, T, E, F>(f: F, cache: SharedCache<T>) -> impl Fn(A) -> Result<T, E>
where
    A: Serialize,
    T: Clone,
    F: Fn(A) -> Result<T, E>,
{
    move |args: A| -> Result<T, E> {
        let Some(key) = default_key(&args) else {
            return f(args);
        };
        if let Some(hit) = cache.get(&key) {
            return Ok(hit);
        }

        let value = f(args)?;
        cache.set(&key, value.clone(), None);
        Ok(value)
    }
}

// == Async Wrappers ==
/// Caches the resolved `Ok` values of an async `f`.
///
/// `f` is invoked as soon as the wrapper is called on a miss; its value is
/// stored only once the future resolves successfully.
pub fn with_cache_async<A, T, E, F, Fut>(
    f: F,
    cache: SharedCache<T>,
) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>>
where
    A: Serialize,
    T: Clone + Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    memoize_async(f, cache, default_key::<A>)
}

/// Like `with_cache_async`, with a caller-supplied key function.
pub fn with_cache_async_by<A, T, E, F, Fut, K>(
    f: F,
    cache: SharedCache<T>,
    key_fn: K,
) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    K: Fn(&A) -> String,
{
    memoize_async(f, cache, move |args: &A| Some(key_fn(args)))
}

fn memoize_async<A, T, E, F, Fut, K>(
    f: F,
    cache: SharedCache<T>,
    key_fn: K,
) -> impl Fn(A) -> BoxFuture<'static, Result<T, E>>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    K: Fn(&A) -> Option<String>,
{
    move |args: A| -> BoxFuture<'static, Result<T, E>> {
        let Some(key) = key_fn(&args) else {
            return f(args).boxed();
        };
        if let Some(hit) = cache.get(&key) {
            debug!(%key, "memoized hit");
            return future::ready(Ok(hit)).boxed();
        }

        let pending = f(args);
        let cache = Arc::clone(&cache);
        async move {
            let result = pending.await;
            if let Ok(value) = &result {
                cache.set(&key, value.clone(), None);
            }
            result
        }
        .boxed()
    }
}
