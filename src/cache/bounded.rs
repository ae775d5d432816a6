//! Strict-capacity LRU cache backed by the [`lru`] crate.
//!
//! The whole cache sits behind one [`tokio::sync::Mutex`], held across the
//! operation call on a miss. That makes deduplication coarse: concurrent
//! callers for the same key coalesce onto one invocation, at the price of
//! serializing misses for unrelated keys too. Suited to small, hot endpoint
//! families; use [`QueryCache`](super::QueryCache) where miss concurrency
//! matters.
//!
//! Unlike the coalesced backend, this one obtains its composite key through
//! [`Endpoint::derive_key`] and forwards the key's argument components to
//! the operation.

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{FetchOptions, InvalidateNamespace};
use crate::endpoint::{Endpoint, Operation};
use crate::key::{CacheKey, Identifier, KeyArgs};

/// A bounded LRU query cache over values of type `T`, keyed by
/// [`CacheKey<A>`].
pub struct BoundedCache<A: KeyArgs, T> {
    inner: Mutex<LruCache<CacheKey<A>, T>>,
}

impl<A, T> BoundedCache<A, T>
where
    A: KeyArgs,
    T: Clone + Send,
{
    /// Creates a cache holding at most `capacity` entries; the least
    /// recently used entry is evicted on overflow.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached value for `(endpoint, args)`, fetching it on a miss.
    ///
    /// # Errors
    ///
    /// The operation's own error, untouched. Failed fetches are not cached.
    pub async fn fetch<Op>(&self, endpoint: &Endpoint<A, Op>, args: A) -> Result<T, Op::Error>
    where
        Op: Operation<A, Output = T>,
    {
        let key = endpoint.derive_key(args);
        let mut cache = self.inner.lock().await;
        if let Some(value) = cache.get(&key) {
            return Ok(value.clone());
        }
        debug!(key = %key, "cache miss — invoking operation");
        // Lock stays held across the call: concurrent fetches coalesce.
        let value = endpoint.call(key.args().clone()).await?;
        cache.put(key, value.clone());
        Ok(value)
    }

    /// Drops the entry for one concrete key, if present.
    pub async fn invalidate(&self, key: &CacheKey<A>) {
        self.inner.lock().await.pop(key);
    }

    /// Number of entries currently cached.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Whether the cache currently holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Whether the cache currently holds a value for `key`.
    pub async fn contains(&self, key: &CacheKey<A>) -> bool {
        self.inner.lock().await.contains(key)
    }
}

impl<X, T> BoundedCache<(X,), T>
where
    (X,): KeyArgs,
    T: Clone + Send,
{
    /// Single-argument convenience: the value is the one argument, not an
    /// argument list to spread.
    pub async fn fetch_one<Op>(&self, endpoint: &Endpoint<(X,), Op>, arg: X) -> Result<T, Op::Error>
    where
        Op: Operation<(X,), Output = T>,
    {
        self.fetch(endpoint, (arg,)).await
    }
}

impl<T> BoundedCache<(), T>
where
    T: Clone + Send,
{
    /// Zero-argument form: the argument position is taken by per-call
    /// options instead, and the key collapses to the bare identifier.
    pub async fn fetch_with<Op>(
        &self,
        endpoint: &Endpoint<(), Op>,
        options: FetchOptions,
    ) -> Result<T, Op::Error>
    where
        Op: Operation<(), Output = T>,
    {
        if options.revalidate {
            self.invalidate(&endpoint.derive_key(())).await;
        }
        self.fetch(endpoint, ()).await
    }
}

impl<A, T> InvalidateNamespace for BoundedCache<A, T>
where
    A: KeyArgs,
    T: Clone + Send,
{
    fn invalidate_namespace<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut cache = self.inner.lock().await;
            let doomed: Vec<CacheKey<A>> = cache
                .iter()
                .filter(|(key, _)| key.identifier() == identifier)
                .map(|(key, _)| key.clone())
                .collect();
            for key in &doomed {
                cache.pop(key);
            }
            debug!(identifier = %identifier, evicted = doomed.len(), "namespace invalidated");
        })
    }
}
