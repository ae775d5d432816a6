//! Single-flight query cache backed by [`moka::future::Cache`].
//!
//! Fetches are keyed by the endpoint's composite key. When several callers
//! ask for the same key at once, moka coalesces them onto one in-flight
//! operation invocation and hands every waiter the same result; because the
//! waiters share a failure too, operation errors surface as [`Arc<E>`].
//! Errors are never cached — the next fetch after a failure invokes the
//! operation again.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, warn};

use crate::cache::{FetchOptions, InvalidateNamespace};
use crate::endpoint::{Endpoint, Operation};
use crate::key::{CacheKey, Identifier, KeyArgs};

/// A concurrent query cache over values of type `T`, keyed by
/// [`CacheKey<A>`].
///
/// The cache assembles the composite key itself — identifier first, then the
/// call arguments — and registers a fetcher that strips the identifier back
/// off and invokes the operation with the remaining elements.
///
/// # Examples
///
/// ```
/// use keyfetch::{Endpoint, QueryCache};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let get_user = Endpoint::named("getUser", |(id,): (u64,)| async move {
///     Ok::<_, std::io::Error>(format!("user-{id}"))
/// })
/// .unwrap();
///
/// let cache: QueryCache<(u64,), String> = QueryCache::new(1_000);
/// let user = cache.fetch(&get_user, (42,)).await.unwrap();
/// assert_eq!(user, "user-42");
/// # }
/// ```
pub struct QueryCache<A: KeyArgs, T> {
    cache: Cache<CacheKey<A>, T>,
}

impl<A, T> QueryCache<A, T>
where
    A: KeyArgs,
    T: Clone + Send + Sync + 'static,
{
    /// Creates a cache holding at most `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        QueryCacheBuilder::default()
            .max_capacity(max_capacity)
            .build()
    }

    /// Starts building a cache with explicit capacity and expiry settings.
    pub fn builder() -> QueryCacheBuilder<A, T> {
        QueryCacheBuilder::default()
    }

    /// Returns the cached value for `(endpoint, args)`, fetching it on a miss.
    ///
    /// Concurrent calls for the same key share one operation invocation.
    ///
    /// # Errors
    ///
    /// The operation's own error, untouched apart from the [`Arc`] shared by
    /// coalesced waiters. Failed fetches are not cached.
    pub async fn fetch<Op>(&self, endpoint: &Endpoint<A, Op>, args: A) -> Result<T, Arc<Op::Error>>
    where
        Op: Operation<A, Output = T>,
    {
        let key = CacheKey::new(endpoint.identifier().clone(), args);
        let call_args = key.args().clone();
        self.cache
            .try_get_with(key, async move {
                debug!(
                    identifier = %endpoint.identifier(),
                    args = ?call_args,
                    "cache miss — invoking operation"
                );
                endpoint.call(call_args).await
            })
            .await
    }

    /// Drops the entry for one concrete key, if present.
    pub async fn invalidate(&self, key: &CacheKey<A>) {
        self.cache.invalidate(key).await;
    }

    /// Drops every entry in the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

impl<X, T> QueryCache<(X,), T>
where
    (X,): KeyArgs,
    T: Clone + Send + Sync + 'static,
{
    /// Single-argument convenience: the value is the one argument, not an
    /// argument list to spread.
    pub async fn fetch_one<Op>(
        &self,
        endpoint: &Endpoint<(X,), Op>,
        arg: X,
    ) -> Result<T, Arc<Op::Error>>
    where
        Op: Operation<(X,), Output = T>,
    {
        self.fetch(endpoint, (arg,)).await
    }
}

impl<T> QueryCache<(), T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Zero-argument form: the argument position is taken by per-call
    /// options instead, and the key collapses to the bare identifier.
    pub async fn fetch_with<Op>(
        &self,
        endpoint: &Endpoint<(), Op>,
        options: FetchOptions,
    ) -> Result<T, Arc<Op::Error>>
    where
        Op: Operation<(), Output = T>,
    {
        if options.revalidate {
            self.invalidate(&endpoint.derive_key(())).await;
        }
        self.fetch(endpoint, ()).await
    }
}

impl<A, T> InvalidateNamespace for QueryCache<A, T>
where
    A: KeyArgs,
    T: Clone + Send + Sync + 'static,
{
    fn invalidate_namespace<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let id = identifier.clone();
            let result = self
                .cache
                .invalidate_entries_if(move |key, _| key.identifier() == &id);
            match result {
                Ok(_) => {
                    debug!(identifier = %identifier, "namespace invalidated");
                    self.cache.run_pending_tasks().await;
                }
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "namespace invalidation rejected");
                }
            }
        })
    }
}

/// Builder for [`QueryCache`] — the configuration surface of the coalesced
/// backend.
pub struct QueryCacheBuilder<A, T> {
    max_capacity: Option<u64>,
    time_to_live: Option<Duration>,
    time_to_idle: Option<Duration>,
    _marker: std::marker::PhantomData<fn() -> (A, T)>,
}

impl<A, T> Default for QueryCacheBuilder<A, T> {
    fn default() -> Self {
        Self {
            max_capacity: None,
            time_to_live: None,
            time_to_idle: None,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<A, T> QueryCacheBuilder<A, T>
where
    A: KeyArgs,
    T: Clone + Send + Sync + 'static,
{
    /// Caps the number of live entries.
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    /// Expires entries a fixed duration after insertion.
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Expires entries a fixed duration after their last read.
    pub fn time_to_idle(mut self, tti: Duration) -> Self {
        self.time_to_idle = Some(tti);
        self
    }

    /// Builds the cache.
    pub fn build(self) -> QueryCache<A, T> {
        // Invalidation closures are what namespace eviction rides on.
        let mut builder = Cache::builder().support_invalidation_closures();
        if let Some(max_capacity) = self.max_capacity {
            builder = builder.max_capacity(max_capacity);
        }
        if let Some(ttl) = self.time_to_live {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = self.time_to_idle {
            builder = builder.time_to_idle(tti);
        }
        QueryCache {
            cache: builder.build(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counted_user_fetcher(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn((u64,)) -> Pin<Box<dyn Future<Output = Result<String, Infallible>> + Send>>
    + Send
    + Sync {
        move |(id,)| {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(format!("user-{id}"))
            })
        }
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ep = Endpoint::named("getUser", counted_user_fetcher(Arc::clone(&calls))).unwrap();
        let cache: QueryCache<(u64,), String> = QueryCache::new(64);

        assert_eq!(cache.fetch(&ep, (42,)).await.unwrap(), "user-42");
        assert_eq!(cache.fetch(&ep, (42,)).await.unwrap(), "user-42");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_args_get_distinct_entries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ep = Endpoint::named("getUser", counted_user_fetcher(Arc::clone(&calls))).unwrap();
        let cache: QueryCache<(u64,), String> = QueryCache::new(64);

        assert_eq!(cache.fetch(&ep, (1,)).await.unwrap(), "user-1");
        assert_eq!(cache.fetch(&ep, (2,)).await.unwrap(), "user-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fetch_one_takes_the_single_value_directly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ep = Endpoint::named("getUser", counted_user_fetcher(Arc::clone(&calls))).unwrap();
        let cache: QueryCache<(u64,), String> = QueryCache::new(64);

        assert_eq!(cache.fetch_one(&ep, 7).await.unwrap(), "user-7");
        assert_eq!(cache.fetch(&ep, (7,)).await.unwrap(), "user-7");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_arg_endpoint_collapses_to_bare_identifier() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ping = Endpoint::named("ping", move |(): ()| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>("pong")
            }
        })
        .unwrap();
        assert_eq!(
            ping.derive_key(()),
            CacheKey::new(Identifier::new("ping").unwrap(), ())
        );

        let cache: QueryCache<(), &str> = QueryCache::new(8);
        assert_eq!(
            cache.fetch_with(&ping, FetchOptions::default()).await.unwrap(),
            "pong"
        );
        assert_eq!(
            cache.fetch_with(&ping, FetchOptions::default()).await.unwrap(),
            "pong"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Revalidation drops the entry and fetches fresh.
        assert_eq!(
            cache.fetch_with(&ping, FetchOptions::revalidate()).await.unwrap(),
            "pong"
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_fetches_for_one_key_coalesce() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ep = Endpoint::named("slow", move |(id,): (u64,)| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, Infallible>(id * 2)
            }
        })
        .unwrap();
        let cache: QueryCache<(u64,), u64> = QueryCache::new(64);

        let (a, b) = tokio::join!(cache.fetch(&ep, (21,)), cache.fetch(&ep, (21,)));
        assert_eq!(a.unwrap(), 42);
        assert_eq!(b.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn errors_pass_through_and_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ep = Endpoint::named("flaky", move |(): ()| {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("backend unavailable")
                } else {
                    Ok("recovered")
                }
            }
        })
        .unwrap();
        let cache: QueryCache<(), &str> = QueryCache::new(8);

        let err = cache.fetch(&ep, ()).await.unwrap_err();
        assert_eq!(*err, "backend unavailable");
        assert_eq!(cache.fetch(&ep, ()).await.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn namespace_invalidation_spares_other_identifiers() {
        let user_calls = Arc::new(AtomicUsize::new(0));
        let page_calls = Arc::new(AtomicUsize::new(0));
        let users = Endpoint::named("getUser", counted_user_fetcher(Arc::clone(&user_calls))).unwrap();
        let pages = Endpoint::named("getPage", counted_user_fetcher(Arc::clone(&page_calls))).unwrap();
        let cache: QueryCache<(u64,), String> = QueryCache::new(64);

        cache.fetch(&users, (1,)).await.unwrap();
        cache.fetch(&pages, (1,)).await.unwrap();

        cache.invalidate_namespace(users.identifier()).await;

        cache.fetch(&users, (1,)).await.unwrap();
        cache.fetch(&pages, (1,)).await.unwrap();
        assert_eq!(user_calls.load(Ordering::SeqCst), 2);
        assert_eq!(page_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn builder_applies_time_to_live() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ep = Endpoint::named("getUser", counted_user_fetcher(Arc::clone(&calls))).unwrap();
        let cache: QueryCache<(u64,), String> = QueryCache::builder()
            .max_capacity(8)
            .time_to_live(Duration::from_millis(20))
            .build();

        cache.fetch(&ep, (1,)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.fetch(&ep, (1,)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
