//! Cache backends that consume keyed endpoints.
//!
//! Two adapter layers, both keyed by [`CacheKey`](crate::CacheKey):
//!
//! - [`coalesced::QueryCache`] — concurrent async cache backed by
//!   [`moka`]. Concurrent fetches for the same key coalesce into a single
//!   operation invocation (single-flight).
//! - [`bounded::BoundedCache`] — strict-capacity LRU backed by the [`lru`]
//!   crate behind one async lock.
//!
//! The adapters contain no caching logic of their own: eviction, expiry and
//! deduplication belong to the backend crates. What they add is the key
//! discipline — assemble `(identifier, args...)`, hand the backend a fetcher
//! that strips the identifier back off and calls the operation with the
//! remaining elements.

use std::future::Future;
use std::pin::Pin;

use crate::key::Identifier;

pub mod bounded;
pub mod coalesced;

pub use bounded::BoundedCache;
pub use coalesced::{QueryCache, QueryCacheBuilder};

/// Per-call options for the zero-argument fetch form.
///
/// A zero-parameter operation has no argument position, so its call site
/// takes options instead and its key collapses to the bare identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Drop any cached value for the key before fetching, forcing one fresh
    /// invocation of the operation.
    pub revalidate: bool,
}

impl FetchOptions {
    /// Options requesting a fresh fetch.
    pub fn revalidate() -> Self {
        Self { revalidate: true }
    }
}

/// Eviction of every cached entry under one identifier.
///
/// Implemented by both cache backends and consumed by
/// [`Mutation`](crate::Mutation) to drop a namespace after a successful
/// write. Object-safe so a mutation can hold any backend behind `Arc<dyn _>`.
pub trait InvalidateNamespace: Send + Sync {
    /// Evicts all entries whose key carries `identifier`.
    fn invalidate_namespace<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}
