//! # keyfetch
//!
//! Stable cache keys for async data-fetching operations.
//!
//! Bind an operation to an identifier once and it carries its cache key
//! discipline with it: the composite key is always the identifier followed
//! by the call arguments, in order, so every caching layer indexing on that
//! key agrees on what it caches. The crate ships two backends — a
//! single-flight concurrent cache ([`moka`]) and a strict-capacity LRU
//! ([`lru`]) — plus mutation triggers that evict a namespace on write.
//!
//! ## Quick Start
//!
//! ```
//! use keyfetch::{Endpoint, QueryCache};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let get_user = Endpoint::named("getUser", |(id,): (u64,)| async move {
//!         Ok::<_, std::io::Error>(format!("user-{id}"))
//!     })
//!     .unwrap();
//!
//!     let cache: QueryCache<(u64,), String> = QueryCache::new(1_000);
//!
//!     // First fetch invokes the operation; the second is served from cache
//!     // under the key ("getUser", 42).
//!     let user = cache.fetch(&get_user, (42,)).await.unwrap();
//!     assert_eq!(user, "user-42");
//! }
//! ```

// ── Core: identifiers, keys, and the binder ───────────────────────────────────
pub mod endpoint;
pub mod key;

// ── Backends: caches and mutation triggers ────────────────────────────────────
pub mod cache;
pub mod mutation;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{BoundedCache, FetchOptions, InvalidateNamespace, QueryCache, QueryCacheBuilder};
pub use endpoint::{Endpoint, Operation};
pub use key::{BindError, CacheKey, Identifier, IdentifierSource, KeyArgs, UuidSource};
pub use mutation::Mutation;
