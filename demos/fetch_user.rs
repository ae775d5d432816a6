//! End-to-end demo: keyed endpoints, a single-flight cache, and a linked
//! mutation sharing the query's namespace.
//!
//! Run with: `cargo run --example fetch_user`

use std::convert::Infallible;
use std::sync::Arc;

use keyfetch::{Endpoint, FetchOptions, InvalidateNamespace, Mutation, QueryCache};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    // A query endpoint with an explicit identifier...
    let get_user = Endpoint::named("user", |(id,): (u64,)| async move {
        info!(id, "fetching user from upstream");
        Ok::<_, Infallible>(format!("user-{id}"))
    })?;

    // ...and a write endpoint bound under the *same* identifier, so the
    // mutation can evict the query's namespace.
    let rename_user = Endpoint::named("user", |(id,): (u64,)| async move {
        info!(id, "renaming user upstream");
        Ok::<_, Infallible>(())
    })?;

    let cache: Arc<QueryCache<(u64,), String>> = Arc::new(QueryCache::new(1_000));
    let rename =
        Mutation::linked(rename_user, Arc::clone(&cache) as Arc<dyn InvalidateNamespace>);

    info!(user = %cache.fetch(&get_user, (42,)).await.unwrap(), "first fetch (miss)");
    info!(user = %cache.fetch(&get_user, (42,)).await.unwrap(), "second fetch (hit)");

    rename.trigger((42,)).await?;
    info!(user = %cache.fetch(&get_user, (42,)).await.unwrap(), "after mutation (miss again)");

    // Zero-argument endpoints take options in the argument position; their
    // key collapses to the bare identifier.
    let ping = Endpoint::anonymous(|(): ()| async { Ok::<_, Infallible>("pong") });
    let status: QueryCache<(), &str> = QueryCache::new(8);
    info!(
        identifier = %ping.identifier(),
        reply = status.fetch_with(&ping, FetchOptions::default()).await.unwrap(),
        "anonymous zero-arg endpoint"
    );

    Ok(())
}
