//! Mutation triggers — write operations keyed by identifier alone.
//!
//! A [`Mutation`] wraps a keyed endpoint whose arguments describe the write.
//! Unlike a query, it derives no per-call key: the trigger is keyed solely
//! by the endpoint's identifier. Optionally it can be linked to a cache
//! backend, in which case a successful trigger evicts every cached entry in
//! that identifier's namespace — bind the query and mutation endpoints under
//! the same identifier to get write-through invalidation.

use std::sync::Arc;

use tracing::debug;

use crate::cache::InvalidateNamespace;
use crate::endpoint::{Endpoint, Operation};
use crate::key::{Identifier, KeyArgs};

/// A mutation trigger over a keyed endpoint.
///
/// # Examples
///
/// ```
/// use keyfetch::{Endpoint, Mutation};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let rename = Endpoint::named("renameUser", |(name,): (String,)| async move {
///     Ok::<_, std::io::Error>(name.to_uppercase())
/// })
/// .unwrap();
///
/// let rename = Mutation::new(rename);
/// assert_eq!(rename.trigger(("ada".to_owned(),)).await.unwrap(), "ADA");
/// # }
/// ```
pub struct Mutation<A, Op> {
    endpoint: Endpoint<A, Op>,
    linked: Option<Arc<dyn InvalidateNamespace>>,
}

impl<A, Op> Mutation<A, Op>
where
    A: KeyArgs,
    Op: Operation<A>,
{
    /// Wraps `endpoint` as a plain trigger with no cache linkage.
    pub fn new(endpoint: Endpoint<A, Op>) -> Self {
        Self {
            endpoint,
            linked: None,
        }
    }

    /// Wraps `endpoint` and links it to a cache backend: every successful
    /// trigger evicts the endpoint's identifier namespace in `cache`.
    pub fn linked(endpoint: Endpoint<A, Op>, cache: Arc<dyn InvalidateNamespace>) -> Self {
        Self {
            endpoint,
            linked: Some(cache),
        }
    }

    /// The identifier this trigger is keyed by.
    pub fn identifier(&self) -> &Identifier {
        self.endpoint.identifier()
    }

    /// Invokes the operation with the given argument value.
    ///
    /// On success, a linked cache has the identifier's namespace evicted
    /// before the result is returned.
    ///
    /// # Errors
    ///
    /// The operation's own error, untouched; a failed trigger evicts nothing.
    pub async fn trigger(&self, args: A) -> Result<Op::Output, Op::Error> {
        let output = self.endpoint.call(args).await?;
        if let Some(cache) = &self.linked {
            debug!(identifier = %self.identifier(), "mutation committed — evicting namespace");
            cache.invalidate_namespace(self.identifier()).await;
        }
        Ok(output)
    }
}
