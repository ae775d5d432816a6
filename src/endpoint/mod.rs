//! Keyed endpoints — binding a fetch operation to a stable cache key.
//!
//! [`Endpoint::named`] attaches an explicit identifier to an operation;
//! [`Endpoint::anonymous`] generates a random one. The result is immutable:
//! it exposes the identifier, derives composite cache keys from call
//! arguments, and invokes the wrapped operation. It owns no cache — the
//! backends in [`crate::cache`] consume endpoints and do the storing.
//!
//! ```
//! use keyfetch::Endpoint;
//!
//! let get_user = Endpoint::named("getUser", |(id,): (u64,)| async move {
//!     Ok::<_, std::io::Error>(format!("user-{id}"))
//! })
//! .unwrap();
//!
//! let key = get_user.derive_key((42,));
//! assert_eq!(key.identifier().as_str(), "getUser");
//! assert_eq!(key.args(), &(42,));
//! ```

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

use tracing::debug;

use crate::key::{BindError, CacheKey, Identifier, IdentifierSource, KeyArgs, UuidSource};

/// An opaque async fetch or mutation operation over the argument tuple `A`.
///
/// Blanket-implemented for every `Fn(A) -> impl Future<Output = Result<T, E>>`,
/// so plain async closures satisfy it without any wrapper type. The trait is
/// the seam that keeps [`Endpoint`] and the cache backends generic over
/// whatever callable the caller brings.
pub trait Operation<A>: Send + Sync {
    /// Successful result of the operation.
    type Output;
    /// Failure produced by the operation; passed through the library untouched.
    type Error: Send + Sync + 'static;
    /// Future returned by a single invocation.
    type Future: Future<Output = Result<Self::Output, Self::Error>> + Send;

    /// Starts one invocation with the given arguments.
    fn invoke(&self, args: A) -> Self::Future;
}

impl<A, F, Fut, T, E> Operation<A> for F
where
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
    E: Send + Sync + 'static,
{
    type Output = T;
    type Error = E;
    type Future = Fut;

    fn invoke(&self, args: A) -> Fut {
        self(args)
    }
}

/// An operation bound to a stable cache identifier.
///
/// Created once, synchronously, by [`Endpoint::named`] or
/// [`Endpoint::anonymous`]; immutable thereafter. Binding attaches metadata
/// only — the operation itself is never copied, wrapped, or invoked during
/// construction, and [`derive_key`](Endpoint::derive_key) never invokes it
/// either.
///
/// There is no process-wide registry: nothing stops two endpoints from
/// sharing an identifier. Shared identifiers alias cache namespaces — see
/// [`Identifier`] for when that is a bug and when it is the point.
pub struct Endpoint<A, Op> {
    identifier: Identifier,
    op: Op,
    _args: PhantomData<fn(A) -> A>,
}

impl<A, Op> Endpoint<A, Op>
where
    A: KeyArgs,
    Op: Operation<A>,
{
    /// Binds `op` under an explicit identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::InvalidBindingArguments`] if the identifier is
    /// empty. Binding failures are immediate and synchronous — a malformed
    /// binding is a programming error, not a transient condition.
    pub fn named(identifier: impl Into<String>, op: Op) -> Result<Self, BindError> {
        let identifier = Identifier::new(identifier)?;
        Ok(Self {
            identifier,
            op,
            _args: PhantomData,
        })
    }

    /// Binds `op` under a freshly generated random identifier.
    ///
    /// Consumes entropy from the process-wide random source once; this is
    /// the only side effect of binding.
    pub fn anonymous(op: Op) -> Self {
        Self::anonymous_with(&UuidSource, op)
    }

    /// Binds `op` under an identifier drawn from `source`.
    ///
    /// Exists so tests and embedders can supply deterministic identifiers.
    pub fn anonymous_with<S: IdentifierSource>(source: &S, op: Op) -> Self {
        let identifier = source.generate();
        debug!(identifier = %identifier, "bound anonymous endpoint");
        Self {
            identifier,
            op,
            _args: PhantomData,
        }
    }

    /// The identifier this endpoint was bound under. Read-only.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Derives the composite cache key for a concrete argument tuple.
    ///
    /// Pure: the identifier comes first, the arguments follow in call order,
    /// and the operation is never invoked. Structurally equal arguments
    /// always produce structurally equal keys.
    pub fn derive_key(&self, args: A) -> CacheKey<A> {
        CacheKey::new(self.identifier.clone(), args)
    }

    /// Invokes the wrapped operation.
    ///
    /// # Errors
    ///
    /// Whatever the operation fails with, unchanged — the endpoint adds no
    /// translation, wrapping, or suppression.
    pub async fn call(&self, args: A) -> Result<Op::Output, Op::Error> {
        self.op.invoke(args).await
    }
}

impl<A, Op: Clone> Clone for Endpoint<A, Op> {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            op: self.op.clone(),
            _args: PhantomData,
        }
    }
}

impl<A, Op> fmt::Debug for Endpoint<A, Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("identifier", &self.identifier)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource(&'static str);

    impl IdentifierSource for FixedSource {
        fn generate(&self) -> Identifier {
            Identifier::new(self.0).unwrap()
        }
    }

    fn fetch_user(args: (u64,)) -> impl Future<Output = Result<String, Infallible>> + Send {
        async move { Ok(format!("user-{}", args.0)) }
    }

    #[test]
    fn named_keeps_the_given_identifier() {
        let ep = Endpoint::named("getUser", fetch_user).unwrap();
        assert_eq!(ep.identifier().as_str(), "getUser");
    }

    #[test]
    fn named_rejects_empty_identifier() {
        let err = Endpoint::named("", fetch_user).unwrap_err();
        assert!(matches!(err, BindError::InvalidBindingArguments(_)));
    }

    #[test]
    fn anonymous_identifiers_are_fresh_per_bind() {
        let a = Endpoint::anonymous(fetch_user);
        let b = Endpoint::anonymous(fetch_user);
        assert!(!a.identifier().as_str().is_empty());
        assert_ne!(a.identifier(), b.identifier());
    }

    #[test]
    fn anonymous_with_uses_the_injected_source() {
        let ep = Endpoint::anonymous_with(&FixedSource("fixed-id"), fetch_user);
        assert_eq!(ep.identifier().as_str(), "fixed-id");
    }

    #[test]
    fn derive_key_puts_identifier_first_then_args() {
        let ep = Endpoint::named("getUser", fetch_user).unwrap();
        let key = ep.derive_key((42,));
        assert_eq!(
            key,
            CacheKey::new(Identifier::new("getUser").unwrap(), (42,))
        );
    }

    #[test]
    fn derive_key_is_idempotent() {
        let ep = Endpoint::anonymous(|args: (u32, u32)| async move {
            Ok::<_, Infallible>(args.0 + args.1)
        });
        assert_eq!(ep.derive_key((1, 20)), ep.derive_key((1, 20)));
        assert_eq!(ep.derive_key((1, 20)).identifier(), ep.identifier());
    }

    #[test]
    fn derive_key_never_invokes_the_operation() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let ep = Endpoint::named("counted", |(): ()| async {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        })
        .unwrap();
        let _ = ep.derive_key(());
        let _ = ep.derive_key(());
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn call_forwards_args_and_output() {
        let ep = Endpoint::named("getUser", fetch_user).unwrap();
        assert_eq!(ep.call((42,)).await.unwrap(), "user-42");
    }

    #[tokio::test]
    async fn call_passes_errors_through_untouched() {
        let ep = Endpoint::named("failing", |(): ()| async {
            Err::<(), &str>("backend unavailable")
        })
        .unwrap();
        assert_eq!(ep.call(()).await.unwrap_err(), "backend unavailable");
    }
}
