//! Identifiers and cache keys — the data model every other module builds on.
//!
//! A fetch operation is cached under an ordered composite key: its
//! [`Identifier`] first, then the call arguments in declaration order. The
//! [`CacheKey`] type carries that pair with full structural equality and
//! hashing, so any map- or cache-like backend can index on it directly.
//!
//! ## Core types
//!
//! - [`Identifier`] — non-empty string naming an operation's cache namespace.
//! - [`IdentifierSource`] — pluggable generator for anonymous identifiers;
//!   [`UuidSource`] (UUID v4) is the default.
//! - [`KeyArgs`] — marker trait for argument tuples usable as key components.
//! - [`CacheKey`] — the `(identifier, args...)` composite key.
//! - [`BindError`] — raised when binding arguments are malformed.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while binding an operation to an identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The binding call does not match an accepted shape. The only shape the
    /// type system cannot rule out is an empty identifier string.
    #[error("invalid binding arguments: {0}")]
    InvalidBindingArguments(&'static str),
}

/// A non-empty string naming an operation's cache namespace.
///
/// Identifiers are *not* globally unique: two endpoints may carry the same
/// identifier without any coordination. That aliases their cache namespaces,
/// which is usually a mistake — but it is also what lets a query endpoint and
/// a mutation endpoint share a namespace on purpose, so it is permitted and
/// left to the caller.
///
/// # Examples
///
/// ```
/// use keyfetch::Identifier;
///
/// let id = Identifier::new("get-user").unwrap();
/// assert_eq!(id.as_str(), "get-user");
/// assert!(Identifier::new("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Creates an identifier from an explicit string.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::InvalidBindingArguments`] if the string is empty.
    pub fn new(s: impl Into<String>) -> Result<Self, BindError> {
        let s = s.into();
        if s.is_empty() {
            return Err(BindError::InvalidBindingArguments(
                "identifier must be a non-empty string",
            ));
        }
        Ok(Self(s))
    }

    /// Generates a fresh random identifier (UUID v4, hyphenated form).
    ///
    /// Consumes entropy from the process-wide random source; safe to call
    /// concurrently.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identifier {
    type Error = BindError;

    fn try_from(s: String) -> Result<Self, BindError> {
        Identifier::new(s)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> String {
        id.0
    }
}

/// A source of fresh identifiers for anonymous bindings.
///
/// The default is [`UuidSource`]. Tests (or embedders that need reproducible
/// keys) can supply their own implementation via
/// [`Endpoint::anonymous_with`](crate::Endpoint::anonymous_with).
pub trait IdentifierSource {
    /// Produces a new identifier. Each call should return a practically
    /// unique value; collisions alias cache namespaces.
    fn generate(&self) -> Identifier;
}

/// The default [`IdentifierSource`]: random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSource;

impl IdentifierSource for UuidSource {
    fn generate(&self) -> Identifier {
        Identifier::random()
    }
}

/// Marker trait for argument tuples that can participate in a cache key.
///
/// Implemented for tuples of zero through eight elements whose members are
/// cloneable, structurally comparable, and hashable. The tuple shape makes an
/// operation's arity an explicit, statically-known property of its binding —
/// a zero-parameter operation is bound over `()`, a one-parameter operation
/// over `(T,)`, and so on. There is no runtime arity detection.
pub trait KeyArgs: Clone + PartialEq + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// Number of argument positions in this tuple.
    const ARITY: usize;
}

macro_rules! impl_key_args {
    ($count:expr $(, $name:ident)*) => {
        impl<$($name,)*> KeyArgs for ($($name,)*)
        where
            $($name: Clone + PartialEq + Eq + Hash + fmt::Debug + Send + Sync + 'static,)*
        {
            const ARITY: usize = $count;
        }
    };
}

impl_key_args!(0);
impl_key_args!(1, A1);
impl_key_args!(2, A1, A2);
impl_key_args!(3, A1, A2, A3);
impl_key_args!(4, A1, A2, A3, A4);
impl_key_args!(5, A1, A2, A3, A4, A5);
impl_key_args!(6, A1, A2, A3, A4, A5, A6);
impl_key_args!(7, A1, A2, A3, A4, A5, A6, A7);
impl_key_args!(8, A1, A2, A3, A4, A5, A6, A7, A8);

/// An ordered composite cache key: identifier first, call arguments after.
///
/// Two keys compare equal exactly when their identifiers and argument tuples
/// are structurally equal, so a `CacheKey` can index any `Hash`/`Eq`-keyed
/// cache. Construction neither copies deeply nor serializes — argument
/// values are stored as-is.
///
/// # Examples
///
/// ```
/// use keyfetch::{CacheKey, Identifier};
///
/// let id = Identifier::new("get-user").unwrap();
/// let key = CacheKey::new(id.clone(), (42u64,));
/// assert_eq!(key.identifier(), &id);
/// assert_eq!(key.args(), &(42u64,));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey<A> {
    identifier: Identifier,
    args: A,
}

impl<A: KeyArgs> CacheKey<A> {
    /// Assembles a key from an identifier and an argument tuple.
    pub fn new(identifier: Identifier, args: A) -> Self {
        Self { identifier, args }
    }

    /// The leading identifier component.
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// The argument components, in call order.
    pub fn args(&self) -> &A {
        &self.args
    }

    /// Splits the key back into its components.
    pub fn into_parts(self) -> (Identifier, A) {
        (self.identifier, self.args)
    }
}

impl<A: KeyArgs> fmt::Display for CacheKey<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.identifier, self.args)
    }
}
