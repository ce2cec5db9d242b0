//! Opaque, caller-owned context objects
//!
//! The engine threads two kinds of context through an execution without
//! looking inside them: the per-request GraphQL context and the local
//! context that a data fetcher can hand down to the fields below it.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased value supplied by the caller
#[derive(Clone)]
pub struct OpaqueContext(Arc<dyn Any + Send + Sync>);

/// Per-request context visible to every data fetcher
pub type GraphQLContext = OpaqueContext;

/// Context inherited by a field's descendants unless a fetcher overrides it
pub type LocalContext = OpaqueContext;

impl OpaqueContext {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc(value: Arc<dyn Any + Send + Sync>) -> Self {
        Self(value)
    }

    /// Borrow the inner value if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both handles point at the same value
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for OpaqueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OpaqueContext(..)")
    }
}
