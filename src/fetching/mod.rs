//! Data fetching capabilities
//!
//! A [`DataFetcher`] produces the raw value of one field. It is registered
//! per `(parent type, field)` in the schema's
//! [`CodeRegistry`](crate::schema::CodeRegistry) and invoked by the engine's
//! value fetcher with a [`DataFetchingEnvironment`].
//!
//! A fetcher may answer:
//! - immediately, with a JSON value ([`DataFetcherValue::Value`]),
//! - with a structured result carrying errors and a local context override
//!   ([`DataFetcherValue::Result`]),
//! - later, with a future resolving to either of the above
//!   ([`DataFetcherValue::Future`]).
//!
//! Returning `Err` (or panicking) is never fatal: the engine turns it into a
//! field error at the fetched field's path.
//!
//! # Example
//!
//! ```rust,ignore
//! let items = data_fetcher(|env| {
//!     let limit = env.argument("limit").and_then(|v| v.as_u64()).unwrap_or(10);
//!     Ok(DataFetcherValue::future(async move {
//!         let rows = load_items(limit).await?;
//!         Ok(DataFetcherValue::from(rows))
//!     }))
//! });
//! ```

mod environment;
mod property;
mod type_resolver;

pub use environment::{DataFetchingEnvironment, LazyArguments};
pub use property::PropertyDataFetcher;
pub use type_resolver::{
    TypeResolutionEnvironment, TypeResolver, TypeResolverFn, TypenameTypeResolver,
    type_resolver,
};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;

use crate::core::{GraphQLError, LocalContext};

/// What a data fetcher hands back to the engine
pub enum DataFetcherValue {
    /// A value available right away (including `null`)
    Value(Value),
    /// A value with errors and an optional local context override
    Result(DataFetcherResult),
    /// A value that will be available later
    Future(BoxFuture<'static, anyhow::Result<DataFetcherValue>>),
}

impl DataFetcherValue {
    /// An immediate value
    pub fn ready(value: impl Into<Value>) -> Self {
        DataFetcherValue::Value(value.into())
    }

    /// An immediate `null`
    pub fn null() -> Self {
        DataFetcherValue::Value(Value::Null)
    }

    /// A deferred value
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<DataFetcherValue>> + Send + 'static,
    {
        DataFetcherValue::Future(future.boxed())
    }
}

impl From<Value> for DataFetcherValue {
    fn from(value: Value) -> Self {
        DataFetcherValue::Value(value)
    }
}

impl From<DataFetcherResult> for DataFetcherValue {
    fn from(result: DataFetcherResult) -> Self {
        DataFetcherValue::Result(result)
    }
}

impl std::fmt::Debug for DataFetcherValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFetcherValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DataFetcherValue::Result(result) => f.debug_tuple("Result").field(result).finish(),
            DataFetcherValue::Future(_) => f.write_str("Future(..)"),
        }
    }
}

/// A fetched value together with errors and a local context override
///
/// The override replaces the local context inherited by the field's
/// descendants only when it is set.
#[derive(Debug, Clone, Default)]
pub struct DataFetcherResult {
    pub data: Value,
    pub errors: Vec<GraphQLError>,
    pub local_context: Option<LocalContext>,
}

impl DataFetcherResult {
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Add a field error
    pub fn with_error(mut self, error: GraphQLError) -> Self {
        self.errors.push(error);
        self
    }

    /// Override the local context seen by the field's descendants
    pub fn with_local_context(mut self, local_context: LocalContext) -> Self {
        self.local_context = Some(local_context);
        self
    }
}

/// Produces the value of one field
pub trait DataFetcher: Send + Sync {
    /// Fetch the value for the environment's source
    ///
    /// For batched fetchers the environment's source is a JSON array holding
    /// every source of the batch, and the fetched value must be an array of
    /// the same length.
    fn get(&self, env: &DataFetchingEnvironment) -> anyhow::Result<DataFetcherValue>;

    /// Whether this fetcher accepts a whole batch of sources at once
    fn is_batched(&self) -> bool {
        false
    }
}

/// A [`DataFetcher`] backed by a closure
pub struct DataFetcherFn<F> {
    f: F,
    batched: bool,
}

impl<F> DataFetcher for DataFetcherFn<F>
where
    F: Fn(&DataFetchingEnvironment) -> anyhow::Result<DataFetcherValue> + Send + Sync,
{
    fn get(&self, env: &DataFetchingEnvironment) -> anyhow::Result<DataFetcherValue> {
        (self.f)(env)
    }

    fn is_batched(&self) -> bool {
        self.batched
    }
}

/// Wrap a closure as a data fetcher
pub fn data_fetcher<F>(f: F) -> DataFetcherFn<F>
where
    F: Fn(&DataFetchingEnvironment) -> anyhow::Result<DataFetcherValue> + Send + Sync,
{
    DataFetcherFn { f, batched: false }
}

/// Wrap a closure as a batched data fetcher
///
/// The closure receives every source of the batch as a JSON array in
/// [`DataFetchingEnvironment::source`] and must answer with an array of the
/// same length.
pub fn batched_data_fetcher<F>(f: F) -> DataFetcherFn<F>
where
    F: Fn(&DataFetchingEnvironment) -> anyhow::Result<DataFetcherValue> + Send + Sync,
{
    DataFetcherFn { f, batched: true }
}
