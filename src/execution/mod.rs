//! Query execution
//!
//! Execution turns an operation of a parsed document into an
//! [`ExecutionResult`]. The moving parts, leaves first:
//!
//! - [`FieldCollector`] merges the fields of a selection set per result key
//! - [`ValueFetcher`] invokes data fetchers and normalizes their outcomes
//! - [`FetchedValueAnalyzer`] classifies a fetched value against its type
//! - [`ResultNodesCreator`] maps a classification to a result-tree node
//! - [`NodeMultiZipper`] splices resolved subtrees back into the tree
//! - an [`ExecutionStrategy`] drives rounds of fetching until the tree holds
//!   no unresolved object
//! - [`Execution`] composes everything for one request
//!
//! The result tree is persistent: every round produces a new root sharing
//! the untouched subtrees of the previous one.

mod context;
mod fetched_value;
pub mod field_collector;
mod helper;
mod input;
mod merged_field;
mod nodes_creator;
mod operation;
mod result;
mod result_node;
mod step_info;
pub mod strategy;
mod value_fetcher;
pub mod values;
mod zipper;

pub use context::ExecutionContext;
pub use fetched_value::{FetchedValue, FetchedValueAnalysis, FetchedValueAnalyzer, FetchedValueType};
pub use field_collector::{FieldCollector, FieldCollectorParameters};
pub use helper::{ExecutionHelper, ExecutionStrategyUtil};
pub use input::ExecutionInput;
pub use merged_field::{FieldSubSelection, MergedField, MergedSelectionSet};
pub use nodes_creator::ResultNodesCreator;
pub use operation::Execution;
pub use result::ExecutionResult;
pub use result_node::{
    ExecutionResultNode, LeafNode, ListNode, NodeRef, NonNullableFieldWasNullError,
    ResolvedObjectNode, ResolvedValue, RootNode, UnresolvedObjectNode,
};
pub use step_info::ExecutionStepInfo;
pub use strategy::{BatchedExecutionStrategy, DefaultExecutionStrategy, ExecutionStrategy};
pub use value_fetcher::ValueFetcher;
pub use zipper::{Breadcrumb, NodeMultiZipper, NodeZipper};

use futures::future::try_join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

use crate::core::ExecutionError;

/// A parsed document owning its strings
pub type AstDocument = graphql_parser::query::Document<'static, String>;
/// A field node of a parsed document
pub type AstField = graphql_parser::query::Field<'static, String>;
/// A selection set of a parsed document
pub type AstSelectionSet = graphql_parser::query::SelectionSet<'static, String>;
/// A fragment definition of a parsed document
pub type AstFragmentDefinition = graphql_parser::query::FragmentDefinition<'static, String>;
/// A variable definition of a parsed operation
pub type AstVariableDefinition = graphql_parser::query::VariableDefinition<'static, String>;

/// Await futures concurrently, keeping results in input order
///
/// With a limit, at most `limit` futures are polled at once. The first error
/// wins and the remaining futures are dropped.
pub(crate) async fn join_ordered<T, F>(
    futures: Vec<F>,
    limit: Option<usize>,
) -> Result<Vec<T>, ExecutionError>
where
    F: Future<Output = Result<T, ExecutionError>>,
{
    match limit {
        Some(limit) => stream::iter(futures).buffered(limit).try_collect().await,
        None => try_join_all(futures).await,
    }
}

/// Await futures one after another, in input order
pub(crate) async fn join_serial<T, F>(futures: Vec<F>) -> Result<Vec<T>, ExecutionError>
where
    F: Future<Output = Result<T, ExecutionError>>,
{
    let mut results = Vec::with_capacity(futures.len());
    for future in futures {
        results.push(future.await?);
    }
    Ok(results)
}
