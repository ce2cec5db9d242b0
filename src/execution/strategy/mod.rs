//! Resolution algorithms
//!
//! A strategy takes the root sub-selection of an operation and returns a
//! fully resolved [`RootNode`](super::RootNode). Both strategies produce the
//! same data and errors for the same inputs when no batched fetcher is
//! registered; they differ only in how fetches are scheduled.

mod batched;
mod default;

pub use batched::BatchedExecutionStrategy;
pub use default::DefaultExecutionStrategy;

use async_trait::async_trait;
use std::sync::Arc;

use super::{ExecutionContext, FieldSubSelection, NodeRef};
use crate::config::StrategyKind;
use crate::core::ExecutionError;

/// Drives fetching rounds until no unresolved object is left
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Resolve the operation's root sub-selection into a root node
    ///
    /// # Errors
    ///
    /// `Cancelled`, `BatchSizeMismatch` and `UnresolvedType` abort the
    /// execution. Field failures are recorded in the tree instead.
    async fn execute(
        &self,
        context: Arc<ExecutionContext>,
        root: FieldSubSelection,
    ) -> Result<NodeRef, ExecutionError>;
}

/// The strategy configured by `kind`
pub fn strategy_for(kind: StrategyKind) -> Arc<dyn ExecutionStrategy> {
    match kind {
        StrategyKind::Default => Arc::new(DefaultExecutionStrategy::new()),
        StrategyKind::Batched => Arc::new(BatchedExecutionStrategy::new()),
    }
}
