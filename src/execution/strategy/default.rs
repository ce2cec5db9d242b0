//! Depth-first resolution

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;

use super::ExecutionStrategy;
use crate::core::ExecutionError;
use crate::execution::{
    ExecutionContext, ExecutionResultNode, ExecutionStrategyUtil, FieldSubSelection, ListNode,
    NodeRef, ResolvedObjectNode, RootNode, join_ordered, join_serial,
};

/// Resolves each object as soon as its value is known
///
/// Siblings under one parent are fetched concurrently; every object among
/// them then resolves its own sub-selection recursively, so different depths
/// of the tree interleave freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExecutionStrategy {
    util: ExecutionStrategyUtil,
}

impl DefaultExecutionStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the fields of `sub_selection` and resolve each of them fully
    async fn resolve_sub_selection(
        &self,
        context: &Arc<ExecutionContext>,
        sub_selection: &FieldSubSelection,
    ) -> Result<Vec<NodeRef>, ExecutionError> {
        let resolutions: Vec<_> = sub_selection
            .merged_selection_set
            .iter()
            .map(|(_, field)| async move {
                match self.util.fetch_field(context, sub_selection, field).await? {
                    Some(node) => self.resolve_node(context, node).await.map(Some),
                    None => Ok(None),
                }
            })
            .collect();

        let nodes = if sub_selection.serial {
            join_serial(resolutions).await?
        } else {
            join_ordered(resolutions, context.config().fetch_limit()).await?
        };
        Ok(nodes.into_iter().flatten().collect())
    }

    /// Replace every unresolved object at or below `node`
    fn resolve_node<'a>(
        &'a self,
        context: &'a Arc<ExecutionContext>,
        node: NodeRef,
    ) -> BoxFuture<'a, Result<NodeRef, ExecutionError>> {
        async move {
            match node.as_ref() {
                ExecutionResultNode::UnresolvedObject(unresolved) => {
                    let sub_selection = self.util.helper().create_field_sub_selection(
                        context,
                        &unresolved.step_info,
                        &unresolved.resolved_value,
                    )?;
                    let children = self.resolve_sub_selection(context, &sub_selection).await?;
                    Ok(Arc::new(ExecutionResultNode::ResolvedObject(ResolvedObjectNode {
                        step_info: sub_selection.step_info,
                        resolved_value: unresolved.resolved_value.clone(),
                        children,
                    })))
                }
                ExecutionResultNode::List(list) if !node.is_fully_resolved() => {
                    let items = list
                        .children
                        .iter()
                        .map(|child| self.resolve_node(context, child.clone()))
                        .collect();
                    let children = join_ordered(items, context.config().fetch_limit()).await?;
                    Ok(Arc::new(ExecutionResultNode::List(ListNode {
                        children,
                        ..list.clone()
                    })))
                }
                _ => Ok(node),
            }
        }
        .boxed()
    }
}

#[async_trait]
impl ExecutionStrategy for DefaultExecutionStrategy {
    async fn execute(
        &self,
        context: Arc<ExecutionContext>,
        root: FieldSubSelection,
    ) -> Result<NodeRef, ExecutionError> {
        tracing::debug!(
            execution_id = %context.execution_id(),
            fields = root.merged_selection_set.len(),
            "Resolving depth-first"
        );
        let children = self.resolve_sub_selection(&context, &root).await?;
        Ok(Arc::new(ExecutionResultNode::Root(RootNode { children })))
    }
}
