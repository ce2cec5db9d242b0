//! Breadth-synchronous resolution

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use std::sync::Arc;

use super::ExecutionStrategy;
use crate::core::ExecutionError;
use crate::execution::helper::complete_field;
use crate::execution::{
    ExecutionContext, ExecutionResultNode, ExecutionStepInfo, ExecutionStrategyUtil,
    FieldSubSelection, MergedField, NodeMultiZipper, NodeRef, ResolvedObjectNode, RootNode,
    join_ordered,
};

/// Fields of one query shape selected on one object type, across a frontier
struct FieldGroup {
    merged_field: MergedField,
    members: Vec<GroupMember>,
}

/// One occurrence of a grouped field
#[derive(Clone)]
struct GroupMember {
    /// Index of the frontier object selecting the field
    object: usize,
    /// Position of the field among the object's children
    slot: usize,
    step_info: Arc<ExecutionStepInfo>,
}

/// Resolves the whole unresolved frontier of the tree round by round
///
/// Every round collects all unresolved objects, groups their fields by query
/// shape and object type, fetches each group with one call to
/// [`ValueFetcher::fetch_batched_values`](crate::execution::ValueFetcher::fetch_batched_values),
/// and splices the resolved objects back with a single rebuild. A batched
/// fetcher is therefore called once per group and round instead of once per
/// object.
///
/// Fetcher calls of one round share the configured concurrency limit; a
/// batch counts as one call. The fields of a mutation are resolved one after
/// another, each with its whole sub-tree, before the next one is fetched.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchedExecutionStrategy {
    util: ExecutionStrategyUtil,
}

impl BatchedExecutionStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every object of the frontier and return the new root
    async fn resolve_frontier(
        &self,
        context: &Arc<ExecutionContext>,
        frontier: &NodeMultiZipper,
    ) -> Result<NodeRef, ExecutionError> {
        let helper = self.util.helper();

        let mut sub_selections = Vec::with_capacity(frontier.len());
        let mut resolved_values = Vec::with_capacity(frontier.len());
        for zipper in frontier.zippers() {
            let ExecutionResultNode::UnresolvedObject(unresolved) = zipper.current().as_ref() else {
                unreachable!("the frontier only holds unresolved objects");
            };
            sub_selections.push(helper.create_field_sub_selection(
                context,
                &unresolved.step_info,
                &unresolved.resolved_value,
            )?);
            resolved_values.push(unresolved.resolved_value.clone());
        }

        let mut groups: IndexMap<(String, Vec<(usize, usize)>), FieldGroup> = IndexMap::new();
        let mut children: Vec<Vec<Option<NodeRef>>> = Vec::with_capacity(sub_selections.len());
        for (object, sub_selection) in sub_selections.iter().enumerate() {
            let object_type = sub_selection.step_info.field_type().named_type();
            let mut slot = 0;
            for (_, merged_field) in sub_selection.merged_selection_set.iter() {
                let Some(step_info) =
                    helper.new_field_step(context, &sub_selection.step_info, merged_field)
                else {
                    continue;
                };
                groups
                    .entry((object_type.to_string(), merged_field.shape()))
                    .or_insert_with(|| FieldGroup {
                        merged_field: merged_field.clone(),
                        members: Vec::new(),
                    })
                    .members
                    .push(GroupMember {
                        object,
                        slot,
                        step_info,
                    });
                slot += 1;
            }
            children.push(vec![None; slot]);
        }

        let mut calls: Vec<BoxFuture<'_, Result<Vec<(GroupMember, NodeRef)>, ExecutionError>>> =
            Vec::new();
        for group in groups.values() {
            let batched = group.members.first().is_some_and(|member| {
                self.util
                    .value_fetcher()
                    .is_batched(context, &member.step_info, &group.merged_field)
            });
            if batched {
                calls.push(
                    self.fetch_members(context, &group.merged_field, &group.members, &sub_selections)
                        .boxed(),
                );
            } else {
                calls.extend(group.members.chunks(1).map(|member| {
                    self.fetch_members(context, &group.merged_field, member, &sub_selections)
                        .boxed()
                }));
            }
        }
        let fetched = join_ordered(calls, context.config().fetch_limit()).await?;

        for (member, node) in fetched.into_iter().flatten() {
            children[member.object][member.slot] = Some(node);
        }

        let resolved = sub_selections
            .into_iter()
            .zip(resolved_values)
            .zip(children)
            .map(|((sub_selection, resolved_value), children)| {
                Arc::new(ExecutionResultNode::ResolvedObject(ResolvedObjectNode {
                    step_info: sub_selection.step_info,
                    resolved_value,
                    children: children.into_iter().flatten().collect(),
                }))
            })
            .collect();

        Ok(frontier.with_replaced_zippers(resolved).to_root_node())
    }

    /// Fetch a field for some members of a group with one call to the value
    /// fetcher and build a node per member, in member order
    async fn fetch_members(
        &self,
        context: &Arc<ExecutionContext>,
        merged_field: &MergedField,
        members: &[GroupMember],
        sub_selections: &[FieldSubSelection],
    ) -> Result<Vec<(GroupMember, NodeRef)>, ExecutionError> {
        let instrumentations: Vec<_> = members
            .iter()
            .map(|member| {
                context
                    .instrumentation()
                    .begin_field(&member.step_info, context.instrumentation_state())
            })
            .collect();
        let sources = members
            .iter()
            .map(|member| {
                let sub_selection = &sub_selections[member.object];
                (sub_selection.source.clone(), sub_selection.local_context.clone())
            })
            .collect();
        let step_infos: Vec<_> = members
            .iter()
            .map(|member| member.step_info.clone())
            .collect();

        let fetched = match self
            .util
            .value_fetcher()
            .fetch_batched_values(context, sources, merged_field, &step_infos)
            .await
        {
            Ok(fetched) => fetched,
            Err(error) => {
                for instrumentation in instrumentations {
                    complete_field(instrumentation, Err(&error));
                }
                return Err(error);
            }
        };

        Ok(fetched
            .into_iter()
            .zip(members)
            .zip(instrumentations)
            .map(|((value, member), instrumentation)| {
                let node = self
                    .util
                    .complete_value(context, value, member.step_info.clone());
                complete_field(instrumentation, Ok(Some(&node)));
                (member.clone(), node)
            })
            .collect())
    }

    /// Run fetching rounds until `tree` has no unresolved object left
    async fn resolve_tree(
        &self,
        context: &Arc<ExecutionContext>,
        mut tree: NodeRef,
    ) -> Result<NodeRef, ExecutionError> {
        let mut round = 0usize;
        loop {
            context.check_cancelled()?;
            let frontier = NodeMultiZipper::focus(&tree, ExecutionResultNode::is_unresolved);
            if frontier.is_empty() {
                return Ok(tree);
            }
            round += 1;
            tracing::debug!(
                execution_id = %context.execution_id(),
                round,
                frontier = frontier.len(),
                "Resolving frontier"
            );
            tree = self.resolve_frontier(context, &frontier).await?;
        }
    }
}

fn root_node(children: Vec<NodeRef>) -> NodeRef {
    Arc::new(ExecutionResultNode::Root(RootNode { children }))
}

#[async_trait]
impl ExecutionStrategy for BatchedExecutionStrategy {
    async fn execute(
        &self,
        context: Arc<ExecutionContext>,
        root: FieldSubSelection,
    ) -> Result<NodeRef, ExecutionError> {
        if !root.serial {
            let children = self.util.fetch_sub_selection(&context, &root).await?;
            return self.resolve_tree(&context, root_node(children)).await;
        }

        // each mutation field is resolved in a tree of its own
        let mut children = Vec::with_capacity(root.merged_selection_set.len());
        for (_, field) in root.merged_selection_set.iter() {
            let Some(node) = self.util.fetch_field(&context, &root, field).await? else {
                continue;
            };
            let resolved = self.resolve_tree(&context, root_node(vec![node])).await?;
            children.extend(resolved.children().iter().cloned());
        }
        Ok(root_node(children))
    }
}
