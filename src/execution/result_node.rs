//! The result tree
//!
//! A result tree is persistent: nodes are shared through [`NodeRef`] and
//! never modified once built. Resolving a subtree produces a new node that is
//! spliced into a new tree by a [`NodeMultiZipper`](super::NodeMultiZipper).

use serde_json::Value;
use std::sync::Arc;

use super::ExecutionStepInfo;
use crate::core::{ErrorClassification, GraphQLError, LocalContext, ResultPath, SourceLocation};

/// Shared handle to a node of the result tree
pub type NodeRef = Arc<ExecutionResultNode>;

/// The completed value of one step
#[derive(Debug, Clone)]
pub struct ResolvedValue {
    /// Serialized leaf value, list value or object source
    pub completed_value: Arc<Value>,
    /// Local context handed to the step's descendants
    pub local_context: Option<LocalContext>,
    pub null_value: bool,
    /// Errors raised while fetching and completing this step
    pub errors: Vec<GraphQLError>,
}

impl ResolvedValue {
    pub fn null() -> Self {
        Self {
            completed_value: Arc::new(Value::Null),
            local_context: None,
            null_value: true,
            errors: Vec::new(),
        }
    }
}

/// A non-null step resolved to null
#[derive(Debug, Clone, PartialEq)]
pub struct NonNullableFieldWasNullError {
    pub message: String,
    pub path: ResultPath,
    pub locations: Vec<SourceLocation>,
}

impl NonNullableFieldWasNullError {
    pub fn new(step_info: &ExecutionStepInfo) -> Self {
        let parent_type = step_info
            .parent()
            .map(|parent| parent.field_type().nullable().to_string())
            .unwrap_or_default();
        Self {
            message: format!(
                "Cannot return null for non-nullable type: '{}' within parent '{}' ({})",
                step_info.field_type().nullable(),
                parent_type,
                step_info.path()
            ),
            path: step_info.path().clone(),
            locations: step_info.field().map(|f| f.locations()).unwrap_or_default(),
        }
    }

    pub fn to_graphql_error(&self) -> GraphQLError {
        GraphQLError::new(self.message.clone(), ErrorClassification::NullValueInNonNullableField)
            .with_path(self.path.clone())
            .with_locations(self.locations.clone())
    }
}

/// Top of the tree, one child per root field
#[derive(Debug, Clone)]
pub struct RootNode {
    pub children: Vec<NodeRef>,
}

/// An object whose sub-selection has not been fetched yet
#[derive(Debug, Clone)]
pub struct UnresolvedObjectNode {
    pub step_info: Arc<ExecutionStepInfo>,
    pub resolved_value: ResolvedValue,
}

/// An object with one child per selected field
#[derive(Debug, Clone)]
pub struct ResolvedObjectNode {
    pub step_info: Arc<ExecutionStepInfo>,
    pub resolved_value: ResolvedValue,
    pub children: Vec<NodeRef>,
}

/// A list with one child per element
#[derive(Debug, Clone)]
pub struct ListNode {
    pub step_info: Arc<ExecutionStepInfo>,
    pub resolved_value: ResolvedValue,
    pub children: Vec<NodeRef>,
}

/// A scalar, enum or null value
#[derive(Debug, Clone)]
pub struct LeafNode {
    pub step_info: Arc<ExecutionStepInfo>,
    pub resolved_value: ResolvedValue,
    /// Set when the step is non-null but resolved to null
    pub non_null_error: Option<NonNullableFieldWasNullError>,
}

/// A node of the result tree
#[derive(Debug, Clone)]
pub enum ExecutionResultNode {
    Root(RootNode),
    UnresolvedObject(UnresolvedObjectNode),
    ResolvedObject(ResolvedObjectNode),
    List(ListNode),
    Leaf(LeafNode),
}

impl ExecutionResultNode {
    pub fn children(&self) -> &[NodeRef] {
        match self {
            ExecutionResultNode::Root(node) => &node.children,
            ExecutionResultNode::ResolvedObject(node) => &node.children,
            ExecutionResultNode::List(node) => &node.children,
            ExecutionResultNode::UnresolvedObject(_) | ExecutionResultNode::Leaf(_) => &[],
        }
    }

    /// A copy of this node with its children replaced
    ///
    /// Nodes without children are returned unchanged.
    pub fn with_new_children(&self, children: Vec<NodeRef>) -> ExecutionResultNode {
        match self {
            ExecutionResultNode::Root(_) => ExecutionResultNode::Root(RootNode { children }),
            ExecutionResultNode::ResolvedObject(node) => {
                ExecutionResultNode::ResolvedObject(ResolvedObjectNode {
                    children,
                    ..node.clone()
                })
            }
            ExecutionResultNode::List(node) => ExecutionResultNode::List(ListNode {
                children,
                ..node.clone()
            }),
            ExecutionResultNode::UnresolvedObject(_) | ExecutionResultNode::Leaf(_) => {
                debug_assert!(children.is_empty(), "terminal nodes have no children");
                self.clone()
            }
        }
    }

    /// Step of the node, `None` for the root
    pub fn step_info(&self) -> Option<&Arc<ExecutionStepInfo>> {
        match self {
            ExecutionResultNode::Root(_) => None,
            ExecutionResultNode::UnresolvedObject(node) => Some(&node.step_info),
            ExecutionResultNode::ResolvedObject(node) => Some(&node.step_info),
            ExecutionResultNode::List(node) => Some(&node.step_info),
            ExecutionResultNode::Leaf(node) => Some(&node.step_info),
        }
    }

    pub fn resolved_value(&self) -> Option<&ResolvedValue> {
        match self {
            ExecutionResultNode::Root(_) => None,
            ExecutionResultNode::UnresolvedObject(node) => Some(&node.resolved_value),
            ExecutionResultNode::ResolvedObject(node) => Some(&node.resolved_value),
            ExecutionResultNode::List(node) => Some(&node.resolved_value),
            ExecutionResultNode::Leaf(node) => Some(&node.resolved_value),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ExecutionResultNode::UnresolvedObject(_))
    }

    /// Whether no unresolved object is left below (and including) this node
    pub fn is_fully_resolved(&self) -> bool {
        !self.is_unresolved() && self.children().iter().all(|child| child.is_fully_resolved())
    }
}
