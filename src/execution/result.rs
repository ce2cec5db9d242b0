//! The public result of an execution

use serde::Serialize;
use serde_json::{Map, Value};

use super::{ExecutionResultNode, NodeRef};
use crate::core::{ExecutionError, GraphQLError};

/// `data` and `errors` of an executed request
///
/// `data` is absent when the execution stopped before fetching anything and
/// `null` when a non-null violation reached the root.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

/// A non-null violation travelling up to the nearest nullable ancestor
struct NullBubble;

impl ExecutionResult {
    /// A result without data carrying one error
    pub fn from_error(error: &ExecutionError) -> Self {
        Self {
            data: None,
            errors: vec![error.to_graphql_error()],
        }
    }

    /// Flatten a fully resolved tree
    ///
    /// Non-null violations null their nearest nullable ancestor; errors are
    /// listed in tree order, including those of discarded subtrees.
    pub fn from_root_node(root: &NodeRef) -> Self {
        let mut errors = Vec::new();
        let data = match complete_node(root, &mut errors) {
            Ok(data) => data,
            Err(NullBubble) => Value::Null,
        };
        Self {
            data: Some(data),
            errors,
        }
    }

    /// The `{ "data": .., "errors": [..] }` map of the response format
    pub fn to_specification(&self) -> Value {
        let mut map = Map::new();
        if let Some(data) = &self.data {
            map.insert("data".to_string(), data.clone());
        }
        if !self.errors.is_empty() {
            map.insert(
                "errors".to_string(),
                Value::Array(self.errors.iter().map(GraphQLError::to_specification).collect()),
            );
        }
        Value::Object(map)
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

fn complete_node(node: &ExecutionResultNode, errors: &mut Vec<GraphQLError>) -> Result<Value, NullBubble> {
    if let Some(resolved_value) = node.resolved_value() {
        errors.extend(resolved_value.errors.iter().cloned());
    }

    match node {
        ExecutionResultNode::Root(root) => complete_object(&root.children, errors),
        ExecutionResultNode::ResolvedObject(object) => {
            nullable_or_bubble(complete_object(&object.children, errors), node)
        }
        ExecutionResultNode::List(list) => {
            let mut items = Vec::with_capacity(list.children.len());
            let mut bubbled = false;
            for child in &list.children {
                match complete_node(child, errors) {
                    Ok(item) => items.push(item),
                    Err(NullBubble) => bubbled = true,
                }
            }
            let completed = if bubbled { Err(NullBubble) } else { Ok(Value::Array(items)) };
            nullable_or_bubble(completed, node)
        }
        ExecutionResultNode::Leaf(leaf) => match &leaf.non_null_error {
            Some(violation) => {
                errors.push(violation.to_graphql_error());
                Err(NullBubble)
            }
            None => Ok((*leaf.resolved_value.completed_value).clone()),
        },
        ExecutionResultNode::UnresolvedObject(_) => {
            debug_assert!(false, "flattening a tree with unresolved objects");
            nullable_or_bubble(Ok(Value::Null), node)
        }
    }
}

fn complete_object(children: &[NodeRef], errors: &mut Vec<GraphQLError>) -> Result<Value, NullBubble> {
    let mut fields = Map::new();
    let mut bubbled = false;
    for child in children {
        let key = child
            .step_info()
            .and_then(|step| step.result_key())
            .unwrap_or_default()
            .to_string();
        match complete_node(child, errors) {
            Ok(value) => {
                fields.insert(key, value);
            }
            Err(NullBubble) => bubbled = true,
        }
    }
    if bubbled { Err(NullBubble) } else { Ok(Value::Object(fields)) }
}

/// Absorb a bubbling violation unless `node` is itself non-null
fn nullable_or_bubble(
    completed: Result<Value, NullBubble>,
    node: &ExecutionResultNode,
) -> Result<Value, NullBubble> {
    match completed {
        Ok(value) => Ok(value),
        Err(NullBubble) => {
            let non_null = node
                .step_info()
                .is_some_and(|step| step.field_type().is_non_null());
            if non_null { Err(NullBubble) } else { Ok(Value::Null) }
        }
    }
}
