//! Mapping classified values to result nodes

use std::sync::Arc;

use super::{
    ExecutionResultNode, FetchedValueAnalysis, FetchedValueType, LeafNode, ListNode, NodeRef,
    NonNullableFieldWasNullError, ResolvedValue, UnresolvedObjectNode,
};

/// Builds the result node of a classified value
///
/// Pure and total: every analysis maps to exactly one of an unresolved
/// object, a list or a leaf.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultNodesCreator;

impl ResultNodesCreator {
    pub fn new() -> Self {
        Self
    }

    pub fn create_result_node(&self, analysis: FetchedValueAnalysis) -> NodeRef {
        let FetchedValueAnalysis {
            value_type,
            completed_value,
            null_value,
            errors,
            children,
            step_info,
            local_context,
            ..
        } = analysis;
        let resolved_value = ResolvedValue {
            completed_value,
            local_context,
            null_value,
            errors,
        };

        if null_value {
            let non_null_error = step_info
                .field_type()
                .is_non_null()
                .then(|| NonNullableFieldWasNullError::new(&step_info));
            return Arc::new(ExecutionResultNode::Leaf(LeafNode {
                step_info,
                resolved_value,
                non_null_error,
            }));
        }

        let node = match value_type {
            FetchedValueType::Object => ExecutionResultNode::UnresolvedObject(UnresolvedObjectNode {
                step_info,
                resolved_value,
            }),
            FetchedValueType::List => ExecutionResultNode::List(ListNode {
                step_info,
                resolved_value,
                children: children
                    .into_iter()
                    .map(|child| self.create_result_node(child))
                    .collect(),
            }),
            FetchedValueType::Scalar | FetchedValueType::Enum => {
                ExecutionResultNode::Leaf(LeafNode {
                    step_info,
                    resolved_value,
                    non_null_error: None,
                })
            }
        };
        Arc::new(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionStepInfo;
    use crate::schema::TypeRef;
    use serde_json::{Value, json};

    fn analysis(
        value_type: FetchedValueType,
        value: Value,
        field_type: TypeRef,
        children: Vec<FetchedValueAnalysis>,
    ) -> FetchedValueAnalysis {
        let root = Arc::new(ExecutionStepInfo::root("Query"));
        let step = Arc::new(root.for_list_item(0, field_type));
        FetchedValueAnalysis {
            value_type,
            null_value: value.is_null(),
            completed_value: Arc::new(value),
            resolved_type: None,
            errors: vec![],
            children,
            step_info: step,
            local_context: None,
        }
    }

    #[test]
    fn test_null_on_non_null_type_carries_violation() {
        let node = ResultNodesCreator::new().create_result_node(analysis(
            FetchedValueType::Object,
            Value::Null,
            TypeRef::non_null(TypeRef::named("Query")),
            vec![],
        ));
        match node.as_ref() {
            ExecutionResultNode::Leaf(leaf) => assert!(leaf.non_null_error.is_some()),
            other => panic!("expected a leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_null_on_nullable_type_is_plain_leaf() {
        let node = ResultNodesCreator::new().create_result_node(analysis(
            FetchedValueType::Scalar,
            Value::Null,
            TypeRef::named("Int"),
            vec![],
        ));
        match node.as_ref() {
            ExecutionResultNode::Leaf(leaf) => {
                assert!(leaf.non_null_error.is_none());
                assert!(leaf.resolved_value.null_value);
            }
            other => panic!("expected a leaf, got {other:?}"),
        }
    }

    #[test]
    fn test_every_classification_maps_to_one_node_kind() {
        let creator = ResultNodesCreator::new();
        let object = creator.create_result_node(analysis(
            FetchedValueType::Object,
            json!({ "id": 1 }),
            TypeRef::named("Item"),
            vec![],
        ));
        assert!(object.is_unresolved());

        let scalar = creator.create_result_node(analysis(
            FetchedValueType::Scalar,
            json!(3),
            TypeRef::named("Int"),
            vec![],
        ));
        assert!(matches!(scalar.as_ref(), ExecutionResultNode::Leaf(_)));

        let enumeration = creator.create_result_node(analysis(
            FetchedValueType::Enum,
            json!("ASC"),
            TypeRef::named("Order"),
            vec![],
        ));
        assert!(matches!(enumeration.as_ref(), ExecutionResultNode::Leaf(_)));

        let list = creator.create_result_node(analysis(
            FetchedValueType::List,
            json!([1, null]),
            TypeRef::list(TypeRef::named("Int")),
            vec![
                analysis(FetchedValueType::Scalar, json!(1), TypeRef::named("Int"), vec![]),
                analysis(FetchedValueType::Scalar, Value::Null, TypeRef::named("Int"), vec![]),
            ],
        ));
        match list.as_ref() {
            ExecutionResultNode::List(node) => assert_eq!(node.children.len(), 2),
            other => panic!("expected a list, got {other:?}"),
        }
    }
}
