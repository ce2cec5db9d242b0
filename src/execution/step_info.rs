//! Positions in the query

use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};

use super::MergedField;
use crate::core::ResultPath;
use crate::fetching::LazyArguments;
use crate::schema::{FieldDefinition, TypeRef};

static NO_ARGUMENTS: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

/// One position of the query: a field or a list element
///
/// Immutable once created. A step points at its parent step but never owns
/// its children.
#[derive(Debug, Clone)]
pub struct ExecutionStepInfo {
    field_type: TypeRef,
    path: ResultPath,
    field: Option<MergedField>,
    field_definition: Option<Arc<FieldDefinition>>,
    field_container: Option<String>,
    parent: Option<Arc<ExecutionStepInfo>>,
    arguments: Option<Arc<LazyArguments>>,
}

impl ExecutionStepInfo {
    /// Step of the operation's root object
    pub fn root(root_type: &str) -> Self {
        Self {
            field_type: TypeRef::non_null(TypeRef::named(root_type)),
            path: ResultPath::root(),
            field: None,
            field_definition: None,
            field_container: None,
            parent: None,
            arguments: None,
        }
    }

    /// Step of a field selected on the object described by `parent`
    pub fn for_field(
        parent: &Arc<ExecutionStepInfo>,
        field_container: &str,
        field_definition: Option<Arc<FieldDefinition>>,
        field: MergedField,
        field_type: TypeRef,
        arguments: Arc<LazyArguments>,
    ) -> Self {
        Self {
            path: parent.path.segment(field.result_key()),
            field_type,
            field: Some(field),
            field_definition,
            field_container: Some(field_container.to_string()),
            parent: Some(parent.clone()),
            arguments: Some(arguments),
        }
    }

    /// Step of the element at `index` of the list described by `self`
    ///
    /// The element shares field, definition and arguments with the list.
    pub fn for_list_item(self: &Arc<Self>, index: usize, item_type: TypeRef) -> Self {
        Self {
            field_type: item_type,
            path: self.path.index(index),
            field: self.field.clone(),
            field_definition: self.field_definition.clone(),
            field_container: self.field_container.clone(),
            parent: Some(self.clone()),
            arguments: self.arguments.clone(),
        }
    }

    /// The same step narrowed to a concrete object type
    ///
    /// List and non-null wrappers of the declared type are kept.
    pub fn with_resolved_type(&self, object_type: &str) -> Self {
        Self {
            field_type: self.field_type.with_named_type(object_type),
            ..self.clone()
        }
    }

    pub fn field_type(&self) -> &TypeRef {
        &self.field_type
    }

    pub fn path(&self) -> &ResultPath {
        &self.path
    }

    pub fn field(&self) -> Option<&MergedField> {
        self.field.as_ref()
    }

    pub fn field_definition(&self) -> Option<&FieldDefinition> {
        self.field_definition.as_deref()
    }

    /// Object type declaring the field
    pub fn field_container(&self) -> Option<&str> {
        self.field_container.as_deref()
    }

    pub fn parent(&self) -> Option<&Arc<ExecutionStepInfo>> {
        self.parent.as_ref()
    }

    /// Argument values of the field, computed on first access
    pub fn arguments(&self) -> &Map<String, Value> {
        match &self.arguments {
            Some(arguments) => arguments.get(),
            None => &NO_ARGUMENTS,
        }
    }

    pub(crate) fn lazy_arguments(&self) -> Option<&Arc<LazyArguments>> {
        self.arguments.as_ref()
    }

    /// Result key of the field, `None` for the root
    pub fn result_key(&self) -> Option<&str> {
        self.field.as_ref().map(MergedField::result_key)
    }
}
