//! Fetched values and their classification

use serde_json::Value;
use std::sync::Arc;

use super::{ExecutionContext, ExecutionStepInfo};
use crate::core::value::serialize_scalar;
use crate::core::{ErrorClassification, GraphQLError, LocalContext};
use crate::fetching::TypeResolutionEnvironment;
use crate::schema::{TypeDefinition, TypeRef};

/// Raw outcome of fetching one field for one source
#[derive(Debug, Clone)]
pub struct FetchedValue {
    pub value: Value,
    /// Local context for the field's descendants, override applied
    pub local_context: Option<LocalContext>,
    /// Errors raised while fetching
    pub errors: Vec<GraphQLError>,
}

impl FetchedValue {
    pub fn new(value: Value, local_context: Option<LocalContext>) -> Self {
        Self {
            value,
            local_context,
            errors: Vec::new(),
        }
    }
}

/// What kind of result a fetched value completes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchedValueType {
    Object,
    List,
    Scalar,
    Enum,
}

/// A fetched value classified against the declared type of its step
#[derive(Debug, Clone)]
pub struct FetchedValueAnalysis {
    pub value_type: FetchedValueType,
    /// Serialized leaf value, the list value or the object source
    pub completed_value: Arc<Value>,
    pub null_value: bool,
    /// Concrete object type, objects only
    pub resolved_type: Option<String>,
    /// Fetch errors first, then completion errors of this step
    pub errors: Vec<GraphQLError>,
    /// One analysis per element, lists only
    pub children: Vec<FetchedValueAnalysis>,
    /// Step of the value, narrowed to the concrete type for objects
    pub step_info: Arc<ExecutionStepInfo>,
    pub local_context: Option<LocalContext>,
}

/// Classifies fetched values
///
/// Leaf values are serialized, lists are analyzed element by element and
/// interface or union values are narrowed to an object type. A value that
/// cannot be completed yields a `BadValue` or `UnresolvedType` field error
/// and is treated as `null` from then on. Non-null violations are left to
/// the [`ResultNodesCreator`](super::ResultNodesCreator).
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchedValueAnalyzer;

impl FetchedValueAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze(
        &self,
        context: &ExecutionContext,
        fetched: FetchedValue,
        step_info: Arc<ExecutionStepInfo>,
    ) -> FetchedValueAnalysis {
        let FetchedValue {
            value,
            local_context,
            mut errors,
        } = fetched;
        let mut analysis = self.analyze_value(context, value, step_info, local_context);
        errors.append(&mut analysis.errors);
        analysis.errors = errors;
        analysis
    }

    fn analyze_value(
        &self,
        context: &ExecutionContext,
        value: Value,
        step_info: Arc<ExecutionStepInfo>,
        local_context: Option<LocalContext>,
    ) -> FetchedValueAnalysis {
        match step_info.field_type().nullable() {
            TypeRef::List(item_type) => {
                if value.is_null() {
                    return null_analysis(FetchedValueType::List, step_info, local_context, vec![]);
                }
                if !value.is_array() {
                    let error = bad_value(
                        &step_info,
                        format!(
                            "Expected a list for type '{}' but got '{}'",
                            step_info.field_type(),
                            value
                        ),
                    );
                    return null_analysis(FetchedValueType::List, step_info, local_context, vec![error]);
                }

                let item_type = (**item_type).clone();
                let completed = Arc::new(value);
                let children = completed
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .enumerate()
                            .map(|(index, item)| {
                                let item_step =
                                    Arc::new(step_info.for_list_item(index, item_type.clone()));
                                self.analyze_value(context, item.clone(), item_step, local_context.clone())
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                FetchedValueAnalysis {
                    value_type: FetchedValueType::List,
                    completed_value: completed,
                    null_value: false,
                    resolved_type: None,
                    errors: Vec::new(),
                    children,
                    step_info,
                    local_context,
                }
            }
            TypeRef::Named(type_name) => {
                let type_name = type_name.clone();
                self.analyze_named(context, &type_name, value, step_info, local_context)
            }
            TypeRef::NonNull(_) => {
                let error = bad_value(
                    &step_info,
                    format!("Malformed type '{}'", step_info.field_type()),
                );
                null_analysis(FetchedValueType::Scalar, step_info, local_context, vec![error])
            }
        }
    }

    fn analyze_named(
        &self,
        context: &ExecutionContext,
        type_name: &str,
        value: Value,
        step_info: Arc<ExecutionStepInfo>,
        local_context: Option<LocalContext>,
    ) -> FetchedValueAnalysis {
        let schema = context.schema();
        let value_type = match schema.get_type(type_name) {
            Some(TypeDefinition::Enum(_)) => FetchedValueType::Enum,
            Some(TypeDefinition::Scalar(_)) | Some(TypeDefinition::InputObject(_)) | None => {
                FetchedValueType::Scalar
            }
            Some(_) => FetchedValueType::Object,
        };
        if value.is_null() {
            return null_analysis(value_type, step_info, local_context, vec![]);
        }
        if value_type == FetchedValueType::Object && !value.is_object() {
            let error = bad_value(
                &step_info,
                format!("Expected an object for type '{}' but got '{}'", type_name, value),
            );
            return null_analysis(value_type, step_info, local_context, vec![error]);
        }

        match schema.get_type(type_name) {
            Some(TypeDefinition::Scalar(_)) => match serialize_scalar(type_name, &value) {
                Ok(serialized) => leaf_analysis(value_type, serialized, step_info, local_context),
                Err(message) => {
                    let error = bad_value(&step_info, message);
                    null_analysis(value_type, step_info, local_context, vec![error])
                }
            },
            Some(TypeDefinition::Enum(enumeration)) => {
                let known = value
                    .as_str()
                    .is_some_and(|name| enumeration.values.iter().any(|v| v == name));
                if known {
                    leaf_analysis(value_type, value, step_info, local_context)
                } else {
                    let error = bad_value(
                        &step_info,
                        format!("Invalid input for enum '{}': '{}'", enumeration.name, value),
                    );
                    null_analysis(value_type, step_info, local_context, vec![error])
                }
            }
            Some(TypeDefinition::Object(object)) => {
                let resolved_type = object.name.clone();
                object_analysis(value, resolved_type, step_info, local_context)
            }
            Some(TypeDefinition::Interface(_)) | Some(TypeDefinition::Union(_)) => {
                match resolve_object_type(context, type_name, &value, &step_info) {
                    Ok(resolved_type) => {
                        let narrowed = Arc::new(step_info.with_resolved_type(&resolved_type));
                        object_analysis(value, resolved_type, narrowed, local_context)
                    }
                    Err(message) => {
                        let error = GraphQLError::new(message, ErrorClassification::UnresolvedType)
                            .with_path(step_info.path().clone())
                            .with_locations(locations(&step_info));
                        null_analysis(value_type, step_info, local_context, vec![error])
                    }
                }
            }
            Some(TypeDefinition::InputObject(_)) | None => {
                let error = bad_value(
                    &step_info,
                    format!("Type '{}' is not an output type", type_name),
                );
                null_analysis(value_type, step_info, local_context, vec![error])
            }
        }
    }
}

/// Narrow a value of an interface or union type to an object type
///
/// Uses the type resolver registered for `abstract_type` and checks that
/// the answer is one of its possible types. The error is a message suitable
/// for a field error.
pub(crate) fn resolve_object_type(
    context: &ExecutionContext,
    abstract_type: &str,
    value: &Value,
    step_info: &ExecutionStepInfo,
) -> Result<String, String> {
    let schema = context.schema();
    let resolver = schema.code_registry().type_resolver(abstract_type);
    let env = TypeResolutionEnvironment {
        value,
        abstract_type,
        field_type: step_info.field_type(),
        arguments: step_info.arguments(),
        schema,
        context: context.graphql_context(),
    };
    match resolver.resolve_type(&env) {
        Some(object_type) if schema.is_possible_type(abstract_type, &object_type) => Ok(object_type),
        Some(object_type) => Err(format!(
            "Runtime object type '{}' is not a possible type for '{}'",
            object_type, abstract_type
        )),
        None => Err(format!(
            "Could not determine the exact type of '{}' ({})",
            abstract_type,
            step_info.path()
        )),
    }
}

fn locations(step_info: &ExecutionStepInfo) -> Vec<crate::core::SourceLocation> {
    step_info.field().map(|f| f.locations()).unwrap_or_default()
}

fn bad_value(step_info: &ExecutionStepInfo, message: String) -> GraphQLError {
    GraphQLError::new(message, ErrorClassification::BadValue)
        .with_path(step_info.path().clone())
        .with_locations(locations(step_info))
}

fn null_analysis(
    value_type: FetchedValueType,
    step_info: Arc<ExecutionStepInfo>,
    local_context: Option<LocalContext>,
    errors: Vec<GraphQLError>,
) -> FetchedValueAnalysis {
    FetchedValueAnalysis {
        value_type,
        completed_value: Arc::new(Value::Null),
        null_value: true,
        resolved_type: None,
        errors,
        children: Vec::new(),
        step_info,
        local_context,
    }
}

fn leaf_analysis(
    value_type: FetchedValueType,
    value: Value,
    step_info: Arc<ExecutionStepInfo>,
    local_context: Option<LocalContext>,
) -> FetchedValueAnalysis {
    FetchedValueAnalysis {
        value_type,
        completed_value: Arc::new(value),
        null_value: false,
        resolved_type: None,
        errors: Vec::new(),
        children: Vec::new(),
        step_info,
        local_context,
    }
}

fn object_analysis(
    value: Value,
    resolved_type: String,
    step_info: Arc<ExecutionStepInfo>,
    local_context: Option<LocalContext>,
) -> FetchedValueAnalysis {
    FetchedValueAnalysis {
        value_type: FetchedValueType::Object,
        completed_value: Arc::new(value),
        null_value: false,
        resolved_type: Some(resolved_type),
        errors: Vec::new(),
        children: Vec::new(),
        step_info,
        local_context,
    }
}
