//! Per-request execution state

use graphql_parser::query::{Definition, OperationDefinition};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::values::coerce_variable_values;
use super::{AstDocument, AstFragmentDefinition, AstSelectionSet, ExecutionInput};
use crate::config::ExecutionConfig;
use crate::core::{ExecutionError, ExecutionId, GraphQLContext, LocalContext};
use crate::instrumentation::{Instrumentation, InstrumentationState};
use crate::schema::{OperationKind, Schema};

/// Everything shared by the fetches of one execution
///
/// Built once per request and shared behind an `Arc`; never mutated.
pub struct ExecutionContext {
    execution_id: ExecutionId,
    schema: Arc<Schema>,
    operation_kind: OperationKind,
    operation_name: Option<String>,
    selection_set: AstSelectionSet,
    fragments: HashMap<String, AstFragmentDefinition>,
    variables: Arc<Map<String, Value>>,
    root: Arc<Value>,
    graphql_context: Option<GraphQLContext>,
    local_context: Option<LocalContext>,
    instrumentation: Arc<dyn Instrumentation>,
    instrumentation_state: Option<InstrumentationState>,
    cancellation: CancellationToken,
    config: ExecutionConfig,
}

impl ExecutionContext {
    /// Select the operation and coerce the variables of a request
    ///
    /// # Errors
    ///
    /// `UnknownOperation` when the operation cannot be chosen and
    /// `VariableCoercion` when a variable value does not fit its type.
    pub fn new(
        document: &AstDocument,
        schema: Arc<Schema>,
        execution_id: ExecutionId,
        input: &ExecutionInput,
        instrumentation: Arc<dyn Instrumentation>,
        instrumentation_state: Option<InstrumentationState>,
        config: ExecutionConfig,
    ) -> Result<Self, ExecutionError> {
        let operation = select_operation(document, input.operation_name.as_deref())?;
        let (operation_kind, operation_name, variable_definitions, selection_set) = match operation {
            OperationDefinition::SelectionSet(set) => (OperationKind::Query, None, &[][..], set),
            OperationDefinition::Query(query) => (
                OperationKind::Query,
                query.name.clone(),
                &query.variable_definitions[..],
                &query.selection_set,
            ),
            OperationDefinition::Mutation(mutation) => (
                OperationKind::Mutation,
                mutation.name.clone(),
                &mutation.variable_definitions[..],
                &mutation.selection_set,
            ),
            OperationDefinition::Subscription(subscription) => (
                OperationKind::Subscription,
                subscription.name.clone(),
                &subscription.variable_definitions[..],
                &subscription.selection_set,
            ),
        };

        let variables = coerce_variable_values(&schema, variable_definitions, &input.variables)?;

        let fragments = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Fragment(fragment) => Some((fragment.name.clone(), fragment.clone())),
                Definition::Operation(_) => None,
            })
            .collect();

        Ok(Self {
            execution_id,
            schema,
            operation_kind,
            operation_name,
            selection_set: selection_set.clone(),
            fragments,
            variables: Arc::new(variables),
            root: Arc::new(input.root.clone()),
            graphql_context: input.graphql_context.clone(),
            local_context: input.local_context.clone(),
            instrumentation,
            instrumentation_state,
            cancellation: input.cancellation.clone(),
            config,
        })
    }

    pub fn execution_id(&self) -> &ExecutionId {
        &self.execution_id
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn operation_kind(&self) -> OperationKind {
        self.operation_kind
    }

    pub fn operation_name(&self) -> Option<&str> {
        self.operation_name.as_deref()
    }

    /// Top-level selection set of the operation
    pub fn selection_set(&self) -> &AstSelectionSet {
        &self.selection_set
    }

    pub fn fragments(&self) -> &HashMap<String, AstFragmentDefinition> {
        &self.fragments
    }

    /// Coerced variable values
    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub(crate) fn shared_variables(&self) -> Arc<Map<String, Value>> {
        self.variables.clone()
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub(crate) fn shared_root(&self) -> Arc<Value> {
        self.root.clone()
    }

    pub fn graphql_context(&self) -> Option<&GraphQLContext> {
        self.graphql_context.as_ref()
    }

    /// Local context handed to the root fields
    pub fn local_context(&self) -> Option<&LocalContext> {
        self.local_context.as_ref()
    }

    pub fn instrumentation(&self) -> &Arc<dyn Instrumentation> {
        &self.instrumentation
    }

    pub fn instrumentation_state(&self) -> Option<&InstrumentationState> {
        self.instrumentation_state.as_ref()
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Fail with `Cancelled` once the caller's token has fired
    pub fn check_cancelled(&self) -> Result<(), ExecutionError> {
        if self.cancellation.is_cancelled() {
            return Err(ExecutionError::Cancelled {
                execution_id: self.execution_id.clone(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("execution_id", &self.execution_id)
            .field("operation_kind", &self.operation_kind)
            .field("operation_name", &self.operation_name)
            .field("variables", &self.variables)
            .finish()
    }
}

fn select_operation<'d>(
    document: &'d AstDocument,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition<'static, String>, ExecutionError> {
    let operations: Vec<&OperationDefinition<'static, String>> = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(operation),
            Definition::Fragment(_) => None,
        })
        .collect();

    match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|operation| operation_name_of(operation) == Some(name))
            .ok_or_else(|| ExecutionError::UnknownOperation {
                message: format!("Unknown operation named '{}'.", name),
            }),
        None => match operations.as_slice() {
            [single] => Ok(*single),
            [] => Err(ExecutionError::UnknownOperation {
                message: "The document does not contain any operation.".to_string(),
            }),
            _ => Err(ExecutionError::UnknownOperation {
                message: "Must provide operation name if query contains multiple operations."
                    .to_string(),
            }),
        },
    }
}

fn operation_name_of<'d>(operation: &'d OperationDefinition<'static, String>) -> Option<&'d str> {
    match operation {
        OperationDefinition::SelectionSet(_) => None,
        OperationDefinition::Query(query) => query.name.as_deref(),
        OperationDefinition::Mutation(mutation) => mutation.name.as_deref(),
        OperationDefinition::Subscription(subscription) => subscription.name.as_deref(),
    }
}
