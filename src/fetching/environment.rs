//! The environment handed to a data fetcher

use indexmap::IndexSet;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};

use crate::core::{ExecutionId, GraphQLContext, LocalContext};
use crate::execution::field_collector::{FieldCollector, FieldCollectorParameters};
use crate::execution::values::argument_values;
use crate::execution::{ExecutionContext, ExecutionStepInfo, MergedField};
use crate::schema::{FieldDefinition, Schema, TypeDefinition, TypeRef};

/// Argument values of one field, computed on first access
///
/// One instance is shared by the fetch environment of a field and every
/// step below it (list elements included), so the conversion from the
/// document happens at most once per field invocation.
pub struct LazyArguments {
    definition: Option<Arc<FieldDefinition>>,
    field: Option<MergedField>,
    variables: Arc<Map<String, Value>>,
    values: OnceLock<Map<String, Value>>,
}

impl LazyArguments {
    pub(crate) fn new(
        definition: Option<Arc<FieldDefinition>>,
        field: Option<MergedField>,
        variables: Arc<Map<String, Value>>,
    ) -> Self {
        Self {
            definition,
            field,
            variables,
            values: OnceLock::new(),
        }
    }

    /// Arguments that are already known
    pub fn from_values(values: Map<String, Value>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(values);
        Self {
            definition: None,
            field: None,
            variables: Arc::new(Map::new()),
            values: cell,
        }
    }

    /// The argument map, computing it if needed
    pub fn get(&self) -> &Map<String, Value> {
        self.values.get_or_init(|| self.compute())
    }

    /// Whether the map has been computed yet
    pub fn is_computed(&self) -> bool {
        self.values.get().is_some()
    }

    fn compute(&self) -> Map<String, Value> {
        match &self.field {
            Some(field) => argument_values(
                self.definition.as_deref(),
                &field.single_field().arguments,
                &self.variables,
            ),
            None => Map::new(),
        }
    }
}

impl std::fmt::Debug for LazyArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyArguments")
            .field("values", &self.values.get())
            .finish()
    }
}

/// Everything a data fetcher may look at while fetching one field
#[derive(Clone)]
pub struct DataFetchingEnvironment {
    context: Arc<ExecutionContext>,
    source: Arc<Value>,
    local_context: Option<LocalContext>,
    step_info: Arc<ExecutionStepInfo>,
    merged_field: MergedField,
    batch_local_contexts: Vec<Option<LocalContext>>,
    selection_set: Arc<OnceLock<Vec<String>>>,
}

impl DataFetchingEnvironment {
    pub(crate) fn new(
        context: Arc<ExecutionContext>,
        source: Arc<Value>,
        local_context: Option<LocalContext>,
        step_info: Arc<ExecutionStepInfo>,
        merged_field: MergedField,
    ) -> Self {
        Self {
            context,
            source,
            local_context,
            step_info,
            merged_field,
            batch_local_contexts: Vec::new(),
            selection_set: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn with_batch_local_contexts(mut self, contexts: Vec<Option<LocalContext>>) -> Self {
        self.batch_local_contexts = contexts;
        self
    }

    /// The parent value the field is fetched from
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Argument values of the field
    pub fn arguments(&self) -> &Map<String, Value> {
        self.step_info.arguments()
    }

    /// One argument value
    pub fn argument(&self, name: &str) -> Option<&Value> {
        self.arguments().get(name)
    }

    /// Local context inherited from the parent field
    ///
    /// In a batched call this is the context of the first source; see
    /// [`batch_local_contexts`](Self::batch_local_contexts) for all of them.
    pub fn local_context(&self) -> Option<&LocalContext> {
        self.local_context.as_ref()
    }

    /// Local context of every source of a batched call, in source order
    ///
    /// Empty when the fetcher is called for a single source.
    pub fn batch_local_contexts(&self) -> &[Option<LocalContext>] {
        &self.batch_local_contexts
    }

    /// Per-request context
    pub fn graphql_context(&self) -> Option<&GraphQLContext> {
        self.context.graphql_context()
    }

    /// Root value of the execution
    pub fn root(&self) -> &Value {
        self.context.root()
    }

    /// Position of the field in the result
    pub fn step_info(&self) -> &Arc<ExecutionStepInfo> {
        &self.step_info
    }

    /// Declared output type of the field
    pub fn field_type(&self) -> &TypeRef {
        self.step_info.field_type()
    }

    /// Schema definition of the field
    pub fn field_definition(&self) -> Option<&FieldDefinition> {
        self.step_info.field_definition()
    }

    /// Name of the object type declaring the field
    pub fn parent_type(&self) -> &str {
        self.step_info.field_container().unwrap_or_default()
    }

    /// Document field nodes that map to this position
    pub fn merged_field(&self) -> &MergedField {
        &self.merged_field
    }

    /// Coerced variables of the operation
    pub fn variables(&self) -> &Map<String, Value> {
        self.context.variables()
    }

    pub fn schema(&self) -> &Schema {
        self.context.schema()
    }

    pub fn execution_id(&self) -> &ExecutionId {
        self.context.execution_id()
    }

    /// Result keys of the field's immediate sub-selection
    ///
    /// For interface and union fields the keys of every possible object type
    /// are included. Computed on first access.
    pub fn selection_set(&self) -> &[String] {
        self.selection_set.get_or_init(|| self.compute_selection_set())
    }

    fn compute_selection_set(&self) -> Vec<String> {
        let schema = self.context.schema();
        let named = self.step_info.field_type().named_type();
        let object_types: Vec<&str> = match schema.get_type(named) {
            Some(TypeDefinition::Object(object)) => vec![object.name.as_str()],
            Some(definition) if definition.is_abstract() => schema
                .possible_types(named)
                .into_iter()
                .map(|object| object.name.as_str())
                .collect(),
            _ => return Vec::new(),
        };

        let collector = FieldCollector::new();
        let mut keys = IndexSet::new();
        for object_type in object_types {
            let params = FieldCollectorParameters {
                schema,
                object_type,
                fragments: self.context.fragments(),
                variables: self.context.variables(),
            };
            keys.extend(
                collector
                    .collect_fields(&params, &self.merged_field)
                    .into_keys(),
            );
        }
        keys.into_iter().collect()
    }
}

impl std::fmt::Debug for DataFetchingEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFetchingEnvironment")
            .field("path", self.step_info.path())
            .field("source", &self.source)
            .finish()
    }
}
