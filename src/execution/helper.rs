//! Sub-selection construction and per-field fetching shared by the strategies

use serde_json::Map;
use std::sync::Arc;

use super::fetched_value::resolve_object_type;
use super::value_fetcher::TYPENAME_FIELD;
use super::{
    ExecutionContext, ExecutionStepInfo, FetchedValue, FetchedValueAnalyzer, FieldCollector,
    FieldCollectorParameters, FieldSubSelection, MergedField, NodeRef, ResolvedValue,
    ResultNodesCreator, ValueFetcher, join_ordered, join_serial,
};
use crate::core::ExecutionError;
use crate::fetching::LazyArguments;
use crate::instrumentation::InstrumentationContext;
use crate::schema::{OperationKind, TypeRef};

/// Builds the sub-selections and field steps of an execution
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionHelper {
    field_collector: FieldCollector,
}

impl ExecutionHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sub-selection of the operation's root object
    ///
    /// # Errors
    ///
    /// `MissingRootType` when the schema has no root type for the operation
    /// kind.
    pub fn create_root_sub_selection(
        &self,
        context: &ExecutionContext,
    ) -> Result<FieldSubSelection, ExecutionError> {
        let kind = context.operation_kind();
        let root_type = context
            .schema()
            .root_type(kind)
            .ok_or(ExecutionError::MissingRootType { operation: kind })?;

        let params = FieldCollectorParameters {
            schema: context.schema(),
            object_type: &root_type.name,
            fragments: context.fragments(),
            variables: context.variables(),
        };
        let merged_selection_set = self
            .field_collector
            .collect_root_fields(&params, context.selection_set());

        Ok(FieldSubSelection {
            source: context.shared_root(),
            local_context: context.local_context().cloned(),
            merged_selection_set,
            step_info: Arc::new(ExecutionStepInfo::root(&root_type.name)),
            serial: kind == OperationKind::Mutation,
        })
    }

    /// Sub-selection of an object value
    ///
    /// `step_info` is normally already narrowed to an object type. When it
    /// still names an interface or union, the type is resolved here.
    ///
    /// # Errors
    ///
    /// `UnresolvedType` when an abstract type cannot be narrowed.
    pub fn create_field_sub_selection(
        &self,
        context: &ExecutionContext,
        step_info: &Arc<ExecutionStepInfo>,
        resolved_value: &ResolvedValue,
    ) -> Result<FieldSubSelection, ExecutionError> {
        let declared = step_info.field_type().named_type();
        let step_info = if context.schema().object_type(declared).is_some() {
            step_info.clone()
        } else {
            let object_type = resolve_object_type(
                context,
                declared,
                &resolved_value.completed_value,
                step_info,
            )
            .map_err(|_| ExecutionError::UnresolvedType {
                abstract_type: declared.to_string(),
                path: step_info.path().clone(),
            })?;
            Arc::new(step_info.with_resolved_type(&object_type))
        };

        let merged_selection_set = match step_info.field() {
            Some(field) => {
                let params = FieldCollectorParameters {
                    schema: context.schema(),
                    object_type: step_info.field_type().named_type(),
                    fragments: context.fragments(),
                    variables: context.variables(),
                };
                self.field_collector.collect_fields(&params, field)
            }
            None => Default::default(),
        };

        Ok(FieldSubSelection {
            source: resolved_value.completed_value.clone(),
            local_context: resolved_value.local_context.clone(),
            merged_selection_set,
            step_info,
            serial: false,
        })
    }

    /// Step of `merged_field` selected on the object described by `parent`
    ///
    /// Returns `None` for a field the object type does not declare.
    pub fn new_field_step(
        &self,
        context: &ExecutionContext,
        parent: &Arc<ExecutionStepInfo>,
        merged_field: &MergedField,
    ) -> Option<Arc<ExecutionStepInfo>> {
        let object_type = parent.field_type().named_type();

        if merged_field.name() == TYPENAME_FIELD {
            return Some(Arc::new(ExecutionStepInfo::for_field(
                parent,
                object_type,
                None,
                merged_field.clone(),
                TypeRef::non_null(TypeRef::named("String")),
                Arc::new(LazyArguments::from_values(Map::new())),
            )));
        }

        let Some(definition) = context
            .schema()
            .field_definition(object_type, merged_field.name())
        else {
            tracing::warn!(
                object_type,
                field = merged_field.name(),
                path = %parent.path(),
                "Skipping field not declared on type"
            );
            return None;
        };

        let arguments = LazyArguments::new(
            Some(definition.clone()),
            Some(merged_field.clone()),
            context.shared_variables(),
        );
        Some(Arc::new(ExecutionStepInfo::for_field(
            parent,
            object_type,
            Some(definition.clone()),
            merged_field.clone(),
            definition.field_type.clone(),
            Arc::new(arguments),
        )))
    }
}

/// Fetch, classify and build nodes for the fields of a sub-selection
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionStrategyUtil {
    helper: ExecutionHelper,
    value_fetcher: ValueFetcher,
    analyzer: FetchedValueAnalyzer,
    nodes_creator: ResultNodesCreator,
}

impl ExecutionStrategyUtil {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn helper(&self) -> &ExecutionHelper {
        &self.helper
    }

    pub fn value_fetcher(&self) -> &ValueFetcher {
        &self.value_fetcher
    }

    /// Classify a fetched value and build its node
    pub fn complete_value(
        &self,
        context: &ExecutionContext,
        fetched: FetchedValue,
        step_info: Arc<ExecutionStepInfo>,
    ) -> NodeRef {
        let analysis = self.analyzer.analyze(context, fetched, step_info);
        self.nodes_creator.create_result_node(analysis)
    }

    /// Fetch one field of a sub-selection
    ///
    /// `None` when the field is not declared on the object type.
    pub async fn fetch_field(
        &self,
        context: &Arc<ExecutionContext>,
        sub_selection: &FieldSubSelection,
        merged_field: &MergedField,
    ) -> Result<Option<NodeRef>, ExecutionError> {
        let Some(step_info) = self
            .helper
            .new_field_step(context, &sub_selection.step_info, merged_field)
        else {
            return Ok(None);
        };
        let instrumentation = context
            .instrumentation()
            .begin_field(&step_info, context.instrumentation_state());
        let outcome = self
            .fetch_step(context, sub_selection, merged_field, step_info)
            .await;
        complete_field(instrumentation, outcome.as_ref().map(Option::as_ref));
        outcome
    }

    async fn fetch_step(
        &self,
        context: &Arc<ExecutionContext>,
        sub_selection: &FieldSubSelection,
        merged_field: &MergedField,
        step_info: Arc<ExecutionStepInfo>,
    ) -> Result<Option<NodeRef>, ExecutionError> {
        let source = sub_selection.source.clone();
        let local_context = sub_selection.local_context.clone();
        let fetched = if self.value_fetcher.is_batched(context, &step_info, merged_field) {
            // batched fetchers always see an array source, even for one object
            self.value_fetcher
                .fetch_batched_values(
                    context,
                    vec![(source, local_context)],
                    merged_field,
                    std::slice::from_ref(&step_info),
                )
                .await?
                .pop()
        } else {
            Some(
                self.value_fetcher
                    .fetch_value(context, source, local_context, merged_field, &step_info)
                    .await?,
            )
        };
        Ok(fetched.map(|fetched| self.complete_value(context, fetched, step_info)))
    }

    /// Fetch every field of a sub-selection, children in selection order
    ///
    /// Serial sub-selections fetch one field after another; the others fetch
    /// concurrently within the configured limit.
    pub async fn fetch_sub_selection(
        &self,
        context: &Arc<ExecutionContext>,
        sub_selection: &FieldSubSelection,
    ) -> Result<Vec<NodeRef>, ExecutionError> {
        let fetches: Vec<_> = sub_selection
            .merged_selection_set
            .iter()
            .map(|(_, field)| self.fetch_field(context, sub_selection, field))
            .collect();
        let nodes = if sub_selection.serial {
            join_serial(fetches).await?
        } else {
            join_ordered(fetches, context.config().fetch_limit()).await?
        };
        Ok(nodes.into_iter().flatten().collect())
    }
}

/// Complete a field's instrumentation with the outcome of building its node
pub(crate) fn complete_field(
    instrumentation: InstrumentationContext,
    outcome: Result<Option<&NodeRef>, &ExecutionError>,
) {
    match outcome {
        Ok(node) => {
            let error = node
                .and_then(|node| node.resolved_value())
                .and_then(|value| value.errors.first());
            instrumentation.on_completed(error.map(|error| error as &(dyn std::error::Error + 'static)));
        }
        Err(error) => instrumentation.on_completed(Some(error as &(dyn std::error::Error + 'static))),
    }
}
