//! Invoking data fetchers

use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::{ExecutionContext, ExecutionStepInfo, FetchedValue, MergedField, join_ordered};
use crate::core::{ExecutionError, GraphQLError, LocalContext, ResultPath, SourceLocation};
use crate::fetching::{DataFetcher, DataFetcherResult, DataFetcherValue, DataFetchingEnvironment};

/// Name of the meta field answered by the engine itself
pub const TYPENAME_FIELD: &str = "__typename";

/// Fetches field values for one or many sources
///
/// Whatever the fetcher does (answer right away, answer later, return an
/// error, panic), the outcome is a [`FetchedValue`]. Failures become a field
/// error at the fetched path; only cancellation and a misbehaving batched
/// fetcher end the execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueFetcher;

impl ValueFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Fetch the field described by `step_info` for one source
    pub async fn fetch_value(
        &self,
        context: &Arc<ExecutionContext>,
        source: Arc<Value>,
        local_context: Option<LocalContext>,
        merged_field: &MergedField,
        step_info: &Arc<ExecutionStepInfo>,
    ) -> Result<FetchedValue, ExecutionError> {
        context.check_cancelled()?;

        let parent_type = step_info.field_container().unwrap_or_default();
        if merged_field.name() == TYPENAME_FIELD {
            return Ok(FetchedValue::new(Value::String(parent_type.to_string()), local_context));
        }

        let env = DataFetchingEnvironment::new(
            context.clone(),
            source,
            local_context.clone(),
            step_info.clone(),
            merged_field.clone(),
        );
        let fetcher = self.instrumented_fetcher(context, parent_type, merged_field.name(), &env);

        tracing::trace!(
            execution_id = %context.execution_id(),
            path = %step_info.path(),
            "Fetching field"
        );
        let instrumentation = context
            .instrumentation()
            .begin_field_fetch(&env, context.instrumentation_state());
        let outcome = invoke(fetcher, &env, context.config().capture_panics).await;
        instrumentation.on_completed(outcome.as_ref().err().map(std_error));

        Ok(match outcome {
            Ok(result) => into_fetched_value(result, local_context, step_info.path(), merged_field),
            Err(error) => {
                tracing::debug!(path = %step_info.path(), error = %error, "Data fetcher failed");
                FetchedValue {
                    value: Value::Null,
                    local_context,
                    errors: vec![GraphQLError::exception_while_fetching(
                        step_info.path(),
                        merged_field.locations(),
                        &error,
                    )],
                }
            }
        })
    }

    /// Whether the field's registered fetcher accepts whole batches
    pub fn is_batched(
        &self,
        context: &ExecutionContext,
        step_info: &ExecutionStepInfo,
        merged_field: &MergedField,
    ) -> bool {
        let parent_type = step_info.field_container().unwrap_or_default();
        merged_field.name() != TYPENAME_FIELD
            && context
                .schema()
                .code_registry()
                .data_fetcher(parent_type, merged_field.name())
                .is_batched()
    }

    /// Fetch one field for many sources
    ///
    /// A batched fetcher is called once with every source and must answer
    /// with one value per source; its errors are reported on the first
    /// element only. Other fetchers are called once per source.
    ///
    /// # Errors
    ///
    /// `BatchSizeMismatch` when a batched fetcher answers with the wrong
    /// number of values, `Cancelled` when the execution was cancelled.
    pub async fn fetch_batched_values(
        &self,
        context: &Arc<ExecutionContext>,
        sources: Vec<(Arc<Value>, Option<LocalContext>)>,
        merged_field: &MergedField,
        step_infos: &[Arc<ExecutionStepInfo>],
    ) -> Result<Vec<FetchedValue>, ExecutionError> {
        debug_assert_eq!(sources.len(), step_infos.len());
        let Some(first_step) = step_infos.first() else {
            return Ok(Vec::new());
        };

        let parent_type = first_step.field_container().unwrap_or_default();
        if !self.is_batched(context, first_step, merged_field) {
            let fetches = sources
                .into_iter()
                .zip(step_infos)
                .map(|((source, local_context), step_info)| {
                    self.fetch_value(context, source, local_context, merged_field, step_info)
                })
                .collect();
            return join_ordered(fetches, context.config().fetch_limit()).await;
        }

        context.check_cancelled()?;
        let expected = sources.len();
        let batch_source = Value::Array(sources.iter().map(|(source, _)| (**source).clone()).collect());
        let local_contexts: Vec<_> = sources.iter().map(|(_, lc)| lc.clone()).collect();
        let env = DataFetchingEnvironment::new(
            context.clone(),
            Arc::new(batch_source),
            local_contexts.first().cloned().flatten(),
            first_step.clone(),
            merged_field.clone(),
        )
        .with_batch_local_contexts(local_contexts);
        let fetcher = self.instrumented_fetcher(context, parent_type, merged_field.name(), &env);

        tracing::debug!(
            execution_id = %context.execution_id(),
            path = %first_step.path(),
            sources = expected,
            "Fetching batch"
        );
        let instrumentation = context
            .instrumentation()
            .begin_field_fetch(&env, context.instrumentation_state());
        let outcome = invoke(fetcher, &env, context.config().capture_panics).await;
        instrumentation.on_completed(outcome.as_ref().err().map(std_error));

        let (values, errors, local_override) = match outcome {
            Ok(result) => {
                let DataFetcherResult {
                    data,
                    errors,
                    local_context: local_override,
                } = result;
                let values = match data {
                    Value::Array(values) if values.len() == expected => values,
                    other => {
                        return Err(ExecutionError::BatchSizeMismatch {
                            path: first_step.path().clone(),
                            expected,
                            actual: other.as_array().map_or(0, Vec::len),
                        });
                    }
                };
                let errors = complete_errors(errors, first_step.path(), merged_field);
                (values, errors, local_override)
            }
            Err(error) => {
                tracing::debug!(path = %first_step.path(), error = %error, "Batched data fetcher failed");
                let errors = vec![GraphQLError::exception_while_fetching(
                    first_step.path(),
                    merged_field.locations(),
                    &error,
                )];
                (vec![Value::Null; expected], errors, None)
            }
        };

        let mut errors = Some(errors);
        Ok(values
            .into_iter()
            .zip(sources)
            .map(|(value, (_, inherited))| FetchedValue {
                value,
                local_context: local_override.clone().or(inherited),
                errors: errors.take().unwrap_or_default(),
            })
            .collect())
    }

    fn instrumented_fetcher(
        &self,
        context: &ExecutionContext,
        parent_type: &str,
        field_name: &str,
        env: &DataFetchingEnvironment,
    ) -> Arc<dyn DataFetcher> {
        let fetcher = context
            .schema()
            .code_registry()
            .data_fetcher(parent_type, field_name);
        context
            .instrumentation()
            .instrument_data_fetcher(fetcher, env, context.instrumentation_state())
    }
}

/// Call the fetcher and drive its answer to completion
async fn invoke(
    fetcher: Arc<dyn DataFetcher>,
    env: &DataFetchingEnvironment,
    capture_panics: bool,
) -> anyhow::Result<DataFetcherResult> {
    let mut value = if capture_panics {
        std::panic::catch_unwind(AssertUnwindSafe(|| fetcher.get(env)))
            .map_err(panic_error)??
    } else {
        fetcher.get(env)?
    };

    loop {
        value = match value {
            DataFetcherValue::Value(value) => return Ok(DataFetcherResult::new(value)),
            DataFetcherValue::Result(result) => return Ok(result),
            DataFetcherValue::Future(future) => {
                if capture_panics {
                    AssertUnwindSafe(future)
                        .catch_unwind()
                        .await
                        .map_err(panic_error)??
                } else {
                    future.await?
                }
            }
        };
    }
}

fn std_error(error: &anyhow::Error) -> &(dyn std::error::Error + 'static) {
    error.as_ref()
}

fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    anyhow::anyhow!("data fetcher panicked: {}", message)
}

fn into_fetched_value(
    result: DataFetcherResult,
    inherited: Option<LocalContext>,
    path: &ResultPath,
    merged_field: &MergedField,
) -> FetchedValue {
    let DataFetcherResult {
        data,
        errors,
        local_context,
    } = result;
    FetchedValue {
        value: data,
        local_context: local_context.or(inherited),
        errors: complete_errors(errors, path, merged_field),
    }
}

/// Attach the field's path and locations to errors that lack them
fn complete_errors(
    errors: Vec<GraphQLError>,
    path: &ResultPath,
    merged_field: &MergedField,
) -> Vec<GraphQLError> {
    let locations: Vec<SourceLocation> = merged_field.locations();
    errors
        .into_iter()
        .map(|mut error| {
            if error.path.is_none() {
                error.path = Some(path.clone());
            }
            if error.locations.is_empty() {
                error.locations = locations.clone();
            }
            error
        })
        .collect()
}
