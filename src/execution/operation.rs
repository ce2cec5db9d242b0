//! Execution of one operation

use std::sync::Arc;

use super::{
    AstDocument, ExecutionContext, ExecutionHelper, ExecutionInput, ExecutionResult,
    ExecutionStrategy,
};
use crate::config::ExecutionConfig;
use crate::core::{ExecutionError, ExecutionId};
use crate::instrumentation::{Instrumentation, InstrumentationState};
use crate::schema::Schema;

/// Composes context creation, the strategy and flattening for one request
///
/// # Example
///
/// ```rust,ignore
/// let execution = Execution::new(
///     Arc::new(DefaultExecutionStrategy::new()),
///     Arc::new(SimpleInstrumentation),
///     ExecutionConfig::default(),
/// );
/// let result = execution
///     .execute(&document, schema, ExecutionId::generate(), &input, None)
///     .await?;
/// ```
#[derive(Clone)]
pub struct Execution {
    strategy: Arc<dyn ExecutionStrategy>,
    instrumentation: Arc<dyn Instrumentation>,
    config: ExecutionConfig,
}

impl Execution {
    pub fn new(
        strategy: Arc<dyn ExecutionStrategy>,
        instrumentation: Arc<dyn Instrumentation>,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            strategy,
            instrumentation,
            config,
        }
    }

    /// Execute the selected operation of `document`
    ///
    /// Pre-execution failures (unknown operation, variable coercion, missing
    /// root type) are reported inside the result, without data.
    ///
    /// # Errors
    ///
    /// The fatal errors raised by the strategy, such as `Cancelled` or
    /// `BatchSizeMismatch`.
    pub async fn execute(
        &self,
        document: &AstDocument,
        schema: Arc<Schema>,
        execution_id: ExecutionId,
        input: &ExecutionInput,
        instrumentation_state: Option<InstrumentationState>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let context = match ExecutionContext::new(
            document,
            schema,
            execution_id.clone(),
            input,
            self.instrumentation.clone(),
            instrumentation_state,
            self.config.clone(),
        ) {
            Ok(context) => Arc::new(context),
            Err(error) => return pre_execution_failure(&execution_id, error),
        };

        let root = match ExecutionHelper::new().create_root_sub_selection(&context) {
            Ok(root) => root,
            Err(error) => return pre_execution_failure(&execution_id, error),
        };

        tracing::debug!(
            execution_id = %execution_id,
            operation = %context.operation_kind(),
            name = ?context.operation_name(),
            "Executing operation"
        );
        let instrumentation = self
            .instrumentation
            .begin_execute_operation(&context, context.instrumentation_state());

        match self.strategy.execute(context.clone(), root).await {
            Ok(tree) => {
                instrumentation.on_completed(None);
                let result = ExecutionResult::from_root_node(&tree);
                tracing::debug!(
                    execution_id = %execution_id,
                    errors = result.errors.len(),
                    "Operation executed"
                );
                Ok(result)
            }
            Err(error) => {
                instrumentation.on_completed(Some(&error));
                tracing::warn!(
                    execution_id = %execution_id,
                    code = error.error_code(),
                    error = %error,
                    "Operation aborted"
                );
                Err(error)
            }
        }
    }
}

fn pre_execution_failure(
    execution_id: &ExecutionId,
    error: ExecutionError,
) -> Result<ExecutionResult, ExecutionError> {
    if !error.is_pre_execution() {
        return Err(error);
    }
    tracing::debug!(
        execution_id = %execution_id,
        code = error.error_code(),
        error = %error,
        "Operation rejected before execution"
    );
    Ok(ExecutionResult::from_error(&error))
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Execution")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
