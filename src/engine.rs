//! The engine facade: parse, execute, instrument

use std::sync::Arc;

use crate::config::ExecutionConfig;
use crate::core::{ExecutionError, ExecutionId};
use crate::execution::strategy::strategy_for;
use crate::execution::{AstDocument, Execution, ExecutionInput, ExecutionResult, ExecutionStrategy};
use crate::instrumentation::{Instrumentation, InstrumentationState, SimpleInstrumentation};
use crate::schema::Schema;

/// A schema ready to execute requests
///
/// Cheap to clone and safe to share between tasks.
///
/// # Example
///
/// ```rust,ignore
/// let schema = SchemaBuilder::from_sdl("type Query { hello: String }")?
///     .data_fetcher("Query", "hello", data_fetcher(|_| Ok("world".into())))
///     .build()?;
/// let engine = GraphQL::builder(schema).build();
///
/// let result = engine.execute(ExecutionInput::new("{ hello }")).await?;
/// assert_eq!(result.data, Some(json!({ "hello": "world" })));
/// ```
#[derive(Clone)]
pub struct GraphQL {
    schema: Arc<Schema>,
    instrumentation: Arc<dyn Instrumentation>,
    execution: Execution,
}

impl GraphQL {
    pub fn builder(schema: impl Into<Arc<Schema>>) -> GraphQLBuilder {
        GraphQLBuilder::new(schema.into())
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Execute one request
    ///
    /// Syntax errors and pre-execution failures are reported inside the
    /// result, without data. Field failures are reported inside the result
    /// next to partial data.
    ///
    /// # Errors
    ///
    /// `Cancelled` when the input's cancellation token fires, and
    /// `BatchSizeMismatch` when a batched fetcher breaks its contract.
    pub async fn execute(&self, input: ExecutionInput) -> Result<ExecutionResult, ExecutionError> {
        let state = self.instrumentation.create_state();
        let input = self
            .instrumentation
            .instrument_execution_input(input, state.as_ref());
        let execution_id = input
            .execution_id
            .clone()
            .unwrap_or_else(ExecutionId::generate);

        let execution = self.instrumentation.begin_execution(&input, state.as_ref());

        let document = match self.parse(&input, state.as_ref()) {
            Ok(document) => document,
            Err(error) => {
                tracing::debug!(execution_id = %execution_id, error = %error, "Rejecting unparsable query");
                let result = ExecutionResult::from_error(&error);
                execution.on_completed(Some(&error));
                return Ok(self
                    .instrumentation
                    .instrument_execution_result(result, state.as_ref()));
            }
        };

        let outcome = self
            .execution
            .execute(&document, self.schema.clone(), execution_id, &input, state.clone())
            .await;

        match outcome {
            Ok(result) => {
                execution.on_completed(None);
                Ok(self
                    .instrumentation
                    .instrument_execution_result(result, state.as_ref()))
            }
            Err(error) => {
                execution.on_completed(Some(&error));
                Err(error)
            }
        }
    }

    fn parse(
        &self,
        input: &ExecutionInput,
        state: Option<&InstrumentationState>,
    ) -> Result<AstDocument, ExecutionError> {
        let parse = self.instrumentation.begin_parse(input, state);
        match graphql_parser::query::parse_query::<String>(&input.query) {
            Ok(document) => {
                parse.on_completed(None);
                Ok(document.into_static())
            }
            Err(error) => {
                parse.on_completed(Some(&error));
                Err(ExecutionError::InvalidSyntax {
                    message: error.to_string().trim().to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for GraphQL {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQL")
            .field("execution", &self.execution)
            .finish_non_exhaustive()
    }
}

/// Builder of a [`GraphQL`] engine
pub struct GraphQLBuilder {
    schema: Arc<Schema>,
    strategy: Option<Arc<dyn ExecutionStrategy>>,
    instrumentation: Arc<dyn Instrumentation>,
    config: ExecutionConfig,
}

impl GraphQLBuilder {
    fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            strategy: None,
            instrumentation: Arc::new(SimpleInstrumentation),
            config: ExecutionConfig::default(),
        }
    }

    /// Use this strategy instead of the configured one
    pub fn with_strategy(mut self, strategy: impl ExecutionStrategy + 'static) -> Self {
        self.strategy = Some(Arc::new(strategy));
        self
    }

    pub fn with_instrumentation(mut self, instrumentation: impl Instrumentation + 'static) -> Self {
        self.instrumentation = Arc::new(instrumentation);
        self
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> GraphQL {
        tracing::debug!(
            strategy = ?self.config.strategy,
            explicit_strategy = self.strategy.is_some(),
            types = self.schema.types().count(),
            "Building GraphQL engine"
        );
        let strategy = self
            .strategy
            .unwrap_or_else(|| strategy_for(self.config.strategy));
        GraphQL {
            execution: Execution::new(strategy, self.instrumentation.clone(), self.config),
            instrumentation: self.instrumentation,
            schema: self.schema,
        }
    }
}
