//! Instrumentation hooks
//!
//! An [`Instrumentation`] observes an execution at its boundaries. `begin_*`
//! hooks return an [`InstrumentationContext`] that is completed with the
//! outcome once the step finishes; `instrument_*` hooks may replace the value
//! flowing through (input, data fetcher, result). Hooks never change control
//! flow.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = GraphQL::builder(schema)
//!     .with_instrumentation(ChainedInstrumentation::new(vec![
//!         Arc::new(TracingInstrumentation::new()),
//!         Arc::new(my_metrics),
//!     ]))
//!     .build();
//! ```

mod chained;
mod trace;

pub use chained::ChainedInstrumentation;
pub use trace::TracingInstrumentation;

use std::any::Any;
use std::error::Error;
use std::sync::Arc;

use crate::execution::{ExecutionContext, ExecutionInput, ExecutionResult, ExecutionStepInfo};
use crate::fetching::{DataFetcher, DataFetchingEnvironment};

/// Per-execution state created by [`Instrumentation::create_state`]
pub type InstrumentationState = Arc<dyn Any + Send + Sync>;

type Completion = Box<dyn FnOnce(Option<&(dyn Error + 'static)>) + Send>;

/// Completion callback of a `begin_*` hook
///
/// Dropping a context without completing it skips the callback.
#[derive(Default)]
pub struct InstrumentationContext {
    on_completed: Option<Completion>,
}

impl InstrumentationContext {
    /// A context that does nothing on completion
    pub fn noop() -> Self {
        Self { on_completed: None }
    }

    pub fn new<F>(on_completed: F) -> Self
    where
        F: FnOnce(Option<&(dyn Error + 'static)>) + Send + 'static,
    {
        Self {
            on_completed: Some(Box::new(on_completed)),
        }
    }

    /// Complete several contexts in order
    pub fn chain(contexts: Vec<InstrumentationContext>) -> Self {
        if contexts.iter().all(|context| context.on_completed.is_none()) {
            return Self::noop();
        }
        Self::new(move |error| {
            for context in contexts {
                context.on_completed(error);
            }
        })
    }

    /// Report the outcome of the step, `None` meaning success
    pub fn on_completed(self, error: Option<&(dyn Error + 'static)>) {
        if let Some(on_completed) = self.on_completed {
            on_completed(error);
        }
    }
}

impl std::fmt::Debug for InstrumentationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentationContext")
            .field("noop", &self.on_completed.is_none())
            .finish()
    }
}

/// Observer of executions
///
/// Every method has a no-op default.
pub trait Instrumentation: Send + Sync {
    /// State shared by the hooks of one execution
    fn create_state(&self) -> Option<InstrumentationState> {
        None
    }

    fn begin_execution(
        &self,
        _input: &ExecutionInput,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::noop()
    }

    fn begin_parse(
        &self,
        _input: &ExecutionInput,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::noop()
    }

    fn begin_execute_operation(
        &self,
        _context: &ExecutionContext,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::noop()
    }

    /// Around one field: fetching it, classifying the value and building its
    /// node
    ///
    /// Completes with the first error recorded on the field, if any. The
    /// field's sub-selection is resolved afterwards and observed through its
    /// own fields.
    fn begin_field(
        &self,
        _step_info: &ExecutionStepInfo,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::noop()
    }

    /// Around the data fetcher call of one field, or of one batch
    fn begin_field_fetch(
        &self,
        _env: &DataFetchingEnvironment,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::noop()
    }

    fn instrument_execution_input(
        &self,
        input: ExecutionInput,
        _state: Option<&InstrumentationState>,
    ) -> ExecutionInput {
        input
    }

    fn instrument_data_fetcher(
        &self,
        fetcher: Arc<dyn DataFetcher>,
        _env: &DataFetchingEnvironment,
        _state: Option<&InstrumentationState>,
    ) -> Arc<dyn DataFetcher> {
        fetcher
    }

    fn instrument_execution_result(
        &self,
        result: ExecutionResult,
        _state: Option<&InstrumentationState>,
    ) -> ExecutionResult {
        result
    }
}

/// Instrumentation that observes nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleInstrumentation;

impl Instrumentation for SimpleInstrumentation {}
