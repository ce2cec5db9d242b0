//! Instrumentation emitting `tracing` events

use std::time::Instant;

use super::{Instrumentation, InstrumentationContext, InstrumentationState};
use crate::execution::{ExecutionContext, ExecutionInput, ExecutionStepInfo};
use crate::fetching::DataFetchingEnvironment;

/// Logs execution, operation, field and field fetch boundaries with durations
///
/// Executions and operations are logged at `debug`, fields and their fetches
/// at `trace`. Failures are logged at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInstrumentation {
    skip_fields: bool,
}

impl TracingInstrumentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not log individual fields and their fetches
    pub fn without_fields(mut self) -> Self {
        self.skip_fields = true;
        self
    }
}

impl Instrumentation for TracingInstrumentation {
    fn begin_execution(
        &self,
        input: &ExecutionInput,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        let started = Instant::now();
        let operation = input.operation_name.clone();
        tracing::debug!(operation = ?operation, "Execution started");
        InstrumentationContext::new(move |error| match error {
            None => tracing::debug!(
                operation = ?operation,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Execution finished"
            ),
            Some(error) => tracing::warn!(
                operation = ?operation,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %error,
                "Execution failed"
            ),
        })
    }

    fn begin_execute_operation(
        &self,
        context: &ExecutionContext,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        let started = Instant::now();
        let execution_id = context.execution_id().clone();
        let kind = context.operation_kind();
        tracing::debug!(execution_id = %execution_id, operation = %kind, "Operation started");
        InstrumentationContext::new(move |error| {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match error {
                None => tracing::debug!(execution_id = %execution_id, elapsed_ms, "Operation finished"),
                Some(error) => tracing::warn!(
                    execution_id = %execution_id,
                    elapsed_ms,
                    error = %error,
                    "Operation failed"
                ),
            }
        })
    }

    fn begin_field(
        &self,
        step_info: &ExecutionStepInfo,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        if self.skip_fields {
            return InstrumentationContext::noop();
        }
        let started = Instant::now();
        let path = step_info.path().to_string();
        InstrumentationContext::new(move |error| {
            let elapsed_us = started.elapsed().as_micros() as u64;
            match error {
                None => tracing::trace!(path = %path, elapsed_us, "Field completed"),
                Some(error) => tracing::warn!(path = %path, elapsed_us, error = %error, "Field completed with error"),
            }
        })
    }

    fn begin_field_fetch(
        &self,
        env: &DataFetchingEnvironment,
        _state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        if self.skip_fields {
            return InstrumentationContext::noop();
        }
        let started = Instant::now();
        let path = env.step_info().path().to_string();
        tracing::trace!(path = %path, parent = env.parent_type(), "Fetching field");
        InstrumentationContext::new(move |error| {
            let elapsed_us = started.elapsed().as_micros() as u64;
            match error {
                None => tracing::trace!(path = %path, elapsed_us, "Field fetched"),
                Some(error) => tracing::warn!(path = %path, elapsed_us, error = %error, "Field fetch failed"),
            }
        })
    }
}
