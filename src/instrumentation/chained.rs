//! Composition of several instrumentations

use std::any::Any;
use std::sync::Arc;

use super::{Instrumentation, InstrumentationContext, InstrumentationState};
use crate::execution::{ExecutionContext, ExecutionInput, ExecutionResult, ExecutionStepInfo};
use crate::fetching::{DataFetcher, DataFetchingEnvironment};

/// Runs an ordered list of instrumentations as one
///
/// Each member keeps its own state. `begin_*` contexts complete in list
/// order and `instrument_*` hooks fold from the first member to the last.
#[derive(Clone, Default)]
pub struct ChainedInstrumentation {
    instrumentations: Vec<Arc<dyn Instrumentation>>,
}

struct ChainedState {
    states: Vec<Option<InstrumentationState>>,
}

impl ChainedInstrumentation {
    pub fn new(instrumentations: Vec<Arc<dyn Instrumentation>>) -> Self {
        Self { instrumentations }
    }

    /// Append one instrumentation
    pub fn with(mut self, instrumentation: impl Instrumentation + 'static) -> Self {
        self.instrumentations.push(Arc::new(instrumentation));
        self
    }

    pub fn len(&self) -> usize {
        self.instrumentations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrumentations.is_empty()
    }

    fn member_state<'a>(
        state: Option<&'a InstrumentationState>,
        index: usize,
    ) -> Option<&'a InstrumentationState> {
        let any: &(dyn Any + Send + Sync) = &**state?;
        any.downcast_ref::<ChainedState>()
            .and_then(|chained| chained.states.get(index))
            .and_then(Option::as_ref)
    }

    fn members<'a>(
        &'a self,
        state: Option<&'a InstrumentationState>,
    ) -> impl Iterator<Item = (&'a Arc<dyn Instrumentation>, Option<&'a InstrumentationState>)> + 'a
    {
        self.instrumentations
            .iter()
            .enumerate()
            .map(move |(index, member)| (member, Self::member_state(state, index)))
    }
}

impl Instrumentation for ChainedInstrumentation {
    fn create_state(&self) -> Option<InstrumentationState> {
        let states = self
            .instrumentations
            .iter()
            .map(|member| member.create_state())
            .collect();
        Some(Arc::new(ChainedState { states }))
    }

    fn begin_execution(
        &self,
        input: &ExecutionInput,
        state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::chain(
            self.members(state)
                .map(|(member, state)| member.begin_execution(input, state))
                .collect(),
        )
    }

    fn begin_parse(
        &self,
        input: &ExecutionInput,
        state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::chain(
            self.members(state)
                .map(|(member, state)| member.begin_parse(input, state))
                .collect(),
        )
    }

    fn begin_execute_operation(
        &self,
        context: &ExecutionContext,
        state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::chain(
            self.members(state)
                .map(|(member, state)| member.begin_execute_operation(context, state))
                .collect(),
        )
    }

    fn begin_field(
        &self,
        step_info: &ExecutionStepInfo,
        state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::chain(
            self.members(state)
                .map(|(member, state)| member.begin_field(step_info, state))
                .collect(),
        )
    }

    fn begin_field_fetch(
        &self,
        env: &DataFetchingEnvironment,
        state: Option<&InstrumentationState>,
    ) -> InstrumentationContext {
        InstrumentationContext::chain(
            self.members(state)
                .map(|(member, state)| member.begin_field_fetch(env, state))
                .collect(),
        )
    }

    fn instrument_execution_input(
        &self,
        input: ExecutionInput,
        state: Option<&InstrumentationState>,
    ) -> ExecutionInput {
        self.members(state).fold(input, |input, (member, state)| {
            member.instrument_execution_input(input, state)
        })
    }

    fn instrument_data_fetcher(
        &self,
        fetcher: Arc<dyn DataFetcher>,
        env: &DataFetchingEnvironment,
        state: Option<&InstrumentationState>,
    ) -> Arc<dyn DataFetcher> {
        self.members(state).fold(fetcher, |fetcher, (member, state)| {
            member.instrument_data_fetcher(fetcher, env, state)
        })
    }

    fn instrument_execution_result(
        &self,
        result: ExecutionResult,
        state: Option<&InstrumentationState>,
    ) -> ExecutionResult {
        self.members(state).fold(result, |result, (member, state)| {
            member.instrument_execution_result(result, state)
        })
    }
}

impl std::fmt::Debug for ChainedInstrumentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainedInstrumentation")
            .field("len", &self.instrumentations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Instrumentation for Counting {
        fn create_state(&self) -> Option<InstrumentationState> {
            Some(Arc::new(AtomicUsize::new(0)))
        }

        fn begin_execution(
            &self,
            _input: &ExecutionInput,
            state: Option<&InstrumentationState>,
        ) -> InstrumentationContext {
            let counter = state
                .and_then(|s| s.downcast_ref::<AtomicUsize>())
                .expect("own state");
            counter.fetch_add(1, Ordering::SeqCst);
            let log = self.log.clone();
            let name = self.name;
            InstrumentationContext::new(move |_| log.lock().unwrap().push(format!("{name}:done")))
        }

        fn instrument_execution_result(
            &self,
            mut result: ExecutionResult,
            _state: Option<&InstrumentationState>,
        ) -> ExecutionResult {
            self.log.lock().unwrap().push(format!("{}:result", self.name));
            result.errors.clear();
            result
        }
    }

    #[test]
    fn test_members_get_own_state_and_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chained = ChainedInstrumentation::default()
            .with(Counting {
                name: "a",
                log: log.clone(),
            })
            .with(Counting {
                name: "b",
                log: log.clone(),
            });
        assert_eq!(chained.len(), 2);

        let state = chained.create_state();
        let input = ExecutionInput::new("{ a }");
        chained.begin_execution(&input, state.as_ref()).on_completed(None);
        chained.instrument_execution_result(ExecutionResult::default(), state.as_ref());

        assert_eq!(
            *log.lock().unwrap(),
            vec!["a:done", "b:done", "a:result", "b:result"]
        );
    }
}
