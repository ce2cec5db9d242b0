//! Execution requests

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::core::{ExecutionId, GraphQLContext, LocalContext};

/// One request to execute
///
/// # Example
///
/// ```rust,ignore
/// let input = ExecutionInput::new("query($id: ID!) { user(id: $id) { name } }")
///     .with_variables(json!({ "id": "1" }))
///     .with_graphql_context(OpaqueContext::new(session));
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionInput {
    pub query: String,
    /// Operation to run when the document holds several
    pub operation_name: Option<String>,
    pub variables: Map<String, Value>,
    /// Source value of the root fields
    pub root: Value,
    pub graphql_context: Option<GraphQLContext>,
    /// Local context handed to the root fields
    pub local_context: Option<LocalContext>,
    /// Generated when absent
    pub execution_id: Option<ExecutionId>,
    pub cancellation: CancellationToken,
}

impl ExecutionInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: Map::new(),
            root: Value::Null,
            graphql_context: None,
            local_context: None,
            execution_id: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Set the variables from a JSON object; other values clear them
    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = match variables {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self
    }

    pub fn with_root(mut self, root: Value) -> Self {
        self.root = root;
        self
    }

    pub fn with_graphql_context(mut self, context: GraphQLContext) -> Self {
        self.graphql_context = Some(context);
        self
    }

    pub fn with_local_context(mut self, context: LocalContext) -> Self {
        self.local_context = Some(context);
        self
    }

    pub fn with_execution_id(mut self, execution_id: ExecutionId) -> Self {
        self.execution_id = Some(execution_id);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}
