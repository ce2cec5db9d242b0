//! Typed error handling for the execution engine
//!
//! Two families of errors exist and they never mix:
//!
//! - [`GraphQLError`]: a response-level error record. These are collected
//!   while executing and end up in the `errors` list of an
//!   [`ExecutionResult`](crate::execution::ExecutionResult). Field fetch
//!   failures and non-null violations are reported this way and never abort
//!   the execution.
//! - [`ExecutionError`]: a fatal condition. Pre-execution failures (missing
//!   root type, unknown operation, variable coercion, syntax) are turned into
//!   a result carrying a single error and no data; invariant failures
//!   (batched size mismatch, cancellation) are returned as `Err`.
//!
//! [`SchemaError`] is raised while building a [`Schema`](crate::schema::Schema).
//!
//! # Example
//!
//! ```rust,ignore
//! match engine.execute(input).await {
//!     Ok(result) => println!("{}", result.to_specification()),
//!     Err(ExecutionError::BatchSizeMismatch { path, .. }) => {
//!         eprintln!("batched fetcher misbehaved at {}", path);
//!     }
//!     Err(e) => eprintln!("execution aborted: {}", e),
//! }
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

use super::execution_id::ExecutionId;
use super::path::ResultPath;
use crate::schema::OperationKind;

// =============================================================================
// Response errors
// =============================================================================

/// A location in the GraphQL document (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl From<graphql_parser::Pos> for SourceLocation {
    fn from(pos: graphql_parser::Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Broad category of a [`GraphQLError`], reported as `extensions.classification`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorClassification {
    /// A data fetcher failed (returned an error or panicked)
    DataFetchingException,
    /// A non-null position resolved to null
    NullValueInNonNullableField,
    /// The request did not fit the schema (operation selection, variables)
    ValidationError,
    /// The query text could not be parsed
    InvalidSyntax,
    /// Execution stopped before producing data
    ExecutionAborted,
    /// The schema has no root type for the requested operation kind
    OperationNotSupported,
    /// A fetched value could not be completed against its declared type
    BadValue,
    /// The concrete type of an interface or union value could not be determined
    UnresolvedType,
}

impl fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A GraphQL error as it appears in the `errors` list of a response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLError {
    /// Human-readable error message
    pub message: String,

    /// Locations in the document the error refers to
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,

    /// Result path of the field the error is attached to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ResultPath>,

    /// Free-form extensions supplied by the error producer
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,

    #[serde(skip)]
    pub classification: ErrorClassification,
}

impl GraphQLError {
    /// Create an error without path or locations
    pub fn new(message: impl Into<String>, classification: ErrorClassification) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: Map::new(),
            classification,
        }
    }

    /// Shorthand for an error raised by a data fetcher
    pub fn data_fetching(message: impl Into<String>) -> Self {
        Self::new(message, ErrorClassification::DataFetchingException)
    }

    /// Attach a result path
    pub fn with_path(mut self, path: ResultPath) -> Self {
        self.path = Some(path);
        self
    }

    /// Attach document locations
    pub fn with_locations(mut self, locations: Vec<SourceLocation>) -> Self {
        self.locations = locations;
        self
    }

    /// Add one extension entry
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Error raised when a data fetcher fails for the field at `path`
    pub fn exception_while_fetching(
        path: &ResultPath,
        locations: Vec<SourceLocation>,
        cause: &anyhow::Error,
    ) -> Self {
        Self::data_fetching(format!(
            "Exception while fetching data ({}) : {}",
            path, cause
        ))
        .with_path(path.clone())
        .with_locations(locations)
    }

    /// Convert to the JSON shape of the GraphQL response format
    pub fn to_specification(&self) -> Value {
        let mut extensions = self.extensions.clone();
        extensions
            .entry("classification")
            .or_insert_with(|| Value::String(self.classification.to_string()));

        let mut map = Map::new();
        map.insert("message".to_string(), Value::String(self.message.clone()));
        if !self.locations.is_empty() {
            map.insert(
                "locations".to_string(),
                serde_json::to_value(&self.locations).unwrap_or(Value::Null),
            );
        }
        if let Some(path) = &self.path {
            map.insert("path".to_string(), path.to_value());
        }
        map.insert("extensions".to_string(), Value::Object(extensions));
        Value::Object(map)
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at {})", self.message, path),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for GraphQLError {}

// =============================================================================
// Fatal execution errors
// =============================================================================

/// Fatal conditions that stop an execution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    /// The schema has no root type for the operation kind of the request
    #[error("Schema is not configured for {operation}s.")]
    MissingRootType { operation: OperationKind },

    /// The requested operation cannot be found in the document
    #[error("{message}")]
    UnknownOperation { message: String },

    /// A variable value does not fit its declared type
    #[error("Variable '{name}' has an invalid value: {message}")]
    VariableCoercion {
        name: String,
        message: String,
        location: Option<SourceLocation>,
    },

    /// The query text is not valid GraphQL
    #[error("Invalid syntax: {message}")]
    InvalidSyntax { message: String },

    /// A batched data fetcher returned a list of the wrong length
    #[error(
        "Batched data fetcher for '{path}' returned {actual} values for {expected} sources"
    )]
    BatchSizeMismatch {
        path: ResultPath,
        expected: usize,
        actual: usize,
    },

    /// An abstract type could not be narrowed to a concrete object type
    #[error("Could not resolve the concrete type of '{abstract_type}' at '{path}'")]
    UnresolvedType {
        abstract_type: String,
        path: ResultPath,
    },

    /// The caller cancelled the execution
    #[error("Execution '{execution_id}' was cancelled")]
    Cancelled { execution_id: ExecutionId },
}

impl ExecutionError {
    /// Whether the error happens before any field is fetched
    ///
    /// Pre-execution errors are reported inside the result rather than
    /// returned as `Err`.
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            ExecutionError::MissingRootType { .. }
                | ExecutionError::UnknownOperation { .. }
                | ExecutionError::VariableCoercion { .. }
                | ExecutionError::InvalidSyntax { .. }
        )
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ExecutionError::MissingRootType { .. } => "MISSING_ROOT_TYPE",
            ExecutionError::UnknownOperation { .. } => "UNKNOWN_OPERATION",
            ExecutionError::VariableCoercion { .. } => "VARIABLE_COERCION_FAILED",
            ExecutionError::InvalidSyntax { .. } => "INVALID_SYNTAX",
            ExecutionError::BatchSizeMismatch { .. } => "BATCH_SIZE_MISMATCH",
            ExecutionError::UnresolvedType { .. } => "UNRESOLVED_TYPE",
            ExecutionError::Cancelled { .. } => "EXECUTION_CANCELLED",
        }
    }

    /// Classification used when the error is reported in a response
    pub fn classification(&self) -> ErrorClassification {
        match self {
            ExecutionError::MissingRootType { .. } => ErrorClassification::OperationNotSupported,
            ExecutionError::UnknownOperation { .. } => ErrorClassification::ValidationError,
            ExecutionError::VariableCoercion { .. } => ErrorClassification::ValidationError,
            ExecutionError::InvalidSyntax { .. } => ErrorClassification::InvalidSyntax,
            ExecutionError::UnresolvedType { .. } => ErrorClassification::UnresolvedType,
            ExecutionError::BatchSizeMismatch { .. } | ExecutionError::Cancelled { .. } => {
                ErrorClassification::ExecutionAborted
            }
        }
    }

    /// Convert to a response error
    pub fn to_graphql_error(&self) -> GraphQLError {
        let error = GraphQLError::new(self.to_string(), self.classification())
            .with_extension("code", Value::String(self.error_code().to_string()));
        match self {
            ExecutionError::VariableCoercion {
                location: Some(location),
                ..
            } => error.with_locations(vec![*location]),
            ExecutionError::BatchSizeMismatch { path, .. }
            | ExecutionError::UnresolvedType { path, .. } => error.with_path(path.clone()),
            _ => error,
        }
    }
}

// =============================================================================
// Schema errors
// =============================================================================

/// Errors raised while building a schema
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// The SDL text could not be parsed
    #[error("Failed to parse schema: {message}")]
    Parse { message: String },

    /// Two definitions share one name
    #[error("Type '{name}' is defined more than once")]
    DuplicateType { name: String },

    /// A type reference points at nothing
    #[error("Type '{name}' referenced by '{referenced_by}' is not defined")]
    UnknownType { name: String, referenced_by: String },

    /// A type is used where its kind is not allowed
    #[error("Type '{name}' cannot be used as {expected}")]
    InvalidTypeKind { name: String, expected: String },

    /// A data fetcher was registered for a field that does not exist
    #[error("Cannot register a data fetcher for unknown field '{type_name}.{field_name}'")]
    UnknownField {
        type_name: String,
        field_name: String,
    },
}

impl SchemaError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SchemaError::Parse { .. } => "SCHEMA_PARSE_ERROR",
            SchemaError::DuplicateType { .. } => "DUPLICATE_TYPE",
            SchemaError::UnknownType { .. } => "UNKNOWN_TYPE",
            SchemaError::InvalidTypeKind { .. } => "INVALID_TYPE_KIND",
            SchemaError::UnknownField { .. } => "UNKNOWN_FIELD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pre_execution_classes() {
        assert!(
            ExecutionError::MissingRootType {
                operation: OperationKind::Mutation
            }
            .is_pre_execution()
        );
        assert!(
            !ExecutionError::BatchSizeMismatch {
                path: ResultPath::root(),
                expected: 2,
                actual: 1,
            }
            .is_pre_execution()
        );
        assert!(
            !ExecutionError::Cancelled {
                execution_id: ExecutionId::from("e1")
            }
            .is_pre_execution()
        );
    }

    #[test]
    fn test_missing_root_type_message() {
        let err = ExecutionError::MissingRootType {
            operation: OperationKind::Mutation,
        };
        assert_eq!(err.to_string(), "Schema is not configured for mutations.");
        assert_eq!(err.error_code(), "MISSING_ROOT_TYPE");
        assert_eq!(
            err.classification(),
            ErrorClassification::OperationNotSupported
        );
    }

    #[test]
    fn test_graphql_error_specification_shape() {
        let error = GraphQLError::data_fetching("boom")
            .with_path(ResultPath::root().segment("a").index(1))
            .with_locations(vec![SourceLocation { line: 1, column: 3 }]);

        assert_eq!(
            error.to_specification(),
            json!({
                "message": "boom",
                "locations": [{ "line": 1, "column": 3 }],
                "path": ["a", 1],
                "extensions": { "classification": "DataFetchingException" }
            })
        );
    }

    #[test]
    fn test_user_classification_extension_is_kept() {
        let error = GraphQLError::data_fetching("boom")
            .with_extension("classification", json!("Custom"));
        assert_eq!(
            error.to_specification()["extensions"]["classification"],
            json!("Custom")
        );
    }

    #[test]
    fn test_variable_error_carries_location() {
        let err = ExecutionError::VariableCoercion {
            name: "id".to_string(),
            message: "expected Int".to_string(),
            location: Some(SourceLocation { line: 2, column: 9 }),
        };
        let error = err.to_graphql_error();
        assert_eq!(error.locations, vec![SourceLocation { line: 2, column: 9 }]);
        assert_eq!(error.classification, ErrorClassification::ValidationError);
        assert_eq!(error.extensions["code"], json!("VARIABLE_COERCION_FAILED"));
    }
}
