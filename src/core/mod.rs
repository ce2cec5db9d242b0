//! Core module containing the shared vocabulary of the engine

pub mod context;
pub mod error;
pub mod execution_id;
pub mod path;
pub mod value;

pub use context::{GraphQLContext, LocalContext, OpaqueContext};
pub use error::{
    ErrorClassification, ExecutionError, GraphQLError, SchemaError, SourceLocation,
};
pub use execution_id::ExecutionId;
pub use path::{PathSegment, ResultPath};
