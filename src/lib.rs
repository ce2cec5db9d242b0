//! # This-GraphQL Engine
//!
//! An asynchronous GraphQL execution engine.
//!
//! ## Features
//!
//! - **Persistent Result Tree**: Resolved subtrees are spliced back with zippers, sharing every untouched node
//! - **Two Strategies**: Depth-first resolution or breadth-synchronous batched resolution, with identical results
//! - **Batched Fetchers**: One call per field shape and round when a fetcher opts into batching
//! - **Null Propagation**: Non-null violations null the nearest nullable ancestor
//! - **Uniform Fetch Outcomes**: Immediate values, futures, structured results, errors and panics all end up as field values or field errors
//! - **Instrumentation**: Chainable hooks around execution, parsing, operations and field fetches
//! - **Configuration-Based**: Strategy, fan-out limit and panic capture loadable from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use this_graphql::prelude::*;
//!
//! let schema = SchemaBuilder::from_sdl(r#"
//!     type Query { items: [Item!] }
//!     type Item { id: ID! name: String }
//! "#)?
//! .data_fetcher("Query", "items", data_fetcher(|_| {
//!     Ok(json!([{ "id": "1", "name": "x" }, { "id": "2", "name": null }]).into())
//! }))
//! .build()?;
//!
//! let engine = GraphQL::builder(schema).build();
//! let result = engine.execute(ExecutionInput::new("{ items { id name } }")).await?;
//! println!("{}", result.to_specification());
//! ```

pub mod config;
pub mod core;
pub mod engine;
pub mod execution;
pub mod fetching;
pub mod instrumentation;
pub mod schema;

pub use engine::{GraphQL, GraphQLBuilder};

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Engine ===
    pub use crate::engine::{GraphQL, GraphQLBuilder};

    // === Core ===
    pub use crate::core::{
        ErrorClassification, ExecutionError, ExecutionId, GraphQLContext, GraphQLError,
        LocalContext, OpaqueContext, ResultPath, SchemaError, SourceLocation,
    };

    // === Schema ===
    pub use crate::schema::{Schema, SchemaBuilder, TypeRef};

    // === Data Fetching ===
    pub use crate::fetching::{
        DataFetcher, DataFetcherResult, DataFetcherValue, DataFetchingEnvironment,
        PropertyDataFetcher, TypeResolutionEnvironment, TypeResolver, batched_data_fetcher,
        data_fetcher, type_resolver,
    };

    // === Execution ===
    pub use crate::execution::{
        BatchedExecutionStrategy, DefaultExecutionStrategy, ExecutionInput, ExecutionResult,
        ExecutionStrategy,
    };

    // === Instrumentation ===
    pub use crate::instrumentation::{
        ChainedInstrumentation, Instrumentation, InstrumentationContext, InstrumentationState,
        SimpleInstrumentation, TracingInstrumentation,
    };

    // === Config ===
    pub use crate::config::{ExecutionConfig, StrategyKind};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde_json::{Value, json};
}
