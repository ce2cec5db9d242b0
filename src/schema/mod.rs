//! Schema model consumed by the execution engine
//!
//! A [`Schema`] is a validated set of named types, the root operation types
//! and a [`CodeRegistry`] mapping fields to data fetchers. It is built with
//! [`SchemaBuilder`], usually from SDL text:
//!
//! ```rust,ignore
//! let schema = SchemaBuilder::from_sdl("type Query { hello: String }")?
//!     .data_fetcher("Query", "hello", data_fetcher(|_| Ok(DataFetcherValue::ready("world"))))
//!     .build()?;
//! ```

mod builder;
mod registry;
mod types;

pub use builder::SchemaBuilder;
pub use registry::{CodeRegistry, FieldCoordinates};
pub use types::{
    EnumType, FieldDefinition, InputObjectType, InputValueDefinition, InterfaceType,
    ObjectType, OperationKind, ScalarType, TypeDefinition, TypeKind, TypeRef, UnionType,
};

use indexmap::IndexMap;
use std::sync::Arc;

/// Names of the scalars every schema provides
pub const BUILT_IN_SCALARS: [&str; 5] = ["Int", "Float", "String", "Boolean", "ID"];

/// A validated GraphQL schema
#[derive(Debug, Clone)]
pub struct Schema {
    types: IndexMap<String, TypeDefinition>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    code_registry: CodeRegistry,
}

impl Schema {
    /// Start building a schema from SDL text
    pub fn builder(sdl: &str) -> Result<SchemaBuilder, crate::core::SchemaError> {
        SchemaBuilder::from_sdl(sdl)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// Name of the root type for an operation kind, if configured
    pub fn root_type_name(&self, kind: OperationKind) -> Option<&str> {
        match kind {
            OperationKind::Query => self.query_type.as_deref(),
            OperationKind::Mutation => self.mutation_type.as_deref(),
            OperationKind::Subscription => self.subscription_type.as_deref(),
        }
    }

    /// Root object type for an operation kind, if configured
    pub fn root_type(&self, kind: OperationKind) -> Option<&ObjectType> {
        self.root_type_name(kind)
            .and_then(|name| self.object_type(name))
    }

    /// Field definition on an object or interface type
    pub fn field_definition(&self, type_name: &str, field_name: &str) -> Option<&Arc<FieldDefinition>> {
        self.types
            .get(type_name)
            .and_then(TypeDefinition::fields)
            .and_then(|fields| fields.get(field_name))
    }

    /// Object types a value of the given type can have at runtime
    ///
    /// For an object type this is the type itself, for a union its members
    /// and for an interface every object type implementing it.
    pub fn possible_types(&self, type_name: &str) -> Vec<&ObjectType> {
        match self.types.get(type_name) {
            Some(TypeDefinition::Object(object)) => vec![object],
            Some(TypeDefinition::Union(union)) => union
                .members
                .iter()
                .filter_map(|member| self.object_type(member))
                .collect(),
            Some(TypeDefinition::Interface(interface)) => self
                .types
                .values()
                .filter_map(|definition| match definition {
                    TypeDefinition::Object(object)
                        if object.interfaces.iter().any(|i| *i == interface.name) =>
                    {
                        Some(object)
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether `object_type` is a possible runtime type of `type_name`
    pub fn is_possible_type(&self, type_name: &str, object_type: &str) -> bool {
        match self.types.get(type_name) {
            Some(TypeDefinition::Object(object)) => object.name == object_type,
            Some(TypeDefinition::Union(union)) => union.members.iter().any(|m| m == object_type),
            Some(TypeDefinition::Interface(interface)) => self
                .object_type(object_type)
                .is_some_and(|object| object.interfaces.iter().any(|i| *i == interface.name)),
            _ => false,
        }
    }

    pub fn code_registry(&self) -> &CodeRegistry {
        &self.code_registry
    }
}
