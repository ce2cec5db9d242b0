//! Narrowing interface and union values to object types

use serde_json::{Map, Value};

use crate::core::GraphQLContext;
use crate::schema::{Schema, TypeRef};

/// Inputs available when resolving the concrete type of a value
pub struct TypeResolutionEnvironment<'a> {
    pub value: &'a Value,
    pub abstract_type: &'a str,
    pub field_type: &'a TypeRef,
    pub arguments: &'a Map<String, Value>,
    pub schema: &'a Schema,
    pub context: Option<&'a GraphQLContext>,
}

/// Resolves the object type of a value declared as an interface or union
pub trait TypeResolver: Send + Sync {
    /// Name of the object type, or `None` when it cannot be determined
    fn resolve_type(&self, env: &TypeResolutionEnvironment<'_>) -> Option<String>;
}

/// Reads the object type from the value's `__typename` property
///
/// Used for abstract types without a registered resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypenameTypeResolver;

impl TypeResolver for TypenameTypeResolver {
    fn resolve_type(&self, env: &TypeResolutionEnvironment<'_>) -> Option<String> {
        env.value
            .get("__typename")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// A [`TypeResolver`] backed by a closure
pub struct TypeResolverFn<F>(F);

impl<F> TypeResolver for TypeResolverFn<F>
where
    F: Fn(&TypeResolutionEnvironment<'_>) -> Option<String> + Send + Sync,
{
    fn resolve_type(&self, env: &TypeResolutionEnvironment<'_>) -> Option<String> {
        (self.0)(env)
    }
}

/// Wrap a closure as a type resolver
pub fn type_resolver<F>(f: F) -> TypeResolverFn<F>
where
    F: Fn(&TypeResolutionEnvironment<'_>) -> Option<String> + Send + Sync,
{
    TypeResolverFn(f)
}
