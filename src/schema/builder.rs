//! Fluent builder for schemas

use graphql_parser::schema::{
    Definition, InputValue, TypeDefinition as GqlTypeDefinition, parse_schema,
};
use indexmap::IndexMap;
use serde_json::Map;
use std::sync::Arc;

use super::registry::{CodeRegistry, FieldCoordinates};
use super::types::{
    EnumType, FieldDefinition, InputObjectType, InputValueDefinition, InterfaceType, ObjectType,
    ScalarType, TypeDefinition, TypeKind, TypeRef, UnionType,
};
use super::{BUILT_IN_SCALARS, Schema};
use crate::core::SchemaError;
use crate::core::value::gql_value_to_json;
use crate::fetching::{DataFetcher, TypeResolver};

/// Builder for [`Schema`]
///
/// # Example
///
/// ```ignore
/// let schema = SchemaBuilder::from_sdl(sdl)?
///     .data_fetcher("Query", "items", items_fetcher)
///     .type_resolver("Node", node_resolver)
///     .build()?;
/// ```
pub struct SchemaBuilder {
    types: IndexMap<String, TypeDefinition>,
    query_type: Option<String>,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    code_registry: CodeRegistry,
}

impl SchemaBuilder {
    /// Create a builder holding only the built-in scalars
    pub fn new() -> Self {
        let mut types = IndexMap::new();
        for name in BUILT_IN_SCALARS {
            types.insert(
                name.to_string(),
                TypeDefinition::Scalar(ScalarType {
                    name: name.to_string(),
                }),
            );
        }
        Self {
            types,
            query_type: None,
            mutation_type: None,
            subscription_type: None,
            code_registry: CodeRegistry::new(),
        }
    }

    /// Create a builder from SDL text
    ///
    /// A `schema { ... }` block sets the root types; without one the
    /// conventional `Query`, `Mutation` and `Subscription` names are used
    /// when such types exist. Type extensions are not merged.
    pub fn from_sdl(sdl: &str) -> Result<Self, SchemaError> {
        let document = parse_schema::<String>(sdl).map_err(|e| SchemaError::Parse {
            message: e.to_string(),
        })?;

        let mut builder = Self::new();
        for definition in document.definitions {
            match definition {
                Definition::SchemaDefinition(schema) => {
                    builder.query_type = schema.query;
                    builder.mutation_type = schema.mutation;
                    builder.subscription_type = schema.subscription;
                }
                Definition::TypeDefinition(definition) => {
                    let definition = convert_type_definition(definition);
                    if BUILT_IN_SCALARS.contains(&definition.name())
                        && matches!(definition, TypeDefinition::Scalar(_))
                    {
                        continue;
                    }
                    builder = builder.with_type(definition)?;
                }
                Definition::TypeExtension(extension) => {
                    tracing::warn!(?extension, "Ignoring type extension in schema SDL");
                }
                Definition::DirectiveDefinition(_) => {}
            }
        }
        Ok(builder)
    }

    /// Add a type definition
    pub fn with_type(mut self, definition: TypeDefinition) -> Result<Self, SchemaError> {
        let name = definition.name().to_string();
        if self.types.contains_key(&name) {
            return Err(SchemaError::DuplicateType { name });
        }
        self.types.insert(name, definition);
        Ok(self)
    }

    /// Set the query root type
    pub fn query_type(mut self, name: impl Into<String>) -> Self {
        self.query_type = Some(name.into());
        self
    }

    /// Set the mutation root type
    pub fn mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    /// Set the subscription root type
    pub fn subscription_type(mut self, name: impl Into<String>) -> Self {
        self.subscription_type = Some(name.into());
        self
    }

    /// Register the data fetcher of `type_name.field_name`
    pub fn data_fetcher(
        mut self,
        type_name: &str,
        field_name: &str,
        fetcher: impl DataFetcher + 'static,
    ) -> Self {
        self.code_registry
            .register_data_fetcher(FieldCoordinates::new(type_name, field_name), Arc::new(fetcher));
        self
    }

    /// Register a shared data fetcher for `type_name.field_name`
    pub fn shared_data_fetcher(
        mut self,
        type_name: &str,
        field_name: &str,
        fetcher: Arc<dyn DataFetcher>,
    ) -> Self {
        self.code_registry
            .register_data_fetcher(FieldCoordinates::new(type_name, field_name), fetcher);
        self
    }

    /// Register the type resolver of an interface or union
    pub fn type_resolver(mut self, type_name: &str, resolver: impl TypeResolver + 'static) -> Self {
        self.code_registry
            .register_type_resolver(type_name.to_string(), Arc::new(resolver));
        self
    }

    /// Replace the fetcher used for fields without a registered one
    pub fn default_data_fetcher(mut self, fetcher: impl DataFetcher + 'static) -> Self {
        self.code_registry.set_default_data_fetcher(Arc::new(fetcher));
        self
    }

    /// Validate references and build the schema
    pub fn build(mut self) -> Result<Schema, SchemaError> {
        for (kind, slot) in [
            ("Query", &mut self.query_type),
            ("Mutation", &mut self.mutation_type),
            ("Subscription", &mut self.subscription_type),
        ] {
            if slot.is_none() && matches!(self.types.get(kind), Some(TypeDefinition::Object(_))) {
                *slot = Some(kind.to_string());
            }
        }

        self.validate()?;

        Ok(Schema {
            types: self.types,
            query_type: self.query_type,
            mutation_type: self.mutation_type,
            subscription_type: self.subscription_type,
            code_registry: self.code_registry,
        })
    }

    fn validate(&self) -> Result<(), SchemaError> {
        for root in [&self.query_type, &self.mutation_type, &self.subscription_type]
            .into_iter()
            .flatten()
        {
            self.expect_kind(root, "schema", &[TypeKind::Object], "a root operation type")?;
        }

        for definition in self.types.values() {
            match definition {
                TypeDefinition::Object(object) => {
                    for interface in &object.interfaces {
                        self.expect_kind(interface, &object.name, &[TypeKind::Interface], "an interface")?;
                    }
                    self.validate_fields(&object.name, &object.fields)?;
                }
                TypeDefinition::Interface(interface) => {
                    self.validate_fields(&interface.name, &interface.fields)?;
                }
                TypeDefinition::Union(union) => {
                    for member in &union.members {
                        self.expect_kind(member, &union.name, &[TypeKind::Object], "a union member")?;
                    }
                }
                TypeDefinition::InputObject(input) => {
                    for field in input.fields.values() {
                        self.expect_input_type(&field.value_type, &input.name)?;
                    }
                }
                TypeDefinition::Scalar(_) | TypeDefinition::Enum(_) => {}
            }
        }

        for coordinates in self.code_registry.registered_fields() {
            let known = self
                .types
                .get(&coordinates.type_name)
                .and_then(TypeDefinition::fields)
                .is_some_and(|fields| fields.contains_key(&coordinates.field_name));
            if !known {
                return Err(SchemaError::UnknownField {
                    type_name: coordinates.type_name.clone(),
                    field_name: coordinates.field_name.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_fields(
        &self,
        owner: &str,
        fields: &IndexMap<String, Arc<FieldDefinition>>,
    ) -> Result<(), SchemaError> {
        for field in fields.values() {
            let referenced_by = format!("{}.{}", owner, field.name);
            self.expect_kind(
                field.field_type.named_type(),
                &referenced_by,
                &[
                    TypeKind::Scalar,
                    TypeKind::Object,
                    TypeKind::Interface,
                    TypeKind::Union,
                    TypeKind::Enum,
                ],
                "an output type",
            )?;
            for argument in field.arguments.values() {
                self.expect_input_type(&argument.value_type, &referenced_by)?;
            }
        }
        Ok(())
    }

    fn expect_input_type(&self, ty: &TypeRef, referenced_by: &str) -> Result<(), SchemaError> {
        self.expect_kind(
            ty.named_type(),
            referenced_by,
            &[TypeKind::Scalar, TypeKind::Enum, TypeKind::InputObject],
            "an input type",
        )
    }

    fn expect_kind(
        &self,
        name: &str,
        referenced_by: &str,
        allowed: &[TypeKind],
        expected: &str,
    ) -> Result<(), SchemaError> {
        let definition = self.types.get(name).ok_or_else(|| SchemaError::UnknownType {
            name: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })?;
        if !allowed.contains(&definition.kind()) {
            return Err(SchemaError::InvalidTypeKind {
                name: name.to_string(),
                expected: expected.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn convert_type_definition(definition: GqlTypeDefinition<'_, String>) -> TypeDefinition {
    match definition {
        GqlTypeDefinition::Scalar(scalar) => TypeDefinition::Scalar(ScalarType { name: scalar.name }),
        GqlTypeDefinition::Object(object) => TypeDefinition::Object(ObjectType {
            name: object.name,
            interfaces: object.implements_interfaces,
            fields: object
                .fields
                .into_iter()
                .map(|field| {
                    let definition = FieldDefinition {
                        name: field.name.clone(),
                        arguments: convert_input_values(field.arguments),
                        field_type: TypeRef::from_ast(&field.field_type),
                    };
                    (field.name, Arc::new(definition))
                })
                .collect(),
        }),
        GqlTypeDefinition::Interface(interface) => TypeDefinition::Interface(InterfaceType {
            name: interface.name,
            fields: interface
                .fields
                .into_iter()
                .map(|field| {
                    let definition = FieldDefinition {
                        name: field.name.clone(),
                        arguments: convert_input_values(field.arguments),
                        field_type: TypeRef::from_ast(&field.field_type),
                    };
                    (field.name, Arc::new(definition))
                })
                .collect(),
        }),
        GqlTypeDefinition::Union(union) => TypeDefinition::Union(UnionType {
            name: union.name,
            members: union.types,
        }),
        GqlTypeDefinition::Enum(enumeration) => TypeDefinition::Enum(EnumType {
            name: enumeration.name,
            values: enumeration.values.into_iter().map(|v| v.name).collect(),
        }),
        GqlTypeDefinition::InputObject(input) => TypeDefinition::InputObject(InputObjectType {
            name: input.name,
            fields: convert_input_values(input.fields),
        }),
    }
}

fn convert_input_values(
    values: Vec<InputValue<'_, String>>,
) -> IndexMap<String, InputValueDefinition> {
    let no_variables = Map::new();
    values
        .into_iter()
        .map(|value| {
            let definition = InputValueDefinition {
                name: value.name.clone(),
                value_type: TypeRef::from_ast(&value.value_type),
                default_value: value
                    .default_value
                    .as_ref()
                    .and_then(|default| gql_value_to_json(default, &no_variables)),
            };
            (value.name, definition)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetching::{DataFetcherValue, data_fetcher};
    use crate::schema::OperationKind;
    use serde_json::json;

    #[test]
    fn test_schema_block_sets_root_types() {
        let schema = SchemaBuilder::from_sdl(
            r#"
            schema { query: Root mutation: Changes }
            type Root { a: Int }
            type Changes { b: Int }
            "#,
        )
        .expect("sdl")
        .build()
        .expect("schema");
        assert_eq!(schema.root_type_name(OperationKind::Query), Some("Root"));
        assert_eq!(schema.root_type_name(OperationKind::Mutation), Some("Changes"));
        assert_eq!(schema.root_type_name(OperationKind::Subscription), None);
    }

    #[test]
    fn test_argument_defaults_are_converted() {
        let schema = SchemaBuilder::from_sdl(
            "type Query { items(limit: Int = 10, filter: Filter): [Int] } input Filter { q: String }",
        )
        .expect("sdl")
        .build()
        .expect("schema");
        let field = schema.field_definition("Query", "items").expect("field");
        assert_eq!(field.arguments["limit"].default_value, Some(json!(10)));
        assert_eq!(field.arguments["filter"].default_value, None);
    }

    #[test]
    fn test_unknown_type_reference_is_rejected() {
        let err = SchemaBuilder::from_sdl("type Query { a: Missing }")
            .expect("sdl")
            .build()
            .expect_err("should fail");
        assert_eq!(
            err,
            SchemaError::UnknownType {
                name: "Missing".to_string(),
                referenced_by: "Query.a".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_type_is_rejected() {
        let result = SchemaBuilder::from_sdl("type Query { a: Int } type Query { b: Int }");
        assert!(matches!(result, Err(SchemaError::DuplicateType { .. })));
    }

    #[test]
    fn test_union_member_must_be_object() {
        let err = SchemaBuilder::from_sdl("type Query { u: U } union U = Int")
            .expect("sdl")
            .build()
            .expect_err("should fail");
        assert_eq!(err.error_code(), "INVALID_TYPE_KIND");
    }

    #[test]
    fn test_fetcher_for_unknown_field_is_rejected() {
        let err = SchemaBuilder::from_sdl("type Query { a: Int }")
            .expect("sdl")
            .data_fetcher("Query", "b", data_fetcher(|_| Ok(DataFetcherValue::null())))
            .build()
            .expect_err("should fail");
        assert!(matches!(err, SchemaError::UnknownField { .. }));
    }

    #[test]
    fn test_parse_error() {
        let result = SchemaBuilder::from_sdl("type Query {");
        assert!(matches!(result, Err(SchemaError::Parse { .. })));
    }
}
