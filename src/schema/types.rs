//! Type vocabulary of a schema

use graphql_parser::query::Type as GqlType;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A reference to a type, with list and non-null wrappers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        match inner {
            TypeRef::NonNull(_) => inner,
            other => TypeRef::NonNull(Box::new(other)),
        }
    }

    /// Convert a type from a parsed document
    pub fn from_ast(ty: &GqlType<'_, String>) -> Self {
        match ty {
            GqlType::NamedType(name) => TypeRef::Named(name.clone()),
            GqlType::ListType(inner) => TypeRef::List(Box::new(Self::from_ast(inner))),
            GqlType::NonNullType(inner) => TypeRef::NonNull(Box::new(Self::from_ast(inner))),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// The type with one non-null wrapper removed
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }

    /// Whether the type is a list once non-null is stripped
    pub fn is_list(&self) -> bool {
        matches!(self.nullable(), TypeRef::List(_))
    }

    /// Name of the innermost named type
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    /// The same wrappers around a different named type
    pub fn with_named_type(&self, name: &str) -> TypeRef {
        match self {
            TypeRef::Named(_) => TypeRef::Named(name.to_string()),
            TypeRef::List(inner) => TypeRef::List(Box::new(inner.with_named_type(name))),
            TypeRef::NonNull(inner) => TypeRef::NonNull(Box::new(inner.with_named_type(name))),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

/// The operation kinds a schema can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Query => write!(f, "query"),
            OperationKind::Mutation => write!(f, "mutation"),
            OperationKind::Subscription => write!(f, "subscription"),
        }
    }
}

/// An argument or input field definition
#[derive(Debug, Clone, PartialEq)]
pub struct InputValueDefinition {
    pub name: String,
    pub value_type: TypeRef,
    pub default_value: Option<Value>,
}

/// An output field definition
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub arguments: IndexMap<String, InputValueDefinition>,
    pub field_type: TypeRef,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
            field_type,
        }
    }

    /// Add an argument definition
    pub fn with_argument(mut self, argument: InputValueDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarType {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub interfaces: Vec<String>,
    pub fields: IndexMap<String, Arc<FieldDefinition>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    pub name: String,
    pub fields: IndexMap<String, Arc<FieldDefinition>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputObjectType {
    pub name: String,
    pub fields: IndexMap<String, InputValueDefinition>,
}

/// Broad kind of a named type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

/// A named type of the schema
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(t) => &t.name,
            TypeDefinition::Object(t) => &t.name,
            TypeDefinition::Interface(t) => &t.name,
            TypeDefinition::Union(t) => &t.name,
            TypeDefinition::Enum(t) => &t.name,
            TypeDefinition::InputObject(t) => &t.name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDefinition::Scalar(_) => TypeKind::Scalar,
            TypeDefinition::Object(_) => TypeKind::Object,
            TypeDefinition::Interface(_) => TypeKind::Interface,
            TypeDefinition::Union(_) => TypeKind::Union,
            TypeDefinition::Enum(_) => TypeKind::Enum,
            TypeDefinition::InputObject(_) => TypeKind::InputObject,
        }
    }

    /// Interfaces and unions
    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeDefinition::Interface(_) | TypeDefinition::Union(_))
    }

    /// Output fields of objects and interfaces
    pub fn fields(&self) -> Option<&IndexMap<String, Arc<FieldDefinition>>> {
        match self {
            TypeDefinition::Object(t) => Some(&t.fields),
            TypeDefinition::Interface(t) => Some(&t.fields),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_display_and_unwrap() {
        let ty = TypeRef::non_null(TypeRef::list(TypeRef::non_null(TypeRef::named("Item"))));
        assert_eq!(ty.to_string(), "[Item!]!");
        assert!(ty.is_non_null());
        assert!(ty.is_list());
        assert_eq!(ty.named_type(), "Item");
        assert_eq!(ty.nullable().to_string(), "[Item!]");
    }

    #[test]
    fn test_with_named_type_keeps_wrappers() {
        let ty = TypeRef::non_null(TypeRef::named("Node"));
        assert_eq!(ty.with_named_type("User").to_string(), "User!");
    }

    #[test]
    fn test_non_null_is_idempotent() {
        let ty = TypeRef::non_null(TypeRef::non_null(TypeRef::named("Int")));
        assert_eq!(ty.to_string(), "Int!");
    }
}
