//! Variable coercion and argument values

use graphql_parser::query::Value as GqlValue;
use serde_json::{Map, Value, json};

use super::AstVariableDefinition;
use crate::core::value::gql_value_to_json;
use crate::core::{ExecutionError, SourceLocation};
use crate::schema::{FieldDefinition, Schema, TypeDefinition, TypeRef};

/// Coerce the provided variable values against the operation's definitions
///
/// Variables that are neither provided nor defaulted are left out, so
/// arguments referring to them fall back to their own defaults.
pub fn coerce_variable_values(
    schema: &Schema,
    definitions: &[AstVariableDefinition],
    inputs: &Map<String, Value>,
) -> Result<Map<String, Value>, ExecutionError> {
    let no_variables = Map::new();
    let mut coerced = Map::new();

    for definition in definitions {
        let ty = TypeRef::from_ast(&definition.var_type);
        let fail = |message: String| ExecutionError::VariableCoercion {
            name: definition.name.clone(),
            message,
            location: Some(SourceLocation::from(definition.position)),
        };

        match inputs.get(&definition.name) {
            Some(value) => {
                let value = coerce_input_value(schema, &ty, value).map_err(fail)?;
                coerced.insert(definition.name.clone(), value);
            }
            None => {
                if let Some(default) = definition
                    .default_value
                    .as_ref()
                    .and_then(|default| gql_value_to_json(default, &no_variables))
                {
                    coerced.insert(definition.name.clone(), default);
                } else if ty.is_non_null() {
                    return Err(fail(format!(
                        "a value of non-null type '{}' must be provided",
                        ty
                    )));
                }
            }
        }
    }
    Ok(coerced)
}

/// Coerce one input value against an input type
pub fn coerce_input_value(schema: &Schema, ty: &TypeRef, value: &Value) -> Result<Value, String> {
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return Err(format!("null is not allowed for non-null type '{}'", ty));
            }
            coerce_input_value(schema, inner, value)
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_input_value(schema, inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_input_value(schema, inner, single)?])),
        },
        TypeRef::Named(name) => match schema.get_type(name) {
            Some(TypeDefinition::Scalar(_)) => coerce_scalar_input(name, value),
            Some(TypeDefinition::Enum(enumeration)) => match value.as_str() {
                Some(name) if enumeration.values.iter().any(|v| v == name) => Ok(value.clone()),
                _ => Err(format!(
                    "'{}' is not a value of enum '{}'",
                    value, enumeration.name
                )),
            },
            Some(TypeDefinition::InputObject(input)) => {
                let Value::Object(provided) = value else {
                    return Err(format!("expected an object for '{}' but got '{}'", name, value));
                };
                if let Some(unknown) = provided.keys().find(|key| !input.fields.contains_key(*key)) {
                    return Err(format!("'{}' is not a field of input type '{}'", unknown, name));
                }
                let mut object = Map::new();
                for (field_name, field) in &input.fields {
                    match provided.get(field_name) {
                        Some(field_value) => {
                            let coerced = coerce_input_value(schema, &field.value_type, field_value)
                                .map_err(|message| format!("{}.{}: {}", name, field_name, message))?;
                            object.insert(field_name.clone(), coerced);
                        }
                        None => {
                            if let Some(default) = &field.default_value {
                                object.insert(field_name.clone(), default.clone());
                            } else if field.value_type.is_non_null() {
                                return Err(format!(
                                    "missing required field '{}' of input type '{}'",
                                    field_name, name
                                ));
                            }
                        }
                    }
                }
                Ok(Value::Object(object))
            }
            Some(_) => Err(format!("'{}' is not an input type", name)),
            None => Err(format!("unknown type '{}'", name)),
        },
    }
}

fn coerce_scalar_input(scalar: &str, value: &Value) -> Result<Value, String> {
    let coerced = match (scalar, value) {
        ("Int", Value::Number(n)) => n
            .as_i64()
            .filter(|i| *i >= i32::MIN as i64 && *i <= i32::MAX as i64)
            .map(|i| json!(i)),
        ("Float", Value::Number(n)) => n.as_f64().map(|f| json!(f)),
        ("String", Value::String(_)) | ("Boolean", Value::Bool(_)) | ("ID", Value::String(_)) => {
            Some(value.clone())
        }
        ("ID", Value::Number(n)) if n.is_i64() || n.is_u64() => Some(Value::String(n.to_string())),
        ("Int" | "Float" | "String" | "Boolean" | "ID", _) => None,
        _ => Some(value.clone()),
    };
    coerced.ok_or_else(|| format!("'{}' is not a valid '{}'", value, scalar))
}

/// Argument values of a field occurrence
///
/// Literals and variables are converted to JSON. Arguments that are absent
/// (or refer to an absent variable) take the definition's default, if any.
/// Without a definition every provided argument is converted as is.
pub fn argument_values(
    definition: Option<&FieldDefinition>,
    arguments: &[(String, GqlValue<'static, String>)],
    variables: &Map<String, Value>,
) -> Map<String, Value> {
    let provided = |name: &str| {
        arguments
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .and_then(|(_, value)| gql_value_to_json(value, variables))
    };

    let mut values = Map::new();
    match definition {
        Some(definition) => {
            for (name, argument) in &definition.arguments {
                if let Some(value) = provided(name).or_else(|| argument.default_value.clone()) {
                    values.insert(name.clone(), value);
                }
            }
        }
        None => {
            for (name, value) in arguments {
                if let Some(value) = gql_value_to_json(value, variables) {
                    values.insert(name.clone(), value);
                }
            }
        }
    }
    values
}
