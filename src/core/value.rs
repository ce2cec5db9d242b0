//! Value conversion between the GraphQL AST and JSON, and leaf serialization

use graphql_parser::query::Value as GqlValue;
use serde_json::{Map, Number, Value, json};

/// Convert a GraphQL literal to JSON, substituting variables
///
/// Returns `None` when the value is a variable that was not provided, so
/// callers can tell "absent" apart from an explicit `null`. Absent variables
/// nested in a list become `null`; nested in an object they are omitted.
pub fn gql_value_to_json(value: &GqlValue<'_, String>, variables: &Map<String, Value>) -> Option<Value> {
    let converted = match value {
        GqlValue::Variable(name) => return variables.get(name.as_str()).cloned(),
        GqlValue::Null => Value::Null,
        GqlValue::Int(i) => i.as_i64().map(|i| json!(i)).unwrap_or(Value::Null),
        GqlValue::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        GqlValue::String(s) => json!(s),
        GqlValue::Boolean(b) => json!(b),
        GqlValue::Enum(e) => json!(e),
        GqlValue::List(list) => Value::Array(
            list.iter()
                .map(|item| gql_value_to_json(item, variables).unwrap_or(Value::Null))
                .collect(),
        ),
        GqlValue::Object(obj) => {
            let mut map = Map::new();
            for (k, v) in obj {
                if let Some(v) = gql_value_to_json(v, variables) {
                    map.insert(k.clone(), v);
                }
            }
            Value::Object(map)
        }
    };
    Some(converted)
}

/// Serialize a fetched value as one of the built-in scalars
///
/// Custom scalars pass through unchanged. The error string describes why
/// the value does not fit.
pub fn serialize_scalar(scalar: &str, value: &Value) -> Result<Value, String> {
    match scalar {
        "Int" => serialize_int(value),
        "Float" => serialize_float(value),
        "String" => serialize_string(value),
        "Boolean" => serialize_boolean(value),
        "ID" => serialize_id(value),
        _ => Ok(value.clone()),
    }
}

fn serialize_int(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(i) if i >= i32::MIN as i64 && i <= i32::MAX as i64 => Ok(json!(i)),
        _ => Err(format!("Expected a value that can be converted to type 'Int' but it was '{}'", value)),
    }
}

fn serialize_float(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    parsed
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| {
            format!("Expected a value that can be converted to type 'Float' but it was '{}'", value)
        })
}

fn serialize_string(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        _ => Err(format!("Expected a value that can be converted to type 'String' but it was '{}'", value)),
    }
}

fn serialize_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        _ => Err(format!("Expected a value that can be converted to type 'Boolean' but it was '{}'", value)),
    }
}

fn serialize_id(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
        _ => Err(format!("Expected a value that can be converted to type 'ID' but it was '{}'", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_parser::query::{Definition, OperationDefinition, Selection, parse_query};

    fn first_argument(query: &str) -> GqlValue<'static, String> {
        let doc = parse_query::<String>(query).expect("valid query").into_static();
        let Some(Definition::Operation(OperationDefinition::SelectionSet(set))) =
            doc.definitions.into_iter().next()
        else {
            panic!("expected a shorthand query");
        };
        let Some(Selection::Field(field)) = set.items.into_iter().next() else {
            panic!("expected a field");
        };
        field.arguments.into_iter().next().expect("an argument").1
    }

    #[test]
    fn test_literals_convert_to_json() {
        let value = first_argument(r#"{ f(a: {x: 1, y: [true, "s", ENUM_V, null, 1.5]}) }"#);
        assert_eq!(
            gql_value_to_json(&value, &Map::new()),
            Some(json!({"x": 1, "y": [true, "s", "ENUM_V", null, 1.5]}))
        );
    }

    #[test]
    fn test_variables_substituted_or_absent() {
        let mut variables = Map::new();
        variables.insert("present".to_string(), json!(42));

        let present = first_argument("{ f(a: $present) }");
        assert_eq!(gql_value_to_json(&present, &variables), Some(json!(42)));

        let absent = first_argument("{ f(a: $absent) }");
        assert_eq!(gql_value_to_json(&absent, &variables), None);

        let nested = first_argument("{ f(a: {keep: $present, drop: $absent}) }");
        assert_eq!(
            gql_value_to_json(&nested, &variables),
            Some(json!({"keep": 42}))
        );
    }

    #[test]
    fn test_int_serialization() {
        assert_eq!(serialize_scalar("Int", &json!(7)), Ok(json!(7)));
        assert_eq!(serialize_scalar("Int", &json!("12")), Ok(json!(12)));
        assert_eq!(serialize_scalar("Int", &json!(3.0)), Ok(json!(3)));
        assert!(serialize_scalar("Int", &json!(3.5)).is_err());
        assert!(serialize_scalar("Int", &json!(i64::MAX)).is_err());
        assert!(serialize_scalar("Int", &json!({"a": 1})).is_err());
    }

    #[test]
    fn test_string_id_boolean_serialization() {
        assert_eq!(serialize_scalar("String", &json!(1)), Ok(json!("1")));
        assert_eq!(serialize_scalar("ID", &json!(10)), Ok(json!("10")));
        assert!(serialize_scalar("ID", &json!(1.5)).is_err());
        assert_eq!(serialize_scalar("Boolean", &json!("TRUE")), Ok(json!(true)));
        assert!(serialize_scalar("Boolean", &json!(1)).is_err());
    }

    #[test]
    fn test_custom_scalars_pass_through() {
        let value = json!({"lat": 1.0, "lng": 2.0});
        assert_eq!(serialize_scalar("GeoPoint", &value), Ok(value.clone()));
    }
}
