//! Default data fetcher

use serde_json::Value;

use super::{DataFetcher, DataFetcherValue, DataFetchingEnvironment};

/// Reads the field from a JSON object source
///
/// Used for every field without a registered fetcher. The field name is
/// looked up first, then its snake_case form, so `createdAt` also finds
/// `created_at`. Anything else resolves to `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyDataFetcher;

impl PropertyDataFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Look a property up on a source value
    pub fn property(source: &Value, name: &str) -> Value {
        let Some(object) = source.as_object() else {
            return Value::Null;
        };
        if let Some(value) = object.get(name) {
            return value.clone();
        }
        object
            .get(&camel_to_snake(name))
            .cloned()
            .unwrap_or(Value::Null)
    }
}

impl DataFetcher for PropertyDataFetcher {
    fn get(&self, env: &DataFetchingEnvironment) -> anyhow::Result<DataFetcherValue> {
        let name = env
            .field_definition()
            .map(|definition| definition.name.as_str())
            .unwrap_or_else(|| env.merged_field().name());
        Ok(DataFetcherValue::Value(Self::property(env.source(), name)))
    }
}

/// Convert camelCase to snake_case
fn camel_to_snake(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
