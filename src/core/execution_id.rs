//! Execution identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies one execution, used in logs and instrumentation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// A fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
