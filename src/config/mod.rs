//! Configuration loading and management

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Which execution strategy the engine runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Depth-first, one fetch per field and source
    #[default]
    Default,
    /// Breadth-synchronous, one fetch per field shape and round
    Batched,
}

/// Execution settings of a [`GraphQL`](crate::GraphQL) engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Strategy used when none is set explicitly on the engine builder
    pub strategy: StrategyKind,

    /// Upper bound of sibling fetches in flight at once (unbounded when absent)
    pub max_concurrent_fetches: Option<usize>,

    /// Turn panics inside data fetchers into field errors
    pub capture_panics: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Default,
            max_concurrent_fetches: None,
            capture_panics: true,
        }
    }
}

impl ExecutionConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = Some(limit);
        self
    }

    pub fn with_capture_panics(mut self, capture: bool) -> Self {
        self.capture_panics = capture;
        self
    }

    /// Fan-out limit, ignoring a configured zero
    pub(crate) fn fetch_limit(&self) -> Option<usize> {
        self.max_concurrent_fetches.filter(|limit| *limit > 0)
    }
}
