//! Result paths
//!
//! A [`ResultPath`] addresses one position of the response: a sequence of
//! result keys and list indices starting at the root.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// One step of a [`ResultPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A result key (field name or alias)
    Key(String),
    /// A list index
    Index(usize),
}

/// Path of a field or list element in the result tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ResultPath {
    segments: Vec<PathSegment>,
}

impl ResultPath {
    /// The empty path
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from segments
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// A new path extended with a result key
    pub fn segment(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Key(key.into()));
        Self { segments }
    }

    /// A new path extended with a list index
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path without its last segment, `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// JSON array form used in responses
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.segments
                .iter()
                .map(|segment| match segment {
                    PathSegment::Key(key) => Value::String(key.clone()),
                    PathSegment::Index(index) => Value::from(*index),
                })
                .collect(),
        )
    }
}

impl fmt::Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => write!(f, "/{}", key)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for ResultPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter
                .into_iter()
                .map(|key| PathSegment::Key(key.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_mixes_keys_and_indices() {
        let path = ResultPath::root().segment("items").index(2).segment("name");
        assert_eq!(path.to_string(), "/items[2]/name");
        assert_eq!(ResultPath::root().to_string(), "/");
    }

    #[test]
    fn test_json_form() {
        let path = ResultPath::root().segment("a").index(0).segment("b");
        assert_eq!(path.to_value(), json!(["a", 0, "b"]));
        assert_eq!(serde_json::to_value(&path).unwrap(), json!(["a", 0, "b"]));
    }

    #[test]
    fn test_parent() {
        let path: ResultPath = ["a", "b"].into_iter().collect();
        assert_eq!(path.parent(), Some(ResultPath::root().segment("a")));
        assert_eq!(ResultPath::root().parent(), None);
    }
}
