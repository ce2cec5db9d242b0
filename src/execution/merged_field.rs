//! Field groups and sub-selections

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use super::{AstField, ExecutionStepInfo};
use crate::core::{LocalContext, SourceLocation};

/// The document fields that target one result position
///
/// `{ a a }` or the same field selected through two fragments collapse into
/// one merged field. Never empty.
#[derive(Debug, Clone)]
pub struct MergedField {
    fields: Arc<Vec<AstField>>,
}

impl MergedField {
    /// A merged field made of a single document field
    pub fn new(field: AstField) -> Self {
        Self {
            fields: Arc::new(vec![field]),
        }
    }

    pub(crate) fn from_fields(fields: Vec<AstField>) -> Self {
        debug_assert!(!fields.is_empty(), "a merged field needs at least one field");
        Self {
            fields: Arc::new(fields),
        }
    }

    /// The first document field, which carries name and arguments
    pub fn single_field(&self) -> &AstField {
        &self.fields[0]
    }

    pub fn fields(&self) -> &[AstField] {
        &self.fields
    }

    /// Name of the schema field
    pub fn name(&self) -> &str {
        &self.single_field().name
    }

    /// Key of the field in the result (alias or name)
    pub fn result_key(&self) -> &str {
        let field = self.single_field();
        field.alias.as_deref().unwrap_or(&field.name)
    }

    /// Document locations of every merged field
    pub fn locations(&self) -> Vec<SourceLocation> {
        self.fields
            .iter()
            .map(|field| SourceLocation::from(field.position))
            .collect()
    }

    /// Identity of the merged field within the document
    ///
    /// Two merged fields with the same shape come from the same document
    /// fields and therefore share sub-selections and arguments.
    pub fn shape(&self) -> Vec<(usize, usize)> {
        self.fields
            .iter()
            .map(|field| (field.position.line, field.position.column))
            .collect()
    }

    /// Whether any merged field has a sub-selection
    pub fn has_sub_selection(&self) -> bool {
        self.fields
            .iter()
            .any(|field| !field.selection_set.items.is_empty())
    }
}

/// Merged fields of one selection set, keyed by result key in document order
#[derive(Debug, Clone, Default)]
pub struct MergedSelectionSet {
    fields: IndexMap<String, MergedField>,
}

impl MergedSelectionSet {
    pub(crate) fn new(fields: IndexMap<String, MergedField>) -> Self {
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&MergedField> {
        self.fields.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn into_keys(self) -> impl Iterator<Item = String> {
        self.fields.into_keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MergedField)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Everything needed to fetch the fields selected on one object
#[derive(Debug, Clone)]
pub struct FieldSubSelection {
    /// Value of the object, the source of every selected field
    pub source: Arc<Value>,
    /// Local context inherited by the selected fields
    pub local_context: Option<LocalContext>,
    pub merged_selection_set: MergedSelectionSet,
    /// Step of the object itself
    pub step_info: Arc<ExecutionStepInfo>,
    /// Fetch the fields one after another (mutation root fields)
    pub serial: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphql_parser::query::{Definition, OperationDefinition, Selection, parse_query};

    fn fields(query: &str) -> Vec<AstField> {
        let document = parse_query::<String>(query).unwrap().into_static();
        let Some(Definition::Operation(OperationDefinition::SelectionSet(set))) =
            document.definitions.into_iter().next()
        else {
            panic!("expected a selection set");
        };
        set.items
            .into_iter()
            .filter_map(|selection| match selection {
                Selection::Field(field) => Some(field),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_result_key_prefers_alias() {
        let merged = MergedField::from_fields(fields("{ first: item(id: 1) item }"));
        assert_eq!(merged.name(), "item");
        assert_eq!(merged.result_key(), "first");
        assert_eq!(merged.fields().len(), 2);
    }

    #[test]
    fn test_locations_and_shape() {
        let merged = MergedField::from_fields(fields("{ a\n  a }"));
        assert_eq!(
            merged.locations(),
            vec![
                SourceLocation { line: 1, column: 3 },
                SourceLocation { line: 2, column: 3 }
            ]
        );
        assert_eq!(merged.shape(), vec![(1, 3), (2, 3)]);
    }

    #[test]
    fn test_sub_selection_detection() {
        assert!(MergedField::from_fields(fields("{ a { b } }")).has_sub_selection());
        assert!(!MergedField::from_fields(fields("{ a }")).has_sub_selection());
    }
}
