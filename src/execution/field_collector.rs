//! Field collection
//!
//! Flattens a selection set into the fields that apply to one concrete object
//! type, following fragment spreads and inline fragments and honoring the
//! `@skip` and `@include` directives. Fields sharing a result key are merged.

use graphql_parser::query::{Directive, Selection, TypeCondition};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use super::{AstField, AstFragmentDefinition, AstSelectionSet, MergedField, MergedSelectionSet};
use crate::core::value::gql_value_to_json;
use crate::schema::Schema;

/// Inputs of one field collection
pub struct FieldCollectorParameters<'a> {
    pub schema: &'a Schema,
    /// The concrete object type the fields are selected on
    pub object_type: &'a str,
    pub fragments: &'a HashMap<String, AstFragmentDefinition>,
    pub variables: &'a Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldCollector;

impl FieldCollector {
    pub fn new() -> Self {
        Self
    }

    /// Collect the sub-selections of every field merged into `merged_field`
    pub fn collect_fields(
        &self,
        params: &FieldCollectorParameters<'_>,
        merged_field: &MergedField,
    ) -> MergedSelectionSet {
        let mut collected = IndexMap::new();
        let mut visited = HashSet::new();
        for field in merged_field.fields() {
            self.collect(params, &field.selection_set, &mut visited, &mut collected);
        }
        Self::merge(collected)
    }

    /// Collect the top-level selection set of an operation
    pub fn collect_root_fields(
        &self,
        params: &FieldCollectorParameters<'_>,
        selection_set: &AstSelectionSet,
    ) -> MergedSelectionSet {
        let mut collected = IndexMap::new();
        let mut visited = HashSet::new();
        self.collect(params, selection_set, &mut visited, &mut collected);
        Self::merge(collected)
    }

    fn merge(collected: IndexMap<String, Vec<AstField>>) -> MergedSelectionSet {
        MergedSelectionSet::new(
            collected
                .into_iter()
                .map(|(key, fields)| (key, MergedField::from_fields(fields)))
                .collect(),
        )
    }

    fn collect(
        &self,
        params: &FieldCollectorParameters<'_>,
        selection_set: &AstSelectionSet,
        visited_fragments: &mut HashSet<String>,
        collected: &mut IndexMap<String, Vec<AstField>>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if !self.should_include(params, &field.directives) {
                        continue;
                    }
                    let key = field.alias.as_ref().unwrap_or(&field.name).clone();
                    collected.entry(key).or_default().push(field.clone());
                }
                Selection::InlineFragment(fragment) => {
                    if !self.should_include(params, &fragment.directives) {
                        continue;
                    }
                    if let Some(condition) = &fragment.type_condition
                        && !self.does_condition_match(params, condition)
                    {
                        continue;
                    }
                    self.collect(params, &fragment.selection_set, visited_fragments, collected);
                }
                Selection::FragmentSpread(spread) => {
                    if !self.should_include(params, &spread.directives)
                        || !visited_fragments.insert(spread.fragment_name.clone())
                    {
                        continue;
                    }
                    let Some(fragment) = params.fragments.get(&spread.fragment_name) else {
                        tracing::warn!(fragment = %spread.fragment_name, "Unknown fragment");
                        continue;
                    };
                    if !self.does_condition_match(params, &fragment.type_condition) {
                        continue;
                    }
                    self.collect(params, &fragment.selection_set, visited_fragments, collected);
                }
            }
        }
    }

    fn does_condition_match(
        &self,
        params: &FieldCollectorParameters<'_>,
        condition: &TypeCondition<'static, String>,
    ) -> bool {
        let TypeCondition::On(type_name) = condition;
        type_name == params.object_type || params.schema.is_possible_type(type_name, params.object_type)
    }

    fn should_include(
        &self,
        params: &FieldCollectorParameters<'_>,
        directives: &[Directive<'static, String>],
    ) -> bool {
        let condition = |name: &str| {
            directives
                .iter()
                .find(|directive| directive.name == name)
                .and_then(|directive| {
                    directive
                        .arguments
                        .iter()
                        .find(|(arg, _)| arg == "if")
                        .and_then(|(_, value)| gql_value_to_json(value, params.variables))
                })
                .and_then(|value| value.as_bool())
        };
        condition("skip") != Some(true) && condition("include") != Some(false)
    }
}
