//! Registry of data fetchers and type resolvers

use std::collections::HashMap;
use std::sync::Arc;

use crate::fetching::{DataFetcher, PropertyDataFetcher, TypeResolver, TypenameTypeResolver};

/// Coordinates of a field: `(parent type, field name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldCoordinates {
    pub type_name: String,
    pub field_name: String,
}

impl FieldCoordinates {
    pub fn new(type_name: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            field_name: field_name.into(),
        }
    }
}

impl std::fmt::Display for FieldCoordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.type_name, self.field_name)
    }
}

/// Maps fields to their data fetchers and abstract types to their resolvers
///
/// Fields without a registered fetcher use [`PropertyDataFetcher`]; abstract
/// types without a registered resolver use [`TypenameTypeResolver`].
#[derive(Clone)]
pub struct CodeRegistry {
    data_fetchers: HashMap<FieldCoordinates, Arc<dyn DataFetcher>>,
    type_resolvers: HashMap<String, Arc<dyn TypeResolver>>,
    default_data_fetcher: Arc<dyn DataFetcher>,
    default_type_resolver: Arc<dyn TypeResolver>,
}

impl CodeRegistry {
    pub fn new() -> Self {
        Self {
            data_fetchers: HashMap::new(),
            type_resolvers: HashMap::new(),
            default_data_fetcher: Arc::new(PropertyDataFetcher::new()),
            default_type_resolver: Arc::new(TypenameTypeResolver),
        }
    }

    /// Register the fetcher of one field
    pub fn register_data_fetcher(
        &mut self,
        coordinates: FieldCoordinates,
        fetcher: Arc<dyn DataFetcher>,
    ) {
        self.data_fetchers.insert(coordinates, fetcher);
    }

    /// Register the resolver of one interface or union
    pub fn register_type_resolver(&mut self, type_name: String, resolver: Arc<dyn TypeResolver>) {
        self.type_resolvers.insert(type_name, resolver);
    }

    /// Replace the fetcher used for unregistered fields
    pub fn set_default_data_fetcher(&mut self, fetcher: Arc<dyn DataFetcher>) {
        self.default_data_fetcher = fetcher;
    }

    /// Fetcher for a field, falling back to the default one
    pub fn data_fetcher(&self, type_name: &str, field_name: &str) -> Arc<dyn DataFetcher> {
        self.data_fetchers
            .get(&FieldCoordinates::new(type_name, field_name))
            .cloned()
            .unwrap_or_else(|| self.default_data_fetcher.clone())
    }

    /// Whether a fetcher was registered explicitly for the field
    pub fn has_data_fetcher(&self, type_name: &str, field_name: &str) -> bool {
        self.data_fetchers
            .contains_key(&FieldCoordinates::new(type_name, field_name))
    }

    /// Resolver for an abstract type, falling back to the default one
    pub fn type_resolver(&self, type_name: &str) -> Arc<dyn TypeResolver> {
        self.type_resolvers
            .get(type_name)
            .cloned()
            .unwrap_or_else(|| self.default_type_resolver.clone())
    }

    pub(crate) fn registered_fields(&self) -> impl Iterator<Item = &FieldCoordinates> {
        self.data_fetchers.keys()
    }
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields: Vec<String> = self.data_fetchers.keys().map(|c| c.to_string()).collect();
        fields.sort();
        let mut resolvers: Vec<&String> = self.type_resolvers.keys().collect();
        resolvers.sort();
        f.debug_struct("CodeRegistry")
            .field("data_fetchers", &fields)
            .field("type_resolvers", &resolvers)
            .finish()
    }
}
