//! Configuration loading tests
//!
//! Engines are built from YAML files and must behave like engines built in
//! code with the same settings.

mod engine_harness;

use engine_harness::*;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use this_graphql::prelude::*;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(yaml.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_config_from_file() {
    let file = write_config(
        r#"
strategy: batched
max_concurrent_fetches: 8
capture_panics: false
"#,
    );

    let config = ExecutionConfig::from_yaml_file(file.path()).unwrap();

    assert_eq!(
        config,
        ExecutionConfig::default()
            .with_strategy(StrategyKind::Batched)
            .with_max_concurrent_fetches(8)
            .with_capture_panics(false)
    );
}

#[test]
fn test_empty_mapping_uses_defaults() {
    let file = write_config("{}\n");
    let config = ExecutionConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config, ExecutionConfig::default());
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("engine.yaml");
    assert!(ExecutionConfig::from_yaml_file(&missing).is_err());
}

#[test]
fn test_malformed_limit_is_an_error() {
    let file = write_config("max_concurrent_fetches: lots\n");
    assert!(ExecutionConfig::from_yaml_file(file.path()).is_err());
}

#[test]
fn test_engine_from_file_config() {
    let file = write_config("strategy: batched\nmax_concurrent_fetches: 1\n");
    let config = ExecutionConfig::from_yaml_file(file.path()).unwrap();
    let library = Library::new(false);

    let configured = GraphQL::builder(library.schema.clone())
        .with_config(config)
        .build();
    let (configured, reference) = tokio_test::block_on(async {
        let configured = configured
            .execute(ExecutionInput::new(LIBRARY_QUERY))
            .await
            .unwrap();
        let reference = default_engine(&library.schema)
            .execute(ExecutionInput::new(LIBRARY_QUERY))
            .await
            .unwrap();
        (configured, reference)
    });

    assert_eq!(configured, reference);
}

#[test]
fn test_panics_propagate_when_capture_is_disabled() {
    let schema = SchemaBuilder::from_sdl("type Query { value: Int }")
        .unwrap()
        .data_fetcher("Query", "value", data_fetcher(|_| panic!("fetcher exploded")))
        .build()
        .unwrap();
    let schema = Arc::new(schema);

    let file = write_config("capture_panics: true\n");
    let capturing = GraphQL::builder(schema.clone())
        .with_config(ExecutionConfig::from_yaml_file(file.path()).unwrap())
        .build();
    let result = tokio_test::block_on(capturing.execute(ExecutionInput::new("{ value }"))).unwrap();
    assert_eq!(result.data, Some(json!({ "value": null })));
    assert_eq!(result.errors.len(), 1);

    let file = write_config("capture_panics: false\n");
    let propagating = GraphQL::builder(schema)
        .with_config(ExecutionConfig::from_yaml_file(file.path()).unwrap())
        .build();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        tokio_test::block_on(propagating.execute(ExecutionInput::new("{ value }")))
    }));
    assert!(outcome.is_err());
}
