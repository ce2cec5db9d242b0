//! Strategy equivalence and batching tests
//!
//! These tests verify that:
//! - Both strategies produce identical results for the same request
//! - Results do not depend on the order in which fetches complete
//! - Batched fetchers are called once per field and round
//! - Mutation fields resolve their whole sub-tree before the next one runs
//! - The fetch limit bounds concurrent fetcher calls under both strategies
//! - Broken batch contracts and cancellation abort the execution

mod engine_harness;

use engine_harness::*;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use this_graphql::prelude::*;
use tokio_util::sync::CancellationToken;

const SHELF_SDL: &str = r#"
    type Query { authors: [Author!]! }
    type Author { id: ID! name: String! books: [Book!] }
    type Book { title: String }
"#;

/// A shelf whose `Author.books` fetcher is registered by the caller
fn shelf_schema(books_fetcher: impl DataFetcher + 'static) -> Arc<Schema> {
    let schema = SchemaBuilder::from_sdl(SHELF_SDL)
        .unwrap()
        .data_fetcher("Query", "authors", data_fetcher(|_| Ok(authors().into())))
        .data_fetcher("Author", "books", books_fetcher)
        .build()
        .unwrap();
    Arc::new(schema)
}

fn books_of(author: &Value) -> Value {
    let titles: Vec<Value> = author["bookIds"]
        .as_array()
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .filter_map(|id| {
                    books()
                        .as_array()
                        .and_then(|all| all.iter().find(|book| book["id"] == id).cloned())
                })
                .collect()
        })
        .unwrap_or_default();
    Value::Array(titles)
}

/// A batched `Author.books` fetcher recording the size of every batch
fn recording_books_fetcher(batches: Arc<Mutex<Vec<usize>>>) -> impl DataFetcher + 'static {
    batched_data_fetcher(move |env| {
        let sources = env.source().as_array().cloned().unwrap_or_default();
        batches.lock().unwrap().push(sources.len());
        Ok(Value::Array(sources.iter().map(books_of).collect()).into())
    })
}

const SHELF_QUERY: &str = "{ authors { name books { title } } }";

fn shelf_data() -> Value {
    json!({
        "authors": [
            {
                "name": "Ursula",
                "books": [{ "title": "The Dispossessed" }, { "title": "The Lathe of Heaven" }]
            },
            { "name": "Octavia", "books": [{ "title": "Kindred" }] },
            { "name": "Iain", "books": [] }
        ]
    })
}

// =============================================================================
// Equivalence
// =============================================================================

mod equivalence_tests {
    use super::*;

    #[tokio::test]
    async fn test_strategies_agree_on_library_query() {
        init_tracing();
        let library = Library::new(false);
        let input = ExecutionInput::new(LIBRARY_QUERY).with_variables(json!({ "limit": 5 }));

        let (default, batched) = execute_both(&library.schema, input).await;

        assert!(default.data.is_some());
        assert_eq!(default, batched);
        assert_eq!(
            default.to_specification(),
            batched.to_specification()
        );
    }

    #[tokio::test]
    async fn test_strategies_agree_on_nested_round_trips() {
        init_tracing();
        let library = Library::new(false);
        let query = r#"{
            authors {
                name
                books(limit: 1) { title author { name books { title author { id } } } }
            }
        }"#;

        let (default, batched) = execute_both(&library.schema, ExecutionInput::new(query)).await;

        assert!(default.errors.is_empty());
        assert_eq!(
            default.data.as_ref().unwrap()["authors"][1]["books"][0]["author"]["books"][0]["author"],
            json!({ "id": "a2" })
        );
        assert_eq!(default, batched);
    }

    #[tokio::test]
    async fn test_completion_order_does_not_change_results() {
        init_tracing();
        let immediate = Library::new(false);
        let delayed = Library::new(true);
        let input = ExecutionInput::new(LIBRARY_QUERY);

        let (default_immediate, batched_immediate) =
            execute_both(&immediate.schema, input.clone()).await;
        let (default_delayed, batched_delayed) = execute_both(&delayed.schema, input).await;

        assert_eq!(default_immediate, default_delayed);
        assert_eq!(batched_immediate, batched_delayed);
        assert_eq!(default_delayed, batched_delayed);
        assert_eq!(
            error_paths(&default_delayed),
            vec!["/authors[0]/books[1]/rating", "/missing"]
        );
    }

    #[tokio::test]
    async fn test_delayed_mutations_still_run_in_order() {
        init_tracing();
        let library = Library::new(true);
        let query = r#"mutation {
            slow: addBook(title: "Slow", delayMs: 40) { id }
            fast: addBook(title: "Fast") { id }
        }"#;

        let result = batched_engine(&library.schema)
            .execute(ExecutionInput::new(query))
            .await
            .unwrap();

        assert_eq!(
            result.data,
            Some(json!({ "slow": { "id": "new-slow" }, "fast": { "id": "new-fast" } }))
        );
        assert_eq!(*library.added.lock().unwrap(), vec!["Slow", "Fast"]);
    }

    #[tokio::test]
    async fn test_mutation_sub_selections_see_their_own_mutation() {
        init_tracing();
        let counter = Arc::new(AtomicUsize::new(0));
        let bump = counter.clone();
        let read = counter.clone();
        let schema = SchemaBuilder::from_sdl(
            "type Query { value: Int } type Mutation { increment: Counter } type Counter { value: Int }",
        )
        .unwrap()
        .data_fetcher(
            "Mutation",
            "increment",
            data_fetcher(move |_| {
                bump.fetch_add(1, Ordering::SeqCst);
                Ok(json!({}).into())
            }),
        )
        .data_fetcher(
            "Counter",
            "value",
            data_fetcher(move |_| Ok(json!(read.load(Ordering::SeqCst)).into())),
        )
        .build()
        .unwrap();
        let schema = Arc::new(schema);
        let query = "mutation { first: increment { value } second: increment { value } }";

        let default = default_engine(&schema)
            .execute(ExecutionInput::new(query))
            .await
            .unwrap();
        counter.store(0, Ordering::SeqCst);
        let batched = batched_engine(&schema)
            .execute(ExecutionInput::new(query))
            .await
            .unwrap();

        assert_eq!(
            default.data,
            Some(json!({ "first": { "value": 1 }, "second": { "value": 2 } }))
        );
        assert_eq!(default, batched);
    }

    #[tokio::test]
    async fn test_fetch_limit_keeps_results() {
        init_tracing();
        let library = Library::new(true);
        let limited = ExecutionConfig::default().with_max_concurrent_fetches(1);

        let unbounded = default_engine(&library.schema)
            .execute(ExecutionInput::new(LIBRARY_QUERY))
            .await
            .unwrap();
        for strategy in [StrategyKind::Default, StrategyKind::Batched] {
            let engine = GraphQL::builder(library.schema.clone())
                .with_config(limited.clone().with_strategy(strategy))
                .build();
            let result = engine
                .execute(ExecutionInput::new(LIBRARY_QUERY))
                .await
                .unwrap();
            assert_eq!(result, unbounded, "strategy {:?}", strategy);
        }
    }

    #[tokio::test]
    async fn test_fetch_limit_bounds_sibling_fetches() {
        init_tracing();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut builder =
            SchemaBuilder::from_sdl("type Query { o: O } type O { a: Int b: Int c: Int }")
                .unwrap()
                .data_fetcher("Query", "o", data_fetcher(|_| Ok(json!({}).into())));
        for (field, value) in [("a", 1), ("b", 2), ("c", 3)] {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            builder = builder.data_fetcher(
                "O",
                field,
                data_fetcher(move |_| {
                    let in_flight = in_flight.clone();
                    let peak = peak.clone();
                    Ok(DataFetcherValue::future(async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(json!(value).into())
                    }))
                }),
            );
        }
        let schema = Arc::new(builder.build().unwrap());
        let query = "{ o { c a b } }";

        for strategy in [StrategyKind::Default, StrategyKind::Batched] {
            peak.store(0, Ordering::SeqCst);
            let limited = GraphQL::builder(schema.clone())
                .with_config(
                    ExecutionConfig::default()
                        .with_strategy(strategy)
                        .with_max_concurrent_fetches(1),
                )
                .build();
            let result = limited.execute(ExecutionInput::new(query)).await.unwrap();

            assert_eq!(
                result.data,
                Some(json!({ "o": { "c": 3, "a": 1, "b": 2 } })),
                "strategy {:?}",
                strategy
            );
            assert_eq!(peak.load(Ordering::SeqCst), 1, "strategy {:?}", strategy);
        }

        for engine in [default_engine(&schema), batched_engine(&schema)] {
            peak.store(0, Ordering::SeqCst);
            engine.execute(ExecutionInput::new(query)).await.unwrap();
            assert!(peak.load(Ordering::SeqCst) > 1);
        }
    }
}

// =============================================================================
// Batching
// =============================================================================

mod batching_tests {
    use super::*;

    #[tokio::test]
    async fn test_batched_fetcher_called_once_per_round() {
        init_tracing();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let schema = shelf_schema(recording_books_fetcher(batches.clone()));

        let result = batched_engine(&schema)
            .execute(ExecutionInput::new(SHELF_QUERY))
            .await
            .unwrap();

        assert_eq!(result.data, Some(shelf_data()));
        assert!(result.errors.is_empty());
        assert_eq!(*batches.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_default_strategy_sends_batches_of_one() {
        init_tracing();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let schema = shelf_schema(recording_books_fetcher(batches.clone()));

        let result = default_engine(&schema)
            .execute(ExecutionInput::new(SHELF_QUERY))
            .await
            .unwrap();

        assert_eq!(result.data, Some(shelf_data()));
        assert_eq!(*batches.lock().unwrap(), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_strategy_selected_from_config() {
        init_tracing();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let schema = shelf_schema(recording_books_fetcher(batches.clone()));

        let engine = GraphQL::builder(schema)
            .with_config(ExecutionConfig::default().with_strategy(StrategyKind::Batched))
            .build();
        engine.execute(ExecutionInput::new(SHELF_QUERY)).await.unwrap();

        assert_eq!(*batches.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_batched_fetcher_sees_every_local_context() {
        init_tracing();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let recorded = batches.clone();
        let shelf = |label: &'static str| {
            data_fetcher(move |_| {
                Ok(DataFetcherResult::new(json!({ "name": label }))
                    .with_local_context(OpaqueContext::new(label.to_uppercase()))
                    .into())
            })
        };
        let schema = SchemaBuilder::from_sdl(
            "type Query { fiction: Shelf poetry: Shelf } type Shelf { name: String label: String }",
        )
        .unwrap()
        .data_fetcher("Query", "fiction", shelf("fiction"))
        .data_fetcher("Query", "poetry", shelf("poetry"))
        .data_fetcher(
            "Shelf",
            "label",
            batched_data_fetcher(move |env| {
                recorded.lock().unwrap().push(env.source().as_array().map_or(0, Vec::len));
                let labels: Vec<Value> = env
                    .batch_local_contexts()
                    .iter()
                    .map(|context| {
                        context
                            .as_ref()
                            .and_then(|context| context.downcast_ref::<String>())
                            .map_or(Value::Null, |label| json!(label))
                    })
                    .collect();
                Ok(Value::Array(labels).into())
            }),
        )
        .build()
        .unwrap();
        let schema = Arc::new(schema);
        let query = "{ fiction { name label } poetry { name label } }";

        let (default, batched) = execute_both(&schema, ExecutionInput::new(query)).await;

        assert_eq!(
            batched.data,
            Some(json!({
                "fiction": { "name": "fiction", "label": "FICTION" },
                "poetry": { "name": "poetry", "label": "POETRY" }
            }))
        );
        assert_eq!(default, batched);
        assert_eq!(*batches.lock().unwrap(), vec![1, 1, 2]);
    }

    #[tokio::test]
    async fn test_batch_errors_are_reported_once() {
        init_tracing();
        let schema = shelf_schema(batched_data_fetcher(|env| {
            let sources = env.source().as_array().cloned().unwrap_or_default();
            let books: Vec<Value> = sources.iter().map(books_of).collect();
            Ok(DataFetcherResult::new(books)
                .with_error(GraphQLError::data_fetching("shelf partially indexed"))
                .into())
        }));

        let result = batched_engine(&schema)
            .execute(ExecutionInput::new(SHELF_QUERY))
            .await
            .unwrap();

        assert_eq!(result.data, Some(shelf_data()));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "shelf partially indexed");
        assert_eq!(error_paths(&result), vec!["/authors[0]/books"]);
    }

    #[tokio::test]
    async fn test_failed_batch_nulls_every_member() {
        init_tracing();
        let schema = shelf_schema(batched_data_fetcher(|_| anyhow::bail!("index offline")));

        let result = batched_engine(&schema)
            .execute(ExecutionInput::new("{ authors { name books { title } } }"))
            .await
            .unwrap();

        let data = result.data.expect("data");
        for author in data["authors"].as_array().unwrap() {
            assert_eq!(author["books"], Value::Null);
        }
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].classification,
            ErrorClassification::DataFetchingException
        );
    }

    #[tokio::test]
    async fn test_short_batch_aborts_execution() {
        init_tracing();
        let schema = shelf_schema(batched_data_fetcher(|_| Ok(json!([[], []]).into())));

        let error = batched_engine(&schema)
            .execute(ExecutionInput::new(SHELF_QUERY))
            .await
            .unwrap_err();

        match error {
            ExecutionError::BatchSizeMismatch {
                path,
                expected,
                actual,
            } => {
                assert_eq!(path.to_string(), "/authors[0]/books");
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected BatchSizeMismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_list_batch_aborts_execution() {
        init_tracing();
        let schema = shelf_schema(batched_data_fetcher(|_| Ok(json!({ "books": [] }).into())));

        for engine in [default_engine(&schema), batched_engine(&schema)] {
            let error = engine
                .execute(ExecutionInput::new(SHELF_QUERY))
                .await
                .unwrap_err();
            assert!(matches!(
                error,
                ExecutionError::BatchSizeMismatch { actual: 0, .. }
            ));
            assert_eq!(error.error_code(), "BATCH_SIZE_MISMATCH");
        }
    }
}

// =============================================================================
// Cancellation
// =============================================================================

mod cancellation_tests {
    use super::*;

    #[tokio::test]
    async fn test_cancelled_before_execution() {
        init_tracing();
        let schema = items_schema();
        let token = CancellationToken::new();
        token.cancel();

        for engine in [default_engine(&schema), batched_engine(&schema)] {
            let input = ExecutionInput::new("{ items { id } }")
                .with_cancellation(token.clone())
                .with_execution_id(ExecutionId::from("cancelled-early"));
            let error = engine.execute(input).await.unwrap_err();
            match error {
                ExecutionError::Cancelled { execution_id } => {
                    assert_eq!(execution_id, ExecutionId::from("cancelled-early"));
                }
                other => panic!("expected Cancelled, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_cancelled_between_levels() {
        init_tracing();
        let token = CancellationToken::new();
        let books_calls = Arc::new(AtomicUsize::new(0));

        let trigger = token.clone();
        let calls = books_calls.clone();
        let schema = SchemaBuilder::from_sdl(SHELF_SDL)
            .unwrap()
            .data_fetcher(
                "Query",
                "authors",
                data_fetcher(move |_| {
                    trigger.cancel();
                    Ok(authors().into())
                }),
            )
            .data_fetcher(
                "Author",
                "books",
                data_fetcher(move |env| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(books_of(env.source()).into())
                }),
            )
            .build()
            .unwrap();
        let schema = Arc::new(schema);

        for engine in [default_engine(&schema), batched_engine(&schema)] {
            let input = ExecutionInput::new(SHELF_QUERY).with_cancellation(token.clone());
            let error = engine.execute(input).await.unwrap_err();
            assert!(matches!(error, ExecutionError::Cancelled { .. }));
        }
        assert_eq!(books_calls.load(Ordering::SeqCst), 0);
    }
}
