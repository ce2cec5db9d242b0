//! Shared test harness for engine integration tests
//!
//! Provides a small library schema (authors, books, an interface and a
//! union) with fetchers that can answer immediately or after a delay, the
//! `items` schema with two items, and helpers to run one request
//! through both execution strategies.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod engine_harness;
//! use engine_harness::*;
//! ```

#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use this_graphql::prelude::*;

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Install a test subscriber honoring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Items schema
// ---------------------------------------------------------------------------

pub const ITEMS_SDL: &str = r#"
    type Query { items: [Item!] }
    type Item { id: ID! name: String }
"#;

pub fn items_schema() -> Arc<Schema> {
    let schema = SchemaBuilder::from_sdl(ITEMS_SDL)
        .expect("valid sdl")
        .data_fetcher(
            "Query",
            "items",
            data_fetcher(|_| {
                Ok(json!([
                    { "id": "1", "name": "x" },
                    { "id": "2", "name": null }
                ])
                .into())
            }),
        )
        .build()
        .expect("valid schema");
    Arc::new(schema)
}

// ---------------------------------------------------------------------------
// Library schema
// ---------------------------------------------------------------------------

pub const LIBRARY_SDL: &str = r#"
    schema {
        query: Query
        mutation: Mutation
    }

    type Query {
        authors: [Author!]!
        author(id: ID!): Author
        search(term: String): [SearchResult]
        node(id: ID!): Node
    }

    type Mutation {
        addBook(title: String!, delayMs: Int = 0): Book!
    }

    interface Node {
        id: ID!
    }

    type Author implements Node {
        id: ID!
        name: String!
        books(limit: Int = 10): [Book!]
    }

    type Book implements Node {
        id: ID!
        title: String
        rating: Int!
        author: Author
    }

    union SearchResult = Author | Book
"#;

pub fn authors() -> Value {
    json!([
        { "id": "a1", "name": "Ursula", "bookIds": ["b1", "b2"] },
        { "id": "a2", "name": "Octavia", "bookIds": ["b3"] },
        { "id": "a3", "name": "Iain", "bookIds": [] }
    ])
}

pub fn books() -> Value {
    json!([
        { "id": "b1", "title": "The Dispossessed", "rating": 5, "authorId": "a1" },
        { "id": "b2", "title": "The Lathe of Heaven", "rating": null, "authorId": "a1" },
        { "id": "b3", "title": "Kindred", "rating": 4, "authorId": "a2" }
    ])
}

fn find(collection: &Value, id: &str) -> Value {
    collection
        .as_array()
        .and_then(|items| items.iter().find(|item| item["id"] == id))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Answer `value` right away or after `delay_ms`
fn answer(value: Value, delay_ms: u64) -> DataFetcherValue {
    if delay_ms == 0 {
        return value.into();
    }
    DataFetcherValue::future(async move {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(value.into())
    })
}

/// The library schema plus what its fetchers observed
pub struct Library {
    pub schema: Arc<Schema>,
    /// Titles passed to `addBook`, in call order
    pub added: Arc<Mutex<Vec<String>>>,
    /// Number of `Author.books` fetcher calls
    pub book_fetches: Arc<AtomicUsize>,
}

impl Library {
    /// Build the library; `delayed` makes earlier siblings answer later
    pub fn new(delayed: bool) -> Self {
        let added = Arc::new(Mutex::new(Vec::new()));
        let book_fetches = Arc::new(AtomicUsize::new(0));

        let delay = move |id: &str| -> u64 {
            if !delayed {
                return 0;
            }
            match id {
                "a1" | "b1" => 30,
                "a2" | "b2" => 15,
                _ => 1,
            }
        };

        let fetch_count = book_fetches.clone();
        let log = added.clone();
        let schema = SchemaBuilder::from_sdl(LIBRARY_SDL)
            .expect("valid sdl")
            .data_fetcher("Query", "authors", data_fetcher(move |_| Ok(answer(authors(), delay("")))))
            .data_fetcher(
                "Query",
                "author",
                data_fetcher(move |env| {
                    let id = env.argument("id").and_then(Value::as_str).unwrap_or_default();
                    match find(&authors(), id) {
                        Value::Null => anyhow::bail!("no author with id {}", id),
                        author => Ok(answer(author, delay(id))),
                    }
                }),
            )
            .data_fetcher(
                "Query",
                "search",
                data_fetcher(|_| {
                    let mut book = find(&books(), "b3");
                    book["__typename"] = json!("Book");
                    let mut author = find(&authors(), "a2");
                    author["__typename"] = json!("Author");
                    Ok(json!([book, null, author]).into())
                }),
            )
            .data_fetcher(
                "Query",
                "node",
                data_fetcher(|env| {
                    let id = env.argument("id").and_then(Value::as_str).unwrap_or_default();
                    let node = match find(&books(), id) {
                        Value::Null => find(&authors(), id),
                        book => book,
                    };
                    Ok(node.into())
                }),
            )
            .type_resolver(
                "Node",
                type_resolver(|env| {
                    let kind = if env.value.get("title").is_some() { "Book" } else { "Author" };
                    Some(kind.to_string())
                }),
            )
            .data_fetcher(
                "Author",
                "books",
                data_fetcher(move |env| {
                    fetch_count.fetch_add(1, Ordering::SeqCst);
                    let limit = env.argument("limit").and_then(Value::as_u64).unwrap_or(10) as usize;
                    let author_id = env.source()["id"].as_str().unwrap_or_default().to_string();
                    let found: Vec<Value> = env.source()["bookIds"]
                        .as_array()
                        .map(|ids| {
                            ids.iter()
                                .filter_map(Value::as_str)
                                .map(|id| find(&books(), id))
                                .take(limit)
                                .collect()
                        })
                        .unwrap_or_default();
                    Ok(answer(Value::Array(found), delay(&author_id)))
                }),
            )
            .data_fetcher(
                "Book",
                "author",
                data_fetcher(move |env| {
                    let book_id = env.source()["id"].as_str().unwrap_or_default().to_string();
                    let author_id = env.source()["authorId"].as_str().unwrap_or_default();
                    Ok(answer(find(&authors(), author_id), delay(&book_id)))
                }),
            )
            .data_fetcher(
                "Mutation",
                "addBook",
                data_fetcher(move |env| {
                    let title = env.argument("title").and_then(Value::as_str).unwrap_or_default().to_string();
                    let delay_ms = env.argument("delayMs").and_then(Value::as_u64).unwrap_or(0);
                    let log = log.clone();
                    Ok(DataFetcherValue::future(async move {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        log.lock().unwrap().push(title.clone());
                        let id = format!("new-{}", title.to_lowercase());
                        Ok(json!({ "id": id, "title": title, "rating": 0 }).into())
                    }))
                }),
            )
            .build()
            .expect("valid schema");

        Self {
            schema: Arc::new(schema),
            added,
            book_fetches,
        }
    }
}

/// A query touching lists, arguments, variables, fragments, abstract types,
/// a fetch failure and a non-null violation
pub const LIBRARY_QUERY: &str = r#"
    query Library($limit: Int, $skipSearch: Boolean = false) {
        authors {
            id
            name
            books(limit: $limit) { ...BookFields author { name } }
        }
        missing: author(id: "zz") { name }
        octavia: author(id: "a2") { name }
        search(term: "K") @skip(if: $skipSearch) {
            __typename
            ... on Book { title }
            ... on Author { name }
        }
        node(id: "b3") { id ... on Book { title } }
    }

    fragment BookFields on Book { title rating }
"#;

// ---------------------------------------------------------------------------
// Running requests
// ---------------------------------------------------------------------------

pub fn default_engine(schema: &Arc<Schema>) -> GraphQL {
    GraphQL::builder(schema.clone())
        .with_strategy(DefaultExecutionStrategy::new())
        .build()
}

pub fn batched_engine(schema: &Arc<Schema>) -> GraphQL {
    GraphQL::builder(schema.clone())
        .with_strategy(BatchedExecutionStrategy::new())
        .build()
}

/// Execute one request with each strategy
pub async fn execute_both(
    schema: &Arc<Schema>,
    input: ExecutionInput,
) -> (ExecutionResult, ExecutionResult) {
    let default = default_engine(schema)
        .execute(input.clone())
        .await
        .expect("default strategy completes");
    let batched = batched_engine(schema)
        .execute(input)
        .await
        .expect("batched strategy completes");
    (default, batched)
}

/// Paths of the result's errors, rendered as strings
pub fn error_paths(result: &ExecutionResult) -> Vec<String> {
    result
        .errors
        .iter()
        .map(|error| error.path.as_ref().map(ToString::to_string).unwrap_or_default())
        .collect()
}
