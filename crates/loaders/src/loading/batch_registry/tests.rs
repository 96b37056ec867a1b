use super::*;
use crate::error::ModelError;
use crate::loading::{BuilderDecorator, CountModelsLoader, LoaderContext};
use crate::relationships::{RelationshipMetadata, RelationshipRegistry};
use crate::store::MemoryAggregateStore;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

fn fixture() -> (MemoryAggregateStore, LoaderContext, Vec<Record>) {
    let store = MemoryAggregateStore::new();
    for (user_id, done) in [(1, true), (1, false), (1, false), (2, true)] {
        let completed_at = if done { json!("2024-01-01") } else { Value::Null };
        store
            .insert("tasks", json!({"user_id": user_id, "completed_at": completed_at}))
            .unwrap();
    }

    let relationships = RelationshipRegistry::new()
        .with("users", RelationshipMetadata::has_many("tasks", "tasks", "user_id"))
        .unwrap();
    let context = LoaderContext::new(Arc::new(store.clone()), relationships);

    let records = (1..=3)
        .map(|id| Record::new("users").with_attribute("id", id))
        .collect();

    (store, context, records)
}

fn register_counts(registry: &mut BatchLoaderRegistry, context: &LoaderContext) {
    let all = CountModelsLoader::new(context.clone(), "tasks", BuilderDecorator::identity());
    let completed = CountModelsLoader::new(
        context.clone(),
        "tasks as tasks_completed",
        BuilderDecorator::new("completed", |q| q.where_not_null("completed_at")),
    );

    registry.register(all.key(), || Arc::new(all.clone()));
    registry.register(completed.key(), || Arc::new(completed.clone()));
}

struct FailingLoader;

#[async_trait]
impl ModelsLoader for FailingLoader {
    async fn fetch(&self, _parents: &[Record]) -> ModelResult<Annotations> {
        Err(ModelError::Database("connection reset".to_string()))
    }

    fn extract(&self, _model: &Record) -> Value {
        Value::Null
    }
}

#[test]
fn test_loader_key_display() {
    let key = LoaderKey::new("tasks", "*", "count", "");
    assert_eq!(key.to_string(), "count(*) of tasks");

    let key = LoaderKey::new("tasks", "amount", "sum", "scopes:completed");
    assert_eq!(key.to_string(), "sum(amount) of tasks [scopes:completed]");
}

#[test]
fn test_register_deduplicates() {
    let built = AtomicUsize::new(0);
    let mut registry = BatchLoaderRegistry::new();
    let key = LoaderKey::new("tasks", "*", "count", "");

    for _ in 0..3 {
        registry.register(key.clone(), || {
            built.fetch_add(1, Ordering::SeqCst);
            Arc::new(FailingLoader)
        });
    }

    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(registry.len(), 1);
    assert!(registry.get(&key).is_some());
    assert!(registry.get(&LoaderKey::new("tasks", "*", "count", "x")).is_none());
}

#[tokio::test]
async fn test_load_all_runs_each_loader_once() {
    let (store, context, mut records) = fixture();
    let mut registry = BatchLoaderRegistry::new();
    register_counts(&mut registry, &context);
    register_counts(&mut registry, &context);

    let result = registry.load_all(&mut records).await.unwrap();

    assert_eq!(store.query_count(), 2);
    assert_eq!(
        result,
        BatchLoadResult {
            loaders_run: 2,
            registrations_deduplicated: 2,
            annotations_written: 6,
        }
    );

    let counts: Vec<(i64, i64)> = records
        .iter()
        .map(|r| {
            (
                CountModelsLoader::extract_count(r, "tasks").unwrap(),
                CountModelsLoader::extract_count(r, "tasks as tasks_completed").unwrap(),
            )
        })
        .collect();
    assert_eq!(counts, vec![(3, 1), (1, 1), (0, 0)]);
}

#[tokio::test]
async fn test_sequential_matches_parallel() {
    let (_, context, mut parallel_records) = fixture();
    let mut sequential_records = parallel_records.clone();

    let mut parallel = BatchLoaderRegistry::new();
    register_counts(&mut parallel, &context);
    parallel.load_all(&mut parallel_records).await.unwrap();

    let mut sequential =
        BatchLoaderRegistry::with_config(LoaderConfig::new().with_parallel_execution(false));
    register_counts(&mut sequential, &context);
    sequential.load_all(&mut sequential_records).await.unwrap();

    assert_eq!(parallel_records, sequential_records);
}

#[tokio::test]
async fn test_failure_leaves_batch_untouched() {
    let (_, context, mut records) = fixture();
    let before = records.clone();

    let mut registry = BatchLoaderRegistry::new();
    register_counts(&mut registry, &context);
    registry.register(LoaderKey::new("broken", "*", "count", ""), || Arc::new(FailingLoader));

    let err = registry.load_all(&mut records).await.unwrap_err();
    assert_eq!(err, ModelError::Database("connection reset".to_string()));
    assert_eq!(records, before);
}

#[tokio::test]
async fn test_empty_batch() {
    let (store, context, _) = fixture();
    let mut registry = BatchLoaderRegistry::new();
    register_counts(&mut registry, &context);

    let result = registry.load_all(&mut []).await.unwrap();
    assert_eq!(result.loaders_run, 0);
    assert_eq!(store.query_count(), 0);
}
