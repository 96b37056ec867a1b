//! Relation count loader

use async_trait::async_trait;
use serde_json::Value;

use super::aggregate_loader::AggregateModelsLoader;
use super::batch_registry::LoaderKey;
use super::context::LoaderContext;
use super::decorator::BuilderDecorator;
use super::models_loader::{Annotations, ModelsLoader};
use crate::error::{ModelError, ModelResult};
use crate::record::Record;

const COUNT_COLUMN: &str = "*";
const COUNT_FUNCTION: &str = "count";

/// `count(*)` of a relation for every parent of a batch
#[derive(Debug, Clone)]
pub struct CountModelsLoader {
    aggregate: AggregateModelsLoader,
}

impl CountModelsLoader {
    pub fn new(context: LoaderContext, relation: &str, decorate_builder: BuilderDecorator) -> Self {
        Self {
            aggregate: AggregateModelsLoader::new(
                context,
                relation,
                COUNT_COLUMN,
                COUNT_FUNCTION,
                decorate_builder,
            ),
        }
    }

    pub fn relation(&self) -> &str {
        self.aggregate.relation()
    }

    pub fn key(&self) -> LoaderKey {
        self.aggregate.key()
    }

    /// The underlying aggregate loader
    pub fn as_aggregate(&self) -> &AggregateModelsLoader {
        &self.aggregate
    }

    /// Loaded count of this loader's relation on a record
    pub fn count(&self, model: &Record) -> ModelResult<i64> {
        Self::extract_count(model, self.aggregate.relation())
    }

    /// Read a loaded relation count off a record as an integer.
    ///
    /// Numbers and numeric strings are truncated toward zero, saturating
    /// at the `i64` bounds. Anything else, null included, is a type
    /// mismatch.
    pub fn extract_count(model: &Record, relation: &str) -> ModelResult<i64> {
        let count =
            AggregateModelsLoader::extract_aggregate(model, relation, COUNT_COLUMN, COUNT_FUNCTION);

        numeric_to_i64(&count).ok_or_else(|| {
            ModelError::TypeMismatch(format!("Expected numeric count, got: {}.", count))
        })
    }
}

fn truncate(value: f64) -> Option<i64> {
    // `as` saturates at the integer bounds
    value.is_finite().then(|| value.trunc() as i64)
}

fn numeric_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|u| i64::try_from(u).unwrap_or(i64::MAX)))
            .or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

#[async_trait]
impl ModelsLoader for CountModelsLoader {
    async fn fetch(&self, parents: &[Record]) -> ModelResult<Annotations> {
        self.aggregate.fetch(parents).await
    }

    fn extract(&self, model: &Record) -> Value {
        self.aggregate.extract(model)
    }
}
