//! Relation aggregate loader
//!
//! One `AggregateModelsLoader` stands for one (relation, column, function,
//! decorator) combination. Loading a batch costs a single store query no
//! matter how many parents the batch holds.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::batch_registry::LoaderKey;
use super::context::LoaderContext;
use super::decorator::BuilderDecorator;
use super::models_loader::{Annotations, ModelsLoader};
use crate::error::{ModelError, ModelResult, RelationshipError};
use crate::naming::{aggregate_attribute, RelationSpec};
use crate::query::{AggregateFunction, AggregateQuery, RelationQuery, MAX_BIND_PARAMS};
use crate::record::{key_string, Record};

/// Loads an aggregate of a relation for every parent of a batch
#[derive(Debug, Clone)]
pub struct AggregateModelsLoader {
    context: LoaderContext,
    relation: String,
    column: String,
    function: String,
    decorate_builder: BuilderDecorator,
}

impl AggregateModelsLoader {
    pub fn new(
        context: LoaderContext,
        relation: &str,
        column: &str,
        function: &str,
        decorate_builder: BuilderDecorator,
    ) -> Self {
        Self {
            context,
            relation: relation.to_string(),
            column: column.to_string(),
            function: function.to_string(),
            decorate_builder,
        }
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn decorator(&self) -> &BuilderDecorator {
        &self.decorate_builder
    }

    /// Batching key of this loader
    pub fn key(&self) -> LoaderKey {
        LoaderKey::new(
            &self.relation,
            &self.column,
            &self.function,
            self.decorate_builder.id(),
        )
    }

    /// Attribute the aggregate is stored under on each record
    pub fn attribute(&self) -> String {
        aggregate_attribute(&self.relation, &self.column, &self.function)
    }

    /// Read an aggregate off a record by name derivation alone.
    ///
    /// Returns null when the record was never loaded for this aggregate.
    pub fn extract_aggregate(model: &Record, relation: &str, column: &str, function: &str) -> Value {
        model
            .get_attribute(&aggregate_attribute(relation, column, function))
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Model shared by the whole batch
    fn batch_model(parents: &[Record]) -> ModelResult<&str> {
        let model = parents[0].model();
        if let Some(other) = parents.iter().find(|record| record.model() != model) {
            warn!(
                expected = model,
                found = other.model(),
                "Rejecting aggregate load over a mixed batch"
            );
            return Err(RelationshipError::MixedModels {
                expected: model.to_string(),
                found: other.model().to_string(),
            }
            .into());
        }
        Ok(model)
    }
}

#[async_trait]
impl ModelsLoader for AggregateModelsLoader {
    async fn fetch(&self, parents: &[Record]) -> ModelResult<Annotations> {
        if parents.is_empty() {
            return Ok(Annotations::new());
        }

        let model = Self::batch_model(parents)?;
        let spec = RelationSpec::parse(&self.relation);
        let metadata = self.context.relationships().resolve(model, spec.name)?;
        let (parent_key, join) = metadata.aggregate_join()?;
        let function = AggregateFunction::parse(&self.function)?;

        let mut seen = HashSet::new();
        let mut parent_keys = Vec::new();
        for record in parents {
            if let Some(value) = record.get_attribute(&parent_key) {
                if let Some(key) = key_string(value) {
                    if seen.insert(key) {
                        parent_keys.push(value.clone());
                    }
                }
            }
        }

        let max_keys = self.context.config().max_parent_keys;
        if parent_keys.len() > max_keys {
            warn!(
                relation = %self.relation,
                keys = parent_keys.len(),
                max_keys,
                "Aggregate batch exceeds the parent key limit"
            );
            return Err(ModelError::Configuration(format!(
                "Aggregate of '{}' over {} parents exceeds max_parent_keys ({})",
                self.relation,
                parent_keys.len(),
                max_keys
            )));
        }

        let mut values: HashMap<String, Value> = HashMap::new();
        if !parent_keys.is_empty() {
            let conditions = self
                .decorate_builder
                .apply(RelationQuery::new(&metadata.related_table))
                .into_conditions();

            let query = AggregateQuery {
                related_table: metadata.related_table.clone(),
                join,
                parent_keys,
                function: function.clone(),
                column: self.column.clone(),
                conditions,
            };

            let bound = query.param_count();
            if bound > MAX_BIND_PARAMS {
                warn!(
                    relation = %self.relation,
                    params = bound,
                    "Aggregate query exceeds the bind parameter limit"
                );
                return Err(ModelError::Configuration(format!(
                    "Aggregate of '{}' needs {} bind parameters, more than the {} a statement allows",
                    self.relation, bound, MAX_BIND_PARAMS
                )));
            }

            for row in self.context.store().aggregate(&query).await? {
                if let Some(key) = key_string(&row.parent_key) {
                    values.insert(key, row.aggregate);
                }
            }
        }

        let attribute = self.attribute();
        let empty = function.empty_value();
        let mut annotations = Annotations::new();
        for (index, record) in parents.iter().enumerate() {
            let value = record
                .key(&parent_key)
                .and_then(|key| values.get(&key).cloned())
                .unwrap_or_else(|| empty.clone());
            annotations.push(index, &attribute, value);
        }

        debug!(
            model,
            relation = %self.relation,
            function = %function,
            attribute = %attribute,
            parents = parents.len(),
            groups = values.len(),
            "Loaded relation aggregate"
        );

        Ok(annotations)
    }

    fn extract(&self, model: &Record) -> Value {
        Self::extract_aggregate(model, &self.relation, &self.column, &self.function)
    }
}
