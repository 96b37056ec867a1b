//! Aggregate directive arguments
//!
//! Turns the arguments of `@withCount(relation: "tasks", scopes: [...])`
//! and `@withAggregate(relation:, column:, function:)` into loaders and
//! their batching keys. Parsing the schema itself happens elsewhere; this
//! module receives the argument map as JSON.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::loading::{
    AggregateModelsLoader, BatchLoaderRegistry, BuilderDecorator, CountModelsLoader,
    LoaderContext, LoaderKey, ModelsLoader, ScopeRegistry,
};
use crate::naming::RelationSpec;

/// Arguments of an aggregate directive
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateDirectiveArgs {
    pub relation: Option<String>,
    pub column: Option<String>,
    pub function: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl AggregateDirectiveArgs {
    /// Deserialize the directive's argument map
    pub fn from_value(args: Value) -> ModelResult<Self> {
        serde_json::from_value(args)
            .map_err(|e| ModelError::Definition(format!("Invalid aggregate directive arguments: {}", e)))
    }

    pub fn relation(&self) -> ModelResult<&str> {
        required(&self.relation, "relation")
    }

    pub fn column(&self) -> ModelResult<&str> {
        required(&self.column, "column")
    }

    pub fn function(&self) -> ModelResult<&str> {
        required(&self.function, "function")
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> ModelResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(ModelError::Definition(format!(
            "An aggregate directive requires the argument `{}`",
            name
        ))),
    }
}

/// Builds loaders from directive arguments
#[derive(Debug, Clone)]
pub struct AggregateDirectiveFactory {
    context: LoaderContext,
    scopes: ScopeRegistry,
}

impl AggregateDirectiveFactory {
    pub fn new(context: LoaderContext, scopes: ScopeRegistry) -> Self {
        Self { context, scopes }
    }

    /// Decorator applying the directive's scopes to the relation's table
    fn decorator(&self, model: &str, args: &AggregateDirectiveArgs) -> ModelResult<BuilderDecorator> {
        let relation = RelationSpec::parse(args.relation()?).name;
        let metadata = self.context.relationships().resolve(model, relation)?;
        self.scopes.decorator(&metadata.related_table, &args.scopes)
    }

    /// `@withCount` on a field of `model`
    pub fn with_count(
        &self,
        model: &str,
        args: &AggregateDirectiveArgs,
    ) -> ModelResult<(LoaderKey, CountModelsLoader)> {
        let decorator = self.decorator(model, args)?;
        let loader = CountModelsLoader::new(self.context.clone(), args.relation()?, decorator);
        Ok((loader.key(), loader))
    }

    /// `@withAggregate` on a field of `model`
    pub fn with_aggregate(
        &self,
        model: &str,
        args: &AggregateDirectiveArgs,
    ) -> ModelResult<(LoaderKey, AggregateModelsLoader)> {
        let column = args.column()?;
        let function = args.function()?;
        let decorator = self.decorator(model, args)?;
        let loader = AggregateModelsLoader::new(
            self.context.clone(),
            args.relation()?,
            column,
            function,
            decorator,
        );
        Ok((loader.key(), loader))
    }

    /// Register the `@withCount` loader of a field, sharing an existing
    /// loader with the same key
    pub fn register_count(
        &self,
        registry: &mut BatchLoaderRegistry,
        model: &str,
        args: &AggregateDirectiveArgs,
    ) -> ModelResult<Arc<dyn ModelsLoader>> {
        let (key, loader) = self.with_count(model, args)?;
        Ok(registry.register(key, move || Arc::new(loader)))
    }

    /// Register the `@withAggregate` loader of a field
    pub fn register_aggregate(
        &self,
        registry: &mut BatchLoaderRegistry,
        model: &str,
        args: &AggregateDirectiveArgs,
    ) -> ModelResult<Arc<dyn ModelsLoader>> {
        let (key, loader) = self.with_aggregate(model, args)?;
        Ok(registry.register(key, move || Arc::new(loader)))
    }
}
