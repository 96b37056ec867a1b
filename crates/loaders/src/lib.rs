//! # elif-loaders: batched relation aggregates for elif.rs
//!
//! Lets a GraphQL field ask for an aggregate (count, sum, avg, min, max)
//! of a related collection and resolves it for every parent record of a
//! response with a single query per distinct aggregate, instead of one
//! query per record.
//!
//! - [`AggregateModelsLoader`] loads `function(column)` of a relation and
//!   stores it on each record under a derived attribute name.
//! - [`CountModelsLoader`] is the `count(*)` flavour with an integer
//!   extractor.
//! - [`BatchLoaderRegistry`] runs each distinct loader once per batch.
//!
//! Relation names accept an alias, `"tasks as tasks_completed"`, which
//! becomes the attribute name verbatim.

pub mod config;
pub mod directive;
pub mod error;
pub mod loading;
pub mod naming;
pub mod query;
pub mod record;
pub mod relationships;
pub mod security;
pub mod store;

pub use config::{ConfigError, LoaderConfig};
pub use directive::{AggregateDirectiveArgs, AggregateDirectiveFactory};
pub use error::{ModelError, ModelResult, RelationshipError};
pub use loading::{
    AggregateModelsLoader, Annotations, BatchLoadResult, BatchLoaderRegistry, BuilderDecorator,
    CountModelsLoader, LoaderContext, LoaderKey, ModelsLoader, ScopeRegistry,
};
pub use naming::{aggregate_attribute, RelationSpec};
pub use query::{AggregateFunction, AggregateQuery, AggregateRow, RelationQuery};
pub use record::Record;
pub use relationships::{
    PivotConfig, PolymorphicConfig, RelationshipMetadata, RelationshipRegistry, RelationshipType,
};
pub use store::{AggregateStore, MemoryAggregateStore, PgAggregateStore};
