//! Query layer: decorator-facing relation query, bulk aggregate requests
//! and their SQL rendering

pub mod aggregate;
pub mod relation_query;
pub mod sql_generation;
pub mod types;

pub use aggregate::{AggregateFunction, AggregateQuery, AggregateRow, RelationJoin};
pub use relation_query::RelationQuery;
pub use sql_generation::{AGGREGATE_COLUMN, MAX_BIND_PARAMS, PARENT_KEY_COLUMN};
pub use types::{QueryOperator, WhereCondition};
