//! Data-store collaborators that execute bulk aggregate queries

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::query::{AggregateQuery, AggregateRow};

pub mod memory;
pub mod postgres;
mod row_conversion;

pub use memory::MemoryAggregateStore;
pub use postgres::PgAggregateStore;

/// Executes one aggregate query in a single round trip.
///
/// Implementations return one row per parent key that has related rows
/// and propagate their own failures unchanged; they never retry.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn aggregate(&self, query: &AggregateQuery) -> ModelResult<Vec<AggregateRow>>;
}
