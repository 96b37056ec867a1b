//! PostgreSQL aggregate store backed by a sqlx pool

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::Query;
use sqlx::Postgres;
use tracing::debug;

use super::row_conversion::cell_to_json;
use super::AggregateStore;
use crate::config::LoaderConfig;
use crate::error::{ModelError, ModelResult};
use crate::query::{AggregateQuery, AggregateRow};

/// Runs aggregate queries against PostgreSQL
#[derive(Debug, Clone)]
pub struct PgAggregateStore {
    pool: PgPool,
    log_queries: bool,
}

impl PgAggregateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            log_queries: false,
        }
    }

    /// Store configured from the loader configuration
    pub fn with_config(pool: PgPool, config: &LoaderConfig) -> Self {
        Self::new(pool).with_log_queries(config.log_queries)
    }

    /// Log every rendered statement at debug level
    pub fn with_log_queries(mut self, log_queries: bool) -> Self {
        self.log_queries = log_queries;
        self
    }

    pub fn log_queries(&self) -> bool {
        self.log_queries
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Bind a JSON parameter the way the column types expect it
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> ModelResult<Query<'q, Postgres, PgArguments>> {
    Ok(match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                return Err(ModelError::Validation(format!(
                    "Cannot bind number {} as a query parameter",
                    n
                )));
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        other => {
            return Err(ModelError::Validation(format!(
                "Cannot bind {} as a query parameter",
                other
            )))
        }
    })
}

#[async_trait]
impl AggregateStore for PgAggregateStore {
    async fn aggregate(&self, aggregate: &AggregateQuery) -> ModelResult<Vec<AggregateRow>> {
        let (sql, params) = aggregate.to_sql_with_params()?;

        if self.log_queries {
            debug!(sql = %sql, params = params.len(), "Executing aggregate query");
        }

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = bind_value(query, param)?;
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(AggregateRow {
                    parent_key: cell_to_json(row, 0)?,
                    aggregate: cell_to_json(row, 1)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost/elif_loaders")
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_logging_follows_loader_config() {
        let quiet = PgAggregateStore::with_config(lazy_pool(), &LoaderConfig::default());
        assert!(!quiet.log_queries());

        let config = LoaderConfig::new().with_log_queries(true);
        let verbose = PgAggregateStore::with_config(lazy_pool(), &config);
        assert!(verbose.log_queries());
    }

    #[test]
    fn test_bind_rejects_structured_values() {
        let array = serde_json::json!([1, 2]);
        let err = bind_value(sqlx::query("SELECT 1"), &array).err();
        assert!(matches!(err, Some(ModelError::Validation(_))));
    }
}
