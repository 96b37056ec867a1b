//! In-memory aggregate store
//!
//! Evaluates [`AggregateQuery`] over tables of JSON rows with the same
//! grouping and empty-group behaviour as the SQL rendering. Counts every
//! query it answers so callers can check how many round trips a load cost.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::debug;

use super::AggregateStore;
use crate::error::{ModelError, ModelResult};
use crate::query::{
    AggregateFunction, AggregateQuery, AggregateRow, QueryOperator, RelationJoin, WhereCondition,
};
use crate::record::key_string;

type Row = Map<String, Value>;

/// Aggregate store over in-memory tables
#[derive(Debug, Clone, Default)]
pub struct MemoryAggregateStore {
    tables: Arc<DashMap<String, Vec<Row>>>,
    query_count: Arc<AtomicUsize>,
}

impl MemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to a table, creating the table on first use
    pub fn insert(&self, table: &str, row: Value) -> ModelResult<()> {
        match row {
            Value::Object(row) => {
                self.tables.entry(table.to_string()).or_default().push(row);
                Ok(())
            }
            other => Err(ModelError::Serialization(format!(
                "Rows must be JSON objects, got: {}",
                other
            ))),
        }
    }

    /// Create an empty table
    pub fn create_table(&self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    /// Number of aggregate queries answered so far
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    pub fn reset_query_count(&self) {
        self.query_count.store(0, Ordering::SeqCst);
    }

    fn table(&self, table: &str) -> ModelResult<Vec<Row>> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .ok_or_else(|| ModelError::Database(format!("relation \"{}\" does not exist", table)))
    }

    /// Related rows paired with the parent key they belong to
    fn grouped_rows(&self, query: &AggregateQuery) -> ModelResult<Vec<(Value, Row)>> {
        let wanted: HashSet<String> = query.parent_keys.iter().filter_map(key_string).collect();
        let related = self.table(&query.related_table)?;

        let pairs = match &query.join {
            RelationJoin::Direct { group_column, morph } => related
                .into_iter()
                .filter(|row| match morph {
                    Some((type_column, morph_type)) => {
                        row.get(type_column).and_then(Value::as_str) == Some(morph_type.as_str())
                    }
                    None => true,
                })
                .map(|row| {
                    let key = row.get(group_column).cloned().unwrap_or(Value::Null);
                    (key, row)
                })
                .collect(),
            RelationJoin::Pivot {
                table,
                parent_column,
                related_column,
                related_key,
            } => {
                let mut by_key: HashMap<String, Vec<Row>> = HashMap::new();
                for row in related {
                    if let Some(key) = row.get(related_key).and_then(key_string) {
                        by_key.entry(key).or_default().push(row);
                    }
                }

                let mut pairs = Vec::new();
                for pivot in self.table(table)? {
                    let parent = pivot.get(parent_column).cloned().unwrap_or(Value::Null);
                    let target = pivot.get(related_column).and_then(key_string);
                    if let Some(rows) = target.and_then(|key| by_key.get(&key)) {
                        pairs.extend(rows.iter().map(|row| (parent.clone(), row.clone())));
                    }
                }
                pairs
            }
        };

        Ok(pairs
            .into_iter()
            .filter(|(key, _)| key_string(key).map_or(false, |key| wanted.contains(&key)))
            .filter(|(_, row)| query.conditions.iter().all(|c| condition_matches(c, row)))
            .collect())
    }
}

#[async_trait]
impl AggregateStore for MemoryAggregateStore {
    async fn aggregate(&self, query: &AggregateQuery) -> ModelResult<Vec<AggregateRow>> {
        query.validate()?;
        self.query_count.fetch_add(1, Ordering::SeqCst);

        // Group in first-seen order so results are deterministic
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, (Value, Vec<Row>)> = HashMap::new();
        for (key, row) in self.grouped_rows(query)? {
            let Some(text) = key_string(&key) else { continue };
            groups
                .entry(text.clone())
                .or_insert_with(|| {
                    order.push(text);
                    (key, Vec::new())
                })
                .1
                .push(row);
        }

        let mut results = Vec::with_capacity(order.len());
        for text in order {
            if let Some((key, rows)) = groups.remove(&text) {
                let aggregate = aggregate_rows(&query.function, &query.column, &rows)?;
                results.push(AggregateRow::new(key, aggregate));
            }
        }

        debug!(
            table = %query.related_table,
            function = %query.function,
            groups = results.len(),
            "Answered in-memory aggregate query"
        );

        Ok(results)
    }
}

fn aggregate_rows(function: &AggregateFunction, column: &str, rows: &[Row]) -> ModelResult<Value> {
    let values: Vec<&Value> = if column == "*" {
        Vec::new()
    } else {
        rows.iter()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_null())
            .collect()
    };

    match function {
        AggregateFunction::Count if column == "*" => Ok(Value::from(rows.len() as i64)),
        AggregateFunction::Count => Ok(Value::from(values.len() as i64)),
        AggregateFunction::Sum | AggregateFunction::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let mut sum = 0.0;
            for value in &values {
                sum += as_number(value).ok_or_else(|| {
                    ModelError::Database(format!(
                        "function {}({}) does not accept {}",
                        function, column, value
                    ))
                })?;
            }
            let result = if *function == AggregateFunction::Avg {
                sum / values.len() as f64
            } else {
                sum
            };
            Ok(serde_json::Number::from_f64(result).map_or(Value::Null, Value::Number))
        }
        AggregateFunction::Min => Ok(values
            .into_iter()
            .min_by(|a, b| compare(a, b).unwrap_or(CmpOrdering::Equal))
            .cloned()
            .unwrap_or(Value::Null)),
        AggregateFunction::Max => Ok(values
            .into_iter()
            .max_by(|a, b| compare(a, b).unwrap_or(CmpOrdering::Equal))
            .cloned()
            .unwrap_or(Value::Null)),
        AggregateFunction::Other(name) => Err(ModelError::Database(format!(
            "function {}() is not supported by the in-memory store",
            name
        ))),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// SQL-style comparison: NULL compares with nothing
fn compare(left: &Value, right: &Value) -> Option<CmpOrdering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn condition_matches(condition: &WhereCondition, row: &Row) -> bool {
    let cell = row.get(&condition.column).unwrap_or(&Value::Null);
    let operand = condition.value.as_ref().unwrap_or(&Value::Null);

    match condition.operator {
        QueryOperator::IsNull => cell.is_null(),
        QueryOperator::IsNotNull => !cell.is_null(),
        QueryOperator::Equal => compare(cell, operand) == Some(CmpOrdering::Equal),
        QueryOperator::NotEqual => matches!(
            compare(cell, operand),
            Some(CmpOrdering::Less | CmpOrdering::Greater)
        ),
        QueryOperator::GreaterThan => compare(cell, operand) == Some(CmpOrdering::Greater),
        QueryOperator::GreaterThanOrEqual => matches!(
            compare(cell, operand),
            Some(CmpOrdering::Greater | CmpOrdering::Equal)
        ),
        QueryOperator::LessThan => compare(cell, operand) == Some(CmpOrdering::Less),
        QueryOperator::LessThanOrEqual => matches!(
            compare(cell, operand),
            Some(CmpOrdering::Less | CmpOrdering::Equal)
        ),
        QueryOperator::Like | QueryOperator::NotLike => {
            let (Some(text), Some(pattern)) = (cell.as_str(), operand.as_str()) else {
                return false;
            };
            like(text, pattern) == (condition.operator == QueryOperator::Like)
        }
        QueryOperator::In => condition
            .values
            .iter()
            .any(|v| compare(cell, v) == Some(CmpOrdering::Equal)),
        QueryOperator::NotIn => {
            !cell.is_null()
                && condition
                    .values
                    .iter()
                    .all(|v| matches!(compare(cell, v), Some(CmpOrdering::Less | CmpOrdering::Greater)))
        }
        QueryOperator::Between => match (condition.values.first(), condition.values.get(1)) {
            (Some(low), Some(high)) => {
                matches!(compare(cell, low), Some(CmpOrdering::Greater | CmpOrdering::Equal))
                    && matches!(compare(cell, high), Some(CmpOrdering::Less | CmpOrdering::Equal))
            }
            _ => false,
        },
    }
}

/// SQL LIKE with `%` and `_` wildcards
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matches[j]: pattern[..i] matches text[..j]
    let mut matches = vec![false; text.len() + 1];
    matches[0] = true;

    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= matches[j];
                    next[j] = seen;
                }
            }
            _ => {
                for j in 1..=text.len() {
                    next[j] = matches[j - 1] && (*p == '_' || *p == text[j - 1]);
                }
            }
        }
        matches = next;
    }

    matches[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::RelationQuery;
    use serde_json::json;

    fn store() -> MemoryAggregateStore {
        let store = MemoryAggregateStore::new();
        for (user_id, amount, done) in [(1, 10, true), (1, 5, false), (2, 7, true), (3, 1, false)] {
            store
                .insert(
                    "tasks",
                    json!({"user_id": user_id, "amount": amount, "done": done, "title": format!("task {amount}")}),
                )
                .unwrap();
        }
        store
    }

    fn query(function: AggregateFunction, column: &str) -> AggregateQuery {
        AggregateQuery {
            related_table: "tasks".to_string(),
            join: RelationJoin::Direct {
                group_column: "user_id".to_string(),
                morph: None,
            },
            parent_keys: vec![json!(1), json!(2), json!(9)],
            function,
            column: column.to_string(),
            conditions: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_count_groups_only_requested_parents() {
        let store = store();
        let rows = store.aggregate(&query(AggregateFunction::Count, "*")).await.unwrap();

        assert_eq!(
            rows,
            vec![AggregateRow::new(1, 2), AggregateRow::new(2, 1)]
        );
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_sum_avg_min_max() {
        let store = store();

        let sum = store.aggregate(&query(AggregateFunction::Sum, "amount")).await.unwrap();
        assert_eq!(sum[0].aggregate, json!(15.0));

        let avg = store.aggregate(&query(AggregateFunction::Avg, "amount")).await.unwrap();
        assert_eq!(avg[0].aggregate, json!(7.5));

        let min = store.aggregate(&query(AggregateFunction::Min, "amount")).await.unwrap();
        assert_eq!(min[0].aggregate, json!(5));

        let max = store.aggregate(&query(AggregateFunction::Max, "title")).await.unwrap();
        assert_eq!(max[0].aggregate, json!("task 5"));

        assert_eq!(store.query_count(), 4);
    }

    #[tokio::test]
    async fn test_conditions_filter_rows() {
        let store = store();
        let mut aggregate = query(AggregateFunction::Count, "*");
        aggregate.conditions = RelationQuery::new("tasks").where_eq("done", true).into_conditions();

        let rows = store.aggregate(&aggregate).await.unwrap();
        assert_eq!(rows, vec![AggregateRow::new(1, 1), AggregateRow::new(2, 1)]);
    }

    #[tokio::test]
    async fn test_missing_table_is_a_database_error() {
        let store = MemoryAggregateStore::new();
        let err = store.aggregate(&query(AggregateFunction::Count, "*")).await.unwrap_err();
        assert!(matches!(err, ModelError::Database(_)));
    }

    #[tokio::test]
    async fn test_pivot_join() {
        let store = MemoryAggregateStore::new();
        store.insert("roles", json!({"id": 1, "name": "admin"})).unwrap();
        store.insert("roles", json!({"id": 2, "name": "editor"})).unwrap();
        store.insert("role_user", json!({"user_id": 1, "role_id": 1})).unwrap();
        store.insert("role_user", json!({"user_id": 1, "role_id": 2})).unwrap();
        store.insert("role_user", json!({"user_id": 2, "role_id": 2})).unwrap();

        let aggregate = AggregateQuery {
            related_table: "roles".to_string(),
            join: RelationJoin::Pivot {
                table: "role_user".to_string(),
                parent_column: "user_id".to_string(),
                related_column: "role_id".to_string(),
                related_key: "id".to_string(),
            },
            parent_keys: vec![json!(1), json!(2)],
            function: AggregateFunction::Count,
            column: "*".to_string(),
            conditions: RelationQuery::new("roles").where_like("name", "ed%").into_conditions(),
        };

        let rows = store.aggregate(&aggregate).await.unwrap();
        assert_eq!(rows, vec![AggregateRow::new(1, 1), AggregateRow::new(2, 1)]);
    }

    #[test]
    fn test_like() {
        assert!(like("editor", "ed%"));
        assert!(like("editor", "%it%"));
        assert!(like("editor", "e_itor"));
        assert!(!like("admin", "ed%"));
        assert!(like("", "%"));
        assert!(!like("a", ""));
    }

    #[test]
    fn test_null_never_matches_comparisons() {
        let row: Row = json!({"priority": null}).as_object().cloned().unwrap();
        let eq = WhereCondition::single("priority", QueryOperator::Equal, Value::Null);
        let ne = WhereCondition::single("priority", QueryOperator::NotEqual, json!(1));
        assert!(!condition_matches(&eq, &row));
        assert!(!condition_matches(&ne, &row));
    }
}
