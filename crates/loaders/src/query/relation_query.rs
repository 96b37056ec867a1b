//! The relation query handed to builder decorators
//!
//! A decorator receives the query over the related table and returns it
//! with extra conditions. Loaders never look inside; stores render or
//! evaluate the collected conditions.

use serde_json::Value;

use super::types::{QueryOperator, WhereCondition};

/// Conditions applied to a relation's rows before they are aggregated
#[derive(Debug, Clone, PartialEq)]
pub struct RelationQuery {
    table: String,
    conditions: Vec<WhereCondition>,
}

impl RelationQuery {
    /// Start an unconstrained query over the related table
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        &self.conditions
    }

    pub fn into_conditions(self) -> Vec<WhereCondition> {
        self.conditions
    }

    fn push(mut self, condition: WhereCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add WHERE condition with equality
    pub fn where_eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push(WhereCondition::single(column, QueryOperator::Equal, value.into()))
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push(WhereCondition::single(column, QueryOperator::NotEqual, value.into()))
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push(WhereCondition::single(column, QueryOperator::GreaterThan, value.into()))
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push(WhereCondition::single(
            column,
            QueryOperator::GreaterThanOrEqual,
            value.into(),
        ))
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push(WhereCondition::single(column, QueryOperator::LessThan, value.into()))
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.push(WhereCondition::single(
            column,
            QueryOperator::LessThanOrEqual,
            value.into(),
        ))
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.push(WhereCondition::single(
            column,
            QueryOperator::Like,
            Value::String(pattern.to_string()),
        ))
    }

    /// Add WHERE column IN (...)
    pub fn where_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(WhereCondition::list(column, QueryOperator::In, values))
    }

    /// Add WHERE column NOT IN (...)
    pub fn where_not_in<T: Into<Value>>(self, column: &str, values: Vec<T>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(WhereCondition::list(column, QueryOperator::NotIn, values))
    }

    /// Add WHERE column BETWEEN low AND high
    pub fn where_between<T: Into<Value>>(self, column: &str, low: T, high: T) -> Self {
        self.push(WhereCondition::list(
            column,
            QueryOperator::Between,
            vec![low.into(), high.into()],
        ))
    }

    /// Add WHERE column IS NULL
    pub fn where_null(self, column: &str) -> Self {
        self.push(WhereCondition::unary(column, QueryOperator::IsNull))
    }

    /// Add WHERE column IS NOT NULL
    pub fn where_not_null(self, column: &str) -> Self {
        self.push(WhereCondition::unary(column, QueryOperator::IsNotNull))
    }
}
