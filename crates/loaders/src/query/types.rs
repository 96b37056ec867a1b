//! Query Builder Types - operators and conditions shared by every store

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
            QueryOperator::Between => write!(f, "BETWEEN"),
        }
    }
}

/// Where clause condition on a column of the related table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhereCondition {
    pub column: String,
    pub operator: QueryOperator,
    pub value: Option<Value>,
    pub values: Vec<Value>, // For IN, NOT IN, BETWEEN
}

impl WhereCondition {
    /// Condition comparing a column against a single value
    pub fn single(column: &str, operator: QueryOperator, value: Value) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: Some(value),
            values: Vec::new(),
        }
    }

    /// Condition comparing a column against a list of values
    pub fn list(column: &str, operator: QueryOperator, values: Vec<Value>) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: None,
            values,
        }
    }

    /// Condition with no operand (`IS NULL`, `IS NOT NULL`)
    pub fn unary(column: &str, operator: QueryOperator) -> Self {
        Self::list(column, operator, Vec::new())
    }
}
