//! Bulk aggregate requests sent to a store

use std::fmt;

use serde_json::Value;

use super::types::WhereCondition;
use crate::error::{ModelError, ModelResult};
use crate::security::validate_identifier;

/// An aggregate function applied to the related rows of each parent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// Any other aggregate the store understands, e.g. `bool_and`
    Other(String),
}

impl AggregateFunction {
    /// Parse a function name; unknown names must be plain identifiers
    pub fn parse(name: &str) -> ModelResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "sum" => Ok(Self::Sum),
            "avg" => Ok(Self::Avg),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => {
                validate_identifier(name)?;
                Ok(Self::Other(name.to_ascii_lowercase()))
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
            Self::Other(name) => name,
        }
    }

    /// Value of the aggregate over an empty group
    pub fn empty_value(&self) -> Value {
        match self {
            Self::Count => Value::from(0),
            _ => Value::Null,
        }
    }

    /// Whether `*` is an acceptable argument
    pub fn accepts_wildcard(&self) -> bool {
        matches!(self, Self::Count | Self::Other(_))
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shape of the join from related rows back to their parent key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationJoin {
    /// Related rows carry the parent key in `group_column`, optionally
    /// restricted to one morph type as `(type_column, morph_type)`
    Direct {
        group_column: String,
        morph: Option<(String, String)>,
    },
    /// Related rows are reached through a pivot table
    Pivot {
        table: String,
        parent_column: String,
        related_column: String,
        related_key: String,
    },
}

/// One bulk aggregate over a relation for a fixed set of parent keys
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub related_table: String,
    pub join: RelationJoin,
    /// Distinct, non-null parent keys
    pub parent_keys: Vec<Value>,
    pub function: AggregateFunction,
    /// Column of the related table, or `*`
    pub column: String,
    /// Conditions collected from the builder decorator
    pub conditions: Vec<WhereCondition>,
}

impl AggregateQuery {
    /// Check every identifier and the function/column pairing
    pub fn validate(&self) -> ModelResult<()> {
        validate_identifier(&self.related_table)?;

        match &self.join {
            RelationJoin::Direct { group_column, morph } => {
                validate_identifier(group_column)?;
                if let Some((type_column, _)) = morph {
                    validate_identifier(type_column)?;
                }
            }
            RelationJoin::Pivot {
                table,
                parent_column,
                related_column,
                related_key,
            } => {
                validate_identifier(table)?;
                validate_identifier(parent_column)?;
                validate_identifier(related_column)?;
                validate_identifier(related_key)?;
            }
        }

        if self.column == "*" {
            if !self.function.accepts_wildcard() {
                return Err(ModelError::Validation(format!(
                    "Aggregate function '{}' needs a column, got '*'",
                    self.function
                )));
            }
        } else {
            validate_identifier(&self.column)?;
        }

        for condition in &self.conditions {
            validate_identifier(&condition.column)?;
        }

        Ok(())
    }
}

/// One result row: the aggregate for the parent identified by `parent_key`.
///
/// Stores only return rows for parents that have related rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub parent_key: Value,
    pub aggregate: Value,
}

impl AggregateRow {
    pub fn new(parent_key: impl Into<Value>, aggregate: impl Into<Value>) -> Self {
        Self {
            parent_key: parent_key.into(),
            aggregate: aggregate.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn count_query() -> AggregateQuery {
        AggregateQuery {
            related_table: "tasks".to_string(),
            join: RelationJoin::Direct {
                group_column: "user_id".to_string(),
                morph: None,
            },
            parent_keys: vec![json!(1)],
            function: AggregateFunction::Count,
            column: "*".to_string(),
            conditions: Vec::new(),
        }
    }

    #[test]
    fn test_parse_functions() {
        assert_eq!(AggregateFunction::parse("COUNT").unwrap(), AggregateFunction::Count);
        assert_eq!(AggregateFunction::parse("avg").unwrap(), AggregateFunction::Avg);
        assert_eq!(
            AggregateFunction::parse("bool_and").unwrap(),
            AggregateFunction::Other("bool_and".to_string())
        );
        assert!(AggregateFunction::parse("sum(1); --").is_err());
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(AggregateFunction::Count.empty_value(), json!(0));
        assert_eq!(AggregateFunction::Sum.empty_value(), Value::Null);
        assert_eq!(AggregateFunction::Max.empty_value(), Value::Null);
    }

    #[test]
    fn test_validate() {
        assert!(count_query().validate().is_ok());

        let mut query = count_query();
        query.function = AggregateFunction::Sum;
        assert!(matches!(query.validate(), Err(ModelError::Validation(_))));

        let mut query = count_query();
        query.column = "amount\"".to_string();
        assert!(query.validate().is_err());
    }
}
