//! PostgreSQL rendering of aggregate queries

use serde_json::Value;

use super::aggregate::{AggregateFunction, AggregateQuery, RelationJoin};
use super::types::{QueryOperator, WhereCondition};
use crate::error::ModelResult;
use crate::record::key_string;
use crate::security::{escape_identifier, qualified_column};

/// Result column carrying the parent key
pub const PARENT_KEY_COLUMN: &str = "parent_key";
/// Result column carrying the aggregate value
pub const AGGREGATE_COLUMN: &str = "aggregate";
/// Most bind parameters PostgreSQL accepts in one statement
pub const MAX_BIND_PARAMS: usize = 65_535;

/// Accumulates bind parameters and hands out `$n` placeholders
struct Params {
    values: Vec<Value>,
}

impl Params {
    fn push(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }
}

impl AggregateQuery {
    /// Generate SQL with parameter placeholders and the values to bind.
    ///
    /// Parents without related rows produce no result row; the caller
    /// fills in [`AggregateFunction::empty_value`] for them.
    ///
    /// Parent keys are compared and returned in their text form, the same
    /// form [`key_string`] gives them, so integer, UUID and string keys all
    /// bind the same way whatever the column type.
    pub fn to_sql_with_params(&self) -> ModelResult<(String, Vec<Value>)> {
        self.validate()?;

        let mut params = Params { values: Vec::new() };
        let related = &self.related_table;

        let (group_expr, from_clause) = match &self.join {
            RelationJoin::Direct { group_column, .. } => (
                qualified_column(related, group_column),
                escape_identifier(related),
            ),
            RelationJoin::Pivot {
                table,
                parent_column,
                related_column,
                related_key,
            } => (
                qualified_column(table, parent_column),
                format!(
                    "{} INNER JOIN {} ON {} = {}",
                    escape_identifier(related),
                    escape_identifier(table),
                    qualified_column(table, related_column),
                    qualified_column(related, related_key),
                ),
            ),
        };

        let key_expr = format!("CAST({} AS TEXT)", group_expr);
        let placeholders: Vec<String> = self
            .parent_keys
            .iter()
            .filter_map(key_string)
            .map(|key| params.push(Value::String(key)))
            .collect();

        let mut where_parts = vec![format!(
            "{} = ANY(ARRAY[{}])",
            key_expr,
            placeholders.join(", ")
        )];

        if let RelationJoin::Direct {
            morph: Some((type_column, morph_type)),
            ..
        } = &self.join
        {
            let placeholder = params.push(Value::String(morph_type.clone()));
            where_parts.push(format!(
                "{} = {}",
                qualified_column(related, type_column),
                placeholder
            ));
        }

        for condition in &self.conditions {
            where_parts.push(render_condition(related, condition, &mut params));
        }

        let sql = format!(
            "SELECT {} AS {}, {} AS {} FROM {} WHERE {} GROUP BY {}",
            key_expr,
            escape_identifier(PARENT_KEY_COLUMN),
            self.aggregate_expr(),
            escape_identifier(AGGREGATE_COLUMN),
            from_clause,
            where_parts.join(" AND "),
            group_expr,
        );

        Ok((sql, params.values))
    }

    /// Number of bind parameters the rendered statement carries
    pub fn param_count(&self) -> usize {
        let morph = match &self.join {
            RelationJoin::Direct { morph: Some(_), .. } => 1,
            _ => 0,
        };
        let conditions: usize = self
            .conditions
            .iter()
            .map(|condition| match condition.operator {
                QueryOperator::IsNull | QueryOperator::IsNotNull => 0,
                QueryOperator::In | QueryOperator::NotIn => condition.values.len(),
                QueryOperator::Between => 2,
                _ => 1,
            })
            .sum();

        self.parent_keys.len() + morph + conditions
    }

    fn aggregate_expr(&self) -> String {
        let argument = if self.column == "*" {
            "*".to_string()
        } else {
            qualified_column(&self.related_table, &self.column)
        };

        match &self.function {
            // NUMERIC results are cast so every driver decodes them as floats
            AggregateFunction::Sum | AggregateFunction::Avg => format!(
                "CAST({}({}) AS DOUBLE PRECISION)",
                self.function.as_str().to_uppercase(),
                argument
            ),
            AggregateFunction::Other(name) => format!("{}({})", name, argument),
            function => format!("{}({})", function.as_str().to_uppercase(), argument),
        }
    }
}

fn render_condition(table: &str, condition: &WhereCondition, params: &mut Params) -> String {
    let column = qualified_column(table, &condition.column);

    match condition.operator {
        QueryOperator::IsNull | QueryOperator::IsNotNull => {
            format!("{} {}", column, condition.operator)
        }
        QueryOperator::In | QueryOperator::NotIn => {
            if condition.values.is_empty() {
                // IN () is not valid SQL
                return if condition.operator == QueryOperator::In {
                    "FALSE".to_string()
                } else {
                    "TRUE".to_string()
                };
            }
            let placeholders: Vec<String> = condition
                .values
                .iter()
                .map(|value| params.push(value.clone()))
                .collect();
            format!("{} {} ({})", column, condition.operator, placeholders.join(", "))
        }
        QueryOperator::Between => {
            let low = params.push(condition.values.first().cloned().unwrap_or(Value::Null));
            let high = params.push(condition.values.get(1).cloned().unwrap_or(Value::Null));
            format!("{} BETWEEN {} AND {}", column, low, high)
        }
        _ => {
            let placeholder = params.push(condition.value.clone().unwrap_or(Value::Null));
            format!("{} {} {}", column, condition.operator, placeholder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::RelationQuery;
    use serde_json::json;

    fn query(join: RelationJoin, function: AggregateFunction, column: &str) -> AggregateQuery {
        AggregateQuery {
            related_table: "tasks".to_string(),
            join,
            parent_keys: vec![json!(1), json!(2)],
            function,
            column: column.to_string(),
            conditions: Vec::new(),
        }
    }

    fn direct() -> RelationJoin {
        RelationJoin::Direct {
            group_column: "user_id".to_string(),
            morph: None,
        }
    }

    #[test]
    fn test_count_sql() {
        let (sql, params) = query(direct(), AggregateFunction::Count, "*")
            .to_sql_with_params()
            .unwrap();

        assert_eq!(
            sql,
            "SELECT CAST(\"tasks\".\"user_id\" AS TEXT) AS \"parent_key\", COUNT(*) AS \"aggregate\" \
             FROM \"tasks\" WHERE CAST(\"tasks\".\"user_id\" AS TEXT) = ANY(ARRAY[$1, $2]) \
             GROUP BY \"tasks\".\"user_id\""
        );
        assert_eq!(params, vec![json!("1"), json!("2")]);
    }

    #[test]
    fn test_sum_is_cast() {
        let (sql, _) = query(direct(), AggregateFunction::Sum, "amount")
            .to_sql_with_params()
            .unwrap();
        assert!(sql.contains("CAST(SUM(\"tasks\".\"amount\") AS DOUBLE PRECISION)"));
    }

    #[test]
    fn test_conditions_are_bound_after_keys() {
        let mut aggregate = query(direct(), AggregateFunction::Max, "priority");
        aggregate.conditions = RelationQuery::new("tasks")
            .where_not_null("completed_at")
            .where_gt("priority", 2)
            .where_in("status", vec!["open", "done"])
            .where_in::<&str>("label", vec![])
            .into_conditions();

        let (sql, params) = aggregate.to_sql_with_params().unwrap();
        assert!(sql.contains("MAX(\"tasks\".\"priority\")"));
        assert!(sql.contains("\"tasks\".\"completed_at\" IS NOT NULL"));
        assert!(sql.contains("\"tasks\".\"priority\" > $3"));
        assert!(sql.contains("\"tasks\".\"status\" IN ($4, $5)"));
        assert!(sql.contains("AND FALSE"));
        assert_eq!(params, vec![json!("1"), json!("2"), json!(2), json!("open"), json!("done")]);
        assert_eq!(aggregate.param_count(), params.len());
    }

    #[test]
    fn test_morph_filter() {
        let join = RelationJoin::Direct {
            group_column: "commentable_id".to_string(),
            morph: Some(("commentable_type".to_string(), "Post".to_string())),
        };
        let aggregate = query(join, AggregateFunction::Count, "*");
        let (sql, params) = aggregate.to_sql_with_params().unwrap();

        assert!(sql.contains("\"tasks\".\"commentable_type\" = $3"));
        assert_eq!(params[2], json!("Post"));
        assert_eq!(aggregate.param_count(), 3);
    }

    #[test]
    fn test_uuid_keys_bind_as_text() {
        let mut aggregate = query(direct(), AggregateFunction::Count, "*");
        aggregate.parent_keys = vec![
            json!("6f1c1b6e-3d5e-4c4f-9a55-0b1f0f6f7a10"),
            json!("0b8e2e4a-51f5-4f39-8d2e-bb1cf0a4f0c2"),
        ];

        let (sql, params) = aggregate.to_sql_with_params().unwrap();
        assert!(sql.contains(
            "WHERE CAST(\"tasks\".\"user_id\" AS TEXT) = ANY(ARRAY[$1, $2])"
        ));
        assert_eq!(params, aggregate.parent_keys);
    }

    #[test]
    fn test_whole_float_keys_bind_as_integers() {
        let mut aggregate = query(direct(), AggregateFunction::Count, "*");
        aggregate.parent_keys = vec![json!(1.0), json!(2.5)];

        let (_, params) = aggregate.to_sql_with_params().unwrap();
        assert_eq!(params, vec![json!("1"), json!("2.5")]);
    }

    #[test]
    fn test_pivot_join() {
        let join = RelationJoin::Pivot {
            table: "role_user".to_string(),
            parent_column: "user_id".to_string(),
            related_column: "role_id".to_string(),
            related_key: "id".to_string(),
        };
        let (sql, _) = query(join, AggregateFunction::Count, "*")
            .to_sql_with_params()
            .unwrap();

        assert!(sql.contains(
            "FROM \"tasks\" INNER JOIN \"role_user\" ON \"role_user\".\"role_id\" = \"tasks\".\"id\""
        ));
        assert!(sql.contains("SELECT CAST(\"role_user\".\"user_id\" AS TEXT) AS \"parent_key\""));
        assert!(sql.contains("GROUP BY \"role_user\".\"user_id\""));
    }

    #[test]
    fn test_other_function() {
        let (sql, _) = query(direct(), AggregateFunction::Other("bool_and".to_string()), "done")
            .to_sql_with_params()
            .unwrap();
        assert!(sql.contains("bool_and(\"tasks\".\"done\")"));
    }

    #[test]
    fn test_invalid_condition_column() {
        let mut aggregate = query(direct(), AggregateFunction::Count, "*");
        aggregate.conditions = RelationQuery::new("tasks")
            .where_eq("1=1 OR x", 1)
            .into_conditions();
        assert!(aggregate.to_sql_with_params().is_err());
    }
}
