//! Aggregate attribute naming
//!
//! Loading writes an aggregate under a derived attribute name and
//! extraction reads it back under the same name, possibly much later and
//! on another call stack. Both sides go through [`aggregate_attribute`].
//!
//! A relation may carry an alias, `"<relation> as <alias>"`: exactly three
//! single-space separated segments with the middle one equal to `as` in
//! any case. Anything else is a plain relation name and the attribute is
//! generated from `"{relation} {function} {column}"`.

/// A relation specification split into the relation to query and its alias
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSpec<'a> {
    /// Relation name used to resolve the relationship
    pub name: &'a str,
    /// Attribute name chosen by the caller, if any
    pub alias: Option<&'a str>,
}

impl<'a> RelationSpec<'a> {
    pub fn parse(relation: &'a str) -> Self {
        let segments: Vec<&str> = relation.split(' ').collect();

        if segments.len() == 3 && segments[1].eq_ignore_ascii_case("as") {
            Self {
                name: segments[0],
                alias: Some(segments[2]),
            }
        } else {
            Self {
                name: relation,
                alias: None,
            }
        }
    }
}

/// Attribute name under which an aggregate of `relation` is stored.
///
/// ```
/// use elif_loaders::naming::aggregate_attribute;
///
/// assert_eq!(aggregate_attribute("tasks", "*", "count"), "tasks_count");
/// assert_eq!(aggregate_attribute("tasks as done", "*", "count"), "done");
/// ```
pub fn aggregate_attribute(relation: &str, column: &str, function: &str) -> String {
    if let Some(alias) = RelationSpec::parse(relation).alias {
        return alias.to_string();
    }

    snake(&strip_symbols(&format!("{} {} {}", relation, function, column)))
}

/// Remove everything but alphanumerics, whitespace and underscores
fn strip_symbols(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect()
}

/// Word separators that start a new capitalized word before whitespace is dropped
fn is_word_delimiter(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\u{0B}' | '\u{0C}')
}

/// Snake-case a string.
///
/// All-lowercase ASCII input is returned untouched. Otherwise every word
/// is capitalized, whitespace is dropped, an underscore goes in front of
/// each ASCII uppercase letter that is not first, and the result is
/// lowercased.
fn snake(value: &str) -> String {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_lowercase()) {
        return value.to_string();
    }

    let mut studly = String::with_capacity(value.len());
    let mut word_start = true;
    for c in value.chars() {
        if word_start {
            studly.push(c.to_ascii_uppercase());
        } else {
            studly.push(c);
        }
        word_start = is_word_delimiter(c);
    }

    let mut snake = String::with_capacity(studly.len() + 8);
    for c in studly.chars().filter(|c| !c.is_whitespace()) {
        if c.is_ascii_uppercase() && !snake.is_empty() {
            snake.push('_');
        }
        snake.push(c);
    }

    snake.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_alias() {
        let spec = RelationSpec::parse("tasks as tasks_completed");
        assert_eq!(spec.name, "tasks");
        assert_eq!(spec.alias, Some("tasks_completed"));

        let spec = RelationSpec::parse("tasks AS done");
        assert_eq!(spec.alias, Some("done"));
    }

    #[test]
    fn test_parse_without_alias() {
        for relation in ["tasks", "tasks as", "tasks as a b", "as tasks", "tasks  as done"] {
            let spec = RelationSpec::parse(relation);
            assert_eq!(spec.name, relation);
            assert_eq!(spec.alias, None, "{relation} must not parse as alias");
        }
    }

    #[test]
    fn test_alias_takes_precedence() {
        for (column, function) in [("*", "count"), ("amount", "sum"), ("due", "max")] {
            assert_eq!(
                aggregate_attribute("tasks as tasks_completed", column, function),
                "tasks_completed"
            );
        }
    }

    #[test]
    fn test_alias_is_verbatim() {
        assert_eq!(aggregate_attribute("tasks as DoneTasks", "*", "count"), "DoneTasks");
        assert_eq!(aggregate_attribute("tasks as ", "*", "count"), "");
    }

    #[test]
    fn test_generated_names() {
        assert_eq!(aggregate_attribute("tasks", "*", "count"), "tasks_count");
        assert_eq!(aggregate_attribute("tasks", "amount", "sum"), "tasks_sum_amount");
        assert_eq!(aggregate_attribute("posts", "created_at", "max"), "posts_max_created_at");
        assert_eq!(aggregate_attribute("userTasks", "*", "count"), "user_tasks_count");
        assert_eq!(aggregate_attribute("tasks", "Score", "avg"), "tasks_avg_score");
    }

    #[test]
    fn test_misplaced_as_falls_through() {
        assert_eq!(aggregate_attribute("tasks as", "*", "count"), "tasks_as_count");
        assert_eq!(aggregate_attribute("as", "*", "count"), "as_count");
    }

    #[test]
    fn test_symbols_are_stripped() {
        assert_eq!(aggregate_attribute("tasks.items", "*", "count"), "tasksitems_count");
        assert_eq!(aggregate_attribute("tasks-archived", "*", "count"), "tasksarchived_count");
    }

    #[test]
    fn test_unicode_alphanumerics_survive() {
        assert_eq!(aggregate_attribute("zadania", "wartość", "sum"), "zadania_sum_wartość");
    }

    #[test]
    fn test_snake_keeps_plain_lowercase() {
        assert_eq!(snake("tasks"), "tasks");
        assert_eq!(snake("HTTPLog"), "h_t_t_p_log");
        assert_eq!(snake(""), "");
    }

    #[test]
    fn test_naming_is_deterministic() {
        let first = aggregate_attribute("comments", "likes", "sum");
        let second = aggregate_attribute("comments", "likes", "sum");
        assert_eq!(first, second);
    }
}
