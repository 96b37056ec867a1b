//! Security utilities for SQL injection prevention
//!
//! Table, column and function names flow into generated SQL as
//! identifiers, never as bound parameters, so each one is validated and
//! then escaped before it is rendered.

use crate::error::ModelError;

/// Characters allowed in SQL identifiers (alphanumeric, underscore, dollar)
const ALLOWED_IDENTIFIER_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_$";

/// SQL keywords that are rejected as bare identifiers
static SQL_KEYWORDS: &[&str] = &[
    "SELECT", "INSERT", "UPDATE", "DELETE", "FROM", "WHERE", "JOIN", "UNION", "DROP",
    "CREATE", "ALTER", "GRANT", "REVOKE", "TRUNCATE", "EXEC", "EXECUTE", "DECLARE",
];

/// Escape a SQL identifier (table name, column name, etc.)
///
/// Doubles embedded double quotes and wraps the identifier in double quotes.
///
/// ```
/// use elif_loaders::security::escape_identifier;
///
/// assert_eq!(escape_identifier("tasks"), "\"tasks\"");
/// assert_eq!(escape_identifier("table\"name"), "\"table\"\"name\"");
/// ```
pub fn escape_identifier(identifier: &str) -> String {
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Render `table.column` with both parts escaped
pub fn qualified_column(table: &str, column: &str) -> String {
    format!("{}.{}", escape_identifier(table), escape_identifier(column))
}

/// Validate that an identifier is safe for use in SQL
pub fn validate_identifier(identifier: &str) -> Result<(), ModelError> {
    let first = match identifier.chars().next() {
        Some(c) => c,
        None => {
            return Err(ModelError::Validation(
                "Identifier cannot be empty".to_string(),
            ))
        }
    };

    // PostgreSQL limit is 63 bytes
    if identifier.len() > 63 {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' is too long (max 63 characters)",
            identifier
        )));
    }

    if let Some(c) = identifier.chars().find(|c| !ALLOWED_IDENTIFIER_CHARS.contains(*c)) {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' contains invalid character '{}'",
            identifier, c
        )));
    }

    if first.is_ascii_digit() {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' cannot start with a number",
            identifier
        )));
    }

    let upper_identifier = identifier.to_uppercase();
    if SQL_KEYWORDS.contains(&upper_identifier.as_str()) {
        return Err(ModelError::Validation(format!(
            "Identifier '{}' is a reserved SQL keyword",
            identifier
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("user_id"), "\"user_id\"");
        assert_eq!(escape_identifier("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_qualified_column() {
        assert_eq!(qualified_column("tasks", "user_id"), "\"tasks\".\"user_id\"");
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("completed_at").is_ok());
        assert!(validate_identifier("$meta").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1st").is_err());
        assert!(validate_identifier("drop").is_err());
        assert!(validate_identifier("name; DROP TABLE users").is_err());
        assert!(validate_identifier(&"a".repeat(64)).is_err());
    }
}
