//! Error types for the loader system
//!
//! Every failure surfaces synchronously at the call site. Nothing here is
//! logged-and-swallowed; store errors are carried through unchanged.

use std::fmt;

/// Result type alias for loader operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for loader operations
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Database connection or query error raised by a store
    Database(String),
    /// Relationship could not be resolved or is not aggregatable
    Relationship(String),
    /// A loaded value did not have the type the extractor requires
    TypeMismatch(String),
    /// Directive arguments or scopes are malformed
    Definition(String),
    /// Invalid metadata or configuration
    Configuration(String),
    /// Unsafe identifier or function name
    Validation(String),
    /// Serialization/deserialization error
    Serialization(String),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Database(msg) => write!(f, "Database error: {}", msg),
            ModelError::Relationship(msg) => write!(f, "Relationship error: {}", msg),
            ModelError::TypeMismatch(msg) => write!(f, "Type mismatch: {}", msg),
            ModelError::Definition(msg) => write!(f, "Definition error: {}", msg),
            ModelError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ModelError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ModelError {}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

/// Error types for relationship resolution
#[derive(Debug, Clone)]
pub enum RelationshipError {
    /// Relationship not registered for the model
    NotFound { model: String, relation: String },
    /// Relationship kind has no aggregate meaning
    NotAggregatable { relation: String, kind: String },
    /// Batch contained records of more than one model
    MixedModels { expected: String, found: String },
}

impl fmt::Display for RelationshipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipError::NotFound { model, relation } => {
                write!(f, "Relationship '{}' is not defined on model '{}'", relation, model)
            }
            RelationshipError::NotAggregatable { relation, kind } => {
                write!(f, "Relationship '{}' of type {} cannot be aggregated", relation, kind)
            }
            RelationshipError::MixedModels { expected, found } => write!(
                f,
                "Batch mixes models '{}' and '{}'; aggregates load one model at a time",
                expected, found
            ),
        }
    }
}

impl std::error::Error for RelationshipError {}

impl From<RelationshipError> for ModelError {
    fn from(err: RelationshipError) -> Self {
        ModelError::Relationship(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_error_conversion() {
        let err: ModelError = RelationshipError::NotFound {
            model: "users".to_string(),
            relation: "tasks".to_string(),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "Relationship error: Relationship 'tasks' is not defined on model 'users'"
        );
    }

    #[test]
    fn test_serde_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ModelError = parse_err.into();
        assert!(matches!(err, ModelError::Serialization(_)));
    }
}
