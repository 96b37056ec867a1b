//! Relationship Registry - runtime metadata storage and lookup

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use super::metadata::RelationshipMetadata;
use crate::error::{ModelResult, RelationshipError};

/// Thread-safe relationship registry shared by every loader of a request
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    /// Map of model name -> relationship name -> metadata
    relationships: Arc<DashMap<String, HashMap<String, RelationshipMetadata>>>,
}

impl RelationshipRegistry {
    /// Create a new empty relationship registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relationship for a model, replacing any previous
    /// definition of the same name
    pub fn register(&self, model_name: &str, metadata: RelationshipMetadata) -> ModelResult<()> {
        metadata.validate()?;

        self.relationships
            .entry(model_name.to_string())
            .or_default()
            .insert(metadata.name.clone(), metadata);

        Ok(())
    }

    /// Builder-style registration
    pub fn with(self, model_name: &str, metadata: RelationshipMetadata) -> ModelResult<Self> {
        self.register(model_name, metadata)?;
        Ok(self)
    }

    /// Get relationship metadata
    pub fn get(&self, model_name: &str, relationship_name: &str) -> Option<RelationshipMetadata> {
        self.relationships
            .get(model_name)
            .and_then(|relations| relations.get(relationship_name).cloned())
    }

    /// Get relationship metadata or fail with a relationship error
    pub fn resolve(&self, model_name: &str, relationship_name: &str) -> ModelResult<RelationshipMetadata> {
        self.get(model_name, relationship_name).ok_or_else(|| {
            RelationshipError::NotFound {
                model: model_name.to_string(),
                relation: relationship_name.to_string(),
            }
            .into()
        })
    }

    pub fn has_relationship(&self, model_name: &str, relationship_name: &str) -> bool {
        self.relationships
            .get(model_name)
            .map(|relations| relations.contains_key(relationship_name))
            .unwrap_or(false)
    }

    /// Names of all relationships registered for a model, sorted
    pub fn relationship_names(&self, model_name: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .relationships
            .get(model_name)
            .map(|relations| relations.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Remove every registered relationship
    pub fn clear(&self) {
        self.relationships.clear();
    }
}
