//! Shared loader context

use std::fmt;
use std::sync::Arc;

use crate::config::LoaderConfig;
use crate::relationships::RelationshipRegistry;
use crate::store::AggregateStore;

/// Everything a loader needs besides its own specification: the store to
/// query, the relationships to resolve and the loader configuration
#[derive(Clone)]
pub struct LoaderContext {
    store: Arc<dyn AggregateStore>,
    relationships: RelationshipRegistry,
    config: LoaderConfig,
}

impl LoaderContext {
    pub fn new(store: Arc<dyn AggregateStore>, relationships: RelationshipRegistry) -> Self {
        Self {
            store,
            relationships,
            config: LoaderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &dyn AggregateStore {
        self.store.as_ref()
    }

    pub fn relationships(&self) -> &RelationshipRegistry {
        &self.relationships
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }
}

impl fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderContext")
            .field("relationships", &self.relationships)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
