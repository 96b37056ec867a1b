//! Batch loader registry
//!
//! Collects one loader per distinct [`LoaderKey`] while a response is
//! being planned, then runs each of them exactly once over the batch.
//! This is the only place where identical aggregate requests are merged;
//! loaders themselves never cache.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use super::models_loader::{Annotations, ModelsLoader};
use crate::config::LoaderConfig;
use crate::error::ModelResult;
use crate::record::Record;

/// Identifies one batched aggregate query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoaderKey {
    pub relation: String,
    pub column: String,
    pub function: String,
    /// Identity of the builder decorator
    pub decorator: String,
}

impl LoaderKey {
    pub fn new(relation: &str, column: &str, function: &str, decorator: &str) -> Self {
        Self {
            relation: relation.to_string(),
            column: column.to_string(),
            function: function.to_string(),
            decorator: decorator.to_string(),
        }
    }
}

impl Display for LoaderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) of {}", self.function, self.column, self.relation)?;
        if !self.decorator.is_empty() {
            write!(f, " [{}]", self.decorator)?;
        }
        Ok(())
    }
}

/// Outcome of running every registered loader over a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchLoadResult {
    /// Number of loaders executed
    pub loaders_run: usize,
    /// Registrations answered by an already registered loader
    pub registrations_deduplicated: usize,
    /// Attribute writes applied to records
    pub annotations_written: usize,
}

impl Display for BatchLoadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BatchLoader: {} loaders run, {} registrations deduplicated, {} annotations written",
            self.loaders_run, self.registrations_deduplicated, self.annotations_written
        )
    }
}

/// Registry of the loaders needed for one batch
pub struct BatchLoaderRegistry {
    config: LoaderConfig,
    loaders: Vec<(LoaderKey, Arc<dyn ModelsLoader>)>,
    index: HashMap<LoaderKey, usize>,
    deduplicated: usize,
}

impl Default for BatchLoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchLoaderRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            config,
            loaders: Vec::new(),
            index: HashMap::new(),
            deduplicated: 0,
        }
    }

    /// Return the loader registered under `key`, registering the one built
    /// by `factory` if there is none yet
    pub fn register<F>(&mut self, key: LoaderKey, factory: F) -> Arc<dyn ModelsLoader>
    where
        F: FnOnce() -> Arc<dyn ModelsLoader>,
    {
        if let Some(&position) = self.index.get(&key) {
            self.deduplicated += 1;
            return self.loaders[position].1.clone();
        }

        let loader = factory();
        self.index.insert(key.clone(), self.loaders.len());
        self.loaders.push((key, loader.clone()));
        loader
    }

    pub fn get(&self, key: &LoaderKey) -> Option<Arc<dyn ModelsLoader>> {
        self.index
            .get(key)
            .map(|&position| self.loaders[position].1.clone())
    }

    /// Keys in registration order
    pub fn keys(&self) -> Vec<&LoaderKey> {
        self.loaders.iter().map(|(key, _)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Run every registered loader once over `records`.
    ///
    /// All loaders compute before any record is written; if one fails the
    /// batch is left exactly as it was.
    pub async fn load_all(&self, records: &mut [Record]) -> ModelResult<BatchLoadResult> {
        if records.is_empty() || self.loaders.is_empty() {
            return Ok(BatchLoadResult {
                registrations_deduplicated: self.deduplicated,
                ..BatchLoadResult::default()
            });
        }

        let fetched: Vec<Annotations> = {
            let shared: &[Record] = records;
            if self.config.parallel_execution {
                try_join_all(self.loaders.iter().map(|(_, loader)| loader.fetch(shared))).await?
            } else {
                let mut fetched = Vec::with_capacity(self.loaders.len());
                for (_, loader) in &self.loaders {
                    fetched.push(loader.fetch(shared).await?);
                }
                fetched
            }
        };

        let mut annotations_written = 0;
        for annotations in fetched {
            annotations_written += annotations.apply(records);
        }

        let result = BatchLoadResult {
            loaders_run: self.loaders.len(),
            registrations_deduplicated: self.deduplicated,
            annotations_written,
        };
        debug!(records = records.len(), "{}", result);

        Ok(result)
    }
}

impl fmt::Debug for BatchLoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchLoaderRegistry")
            .field("config", &self.config)
            .field("keys", &self.keys())
            .field("deduplicated", &self.deduplicated)
            .finish()
    }
}

#[cfg(test)]
mod tests;
