//! Builder decorators and named scopes
//!
//! A decorator is the caller's hook into the relation query. Loaders apply
//! it without knowing what it does; its `id` is what tells two decorators
//! apart when loaders are batched.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{ModelError, ModelResult};
use crate::query::RelationQuery;

/// Signature of a relation query transform
pub type DecorateFn = dyn Fn(RelationQuery) -> RelationQuery + Send + Sync;

/// An identified transform over a relation query
#[derive(Clone)]
pub struct BuilderDecorator {
    id: String,
    decorate: Arc<DecorateFn>,
}

impl BuilderDecorator {
    pub fn new<F>(id: &str, decorate: F) -> Self
    where
        F: Fn(RelationQuery) -> RelationQuery + Send + Sync + 'static,
    {
        Self {
            id: id.to_string(),
            decorate: Arc::new(decorate),
        }
    }

    /// Decorator that leaves the query untouched
    pub fn identity() -> Self {
        Self::new("", |query| query)
    }

    /// Identity used when batching loaders
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn apply(&self, query: RelationQuery) -> RelationQuery {
        (self.decorate)(query)
    }

    /// Run `self`, then `next`
    pub fn then(self, next: BuilderDecorator) -> Self {
        let id = match (self.id.is_empty(), next.id.is_empty()) {
            (true, _) => next.id.clone(),
            (_, true) => self.id.clone(),
            _ => format!("{}+{}", self.id, next.id),
        };
        let first = self.decorate;
        let second = next.decorate;

        Self {
            id,
            decorate: Arc::new(move |query| second(first(query))),
        }
    }
}

impl Default for BuilderDecorator {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for BuilderDecorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderDecorator").field("id", &self.id).finish()
    }
}

/// Named, reusable query filters per related table
#[derive(Clone, Default)]
pub struct ScopeRegistry {
    scopes: Arc<DashMap<String, HashMap<String, Arc<DecorateFn>>>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scope for a related table
    pub fn register<F>(&self, table: &str, name: &str, scope: F)
    where
        F: Fn(RelationQuery) -> RelationQuery + Send + Sync + 'static,
    {
        self.scopes
            .entry(table.to_string())
            .or_default()
            .insert(name.to_string(), Arc::new(scope));
    }

    pub fn has_scope(&self, table: &str, name: &str) -> bool {
        self.scopes
            .get(table)
            .map(|scopes| scopes.contains_key(name))
            .unwrap_or(false)
    }

    /// Compose the named scopes, in order, into one decorator
    pub fn decorator(&self, table: &str, names: &[String]) -> ModelResult<BuilderDecorator> {
        if names.is_empty() {
            return Ok(BuilderDecorator::identity());
        }

        let mut chain: Vec<Arc<DecorateFn>> = Vec::with_capacity(names.len());
        {
            let scopes = self.scopes.get(table);
            for name in names {
                let scope = scopes
                    .as_ref()
                    .and_then(|scopes| scopes.get(name))
                    .ok_or_else(|| {
                        ModelError::Definition(format!(
                            "Scope '{}' is not defined for '{}'",
                            name, table
                        ))
                    })?;
                chain.push(scope.clone());
            }
        }

        let id = format!("scopes:{}", names.join(","));
        Ok(BuilderDecorator::new(&id, move |query| {
            chain.iter().fold(query, |query, scope| scope(query))
        }))
    }
}

impl fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables: Vec<String> = self.scopes.iter().map(|entry| entry.key().clone()).collect();
        f.debug_struct("ScopeRegistry").field("tables", &tables).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::QueryOperator;

    #[test]
    fn test_identity() {
        let query = BuilderDecorator::identity().apply(RelationQuery::new("tasks"));
        assert!(query.conditions().is_empty());
        assert_eq!(BuilderDecorator::default().id(), "");
    }

    #[test]
    fn test_then_composes_in_order() {
        let completed = BuilderDecorator::new("completed", |q| q.where_not_null("completed_at"));
        let urgent = BuilderDecorator::new("urgent", |q| q.where_gt("priority", 3));

        let both = completed.then(urgent);
        assert_eq!(both.id(), "completed+urgent");

        let query = both.apply(RelationQuery::new("tasks"));
        assert_eq!(query.conditions()[0].operator, QueryOperator::IsNotNull);
        assert_eq!(query.conditions()[1].operator, QueryOperator::GreaterThan);

        let only = BuilderDecorator::identity().then(BuilderDecorator::new("x", |q| q));
        assert_eq!(only.id(), "x");
    }

    #[test]
    fn test_scope_registry() {
        let scopes = ScopeRegistry::new();
        scopes.register("tasks", "completed", |q| q.where_not_null("completed_at"));
        scopes.register("tasks", "urgent", |q| q.where_gt("priority", 3));

        assert!(scopes.has_scope("tasks", "completed"));
        assert!(!scopes.has_scope("posts", "completed"));

        let decorator = scopes
            .decorator("tasks", &["completed".to_string(), "urgent".to_string()])
            .unwrap();
        assert_eq!(decorator.id(), "scopes:completed,urgent");
        assert_eq!(decorator.apply(RelationQuery::new("tasks")).conditions().len(), 2);

        let none = scopes.decorator("tasks", &[]).unwrap();
        assert_eq!(none.id(), "");
    }

    #[test]
    fn test_unknown_scope() {
        let scopes = ScopeRegistry::new();
        let err = scopes
            .decorator("tasks", &["archived".to_string()])
            .unwrap_err();
        assert_eq!(
            err,
            ModelError::Definition("Scope 'archived' is not defined for 'tasks'".to_string())
        );
    }
}
