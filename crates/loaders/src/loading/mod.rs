//! Loader modules for batched relation aggregates
//! Provides the aggregate and count loaders, builder decorators and the
//! registry that runs each distinct loader once per batch

pub mod aggregate_loader;
pub mod batch_registry;
pub mod context;
pub mod count_loader;
pub mod decorator;
pub mod models_loader;

pub use aggregate_loader::AggregateModelsLoader;
pub use batch_registry::{BatchLoadResult, BatchLoaderRegistry, LoaderKey};
pub use context::LoaderContext;
pub use count_loader::CountModelsLoader;
pub use decorator::{BuilderDecorator, DecorateFn, ScopeRegistry};
pub use models_loader::{Annotations, ModelsLoader};
