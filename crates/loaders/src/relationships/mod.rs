//! Relationship metadata and the registry loaders resolve relations from

pub mod metadata;
pub mod registry;

pub use metadata::{
    ForeignKeyConfig, PivotConfig, PolymorphicConfig, RelationshipMetadata, RelationshipType,
};
pub use registry::RelationshipRegistry;
