//! Relationship Metadata System - how related rows join back to a parent

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, RelationshipError};
use crate::query::aggregate::RelationJoin;
use crate::security::validate_identifier;

/// Defines the type of relationship between models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// One-to-one relationship (hasOne)
    HasOne,
    /// One-to-many relationship (hasMany)
    HasMany,
    /// Many-to-one relationship (belongsTo)
    BelongsTo,
    /// Many-to-many relationship through a pivot table
    ManyToMany,
    /// Polymorphic one-to-one relationship
    MorphOne,
    /// Polymorphic one-to-many relationship
    MorphMany,
    /// Inverse polymorphic relationship
    MorphTo,
}

impl RelationshipType {
    /// Returns true if this relationship type is polymorphic
    pub fn is_polymorphic(self) -> bool {
        matches!(self, Self::MorphOne | Self::MorphMany | Self::MorphTo)
    }

    /// Returns true if this relationship requires a pivot table
    pub fn requires_pivot(self) -> bool {
        matches!(self, Self::ManyToMany)
    }
}

/// Relationship metadata needed to aggregate related rows per parent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMetadata {
    /// The type of relationship
    pub relationship_type: RelationshipType,

    /// Name of the relationship as used in aggregate specifications
    pub name: String,

    /// The related model's table name
    pub related_table: String,

    /// Foreign key configuration.
    ///
    /// For `BelongsTo` the column lives on the parent table, for every
    /// other kind it lives on the related table.
    pub foreign_key: ForeignKeyConfig,

    /// Key on the parent (defaults to "id"). For `BelongsTo` this is the
    /// owner key on the related table instead.
    pub local_key: String,

    /// Pivot table configuration for many-to-many relationships
    pub pivot_config: Option<PivotConfig>,

    /// Polymorphic configuration
    pub polymorphic_config: Option<PolymorphicConfig>,
}

impl RelationshipMetadata {
    /// Create a new RelationshipMetadata instance
    pub fn new(
        relationship_type: RelationshipType,
        name: &str,
        related_table: &str,
        foreign_key: ForeignKeyConfig,
    ) -> Self {
        Self {
            relationship_type,
            name: name.to_string(),
            related_table: related_table.to_string(),
            foreign_key,
            local_key: "id".to_string(),
            pivot_config: None,
            polymorphic_config: None,
        }
    }

    /// `parent has many related` through `related.foreign_key`
    pub fn has_many(name: &str, related_table: &str, foreign_key: &str) -> Self {
        Self::new(
            RelationshipType::HasMany,
            name,
            related_table,
            ForeignKeyConfig::simple(foreign_key, related_table),
        )
    }

    /// `parent has one related` through `related.foreign_key`
    pub fn has_one(name: &str, related_table: &str, foreign_key: &str) -> Self {
        Self::new(
            RelationshipType::HasOne,
            name,
            related_table,
            ForeignKeyConfig::simple(foreign_key, related_table),
        )
    }

    /// `parent belongs to related` through `parent.foreign_key = related.id`
    pub fn belongs_to(name: &str, parent_table: &str, related_table: &str, foreign_key: &str) -> Self {
        Self::new(
            RelationshipType::BelongsTo,
            name,
            related_table,
            ForeignKeyConfig::simple(foreign_key, parent_table),
        )
    }

    /// `parent belongs to many related` through a pivot table
    pub fn many_to_many(name: &str, related_table: &str, pivot: PivotConfig) -> Self {
        let foreign_key = ForeignKeyConfig::simple(&pivot.local_key, &pivot.table);
        Self::new(RelationshipType::ManyToMany, name, related_table, foreign_key).with_pivot(pivot)
    }

    /// `parent morphs many related` through `related.{name}_id` and `related.{name}_type`
    pub fn morph_many(name: &str, related_table: &str, morph: PolymorphicConfig) -> Self {
        let foreign_key = ForeignKeyConfig::simple(&morph.id_column, related_table);
        Self::new(RelationshipType::MorphMany, name, related_table, foreign_key).with_polymorphic(morph)
    }

    /// `parent morphs one related`
    pub fn morph_one(name: &str, related_table: &str, morph: PolymorphicConfig) -> Self {
        let foreign_key = ForeignKeyConfig::simple(&morph.id_column, related_table);
        Self::new(RelationshipType::MorphOne, name, related_table, foreign_key).with_polymorphic(morph)
    }

    /// Set the local key (owner key for `BelongsTo`)
    pub fn with_local_key(mut self, local_key: &str) -> Self {
        self.local_key = local_key.to_string();
        self
    }

    /// Set pivot table configuration
    pub fn with_pivot(mut self, pivot_config: PivotConfig) -> Self {
        self.pivot_config = Some(pivot_config);
        self
    }

    /// Set polymorphic configuration
    pub fn with_polymorphic(mut self, polymorphic_config: PolymorphicConfig) -> Self {
        self.polymorphic_config = Some(polymorphic_config);
        self
    }

    /// Validate the relationship metadata for consistency
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(
                "Relationship name cannot be empty".to_string(),
            ));
        }

        if self.relationship_type.requires_pivot() && self.pivot_config.is_none() {
            return Err(ModelError::Configuration(format!(
                "Relationship '{}' of type {:?} requires pivot configuration",
                self.name, self.relationship_type
            )));
        }

        if self.relationship_type.is_polymorphic() && self.polymorphic_config.is_none() {
            return Err(ModelError::Configuration(format!(
                "Relationship '{}' of type {:?} requires polymorphic configuration",
                self.name, self.relationship_type
            )));
        }

        validate_identifier(&self.related_table)?;
        validate_identifier(&self.local_key)?;
        self.foreign_key.validate()?;

        if let Some(ref pivot) = self.pivot_config {
            pivot.validate()?;
        }

        if let Some(ref poly) = self.polymorphic_config {
            poly.validate()?;
        }

        Ok(())
    }

    /// Resolve how related rows are grouped per parent.
    ///
    /// Returns the parent attribute holding the matching key together with
    /// the join shape on the related side.
    pub fn aggregate_join(&self) -> ModelResult<(String, RelationJoin)> {
        let fk = self.foreign_key.column.clone();

        match self.relationship_type {
            RelationshipType::HasOne | RelationshipType::HasMany => Ok((
                self.local_key.clone(),
                RelationJoin::Direct {
                    group_column: fk,
                    morph: None,
                },
            )),
            RelationshipType::BelongsTo => Ok((
                fk,
                RelationJoin::Direct {
                    group_column: self.local_key.clone(),
                    morph: None,
                },
            )),
            RelationshipType::MorphOne | RelationshipType::MorphMany => {
                let poly = self.polymorphic_config.as_ref().ok_or_else(|| {
                    ModelError::Configuration(format!(
                        "Relationship '{}' is missing its polymorphic configuration",
                        self.name
                    ))
                })?;

                Ok((
                    self.local_key.clone(),
                    RelationJoin::Direct {
                        group_column: poly.id_column.clone(),
                        morph: Some((poly.type_column.clone(), poly.morph_type.clone())),
                    },
                ))
            }
            RelationshipType::ManyToMany => {
                let pivot = self.pivot_config.as_ref().ok_or_else(|| {
                    ModelError::Configuration(format!(
                        "Relationship '{}' is missing its pivot configuration",
                        self.name
                    ))
                })?;

                Ok((
                    self.local_key.clone(),
                    RelationJoin::Pivot {
                        table: pivot.table.clone(),
                        parent_column: pivot.local_key.clone(),
                        related_column: pivot.foreign_key.clone(),
                        related_key: pivot.related_key.clone(),
                    },
                ))
            }
            RelationshipType::MorphTo => Err(RelationshipError::NotAggregatable {
                relation: self.name.clone(),
                kind: format!("{:?}", self.relationship_type),
            }
            .into()),
        }
    }
}

/// Foreign key configuration for relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    /// The foreign key column name
    pub column: String,

    /// The table where the foreign key is located
    pub table: String,
}

impl ForeignKeyConfig {
    /// Create a simple foreign key configuration
    pub fn simple(column: &str, table: &str) -> Self {
        Self {
            column: column.to_string(),
            table: table.to_string(),
        }
    }

    /// Validate the foreign key configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.table.is_empty() {
            return Err(ModelError::Configuration(
                "Foreign key configuration must specify a table".to_string(),
            ));
        }

        validate_identifier(&self.column)?;
        validate_identifier(&self.table)
    }
}

/// Pivot table configuration for many-to-many relationships
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotConfig {
    /// The pivot table name
    pub table: String,

    /// Pivot column referencing the parent
    pub local_key: String,

    /// Pivot column referencing the related row
    pub foreign_key: String,

    /// Key on the related table the pivot points at
    pub related_key: String,
}

impl PivotConfig {
    /// Create a new pivot configuration
    pub fn new(table: &str, local_key: &str, foreign_key: &str) -> Self {
        Self {
            table: table.to_string(),
            local_key: local_key.to_string(),
            foreign_key: foreign_key.to_string(),
            related_key: "id".to_string(),
        }
    }

    pub fn with_related_key(mut self, related_key: &str) -> Self {
        self.related_key = related_key.to_string();
        self
    }

    /// Validate the pivot configuration
    pub fn validate(&self) -> ModelResult<()> {
        validate_identifier(&self.table)?;
        validate_identifier(&self.local_key)?;
        validate_identifier(&self.foreign_key)?;
        validate_identifier(&self.related_key)?;

        if self.local_key == self.foreign_key {
            return Err(ModelError::Configuration(
                "Pivot local key and foreign key must be different".to_string(),
            ));
        }

        Ok(())
    }
}

/// Polymorphic relationship configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolymorphicConfig {
    /// The name of this polymorphic relationship (e.g. "commentable")
    pub name: String,

    /// The morph type column name (stores the model type)
    pub type_column: String,

    /// The morph id column name (stores the foreign key)
    pub id_column: String,

    /// Value stored in `type_column` for rows owned by this parent model
    pub morph_type: String,
}

impl PolymorphicConfig {
    /// Conventional columns: `{name}_type` and `{name}_id`
    pub fn new(name: &str, morph_type: &str) -> Self {
        Self {
            name: name.to_string(),
            type_column: format!("{}_type", name),
            id_column: format!("{}_id", name),
            morph_type: morph_type.to_string(),
        }
    }

    /// Validate the polymorphic configuration
    pub fn validate(&self) -> ModelResult<()> {
        if self.name.is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic relationship name cannot be empty".to_string(),
            ));
        }

        if self.morph_type.is_empty() {
            return Err(ModelError::Configuration(
                "Polymorphic morph type cannot be empty".to_string(),
            ));
        }

        validate_identifier(&self.type_column)?;
        validate_identifier(&self.id_column)?;

        if self.type_column == self.id_column {
            return Err(ModelError::Configuration(
                "Polymorphic type column and ID column must be different".to_string(),
            ));
        }

        Ok(())
    }
}
