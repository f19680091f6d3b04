//! Entity metadata registry.

use largecoll_core::{
    AssociationDescriptor, EntityMetadata, Error, MappingErrorKind, MetadataSource, Result,
};
use std::collections::BTreeMap;

/// Registered entity metadata, keyed by fully-qualified entity name.
#[derive(Debug, Clone, Default)]
pub struct MetadataRegistry {
    entities: BTreeMap<String, EntityMetadata>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON array of entity metadata documents.
    ///
    /// The loaded set is validated with [`validate`](Self::validate).
    #[allow(clippy::result_large_err)]
    pub fn from_json(json: &str) -> Result<Self> {
        let entities: Vec<EntityMetadata> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for metadata in entities {
            registry.register(metadata);
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Serialize all registered metadata as a JSON array.
    #[allow(clippy::result_large_err)]
    pub fn to_json(&self) -> Result<String> {
        let entities: Vec<&EntityMetadata> = self.entities.values().collect();
        Ok(serde_json::to_string_pretty(&entities)?)
    }

    /// Register metadata, returning any previous metadata under that name.
    pub fn register(&mut self, metadata: EntityMetadata) -> Option<EntityMetadata> {
        tracing::debug!(entity = %metadata.name(), "Registering entity metadata");
        self.entities
            .insert(metadata.name().as_str().to_string(), metadata)
    }

    pub fn get(&self, entity_name: &str) -> Option<&EntityMetadata> {
        self.entities.get(entity_name)
    }

    pub fn contains(&self, entity_name: &str) -> bool {
        self.entities.contains_key(entity_name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Registered entity names, sorted.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// Check that every association points at a registered entity and that
    /// both ends of each bidirectional association name each other.
    ///
    /// For `Order::items` mapped by `order`, `LineItem::order` must exist,
    /// target `Order`, be the owning side and have `inversed_by = "items"`.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        for metadata in self.entities.values() {
            for association in metadata.associations() {
                self.validate_association(association)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn validate_association(&self, association: &AssociationDescriptor) -> Result<()> {
        association.check_kind()?;
        let target = self.get(association.target_entity.as_str()).ok_or_else(|| {
            Error::mapping(
                MappingErrorKind::UnknownEntity,
                format!(
                    "{}::{} targets unregistered entity {}",
                    association.source_entity, association.field_name, association.target_entity
                ),
            )
        })?;

        let Some(mirror_field) = association.inversed_by().or(association.mapped_by()) else {
            // Unidirectional, nothing to pair up
            return Ok(());
        };

        let mismatch = |detail: String| {
            Error::mapping(
                MappingErrorKind::UnknownAssociation,
                format!(
                    "{}::{} names {}::{mirror_field} as its mirror, but {detail}",
                    association.source_entity, association.field_name, association.target_entity
                ),
            )
        };

        let mirror = target
            .association(mirror_field.as_str())
            .ok_or_else(|| mismatch("that field is not declared".to_string()))?;

        if mirror.target_entity != association.source_entity {
            return Err(mismatch(format!("it targets {}", mirror.target_entity)));
        }
        if mirror.is_owning_side() == association.is_owning_side() {
            return Err(mismatch("both ends claim the same side".to_string()));
        }
        let back = mirror.inversed_by().or(mirror.mapped_by());
        if back != Some(&association.field_name) {
            return Err(mismatch(format!(
                "it points back to {}",
                back.map_or("nothing", |field| field.as_str())
            )));
        }
        if mirror.kind != association.kind.mirrored() {
            return Err(mismatch(format!(
                "it is declared {:?} instead of {:?}",
                mirror.kind,
                association.kind.mirrored()
            )));
        }

        Ok(())
    }
}

impl MetadataSource for MetadataRegistry {
    fn metadata(&self, entity_name: &str) -> Result<EntityMetadata> {
        self.get(entity_name).cloned().ok_or_else(|| {
            Error::mapping(
                MappingErrorKind::UnknownEntity,
                format!("no metadata registered for entity {entity_name}"),
            )
        })
    }
}
