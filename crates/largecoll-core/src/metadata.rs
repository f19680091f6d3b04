//! Per-entity metadata: name, identifier fields and declared associations.

use crate::error::{Error, MappingErrorKind, Result};
use crate::identifiers::{EntityName, Ident};
use crate::relationship::AssociationDescriptor;
use serde::{Deserialize, Serialize};

/// Metadata describing one entity type.
///
/// The identifier field order is significant: identity values reported by
/// the identity service line up with it position by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntityMetadata")]
pub struct EntityMetadata {
    name: EntityName,
    identifier: Vec<Ident>,
    #[serde(default)]
    associations: Vec<AssociationDescriptor>,
}

#[derive(Deserialize)]
struct RawEntityMetadata {
    name: EntityName,
    identifier: Vec<Ident>,
    #[serde(default)]
    associations: Vec<AssociationDescriptor>,
}

impl TryFrom<RawEntityMetadata> for EntityMetadata {
    type Error = Error;

    fn try_from(raw: RawEntityMetadata) -> Result<Self> {
        EntityMetadata::new(raw.name, raw.identifier, raw.associations)
    }
}

impl EntityMetadata {
    /// Create metadata, rejecting an empty identifier set and associations
    /// declared for a different source entity.
    #[allow(clippy::result_large_err)]
    pub fn new(
        name: EntityName,
        identifier: Vec<Ident>,
        associations: Vec<AssociationDescriptor>,
    ) -> Result<Self> {
        if identifier.is_empty() {
            return Err(Error::mapping(
                MappingErrorKind::EmptyIdentifier,
                format!("entity {name} declares no identifier fields"),
            ));
        }
        if let Some(foreign) = associations.iter().find(|a| a.source_entity != name) {
            return Err(Error::mapping(
                MappingErrorKind::UnknownAssociation,
                format!(
                    "association {} is declared on {} but registered with {name}",
                    foreign.field_name, foreign.source_entity
                ),
            ));
        }
        Ok(Self {
            name,
            identifier,
            associations,
        })
    }

    /// Start building metadata for the named entity.
    pub fn builder(name: &str) -> EntityMetadataBuilder {
        EntityMetadataBuilder {
            name: name.to_string(),
            identifier: Vec::new(),
            associations: Vec::new(),
        }
    }

    /// Fully-qualified entity name.
    pub fn name(&self) -> &EntityName {
        &self.name
    }

    /// Identifier field names, in declaration order.
    pub fn identifier(&self) -> &[Ident] {
        &self.identifier
    }

    /// Whether the identifier spans more than one field.
    pub fn is_composite_key(&self) -> bool {
        self.identifier.len() > 1
    }

    /// The identifier field, if there is exactly one.
    pub fn single_identifier(&self) -> Option<&Ident> {
        match self.identifier.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Declared collection associations.
    pub fn associations(&self) -> &[AssociationDescriptor] {
        &self.associations
    }

    /// Look up an association by its field name.
    pub fn association(&self, field: &str) -> Option<&AssociationDescriptor> {
        self.associations.iter().find(|a| a.field_name == field)
    }
}

/// Builder for [`EntityMetadata`].
///
/// Names are validated when [`build`](EntityMetadataBuilder::build) runs.
#[derive(Debug, Clone)]
pub struct EntityMetadataBuilder {
    name: String,
    identifier: Vec<String>,
    associations: Vec<AssociationDescriptor>,
}

impl EntityMetadataBuilder {
    /// Append an identifier field.
    #[must_use]
    pub fn identifier(mut self, field: &str) -> Self {
        self.identifier.push(field.to_string());
        self
    }

    /// Append several identifier fields, in order.
    #[must_use]
    pub fn identifiers(mut self, fields: &[&str]) -> Self {
        self.identifier.extend(fields.iter().map(|f| (*f).to_string()));
        self
    }

    /// Declare a collection association on this entity.
    #[must_use]
    pub fn association(mut self, association: AssociationDescriptor) -> Self {
        self.associations.push(association);
        self
    }

    #[allow(clippy::result_large_err)]
    pub fn build(self) -> Result<EntityMetadata> {
        let name = EntityName::new(self.name)?;
        let identifier = self
            .identifier
            .into_iter()
            .map(Ident::new)
            .collect::<Result<Vec<_>>>()?;
        EntityMetadata::new(name, identifier, self.associations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> EntityMetadata {
        EntityMetadata::builder("Shop::Order")
            .identifiers(&["tenantId", "localId"])
            .association(
                AssociationDescriptor::inverse("Shop::Order", "items", "Shop::LineItem", "order")
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_keeps_identifier_order() {
        let meta = order();
        let ids: Vec<&str> = meta.identifier().iter().map(Ident::as_str).collect();

        assert_eq!(ids, ["tenantId", "localId"]);
        assert!(meta.is_composite_key());
        assert_eq!(meta.single_identifier(), None);
        assert!(meta.association("items").is_some());
        assert!(meta.association("missing").is_none());
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let err = EntityMetadata::builder("Shop::Tag").build().unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::EmptyIdentifier));
    }

    #[test]
    fn test_foreign_association_rejected() {
        let err = EntityMetadata::builder("Shop::Customer")
            .identifier("id")
            .association(
                AssociationDescriptor::inverse("Shop::Order", "items", "Shop::LineItem", "order")
                    .unwrap(),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnknownAssociation));
    }

    #[test]
    fn test_deserialize_validates() {
        let meta: EntityMetadata = serde_json::from_value(serde_json::json!({
            "name": "Shop::LineItem",
            "identifier": ["id"]
        }))
        .unwrap();
        assert_eq!(meta.single_identifier().map(Ident::as_str), Some("id"));

        let empty = serde_json::from_value::<EntityMetadata>(serde_json::json!({
            "name": "Shop::LineItem",
            "identifier": []
        }));
        assert!(empty.is_err());
    }
}
