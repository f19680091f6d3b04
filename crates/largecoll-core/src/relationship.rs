//! Association metadata for LargeColl Rust.
//!
//! An association is declared on a source entity and points at a target
//! entity. Bidirectional associations have an owning side (which holds the
//! foreign key or join-table authority) and an inverse side that mirrors it.
//! The two ends are modelled as a tagged [`AssociationSide`] instead of a pair
//! of nullable names, so a descriptor can never claim both ends at once.

use crate::error::{Error, MappingErrorKind, Result};
use crate::identifiers::{EntityName, Ident};
use serde::{Deserialize, Serialize};

/// The cardinality of an association, seen from the end that declares it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationKind {
    /// One-to-many: one `Order` has many `LineItem`s.
    #[default]
    OneToMany,
    /// Many-to-one: each `LineItem` belongs to at most one `Order`.
    ManyToOne,
    /// Many-to-many: `Product`s have many `Tag`s via a join table.
    ManyToMany,
}

impl AssociationKind {
    /// The kind the mirror field on the target entity must declare.
    pub const fn mirrored(self) -> Self {
        match self {
            Self::OneToMany => Self::ManyToOne,
            Self::ManyToOne => Self::OneToMany,
            Self::ManyToMany => Self::ManyToMany,
        }
    }

    /// Whether the declaring end holds at most one related instance.
    pub const fn is_single_valued(self) -> bool {
        matches!(self, Self::ManyToOne)
    }
}

/// Which end of the association this descriptor describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum AssociationSide {
    /// This end stores the foreign key / join-table authority.
    ///
    /// `inversed_by` names the mirror field on the target entity; `None`
    /// means the association is unidirectional.
    Owning { inversed_by: Option<Ident> },
    /// This end mirrors an owning end; `mapped_by` names the owning field on
    /// the target entity.
    Inverse { mapped_by: Ident },
}

/// Describes one declared collection association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDescriptor {
    /// Name of the collection field on the source entity.
    pub field_name: Ident,

    /// The entity type that owns the collection field.
    pub source_entity: EntityName,

    /// The entity type of the related rows.
    pub target_entity: EntityName,

    #[serde(default)]
    pub kind: AssociationKind,

    #[serde(flatten)]
    pub side: AssociationSide,
}

impl AssociationDescriptor {
    /// Owning side of a many-to-many association; pass `inversed_by` for
    /// bidirectional ones.
    #[allow(clippy::result_large_err)]
    pub fn owning(
        source_entity: &str,
        field_name: &str,
        target_entity: &str,
        inversed_by: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            field_name: Ident::new(field_name)?,
            source_entity: EntityName::new(source_entity)?,
            target_entity: EntityName::new(target_entity)?,
            kind: AssociationKind::ManyToMany,
            side: AssociationSide::Owning {
                inversed_by: inversed_by.map(Ident::new).transpose()?,
            },
        })
    }

    /// Single-valued owning side, e.g. `LineItem::order`; `inversed_by`
    /// names the one-to-many collection on the target.
    #[allow(clippy::result_large_err)]
    pub fn many_to_one(
        source_entity: &str,
        field_name: &str,
        target_entity: &str,
        inversed_by: Option<&str>,
    ) -> Result<Self> {
        Ok(Self::owning(source_entity, field_name, target_entity, inversed_by)?
            .with_kind(AssociationKind::ManyToOne))
    }

    /// Owning side with no mirror field on the target.
    #[allow(clippy::result_large_err)]
    pub fn unidirectional(source_entity: &str, field_name: &str, target_entity: &str) -> Result<Self> {
        Self::owning(source_entity, field_name, target_entity, None)
    }

    /// Inverse side of a bidirectional association.
    #[allow(clippy::result_large_err)]
    pub fn inverse(
        source_entity: &str,
        field_name: &str,
        target_entity: &str,
        mapped_by: &str,
    ) -> Result<Self> {
        Ok(Self {
            field_name: Ident::new(field_name)?,
            source_entity: EntityName::new(source_entity)?,
            target_entity: EntityName::new(target_entity)?,
            kind: AssociationKind::OneToMany,
            side: AssociationSide::Inverse {
                mapped_by: Ident::new(mapped_by)?,
            },
        })
    }

    /// Override the association kind.
    #[must_use]
    pub fn with_kind(mut self, kind: AssociationKind) -> Self {
        self.kind = kind;
        self
    }

    /// Reject kinds the declared side cannot carry.
    ///
    /// A many-to-one end always owns the foreign key, and a bidirectional
    /// one-to-many collection is always the inverse of a many-to-one.
    #[allow(clippy::result_large_err)]
    pub fn check_kind(&self) -> Result<()> {
        let valid = match (&self.side, self.kind) {
            (AssociationSide::Inverse { .. }, AssociationKind::ManyToOne) => false,
            (AssociationSide::Owning { inversed_by: Some(_) }, AssociationKind::OneToMany) => false,
            _ => true,
        };
        if valid {
            Ok(())
        } else {
            Err(Error::mapping(
                MappingErrorKind::UnknownAssociation,
                format!(
                    "{}::{} cannot be a {:?} association on the {} side",
                    self.source_entity,
                    self.field_name,
                    self.kind,
                    if self.is_owning_side() { "owning" } else { "inverse" }
                ),
            ))
        }
    }

    /// Whether this end stores the foreign key / join-table authority.
    pub fn is_owning_side(&self) -> bool {
        matches!(self.side, AssociationSide::Owning { .. })
    }

    /// Mirror field on the target, when this is a bidirectional owning side.
    pub fn inversed_by(&self) -> Option<&Ident> {
        match &self.side {
            AssociationSide::Owning { inversed_by } => inversed_by.as_ref(),
            AssociationSide::Inverse { .. } => None,
        }
    }

    /// Owning field on the target, when this is an inverse side.
    pub fn mapped_by(&self) -> Option<&Ident> {
        match &self.side {
            AssociationSide::Inverse { mapped_by } => Some(mapped_by),
            AssociationSide::Owning { .. } => None,
        }
    }

    /// Whether both ends know about each other.
    pub fn is_bidirectional(&self) -> bool {
        self.inversed_by().is_some() || self.mapped_by().is_some()
    }

    /// The field on the target entity that leads back to the source entity.
    ///
    /// Owning sides traverse through `inversed_by`, inverse sides through
    /// `mapped_by`. A unidirectional owning side has no way back.
    #[allow(clippy::result_large_err)]
    pub fn traversal_field(&self) -> Result<&Ident> {
        match &self.side {
            AssociationSide::Owning {
                inversed_by: Some(field),
            }
            | AssociationSide::Inverse { mapped_by: field } => Ok(field),
            AssociationSide::Owning { inversed_by: None } => Err(Error::mapping(
                MappingErrorKind::UnsupportedDirection,
                format!(
                    "only bidirectional collections can be sliced ({}::{} has no inverse mapping)",
                    self.source_entity, self.field_name
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owning_bidirectional() {
        let assoc =
            AssociationDescriptor::owning("Shop::Product", "tags", "Shop::Tag", Some("products"))
                .unwrap();

        assert!(assoc.is_owning_side());
        assert!(assoc.is_bidirectional());
        assert_eq!(assoc.kind, AssociationKind::ManyToMany);
        assert_eq!(assoc.inversed_by().map(Ident::as_str), Some("products"));
        assert_eq!(assoc.mapped_by(), None);
        assert_eq!(assoc.traversal_field().unwrap(), "products");
    }

    #[test]
    fn test_inverse_uses_mapped_by() {
        let assoc =
            AssociationDescriptor::inverse("Shop::Order", "items", "Shop::LineItem", "order")
                .unwrap();

        assert!(!assoc.is_owning_side());
        assert_eq!(assoc.kind, AssociationKind::OneToMany);
        assert_eq!(assoc.traversal_field().unwrap(), "order");
    }

    #[test]
    fn test_many_to_one_back_reference() {
        let assoc =
            AssociationDescriptor::many_to_one("Shop::LineItem", "order", "Shop::Order", Some("items"))
                .unwrap();

        assert!(assoc.is_owning_side());
        assert_eq!(assoc.kind, AssociationKind::ManyToOne);
        assert!(assoc.kind.is_single_valued());
        assert_eq!(assoc.kind.mirrored(), AssociationKind::OneToMany);
        assert_eq!(assoc.traversal_field().unwrap(), "items");
        assert!(assoc.check_kind().is_ok());
    }

    #[test]
    fn test_kind_must_fit_side() {
        let inverse = AssociationDescriptor::inverse("Shop::Order", "items", "Shop::LineItem", "order")
            .unwrap()
            .with_kind(AssociationKind::ManyToOne);
        assert_eq!(
            inverse.check_kind().unwrap_err().mapping_kind(),
            Some(MappingErrorKind::UnknownAssociation)
        );

        let owning =
            AssociationDescriptor::owning("Shop::LineItem", "order", "Shop::Order", Some("items"))
                .unwrap()
                .with_kind(AssociationKind::OneToMany);
        assert!(owning.check_kind().is_err());

        let unidirectional = AssociationDescriptor::unidirectional("Auth::User", "groups", "Auth::Group")
            .unwrap()
            .with_kind(AssociationKind::OneToMany);
        assert!(unidirectional.check_kind().is_ok());
    }

    #[test]
    fn test_unidirectional_cannot_traverse() {
        let assoc = AssociationDescriptor::unidirectional("Shop::User", "groups", "Shop::Group")
            .unwrap();

        assert!(!assoc.is_bidirectional());
        let err = assoc.traversal_field().unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnsupportedDirection));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let err = AssociationDescriptor::inverse("Shop::Order", "items r", "Shop::LineItem", "order")
            .unwrap_err();
        assert_eq!(err.mapping_kind(), Some(MappingErrorKind::InvalidName));
        assert!(
            AssociationDescriptor::owning("Shop::Product", "tags", "Shop::Tag", Some("1x")).is_err()
        );
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::json!({
            "field_name": "items",
            "source_entity": "Shop::Order",
            "target_entity": "Shop::LineItem",
            "side": "inverse",
            "mapped_by": "order"
        });
        let assoc: AssociationDescriptor = serde_json::from_value(json).unwrap();

        assert_eq!(assoc.kind, AssociationKind::OneToMany);
        assert_eq!(assoc.mapped_by().map(Ident::as_str), Some("order"));

        let unidirectional = serde_json::json!({
            "field_name": "groups",
            "source_entity": "User",
            "target_entity": "Group",
            "kind": "ManyToMany",
            "side": "owning",
            "inversed_by": null
        });
        let assoc: AssociationDescriptor = serde_json::from_value(unidirectional).unwrap();
        assert!(assoc.is_owning_side());
        assert!(!assoc.is_bidirectional());
    }
}
