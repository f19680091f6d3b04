//! Handle to a lazily-loaded collection owned by one entity instance.

use crate::relationship::AssociationDescriptor;
use crate::source::ObjectId;
use std::fmt;

/// A collection-valued association of one managed owner.
///
/// The handle never holds related rows. It only pairs the owner with the
/// association mapping and the manager that can answer metadata, identity
/// and execution requests for it. The manager is exposed through
/// [`manager`](PersistentCollection::manager), so consumers never need to
/// reach into private state.
pub struct PersistentCollection<'m, M: ?Sized> {
    manager: &'m M,
    owner: ObjectId,
    mapping: AssociationDescriptor,
}

impl<'m, M: ?Sized> PersistentCollection<'m, M> {
    pub fn new(manager: &'m M, owner: ObjectId, mapping: AssociationDescriptor) -> Self {
        Self {
            manager,
            owner,
            mapping,
        }
    }

    /// The manager that tracks the owner.
    pub fn manager(&self) -> &'m M {
        self.manager
    }

    /// The owning entity instance.
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// The association this collection represents.
    pub fn mapping(&self) -> &AssociationDescriptor {
        &self.mapping
    }
}

impl<M: ?Sized> Clone for PersistentCollection<'_, M> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager,
            owner: self.owner,
            mapping: self.mapping.clone(),
        }
    }
}

impl<M: ?Sized> fmt::Debug for PersistentCollection<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentCollection")
            .field("owner", &self.owner)
            .field("source", &self.mapping.source_entity)
            .field("field", &self.mapping.field_name)
            .field("target", &self.mapping.target_entity)
            .finish_non_exhaustive()
    }
}
