//! Collaborator interfaces for metadata and identity lookup.
//!
//! The window query builder never owns entity state. It asks a
//! [`MetadataSource`] what an entity type looks like and an
//! [`IdentitySource`] what an owner's identifier values are right now.
//! Query execution lives in `largecoll-query`, next to the query types it
//! consumes.
//!
//! Implementations are expected to be safe for concurrent reads when shared
//! across threads; the builder holds no locks of its own.

use crate::error::Result;
use crate::metadata::EntityMetadata;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle for one managed entity instance.
///
/// Assigned by the identity service. It stays stable while the instance's
/// identifier values may still change (e.g. before the entity is persisted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata lookup service.
pub trait MetadataSource {
    /// Return the metadata for an entity type, by fully-qualified name.
    #[allow(clippy::result_large_err)]
    fn metadata(&self, entity_name: &str) -> Result<EntityMetadata>;
}

/// Identity-tracking service.
pub trait IdentitySource {
    /// Return the current identifier values of a managed instance, in the
    /// order of its entity's declared identifier fields.
    #[allow(clippy::result_large_err)]
    fn identifier(&self, object: ObjectId) -> Result<Vec<Value>>;
}

impl<T: MetadataSource + ?Sized> MetadataSource for &T {
    fn metadata(&self, entity_name: &str) -> Result<EntityMetadata> {
        (**self).metadata(entity_name)
    }
}

impl<T: IdentitySource + ?Sized> IdentitySource for &T {
    fn identifier(&self, object: ObjectId) -> Result<Vec<Value>> {
        (**self).identifier(object)
    }
}
