//! In-memory session for LargeColl Rust.
//!
//! `largecoll-session` is the **reference persistence manager**. It keeps
//! entity metadata, managed instances and association links in memory and
//! evaluates composed object queries against them, which makes it the
//! natural backend for tests and for embedding the window builder without a
//! database.
//!
//! # Role In The Architecture
//!
//! - **Metadata registry**: entity types, identifier fields and associations.
//! - **Identity map**: one handle per managed instance, identifier values
//!   that may be assigned after the instance is added.
//! - **Query execution**: implements `QueryExecutor`, so a `Session` is an
//!   `EntityManager` and can back an `AssociationWindow` directly.
//!
//! # Example
//!
//! ```ignore
//! let mut session = Session::new();
//! session.register_entity(order_metadata);
//! session.register_entity(line_item_metadata);
//!
//! let order = session.persist("Shop::Order", vec![7.into(), 42.into()], vec![])?;
//! let item = session.persist("Shop::LineItem", vec![1.into()], vec![("sku", "A-1".into())])?;
//! session.link(order, "items", item)?;
//!
//! let items = session.collection(order, "items")?;
//! ```

mod evaluate;
pub mod identity_map;
pub mod registry;

pub use identity_map::{IdentityMap, ManagedEntity};
pub use registry::MetadataRegistry;

use evaluate::Evaluator;
use largecoll_core::{
    AssociationKind, EntityMetadata, Error, Ident, IdentityErrorKind, IdentitySource, MappingErrorKind,
    MetadataSource, ObjectId, PersistentCollection, Result, Row, Value,
};
use largecoll_query::{BoundQuery, QueryExecutor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Configuration for Session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Reject links through association fields the owner's metadata does
    /// not declare. When off, undeclared links are recorded one-way.
    pub strict_metadata: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            strict_metadata: true,
        }
    }
}

/// An in-memory persistence manager.
///
/// A `Session` is mutated through `&mut self` while it is being populated
/// and only read through `&self` while queries run, so it can be shared
/// across threads for concurrent window queries.
#[derive(Debug, Default)]
pub struct Session {
    config: SessionConfig,
    registry: MetadataRegistry,
    identities: IdentityMap,
    /// (instance, association field) -> related instances, in link order
    links: HashMap<(ObjectId, Ident), Vec<ObjectId>>,
    executed: AtomicUsize,
}

impl Session {
    /// Create an empty session with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create a session over an already-populated registry.
    pub fn with_registry(registry: MetadataRegistry, config: SessionConfig) -> Self {
        Self {
            config,
            registry,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    pub fn identities(&self) -> &IdentityMap {
        &self.identities
    }

    /// Register (or replace) the metadata of one entity type.
    pub fn register_entity(&mut self, metadata: EntityMetadata) {
        self.registry.register(metadata);
    }

    /// Check that the registered metadata is consistent across entities.
    #[allow(clippy::result_large_err)]
    pub fn validate_metadata(&self) -> Result<()> {
        self.registry.validate()
    }

    /// Start managing an instance with known identifier values.
    ///
    /// `identifier` lines up with the entity's declared identifier fields.
    #[tracing::instrument(level = "debug", skip(self, identifier, fields))]
    #[allow(clippy::result_large_err)]
    pub fn persist(
        &mut self,
        entity_name: &str,
        identifier: Vec<Value>,
        fields: Vec<(&str, Value)>,
    ) -> Result<ObjectId> {
        let metadata = self.registry.metadata(entity_name)?;
        if metadata.identifier().len() != identifier.len() {
            return Err(Error::identity(
                IdentityErrorKind::ArityMismatch,
                format!(
                    "{entity_name} declares {} identifier field(s), got {} value(s)",
                    metadata.identifier().len(),
                    identifier.len()
                ),
            ));
        }

        let fields = fields
            .into_iter()
            .map(|(name, value)| Ok::<_, Error>((Ident::new(name)?, value)))
            .collect::<Result<Vec<_>>>()?;
        if let Some((name, _)) = fields
            .iter()
            .find(|(name, _)| metadata.identifier().contains(name))
        {
            return Err(Error::InvalidArgument(format!(
                "{name} is an identifier field of {entity_name}; pass it as an identifier value"
            )));
        }

        let id = self
            .identities
            .insert(metadata.name().clone(), identifier, fields)?;
        tracing::debug!(object = %id, "Managing new instance");
        Ok(id)
    }

    /// Start managing an instance whose identifier is not known yet.
    ///
    /// All identifier values start as NULL; use
    /// [`assign_identifier`](Self::assign_identifier) once they are.
    #[allow(clippy::result_large_err)]
    pub fn add(&mut self, entity_name: &str, fields: Vec<(&str, Value)>) -> Result<ObjectId> {
        let arity = self.registry.metadata(entity_name)?.identifier().len();
        self.persist(entity_name, vec![Value::Null; arity], fields)
    }

    /// Replace the identifier values of a managed instance.
    #[tracing::instrument(level = "debug", skip(self, identifier))]
    #[allow(clippy::result_large_err)]
    pub fn assign_identifier(&mut self, object: ObjectId, identifier: Vec<Value>) -> Result<()> {
        self.identities.reassign(object, identifier)
    }

    /// Set (or overwrite) a non-identifier field of a managed instance.
    #[allow(clippy::result_large_err)]
    pub fn set_field(&mut self, object: ObjectId, field: &str, value: impl Into<Value>) -> Result<()> {
        self.identities.set_field(object, Ident::new(field)?, value.into())
    }

    pub fn get(&self, object: ObjectId) -> Option<&ManagedEntity> {
        self.identities.get(object)
    }

    /// Find the managed instance holding `identifier`.
    pub fn find(&self, entity_name: &str, identifier: &[Value]) -> Option<ObjectId> {
        self.identities.find(entity_name, identifier)
    }

    /// Add `related` to `owner`'s association `field`.
    ///
    /// When the association is bidirectional, the mirror field on `related`
    /// is updated as well. Linking the same pair twice is a no-op. A
    /// single-valued end keeps only its newest partner: linking an item into
    /// a second order's one-to-many collection moves it there.
    #[tracing::instrument(level = "debug", skip(self))]
    #[allow(clippy::result_large_err)]
    pub fn link(&mut self, owner: ObjectId, field: &str, related: ObjectId) -> Result<()> {
        let field = Ident::new(field)?;
        let Some(shape) = self.declared_association(owner, &field, related)? else {
            tracing::debug!("Recording undeclared association one-way");
            push_unique(&mut self.links, owner, field, related);
            return Ok(());
        };

        if shape.kind.is_single_valued() {
            let previous: Vec<ObjectId> = self.related(owner, &field).to_vec();
            for held in previous.into_iter().filter(|held| *held != related) {
                self.detach(owner, &field, held, shape.mirror.as_ref());
            }
        } else if shape.kind.mirrored().is_single_valued() {
            for holder in self.holders_of(owner, &field, related, shape.mirror.as_ref()) {
                self.detach(holder, &field, related, shape.mirror.as_ref());
            }
        }

        push_unique(&mut self.links, owner, field, related);
        if let Some(mirror) = shape.mirror {
            push_unique(&mut self.links, related, mirror, owner);
        }
        Ok(())
    }

    /// Remove `related` from `owner`'s association `field` (and its mirror).
    ///
    /// Returns whether the link existed.
    #[allow(clippy::result_large_err)]
    pub fn unlink(&mut self, owner: ObjectId, field: &str, related: ObjectId) -> Result<bool> {
        let field = Ident::new(field)?;
        let mirror = self
            .declared_association(owner, &field, related)?
            .and_then(|shape| shape.mirror);

        let removed = remove_link(&mut self.links, owner, field, related);
        if let Some(mirror) = mirror {
            remove_link(&mut self.links, related, mirror, owner);
        }
        Ok(removed)
    }

    /// Instances linked through `owner`'s association `field`, in link order.
    pub fn related(&self, owner: ObjectId, field: &Ident) -> &[ObjectId] {
        self.links
            .get(&(owner, field.clone()))
            .map_or(&[][..], Vec::as_slice)
    }

    /// The collection held by `owner` in association `field`.
    #[allow(clippy::result_large_err)]
    pub fn collection(&self, owner: ObjectId, field: &str) -> Result<PersistentCollection<'_, Self>> {
        let entity = self.managed(owner)?.entity();
        let metadata = self.registry.metadata(entity.as_str())?;
        let mapping = metadata.association(field).cloned().ok_or_else(|| {
            Error::mapping(
                MappingErrorKind::UnknownAssociation,
                format!("{entity} declares no association {field}"),
            )
        })?;
        Ok(PersistentCollection::new(self, owner, mapping))
    }

    /// Number of queries executed through this session.
    pub fn executed_queries(&self) -> usize {
        self.executed.load(Ordering::Relaxed)
    }

    #[allow(clippy::result_large_err)]
    fn managed(&self, object: ObjectId) -> Result<&ManagedEntity> {
        self.identities.get(object).ok_or_else(|| {
            Error::identity(
                IdentityErrorKind::Unmanaged,
                format!("{object} is not managed by this session"),
            )
        })
    }

    /// Resolve the declared association behind a link.
    ///
    /// `None` when the association is undeclared and the session is lenient.
    #[allow(clippy::result_large_err)]
    fn declared_association(
        &self,
        owner: ObjectId,
        field: &Ident,
        related: ObjectId,
    ) -> Result<Option<LinkShape>> {
        let owner_entity = self.managed(owner)?.entity();
        let related_entity = self.managed(related)?.entity();

        let declared = self
            .registry
            .get(owner_entity.as_str())
            .and_then(|metadata| metadata.association(field.as_str()));

        match declared {
            Some(association) => {
                if association.target_entity != *related_entity {
                    return Err(Error::mapping(
                        MappingErrorKind::UnknownAssociation,
                        format!(
                            "{owner_entity}::{field} holds {}, not {related_entity}",
                            association.target_entity
                        ),
                    ));
                }
                Ok(Some(LinkShape {
                    kind: association.kind,
                    mirror: association.traversal_field().ok().cloned(),
                }))
            }
            None if self.config.strict_metadata => Err(Error::mapping(
                MappingErrorKind::UnknownAssociation,
                format!("{owner_entity} declares no association {field}"),
            )),
            None => Ok(None),
        }
    }

    /// Other instances of `owner`'s type that hold `related` in `field`.
    fn holders_of(
        &self,
        owner: ObjectId,
        field: &Ident,
        related: ObjectId,
        mirror: Option<&Ident>,
    ) -> Vec<ObjectId> {
        if let Some(mirror) = mirror {
            return self
                .related(related, mirror)
                .iter()
                .copied()
                .filter(|holder| *holder != owner)
                .collect();
        }

        let owner_entity = self.identities.get(owner).map(ManagedEntity::entity);
        self.links
            .iter()
            .filter(|((holder, held_field), targets)| {
                *holder != owner
                    && held_field == field
                    && targets.contains(&related)
                    && self.identities.get(*holder).map(ManagedEntity::entity) == owner_entity
            })
            .map(|((holder, _), _)| *holder)
            .collect()
    }

    fn detach(&mut self, from: ObjectId, field: &Ident, to: ObjectId, mirror: Option<&Ident>) {
        tracing::debug!(%from, %field, %to, "Detaching single-valued link");
        remove_link(&mut self.links, from, field.clone(), to);
        if let Some(mirror) = mirror {
            remove_link(&mut self.links, to, mirror.clone(), from);
        }
    }
}

/// What a declared association means for links made through it.
struct LinkShape {
    kind: AssociationKind,
    mirror: Option<Ident>,
}

fn push_unique(
    links: &mut HashMap<(ObjectId, Ident), Vec<ObjectId>>,
    from: ObjectId,
    field: Ident,
    to: ObjectId,
) {
    let targets = links.entry((from, field)).or_default();
    if !targets.contains(&to) {
        targets.push(to);
    }
}

fn remove_link(
    links: &mut HashMap<(ObjectId, Ident), Vec<ObjectId>>,
    from: ObjectId,
    field: Ident,
    to: ObjectId,
) -> bool {
    let Some(targets) = links.get_mut(&(from, field)) else {
        return false;
    };
    let before = targets.len();
    targets.retain(|held| *held != to);
    before != targets.len()
}

impl MetadataSource for Session {
    fn metadata(&self, entity_name: &str) -> Result<EntityMetadata> {
        self.registry.metadata(entity_name)
    }
}

impl IdentitySource for Session {
    fn identifier(&self, object: ObjectId) -> Result<Vec<Value>> {
        Ok(self.managed(object)?.identifier().to_vec())
    }
}

impl QueryExecutor for Session {
    #[tracing::instrument(level = "debug", skip(self, query))]
    fn execute_scalar(&self, query: &BoundQuery) -> Result<Value> {
        self.executed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            query = %query.text(),
            params = ?query.parameter_values(),
            "Executing scalar query"
        );
        Evaluator::new(self, query).scalar()
    }

    #[tracing::instrument(level = "debug", skip(self, query))]
    fn execute(&self, query: &BoundQuery) -> Result<Vec<Row>> {
        self.executed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            query = %query.text(),
            params = ?query.parameter_values(),
            first_result = ?query.first_result(),
            max_results = ?query.max_results(),
            "Executing query"
        );
        let rows = Evaluator::new(self, query).rows()?;
        tracing::debug!(rows = rows.len(), "Query complete");
        Ok(rows)
    }
}
