//! Count and slice queries over large associations.
//!
//! Both operations share one pipeline:
//!
//! 1. resolve source and target metadata from the collection's manager,
//! 2. build one `o.<id> = ?N` predicate per owner identifier field,
//! 3. (slice only) resolve the field leading from the target back to the
//!    owner,
//! 4. compose the query structurally,
//! 5. bind the owner's identifier values, fetched fresh on every call.
//!
//! Predicate `?N` and binding `N` are both derived from position `N` of the
//! owner's declared identifier fields. Every precondition is checked before
//! anything is executed.

use crate::config::{Aliases, WindowConfig};
use largecoll_core::{
    AssociationDescriptor, EntityMetadata, Error, Ident, IdentityErrorKind, IdentitySource,
    MappingErrorKind, MetadataSource, PersistentCollection, Result, Row, TypeError, Value,
};
use largecoll_query::{BoundQuery, EntityManager, Expr, Join, ObjectQuery};

/// Builds count and slice queries for collections too large to load.
///
/// The builder is stateless apart from its configuration: nothing about a
/// collection, its metadata or its owner's identity is cached between calls,
/// so one instance can serve many threads at once.
#[derive(Debug, Clone, Default)]
pub struct AssociationWindow {
    config: WindowConfig,
}

/// Source and target metadata of one association.
struct Resolved {
    source: EntityMetadata,
    target: EntityMetadata,
}

impl AssociationWindow {
    /// Create a builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with a custom configuration.
    ///
    /// Fails with `InvalidArgument` if an alias is not a plain identifier or
    /// the owner and related aliases collide.
    #[allow(clippy::result_large_err)]
    pub fn with_config(config: WindowConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Count the related rows of `collection` without loading any of them.
    ///
    /// An owner with no related rows counts as 0.
    #[tracing::instrument(
        level = "debug",
        skip(self, collection),
        fields(owner = %collection.owner(), association = %collection.mapping().field_name)
    )]
    #[allow(clippy::result_large_err)]
    pub fn count<M>(&self, collection: &PersistentCollection<'_, M>) -> Result<u64>
    where
        M: EntityManager + ?Sized,
    {
        let query = self.count_query(collection)?;
        let scalar = collection.manager().execute_scalar(&query)?;
        let count = self.count_from_scalar(scalar)?;
        tracing::debug!(count, "Counted collection");
        Ok(count)
    }

    /// Compose and bind the count query for `collection` without executing it.
    ///
    /// Fails with `UnsupportedKeyShape` when the related entity does not have
    /// exactly one identifier field.
    #[allow(clippy::result_large_err)]
    pub fn count_query<M>(&self, collection: &PersistentCollection<'_, M>) -> Result<BoundQuery>
    where
        M: MetadataSource + IdentitySource + ?Sized,
    {
        let aliases = self.config.aliases()?;
        let mapping = collection.mapping();
        let resolved = resolve_metadata(collection.manager(), mapping)?;

        let Some(target_id) = resolved.target.single_identifier() else {
            tracing::warn!(
                target_entity = %resolved.target.name(),
                identifier_fields = resolved.target.identifier().len(),
                "Refusing to count collection with composite target key"
            );
            return Err(Error::mapping(
                MappingErrorKind::UnsupportedKeyShape,
                format!(
                    "only single-column primary keys on the related entity are supported \
                     ({} declares {} identifier fields)",
                    resolved.target.name(),
                    resolved.target.identifier().len()
                ),
            ));
        };

        let predicates = build_predicates(&aliases.owner, &resolved.source);
        let query = compose_count(&aliases, &resolved.source, mapping, target_id, predicates);
        let bound = bind_parameters(BoundQuery::new(query), collection, &resolved.source)?;

        trace_composed(&resolved, mapping, &bound);
        Ok(bound)
    }

    /// Compose a query for at most `limit` related rows, skipping the first
    /// `offset`.
    ///
    /// The query is returned bound but not executed. No ordering is imposed,
    /// so rows come back in the store's own stable order. Only bidirectional
    /// associations can be sliced: an owning side without `inversed_by`
    /// fails with `UnsupportedDirection`.
    #[tracing::instrument(
        level = "debug",
        skip(self, collection),
        fields(owner = %collection.owner(), association = %collection.mapping().field_name)
    )]
    #[allow(clippy::result_large_err)]
    pub fn slice<M>(
        &self,
        collection: &PersistentCollection<'_, M>,
        limit: u64,
        offset: u64,
    ) -> Result<BoundQuery>
    where
        M: MetadataSource + IdentitySource + ?Sized,
    {
        self.check_window(limit, offset)?;
        let aliases = self.config.aliases()?;
        let mapping = collection.mapping();
        let resolved = resolve_metadata(collection.manager(), mapping)?;

        let traversal = mapping.traversal_field().inspect_err(|_| {
            tracing::warn!(
                source_entity = %mapping.source_entity,
                "Refusing to slice unidirectional collection"
            );
        })?;

        let predicates = build_predicates(&aliases.owner, &resolved.source);
        let query = compose_slice(&aliases, &resolved.target, traversal, predicates);
        let bound = bind_parameters(BoundQuery::new(query), collection, &resolved.source)?
            .set_first_result(offset)
            .set_max_results(limit);

        trace_composed(&resolved, mapping, &bound);
        Ok(bound)
    }

    /// Compose a slice with [`slice`](Self::slice) and execute it through
    /// the collection's manager.
    #[allow(clippy::result_large_err)]
    pub fn fetch_slice<M>(
        &self,
        collection: &PersistentCollection<'_, M>,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Row>>
    where
        M: EntityManager + ?Sized,
    {
        let query = self.slice(collection, limit, offset)?;
        collection.manager().execute(&query)
    }

    #[allow(clippy::result_large_err)]
    fn check_window(&self, limit: u64, offset: u64) -> Result<()> {
        let max = i64::MAX.unsigned_abs();
        let problem = if limit > max {
            Some(format!("limit {limit} exceeds {max}"))
        } else if offset > max {
            Some(format!("offset {offset} exceeds {max}"))
        } else {
            self.config
                .max_limit
                .filter(|cap| limit > *cap)
                .map(|cap| format!("limit {limit} exceeds the configured maximum of {cap}"))
        };

        match problem {
            Some(message) => {
                tracing::warn!(limit, offset, "Rejecting slice window");
                Err(Error::InvalidArgument(message))
            }
            None => Ok(()),
        }
    }

    #[allow(clippy::result_large_err)]
    fn count_from_scalar(&self, scalar: Value) -> Result<u64> {
        let count = match &scalar {
            Value::Null => Some(0),
            Value::Int(n) => u64::try_from(*n).ok(),
            Value::BigInt(n) => u64::try_from(*n).ok(),
            _ => None,
        };
        count.ok_or_else(|| {
            Error::Type(TypeError {
                expected: "non-negative integer",
                actual: format!("{} {scalar:?}", scalar.type_name()),
                column: Some(self.config.count_alias.clone()),
            })
        })
    }
}

#[allow(clippy::result_large_err)]
fn resolve_metadata<M>(manager: &M, mapping: &AssociationDescriptor) -> Result<Resolved>
where
    M: MetadataSource + ?Sized,
{
    Ok(Resolved {
        source: manager.metadata(mapping.source_entity.as_str())?,
        target: manager.metadata(mapping.target_entity.as_str())?,
    })
}

/// `o.<id_i> = ?i` for each owner identifier field, in declared order.
fn build_predicates(owner: &Ident, source: &EntityMetadata) -> Vec<Expr> {
    source
        .identifier()
        .iter()
        .enumerate()
        .map(|(i, field)| Expr::path(owner, field).eq(Expr::placeholder(i + 1)))
        .collect()
}

fn compose_count(
    aliases: &Aliases,
    source: &EntityMetadata,
    mapping: &AssociationDescriptor,
    target_id: &Ident,
    predicates: Vec<Expr>,
) -> ObjectQuery {
    let query = ObjectQuery::from(source.name(), &aliases.owner)
        .select_as(Expr::path(&aliases.related, target_id).count(), &aliases.count)
        .join(Join::left(&aliases.owner, &mapping.field_name, &aliases.related));
    predicates.into_iter().fold(query, ObjectQuery::filter)
}

fn compose_slice(
    aliases: &Aliases,
    target: &EntityMetadata,
    traversal: &Ident,
    predicates: Vec<Expr>,
) -> ObjectQuery {
    let query = ObjectQuery::from(target.name(), &aliases.related)
        .select(Expr::entity(&aliases.related))
        .join(Join::inner(&aliases.related, traversal, &aliases.owner));
    predicates.into_iter().fold(query, ObjectQuery::filter)
}

/// Bind the owner's current identifier values to `?1..=?N`.
#[allow(clippy::result_large_err)]
fn bind_parameters<M>(
    query: BoundQuery,
    collection: &PersistentCollection<'_, M>,
    source: &EntityMetadata,
) -> Result<BoundQuery>
where
    M: IdentitySource + ?Sized,
{
    let identity = collection.manager().identifier(collection.owner())?;
    if identity.len() != source.identifier().len() {
        return Err(Error::identity(
            IdentityErrorKind::ArityMismatch,
            format!(
                "{} declares {} identifier field(s) but {} has {} identity value(s)",
                source.name(),
                source.identifier().len(),
                collection.owner(),
                identity.len()
            ),
        ));
    }

    Ok(identity
        .into_iter()
        .enumerate()
        .fold(query, |query, (i, value)| query.set_parameter(i + 1, value)))
}

fn trace_composed(resolved: &Resolved, mapping: &AssociationDescriptor, bound: &BoundQuery) {
    tracing::debug!(
        source = %resolved.source.name(),
        target = %resolved.target.name(),
        association = %mapping.field_name,
        params = ?bound.parameter_values(),
        "Composed window query"
    );
    tracing::trace!(query = %bound.text(), "Window query text");
}
