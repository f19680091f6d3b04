//! Identity Map tracking managed entity instances by handle and identifier.
//!
//! Every managed instance gets an [`ObjectId`] when it enters the map. The
//! handle never changes, while the identifier values behind it may: an
//! instance can be added before its key is known and assigned one later.
//!
//! Instances whose identifier is complete (no NULL component) are also
//! indexed by `(entity, identifier)`, so the same key always resolves to the
//! same handle within a session.

use largecoll_core::{EntityName, Error, Ident, IdentityErrorKind, ObjectId, Result, Value};
use std::collections::{BTreeMap, HashMap};

/// Hash an entity name plus identifier values for the key index.
fn hash_key(entity: &str, values: &[Value]) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    entity.hash(&mut hasher);
    for v in values {
        hash_single_value(v, &mut hasher);
    }
    hasher.finish()
}

/// Hash a single Value into the hasher.
///
/// Integer widths share a tag so `Int(7)` and `BigInt(7)` land in the same
/// bucket, mirroring [`Value::matches`].
fn hash_single_value(v: &Value, hasher: &mut impl std::hash::Hasher) {
    use std::hash::Hash;

    match v {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Int(i) => {
            2u8.hash(hasher);
            i64::from(*i).hash(hasher);
        }
        Value::BigInt(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Double(f) => {
            3u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Text(s) => {
            4u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            5u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Uuid(u) => {
            6u8.hash(hasher);
            u.hash(hasher);
        }
        Value::Json(j) => {
            7u8.hash(hasher);
            j.to_string().hash(hasher);
        }
    }
}

fn is_complete(identifier: &[Value]) -> bool {
    !identifier.is_empty() && identifier.iter().all(|v| !v.is_null())
}

fn same_identifier(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.matches(y))
}

/// State of one managed entity instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedEntity {
    entity: EntityName,
    identifier: Vec<Value>,
    fields: Vec<(Ident, Value)>,
}

impl ManagedEntity {
    /// Entity type of this instance.
    pub fn entity(&self) -> &EntityName {
        &self.entity
    }

    /// Current identifier values, in declared identifier order.
    pub fn identifier(&self) -> &[Value] {
        &self.identifier
    }

    /// Non-identifier fields, in the order they were first set.
    pub fn fields(&self) -> &[(Ident, Value)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    fn set_field(&mut self, name: Ident, value: Value) {
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }
}

/// Identity map for one session.
///
/// Handles are handed out in increasing order, so iterating the map visits
/// instances in the order they were added.
#[derive(Debug, Default)]
pub struct IdentityMap {
    next_id: u64,
    entries: BTreeMap<ObjectId, ManagedEntity>,
    /// hash(entity, identifier) -> handles (a bucket may hold collisions)
    by_key: HashMap<u64, Vec<ObjectId>>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Start tracking a new instance and return its handle.
    ///
    /// Fails with `Duplicate` if the identifier is complete and already held
    /// by another instance of the same entity.
    #[allow(clippy::result_large_err)]
    pub fn insert(
        &mut self,
        entity: EntityName,
        identifier: Vec<Value>,
        fields: Vec<(Ident, Value)>,
    ) -> Result<ObjectId> {
        self.check_unique(&entity, &identifier, None)?;

        self.next_id += 1;
        let id = ObjectId::new(self.next_id);
        self.index(id, &entity, &identifier);

        let mut managed = ManagedEntity {
            entity,
            identifier,
            fields: Vec::with_capacity(fields.len()),
        };
        for (name, value) in fields {
            managed.set_field(name, value);
        }
        self.entries.insert(id, managed);
        Ok(id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&ManagedEntity> {
        self.entries.get(&id)
    }

    /// Look up the handle holding `identifier` for `entity`.
    pub fn find(&self, entity: &str, identifier: &[Value]) -> Option<ObjectId> {
        if !is_complete(identifier) {
            return None;
        }
        self.by_key
            .get(&hash_key(entity, identifier))?
            .iter()
            .copied()
            .find(|id| {
                self.entries.get(id).is_some_and(|managed| {
                    managed.entity == entity && same_identifier(&managed.identifier, identifier)
                })
            })
    }

    /// Replace the identifier values of a managed instance.
    ///
    /// The new values must have the same arity as the old ones.
    #[allow(clippy::result_large_err)]
    pub fn reassign(&mut self, id: ObjectId, identifier: Vec<Value>) -> Result<()> {
        let managed = self.entries.get(&id).ok_or_else(|| unmanaged(id))?;
        if managed.identifier.len() != identifier.len() {
            return Err(Error::identity(
                IdentityErrorKind::ArityMismatch,
                format!(
                    "{} has {} identifier value(s), got {}",
                    managed.entity,
                    managed.identifier.len(),
                    identifier.len()
                ),
            ));
        }
        let entity = managed.entity.clone();
        let old = managed.identifier.clone();
        self.check_unique(&entity, &identifier, Some(id))?;

        self.unindex(id, &entity, &old);
        self.index(id, &entity, &identifier);
        if let Some(managed) = self.entries.get_mut(&id) {
            managed.identifier = identifier;
        }
        Ok(())
    }

    /// Set (or overwrite) a non-identifier field.
    #[allow(clippy::result_large_err)]
    pub fn set_field(&mut self, id: ObjectId, field: Ident, value: Value) -> Result<()> {
        let managed = self.entries.get_mut(&id).ok_or_else(|| unmanaged(id))?;
        managed.set_field(field, value);
        Ok(())
    }

    /// Managed instances of one entity type, in insertion order.
    pub fn iter_entity<'a>(
        &'a self,
        entity: &'a str,
    ) -> impl Iterator<Item = (ObjectId, &'a ManagedEntity)> + 'a {
        self.entries
            .iter()
            .filter(move |(_, managed)| managed.entity == entity)
            .map(|(id, managed)| (*id, managed))
    }

    #[allow(clippy::result_large_err)]
    fn check_unique(
        &self,
        entity: &EntityName,
        identifier: &[Value],
        except: Option<ObjectId>,
    ) -> Result<()> {
        match self.find(entity.as_str(), identifier) {
            Some(existing) if Some(existing) != except => Err(Error::identity(
                IdentityErrorKind::Duplicate,
                format!("{entity} identifier {identifier:?} is already held by {existing}"),
            )),
            _ => Ok(()),
        }
    }

    fn index(&mut self, id: ObjectId, entity: &EntityName, identifier: &[Value]) {
        if is_complete(identifier) {
            self.by_key
                .entry(hash_key(entity.as_str(), identifier))
                .or_default()
                .push(id);
        }
    }

    fn unindex(&mut self, id: ObjectId, entity: &EntityName, identifier: &[Value]) {
        if !is_complete(identifier) {
            return;
        }
        let key = hash_key(entity.as_str(), identifier);
        if let Some(bucket) = self.by_key.get_mut(&key) {
            bucket.retain(|held| *held != id);
            if bucket.is_empty() {
                self.by_key.remove(&key);
            }
        }
    }
}

fn unmanaged(id: ObjectId) -> Error {
    Error::identity(
        IdentityErrorKind::Unmanaged,
        format!("{id} is not managed by this session"),
    )
}
