//! LargeColl Rust - count and page through huge ORM associations without
//! loading them.
//!
//! An order with millions of line items should not have to materialize its
//! `items` collection to answer "how many?" or "give me items 100-149".
//! LargeColl composes two targeted read queries instead:
//!
//! - **Count**: `SELECT COUNT(r.id) ... LEFT JOIN o.items r WHERE o.<id> = ?1 ...`
//! - **Slice**: `SELECT r ... INNER JOIN r.order o WHERE o.<id> = ?1 ...` plus
//!   first-result / max-results bounds.
//!
//! Queries are built as structured values, names are validated identifiers
//! and owner identity values only ever travel as positional bindings.
//!
//! # Quick Start
//!
//! ```ignore
//! use largecoll::prelude::*;
//!
//! let mut session = Session::new();
//! session.register_entity(
//!     EntityMetadata::builder("Shop::Order")
//!         .identifiers(&["tenantId", "localId"])
//!         .association(AssociationDescriptor::inverse(
//!             "Shop::Order", "items", "Shop::LineItem", "order",
//!         )?)
//!         .build()?,
//! );
//! session.register_entity(
//!     EntityMetadata::builder("Shop::LineItem")
//!         .identifier("id")
//!         .association(AssociationDescriptor::many_to_one(
//!             "Shop::LineItem", "order", "Shop::Order", Some("items"),
//!         )?)
//!         .build()?,
//! );
//!
//! let order = session.persist("Shop::Order", vec![7_i64.into(), 42_i64.into()], vec![])?;
//! // ... persist and link line items ...
//!
//! let window = AssociationWindow::new();
//! let items = session.collection(order, "items")?;
//!
//! let total = window.count(&items)?;
//! let page = window.fetch_slice(&items, 50, 100)?;
//! ```
//!
//! # Crates
//!
//! - `largecoll-core`: values, rows, errors, entity metadata and the
//!   collaborator traits.
//! - `largecoll-query`: the object-query AST and bound queries.
//! - `largecoll-session`: an in-memory persistence manager.

mod config;
mod window;

pub use config::WindowConfig;
pub use window::AssociationWindow;

pub use largecoll_core::{
    AssociationDescriptor, AssociationKind, AssociationSide, ColumnInfo, EntityMetadata,
    EntityMetadataBuilder, EntityName, Error, Ident, IdentityError, IdentityErrorKind,
    IdentitySource, MappingError, MappingErrorKind, MetadataSource, ObjectId,
    PersistentCollection, QueryError, QueryErrorKind, Result, Row, TypeError, Value,
};
pub use largecoll_query::{
    AggregateFunc, BinaryOp, BoundQuery, EntityManager, Expr, Join, JoinType, Limit, ObjectQuery,
    Offset, QueryExecutor, QueryKind, SelectItem, Where,
};
pub use largecoll_session::{
    IdentityMap, ManagedEntity, MetadataRegistry, Session, SessionConfig,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use largecoll::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AssociationDescriptor,
        AssociationWindow,
        BoundQuery,
        EntityManager,
        EntityMetadata,
        Error,
        MetadataRegistry,
        ObjectId,
        PersistentCollection,
        Result,
        Row,
        Session,
        SessionConfig,
        Value,
        WindowConfig,
    };
}
