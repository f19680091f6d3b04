//! Core types and traits for LargeColl Rust.
//!
//! This crate provides the foundational abstractions shared by the query
//! builder, the session and the window facade:
//!
//! - `Value` and `Row` for bindings and results
//! - `EntityMetadata` and `AssociationDescriptor` for the mapping model
//! - `Ident` / `EntityName` for names that are safe to render into query text
//! - `MetadataSource` / `IdentitySource` collaborator traits
//! - `PersistentCollection`, the handle to one owner's collection

pub mod collection;
pub mod error;
pub mod identifiers;
pub mod metadata;
pub mod relationship;
pub mod row;
pub mod source;
pub mod value;

pub use collection::PersistentCollection;
pub use error::{
    Error, IdentityError, IdentityErrorKind, MappingError, MappingErrorKind, QueryError,
    QueryErrorKind, Result, TypeError,
};
pub use identifiers::{EntityName, Ident, is_valid_entity_name, is_valid_ident};
pub use metadata::{EntityMetadata, EntityMetadataBuilder};
pub use relationship::{AssociationDescriptor, AssociationKind, AssociationSide};
pub use row::{ColumnInfo, Row};
pub use source::{IdentitySource, MetadataSource, ObjectId};
pub use value::Value;
