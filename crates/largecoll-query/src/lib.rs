//! Structured object-query builder for LargeColl Rust.
//!
//! `largecoll-query` is the **query construction layer**. Queries are built as
//! data (`ObjectQuery`, `Expr`, `Join`) and only turned into text at the very
//! end, so their structure can be inspected and tested independently of the
//! textual format.
//!
//! # Role In The Architecture
//!
//! - **Expression AST**: `Expr` covers entity/field paths, placeholders,
//!   equality, boolean connectives and `COUNT`.
//! - **Query AST**: `ObjectQuery` roots a query at one entity and follows
//!   association paths with `Join`.
//! - **Bindings**: `BoundQuery` pairs a query with positional parameters and
//!   first-result/max-results bounds.
//! - **Execution seam**: `QueryExecutor` and `EntityManager` describe what a
//!   persistence manager must provide.

pub mod bound;
pub mod clause;
pub mod executor;
pub mod expr;
pub mod join;
pub mod select;

pub use bound::{BoundQuery, QueryKind};
pub use clause::{Limit, Offset, Where};
pub use executor::{EntityManager, QueryExecutor};
pub use expr::{AggregateFunc, BinaryOp, Expr};
pub use join::{Join, JoinType};
pub use select::{ObjectQuery, SelectItem};
