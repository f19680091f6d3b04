//! Query execution collaborator.

use crate::bound::BoundQuery;
use largecoll_core::{IdentitySource, MetadataSource, Result, Row, Value};

/// Executes bound queries against a store.
///
/// Failures are reported as-is; callers in this workspace never wrap or
/// retry them.
pub trait QueryExecutor {
    /// Execute an aggregate query and return its single scalar.
    #[allow(clippy::result_large_err)]
    fn execute_scalar(&self, query: &BoundQuery) -> Result<Value>;

    /// Execute a row query, honouring its first-result/max-results bounds.
    #[allow(clippy::result_large_err)]
    fn execute(&self, query: &BoundQuery) -> Result<Vec<Row>>;
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for &T {
    fn execute_scalar(&self, query: &BoundQuery) -> Result<Value> {
        (**self).execute_scalar(query)
    }

    fn execute(&self, query: &BoundQuery) -> Result<Vec<Row>> {
        (**self).execute(query)
    }
}

/// Everything the window builder needs from a persistence manager:
/// metadata lookup, identity lookup and query execution.
pub trait EntityManager: MetadataSource + IdentitySource + QueryExecutor {}

impl<T: MetadataSource + IdentitySource + QueryExecutor + ?Sized> EntityManager for T {}
