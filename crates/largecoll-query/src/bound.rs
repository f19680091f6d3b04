//! Queries paired with their positional parameter bindings.

use crate::clause::{Limit, Offset};
use crate::select::ObjectQuery;
use largecoll_core::{Error, QueryError, QueryErrorKind, Result, Value};
use std::collections::BTreeMap;

/// What executing a query yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// A single aggregate scalar (`execute_scalar`).
    Count,
    /// Result rows (`execute`).
    Rows,
}

/// A composed query plus its 1-indexed positional bindings and
/// pagination bounds.
///
/// The rendered text is computed once at construction. Binding methods
/// consume and return the query, so a value handed to a caller is never
/// altered behind its back.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    query: ObjectQuery,
    text: String,
    parameters: BTreeMap<usize, Value>,
    first_result: Option<Offset>,
    max_results: Option<Limit>,
}

impl BoundQuery {
    #[tracing::instrument(level = "trace", skip(query))]
    pub fn new(query: ObjectQuery) -> Self {
        let text = query.to_text();
        tracing::trace!(query = %text, "Composed object query");
        Self {
            query,
            text,
            parameters: BTreeMap::new(),
            first_result: None,
            max_results: None,
        }
    }

    /// Bind `value` to placeholder `?position` (1-based).
    #[must_use]
    pub fn set_parameter(mut self, position: usize, value: impl Into<Value>) -> Self {
        self.parameters.insert(position, value.into());
        self
    }

    /// Skip the first `n` result rows.
    #[must_use]
    pub fn set_first_result(mut self, n: u64) -> Self {
        self.first_result = Some(Offset(n));
        self
    }

    /// Return at most `n` result rows.
    #[must_use]
    pub fn set_max_results(mut self, n: u64) -> Self {
        self.max_results = Some(Limit(n));
        self
    }

    /// The structured query.
    pub fn query(&self) -> &ObjectQuery {
        &self.query
    }

    pub fn kind(&self) -> QueryKind {
        if self.query.is_aggregate() {
            QueryKind::Count
        } else {
            QueryKind::Rows
        }
    }

    /// The rendered query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Value bound to `?position`, if any.
    pub fn parameter(&self, position: usize) -> Option<&Value> {
        self.parameters.get(&position)
    }

    /// Bindings in position order.
    pub fn parameters(&self) -> impl Iterator<Item = (usize, &Value)> {
        self.parameters.iter().map(|(pos, value)| (*pos, value))
    }

    /// Bound values in position order.
    pub fn parameter_values(&self) -> Vec<Value> {
        self.parameters.values().cloned().collect()
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn first_result(&self) -> Option<u64> {
        self.first_result.map(|Offset(n)| n)
    }

    pub fn max_results(&self) -> Option<u64> {
        self.max_results.map(|Limit(n)| n)
    }

    /// Check that every placeholder is bound and nothing else is.
    ///
    /// Placeholders must be numbered `1..=N` without gaps.
    #[allow(clippy::result_large_err)]
    pub fn check_bindings(&self) -> Result<()> {
        let mut expected = self.query.placeholders();
        expected.sort_unstable();
        expected.dedup();

        let numbered = expected.iter().enumerate().all(|(i, pos)| *pos == i + 1);
        if !numbered {
            return Err(self.binding_error(format!(
                "placeholders must be numbered 1..=N, found {:?}",
                expected
            )));
        }

        if let Some(missing) = expected.iter().find(|pos| !self.parameters.contains_key(*pos)) {
            return Err(self.binding_error(format!("placeholder ?{missing} has no bound value")));
        }

        if let Some(extra) = self.parameters.keys().find(|pos| !expected.contains(*pos)) {
            return Err(self.binding_error(format!(
                "value bound to ?{extra}, which does not appear in the query"
            )));
        }

        Ok(())
    }

    fn binding_error(&self, message: String) -> Error {
        Error::Query(QueryError::new(QueryErrorKind::UnboundParameter, message).with_query(&self.text))
    }
}
