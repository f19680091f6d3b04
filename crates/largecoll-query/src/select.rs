//! SELECT query builder over entities and association paths.

use crate::clause::Where;
use crate::expr::Expr;
use crate::join::Join;
use largecoll_core::{EntityName, Ident};

/// One item of the select list, with an optional result alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: Option<Ident>,
}

impl SelectItem {
    fn to_text(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {alias}", self.expr.to_text()),
            None => self.expr.to_text(),
        }
    }
}

/// A SELECT query over one root entity.
///
/// Provides a fluent API; the query is plain data until rendered with
/// [`to_text`](ObjectQuery::to_text), so callers and executors can inspect
/// its structure directly.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectQuery {
    /// Select list (empty = the root entity)
    projection: Vec<SelectItem>,
    /// Root entity type
    root: EntityName,
    /// Alias bound to the root entity
    root_alias: Ident,
    /// Association joins, in order
    joins: Vec<Join>,
    /// WHERE clause conditions
    where_clause: Option<Where>,
}

impl ObjectQuery {
    /// Create a query over `root`, bound to `alias`.
    pub fn from(root: &EntityName, alias: &Ident) -> Self {
        Self {
            projection: Vec::new(),
            root: root.clone(),
            root_alias: alias.clone(),
            joins: Vec::new(),
            where_clause: None,
        }
    }

    /// Add a select-list item.
    pub fn select(mut self, expr: Expr) -> Self {
        self.projection.push(SelectItem { expr, alias: None });
        self
    }

    /// Add a select-list item with a result alias.
    pub fn select_as(mut self, expr: Expr, alias: &Ident) -> Self {
        self.projection.push(SelectItem {
            expr,
            alias: Some(alias.clone()),
        });
        self
    }

    /// Add a JOIN clause.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Add a WHERE condition (ANDed with any existing one).
    pub fn filter(mut self, expr: Expr) -> Self {
        self.where_clause = Some(match self.where_clause {
            Some(existing) => existing.and(expr),
            None => Where::new(expr),
        });
        self
    }

    pub fn projection(&self) -> &[SelectItem] {
        &self.projection
    }

    pub fn root(&self) -> &EntityName {
        &self.root
    }

    pub fn root_alias(&self) -> &Ident {
        &self.root_alias
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn where_clause(&self) -> Option<&Where> {
        self.where_clause.as_ref()
    }

    /// Whether the select list consists of aggregates only.
    pub fn is_aggregate(&self) -> bool {
        !self.projection.is_empty() && self.projection.iter().all(|item| item.expr.is_aggregate())
    }

    /// Placeholder indices, in the order they appear in the query text.
    pub fn placeholders(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for item in &self.projection {
            item.expr.collect_placeholders(&mut out);
        }
        if let Some(where_clause) = &self.where_clause {
            where_clause.expr().collect_placeholders(&mut out);
        }
        out
    }

    /// Render the query text.
    pub fn to_text(&self) -> String {
        let mut text = String::from("SELECT ");

        if self.projection.is_empty() {
            text.push_str(self.root_alias.as_str());
        } else {
            let items: Vec<String> = self.projection.iter().map(SelectItem::to_text).collect();
            text.push_str(&items.join(", "));
        }

        // FROM
        text.push_str(" FROM ");
        text.push_str(self.root.as_str());
        text.push(' ');
        text.push_str(self.root_alias.as_str());

        // JOINs
        for join in &self.joins {
            text.push_str(&join.to_text());
        }

        // WHERE
        if let Some(where_clause) = &self.where_clause {
            text.push_str(" WHERE ");
            text.push_str(&where_clause.to_text());
        }

        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Ident {
        Ident::new(s).unwrap()
    }

    #[test]
    fn test_select_root_entity() {
        let query = ObjectQuery::from(&EntityName::new("Shop::LineItem").unwrap(), &ident("r"));
        assert_eq!(query.to_text(), "SELECT r FROM Shop::LineItem r");
        assert!(!query.is_aggregate());
        assert!(query.placeholders().is_empty());
    }

    #[test]
    fn test_count_with_left_join() {
        let (o, r) = (ident("o"), ident("r"));
        let query = ObjectQuery::from(&EntityName::new("Shop::Order").unwrap(), &o)
            .select_as(Expr::path(&r, &ident("id")).count(), &ident("collectionCount"))
            .join(Join::left(&o, &ident("items"), &r))
            .filter(Expr::path(&o, &ident("tenantId")).eq(Expr::placeholder(1)))
            .filter(Expr::path(&o, &ident("localId")).eq(Expr::placeholder(2)));

        assert_eq!(
            query.to_text(),
            "SELECT COUNT(r.id) AS collectionCount FROM Shop::Order o LEFT JOIN o.items r WHERE o.tenantId = ?1 AND o.localId = ?2"
        );
        assert!(query.is_aggregate());
        assert_eq!(query.placeholders(), vec![1, 2]);
    }

    #[test]
    fn test_backslash_namespaced_entity() {
        let (o, r) = (ident("o"), ident("r"));
        let query = ObjectQuery::from(&EntityName::new(r"App\Entity\Tag").unwrap(), &r)
            .select(Expr::entity(&r))
            .join(Join::inner(&r, &ident("products"), &o))
            .filter(Expr::path(&o, &ident("id")).eq(Expr::placeholder(1)));

        assert_eq!(
            query.to_text(),
            r"SELECT r FROM App\Entity\Tag r INNER JOIN r.products o WHERE o.id = ?1"
        );
    }

    #[test]
    fn test_structural_equality() {
        let build = || {
            ObjectQuery::from(&EntityName::new("A").unwrap(), &ident("a"))
                .filter(Expr::path(&ident("a"), &ident("id")).eq(Expr::placeholder(1)))
        };
        assert_eq!(build(), build());
    }
}
