//! Query clause types (WHERE, LIMIT, OFFSET).

use crate::expr::Expr;

/// WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    expr: Expr,
}

impl Where {
    /// Create a new WHERE clause with the given expression.
    pub fn new(expr: Expr) -> Self {
        Self { expr }
    }

    /// Add an AND condition.
    pub fn and(self, expr: Expr) -> Self {
        Self {
            expr: self.expr.and(expr),
        }
    }

    /// The combined condition.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Render the condition (without the `WHERE` keyword).
    pub fn to_text(&self) -> String {
        self.expr.to_text()
    }
}

/// Maximum number of rows to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub u64);

/// Number of leading rows to skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset(pub u64);

#[cfg(test)]
mod tests {
    use super::*;
    use largecoll_core::Ident;

    #[test]
    fn where_and_combines_in_order() {
        let o = Ident::new("o").unwrap();
        let clause = Where::new(Expr::path(&o, &Ident::new("a").unwrap()).eq(Expr::placeholder(1)))
            .and(Expr::path(&o, &Ident::new("b").unwrap()).eq(Expr::placeholder(2)));

        assert_eq!(clause.to_text(), "o.a = ?1 AND o.b = ?2");
    }
}
