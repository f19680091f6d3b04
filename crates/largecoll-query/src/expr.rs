//! Object-query expressions.
//!
//! Expressions reference entities through aliases and fields through
//! `alias.field` paths. Names are validated [`Ident`]s, and values never
//! appear inline: every comparison operand that comes from the caller is a
//! positional [`Expr::Placeholder`].

use largecoll_core::Ident;

/// An expression in a select list or WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A whole entity bound to an alias (`r`).
    Entity(Ident),

    /// A field reached through an alias (`o.tenantId`).
    Path { alias: Ident, field: Ident },

    /// Positional placeholder, 1-based (`?1`).
    Placeholder(usize),

    /// Binary operation (e.g., `a = b`, `a AND b`).
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Aggregate function call (e.g., `COUNT(r.id)`).
    Aggregate { func: AggregateFunc, arg: Box<Expr> },

    /// Parenthesized expression.
    Paren(Box<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// Equal (=)
    Eq,
    /// Not equal (<>)
    Ne,
    /// Logical AND
    And,
    /// Logical OR
    Or,
}

impl BinaryOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
}

impl AggregateFunc {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "COUNT",
        }
    }
}

impl Expr {
    /// Reference the whole entity bound to `alias`.
    pub fn entity(alias: &Ident) -> Self {
        Expr::Entity(alias.clone())
    }

    /// Reference `alias.field`.
    pub fn path(alias: &Ident, field: &Ident) -> Self {
        Expr::Path {
            alias: alias.clone(),
            field: field.clone(),
        }
    }

    /// Positional placeholder (1-based).
    pub fn placeholder(index: usize) -> Self {
        Expr::Placeholder(index)
    }

    fn binary(self, op: BinaryOp, other: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    /// Equal to (`=`).
    pub fn eq(self, other: Expr) -> Self {
        self.binary(BinaryOp::Eq, other)
    }

    /// Not equal to (`<>`).
    pub fn ne(self, other: Expr) -> Self {
        self.binary(BinaryOp::Ne, other)
    }

    /// Logical AND.
    pub fn and(self, other: Expr) -> Self {
        self.binary(BinaryOp::And, other)
    }

    /// Logical OR.
    pub fn or(self, other: Expr) -> Self {
        self.binary(BinaryOp::Or, other)
    }

    /// `COUNT(self)`.
    pub fn count(self) -> Self {
        Expr::Aggregate {
            func: AggregateFunc::Count,
            arg: Box::new(self),
        }
    }

    /// Wrap expression in parentheses.
    pub fn paren(self) -> Self {
        Expr::Paren(Box::new(self))
    }

    /// Whether this expression is an aggregate.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Expr::Aggregate { .. })
    }

    /// Collect placeholder indices in textual order.
    pub fn collect_placeholders(&self, out: &mut Vec<usize>) {
        match self {
            Expr::Placeholder(idx) => out.push(*idx),
            Expr::Binary { left, right, .. } => {
                left.collect_placeholders(out);
                right.collect_placeholders(out);
            }
            Expr::Aggregate { arg, .. } => arg.collect_placeholders(out),
            Expr::Paren(inner) => inner.collect_placeholders(out),
            Expr::Entity(_) | Expr::Path { .. } => {}
        }
    }

    /// Render this expression as query text.
    pub fn to_text(&self) -> String {
        match self {
            Expr::Entity(alias) => alias.to_string(),
            Expr::Path { alias, field } => format!("{alias}.{field}"),
            Expr::Placeholder(idx) => format!("?{idx}"),
            Expr::Binary { left, op, right } => {
                format!("{} {} {}", left.to_text(), op.as_str(), right.to_text())
            }
            Expr::Aggregate { func, arg } => format!("{}({})", func.as_str(), arg.to_text()),
            Expr::Paren(inner) => format!("({})", inner.to_text()),
        }
    }
}
