//! Association-path JOIN clauses.

use largecoll_core::Ident;

/// A JOIN that follows an association field from an already-bound alias.
///
/// Renders as ` LEFT JOIN o.items r`: the join condition is implied by the
/// association mapping, so there is no ON clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Type of join
    pub join_type: JoinType,
    /// Alias the path starts from
    pub from_alias: Ident,
    /// Association field followed from `from_alias`
    pub field: Ident,
    /// Alias bound to the joined entity
    pub alias: Ident,
}

/// Types of association joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Only pairs where the association has at least one related row.
    Inner,
    /// Keeps the left row even when the association is empty.
    Left,
}

impl JoinType {
    /// Get the keyword for this join type.
    pub const fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

impl Join {
    /// Create an INNER JOIN through `from_alias.field`.
    pub fn inner(from_alias: &Ident, field: &Ident, alias: &Ident) -> Self {
        Self {
            join_type: JoinType::Inner,
            from_alias: from_alias.clone(),
            field: field.clone(),
            alias: alias.clone(),
        }
    }

    /// Create a LEFT JOIN through `from_alias.field`.
    pub fn left(from_alias: &Ident, field: &Ident, alias: &Ident) -> Self {
        Self {
            join_type: JoinType::Left,
            from_alias: from_alias.clone(),
            field: field.clone(),
            alias: alias.clone(),
        }
    }

    /// Render this JOIN clause (with a leading space).
    pub fn to_text(&self) -> String {
        format!(
            " {} {}.{} {}",
            self.join_type.as_str(),
            self.from_alias,
            self.field,
            self.alias
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Ident {
        Ident::new(s).unwrap()
    }

    #[test]
    fn left_join_text() {
        let join = Join::left(&ident("o"), &ident("items"), &ident("r"));
        assert_eq!(join.to_text(), " LEFT JOIN o.items r");
    }

    #[test]
    fn inner_join_text() {
        let join = Join::inner(&ident("r"), &ident("order"), &ident("o"));
        assert_eq!(join.join_type, JoinType::Inner);
        assert_eq!(join.to_text(), " INNER JOIN r.order o");
    }
}
