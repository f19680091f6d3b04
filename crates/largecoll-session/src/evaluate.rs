//! In-memory evaluation of bound object queries.
//!
//! Queries are evaluated straight from their structure, never from text:
//! the root entity is scanned in insertion order, each join follows the
//! recorded association links, then the WHERE clause filters the candidate
//! bindings. `LEFT JOIN` keeps a candidate with a NULL alias when the
//! association is empty, so `COUNT(r.id)` over an empty collection is 0.

use crate::Session;
use largecoll_core::{
    EntityMetadata, EntityName, Error, Ident, ObjectId, QueryError, QueryErrorKind, Result, Row,
    Value,
};
use largecoll_query::{AggregateFunc, BinaryOp, BoundQuery, Expr, Join, JoinType};

/// One alias binding inside a candidate row.
#[derive(Debug, Clone, Copy)]
struct Slot<'s> {
    alias: &'s Ident,
    entity: &'s EntityMetadata,
    object: Option<ObjectId>,
}

type Candidate<'s> = Vec<Slot<'s>>;

pub(crate) struct Evaluator<'s> {
    session: &'s Session,
    query: &'s BoundQuery,
}

impl<'s> Evaluator<'s> {
    pub(crate) fn new(session: &'s Session, query: &'s BoundQuery) -> Self {
        Self { session, query }
    }

    /// Evaluate an aggregate query down to its first select-list value.
    #[allow(clippy::result_large_err)]
    pub(crate) fn scalar(&self) -> Result<Value> {
        if !self.query.query().is_aggregate() {
            return Err(self.error(
                QueryErrorKind::Syntax,
                "scalar execution needs an aggregate select list",
            ));
        }
        let candidates = self.candidates()?;
        let row = self.aggregate_row(&candidates)?;
        Ok(row.get(0).cloned().unwrap_or(Value::Null))
    }

    /// Evaluate a query into result rows, honouring first/max results.
    #[allow(clippy::result_large_err)]
    pub(crate) fn rows(&self) -> Result<Vec<Row>> {
        let candidates = self.candidates()?;
        if self.query.query().is_aggregate() {
            return Ok(vec![self.aggregate_row(&candidates)?]);
        }

        let skip = self
            .query
            .first_result()
            .map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX));
        let take = self
            .query
            .max_results()
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        candidates
            .iter()
            .skip(skip)
            .take(take)
            .map(|candidate| self.project(candidate))
            .collect()
    }

    #[allow(clippy::result_large_err)]
    fn candidates(&self) -> Result<Vec<Candidate<'s>>> {
        self.query.check_bindings()?;
        let query = self.query.query();

        let root = self.entity(query.root())?;
        let mut candidates: Vec<Candidate<'s>> = self
            .session
            .identities()
            .iter_entity(root.name().as_str())
            .map(|(id, _)| {
                vec![Slot {
                    alias: query.root_alias(),
                    entity: root,
                    object: Some(id),
                }]
            })
            .collect();
        let mut bound: Vec<(&'s Ident, &'s EntityMetadata)> = vec![(query.root_alias(), root)];

        for join in query.joins() {
            let Some(&(_, from)) = bound.iter().find(|(alias, _)| *alias == &join.from_alias)
            else {
                return Err(self.error(
                    QueryErrorKind::Syntax,
                    format!("join starts from unbound alias {}", join.from_alias),
                ));
            };
            if bound.iter().any(|(alias, _)| *alias == &join.alias) {
                return Err(self.error(
                    QueryErrorKind::Syntax,
                    format!("alias {} is bound twice", join.alias),
                ));
            }
            let association = from.association(join.field.as_str()).ok_or_else(|| {
                self.error(
                    QueryErrorKind::NotFound,
                    format!("{} has no association {}", from.name(), join.field),
                )
            })?;
            let target = self.entity(&association.target_entity)?;
            bound.push((&join.alias, target));

            candidates = self.apply_join(candidates, join, target);
        }

        if let Some(where_clause) = query.where_clause() {
            let mut kept = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                if is_true(&self.eval(where_clause.expr(), &candidate)?) {
                    kept.push(candidate);
                }
            }
            candidates = kept;
        }

        tracing::trace!(matched = candidates.len(), "Evaluated query candidates");
        Ok(candidates)
    }

    fn apply_join(
        &self,
        candidates: Vec<Candidate<'s>>,
        join: &'s Join,
        target: &'s EntityMetadata,
    ) -> Vec<Candidate<'s>> {
        let mut out = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let related = lookup(&candidate, &join.from_alias)
                .and_then(|slot| slot.object)
                .map_or(&[][..], |from| self.session.related(from, &join.field));

            if related.is_empty() {
                if join.join_type == JoinType::Left {
                    let mut extended = candidate;
                    extended.push(Slot {
                        alias: &join.alias,
                        entity: target,
                        object: None,
                    });
                    out.push(extended);
                }
                continue;
            }

            for object in related {
                let mut extended = candidate.clone();
                extended.push(Slot {
                    alias: &join.alias,
                    entity: target,
                    object: Some(*object),
                });
                out.push(extended);
            }
        }
        out
    }

    #[allow(clippy::result_large_err)]
    fn eval(&self, expr: &Expr, candidate: &Candidate<'s>) -> Result<Value> {
        match expr {
            Expr::Path { alias, field } => {
                let slot = lookup(candidate, alias).ok_or_else(|| {
                    self.error(QueryErrorKind::Syntax, format!("unknown alias {alias}"))
                })?;
                Ok(self.field_value(slot, field))
            }
            Expr::Placeholder(position) => self.query.parameter(*position).cloned().ok_or_else(|| {
                self.error(
                    QueryErrorKind::UnboundParameter,
                    format!("placeholder ?{position} has no bound value"),
                )
            }),
            Expr::Binary { left, op, right } => {
                let left = self.eval(left, candidate)?;
                let right = self.eval(right, candidate)?;
                Ok(Value::Bool(match op {
                    BinaryOp::Eq => left.matches(&right),
                    BinaryOp::Ne => !left.is_null() && !right.is_null() && !left.matches(&right),
                    BinaryOp::And => is_true(&left) && is_true(&right),
                    BinaryOp::Or => is_true(&left) || is_true(&right),
                }))
            }
            Expr::Paren(inner) => self.eval(inner, candidate),
            Expr::Entity(_) | Expr::Aggregate { .. } => Err(self.error(
                QueryErrorKind::Syntax,
                format!("{} cannot be used as a value here", expr.to_text()),
            )),
        }
    }

    fn field_value(&self, slot: &Slot<'s>, field: &Ident) -> Value {
        let Some(managed) = slot.object.and_then(|id| self.session.identities().get(id)) else {
            return Value::Null;
        };
        if let Some(position) = slot.entity.identifier().iter().position(|f| f == field) {
            return managed.identifier().get(position).cloned().unwrap_or(Value::Null);
        }
        managed.field(field.as_str()).cloned().unwrap_or(Value::Null)
    }

    #[allow(clippy::result_large_err)]
    fn aggregate_row(&self, candidates: &[Candidate<'s>]) -> Result<Row> {
        let mut names = Vec::new();
        let mut values = Vec::new();

        for item in self.query.query().projection() {
            let Expr::Aggregate { func, arg } = &item.expr else {
                return Err(self.error(
                    QueryErrorKind::Syntax,
                    "cannot mix aggregates with plain select items",
                ));
            };
            let value = match func {
                AggregateFunc::Count => {
                    let mut count: i64 = 0;
                    for candidate in candidates {
                        if !self.eval(arg, candidate)?.is_null() {
                            count += 1;
                        }
                    }
                    Value::BigInt(count)
                }
            };
            names.push(column_name(&item.expr, item.alias.as_ref()));
            values.push(value);
        }

        Ok(Row::new(names, values))
    }

    #[allow(clippy::result_large_err)]
    fn project(&self, candidate: &Candidate<'s>) -> Result<Row> {
        let query = self.query.query();
        let mut names = Vec::new();
        let mut values = Vec::new();

        if query.projection().is_empty() {
            self.expand_entity(candidate, query.root_alias(), &mut names, &mut values)?;
            return Ok(Row::new(names, values));
        }

        for item in query.projection() {
            match &item.expr {
                Expr::Entity(alias) => {
                    self.expand_entity(candidate, alias, &mut names, &mut values)?;
                }
                expr => {
                    values.push(self.eval(expr, candidate)?);
                    names.push(column_name(expr, item.alias.as_ref()));
                }
            }
        }
        Ok(Row::new(names, values))
    }

    /// Identifier columns first, then the instance's other fields.
    #[allow(clippy::result_large_err)]
    fn expand_entity(
        &self,
        candidate: &Candidate<'s>,
        alias: &Ident,
        names: &mut Vec<String>,
        values: &mut Vec<Value>,
    ) -> Result<()> {
        let slot = lookup(candidate, alias)
            .ok_or_else(|| self.error(QueryErrorKind::Syntax, format!("unknown alias {alias}")))?;

        for field in slot.entity.identifier() {
            names.push(field.to_string());
            values.push(self.field_value(slot, field));
        }
        if let Some(managed) = slot.object.and_then(|id| self.session.identities().get(id)) {
            for (field, value) in managed.fields() {
                names.push(field.to_string());
                values.push(value.clone());
            }
        }
        Ok(())
    }

    #[allow(clippy::result_large_err)]
    fn entity(&self, name: &EntityName) -> Result<&'s EntityMetadata> {
        self.session.registry().get(name.as_str()).ok_or_else(|| {
            self.error(
                QueryErrorKind::NotFound,
                format!("entity {name} is not registered"),
            )
        })
    }

    fn error(&self, kind: QueryErrorKind, message: impl Into<String>) -> Error {
        Error::Query(QueryError::new(kind, message).with_query(self.query.text()))
    }
}

fn lookup<'a, 's>(candidate: &'a Candidate<'s>, alias: &Ident) -> Option<&'a Slot<'s>> {
    candidate.iter().find(|slot| slot.alias == alias)
}

fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn column_name(expr: &Expr, alias: Option<&Ident>) -> String {
    alias.map_or_else(|| expr.to_text(), ToString::to_string)
}
