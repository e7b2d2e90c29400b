//! Lowering of scope-tagged predicates to `sea-orm` conditions.
//!
//! Root predicates are bound to the base table. A predicate group on scope
//! `a.b` becomes nested correlated subqueries:
//!
//! ```sql
//! EXISTS (SELECT 1 FROM authors AS scope__author
//!         WHERE scope__author.id = posts.author_id
//!           AND EXISTS (SELECT 1 FROM profiles AS scope__author__profile
//!                       WHERE scope__author__profile.author_id = scope__author.id
//!                         AND (<group>)))
//! ```
//!
//! The owning table of every comparison is read from the scope tag of its
//! group, never from the surrounding query.

use indexmap::IndexMap;
use sea_orm::{
    Condition, DatabaseBackend, DbErr, Identity, RelationDef, Value,
    sea_query::{Alias, DynIden, Expr, Query, SimpleExpr, TableRef},
};

use crate::filtering::search::escape_like_wildcards;
use crate::filtering::{
    ColumnKind, Combinator, Comparison, Predicate, PredicateGroup, PredicateSet, Scope,
};

/// Looks up the storage class of a column by name on one entity.
pub type ColumnKindLookup = fn(&str) -> Option<ColumnKind>;

/// A relation reachable under a scope, plus the column lookup of the entity it
/// ends on.
pub struct ScopeRelation {
    pub def: RelationDef,
    pub(crate) column_kind: ColumnKindLookup,
}

impl std::fmt::Debug for ScopeRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeRelation")
            .field("rel_type", &self.def.rel_type)
            .field("to_tbl", &self.def.to_tbl)
            .finish_non_exhaustive()
    }
}

/// The base table and every relation reachable from it, keyed by scope.
#[derive(Debug)]
pub struct ScopeGraph {
    base_table: String,
    relations: IndexMap<Scope, ScopeRelation>,
}

impl ScopeGraph {
    pub fn new(base_table: impl Into<String>) -> Self {
        Self {
            base_table: base_table.into(),
            relations: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn base_table(&self) -> &str {
        &self.base_table
    }

    pub(crate) fn insert(&mut self, scope: Scope, relation: ScopeRelation) {
        self.relations.insert(scope, relation);
    }

    #[must_use]
    pub fn relation(&self, scope: &Scope) -> Option<&ScopeRelation> {
        self.relations.get(scope)
    }

    #[must_use]
    pub fn contains(&self, scope: &Scope) -> bool {
        self.relations.contains_key(scope)
    }

    /// Column kind of `field` on the entity at the end of `scope`.
    #[must_use]
    pub fn related_column_kind(&self, scope: &Scope, field: &str) -> Option<ColumnKind> {
        self.relation(scope).and_then(|rel| (rel.column_kind)(field))
    }

    /// Table or alias that owns the columns of `scope`.
    fn owner(&self, scope: &Scope) -> String {
        if scope.is_root() {
            self.base_table.clone()
        } else {
            scope.alias()
        }
    }

    /// Lower a predicate set into a single condition.
    ///
    /// # Errors
    ///
    /// `DbErr::Custom` when a scope has no registered relation or its relation
    /// targets something other than a plain table.
    pub fn lower(&self, set: &PredicateSet, backend: DatabaseBackend) -> Result<Condition, DbErr> {
        let mut condition = combine(set.combinator);
        for group in set.groups.iter().filter(|g| !g.predicates.is_empty()) {
            let inner = self.lower_group(group, backend);
            condition = if group.scope.is_root() {
                condition.add(inner)
            } else {
                condition.add(self.exists_in_scope(&group.scope, inner)?)
            };
        }
        Ok(condition)
    }

    fn lower_group(&self, group: &PredicateGroup, backend: DatabaseBackend) -> Condition {
        let owner = self.owner(&group.scope);
        group
            .predicates
            .iter()
            .fold(combine(group.combinator), |condition, predicate| {
                condition.add(lower_predicate(&owner, predicate, backend))
            })
    }

    /// Wrap `inner` into one `EXISTS` per scope segment, innermost first.
    fn exists_in_scope(&self, scope: &Scope, inner: Condition) -> Result<Condition, DbErr> {
        let mut condition = inner;
        for depth in (1..=scope.depth()).rev() {
            let current = scope.prefix(depth);
            let parent = scope.prefix(depth - 1);
            let relation = self
                .relation(&current)
                .ok_or_else(|| DbErr::Custom(format!("No relation registered for scope '{current}'")))?;

            let alias = Alias::new(current.alias());
            let parent_owner = Alias::new(self.owner(&parent));

            let mut correlated = Condition::all();
            for (to_col, from_col) in columns(&relation.def.to_col)
                .into_iter()
                .zip(columns(&relation.def.from_col))
            {
                correlated = correlated.add(
                    Expr::col((alias.clone(), to_col)).equals((parent_owner.clone(), from_col)),
                );
            }

            let subquery = Query::select()
                .expr(Expr::val(1))
                .from_as(table_iden(&relation.def.to_tbl)?, alias)
                .cond_where(correlated.add(condition))
                .to_owned();

            condition = Condition::all().add(Expr::exists(subquery));
        }
        Ok(condition)
    }
}

fn combine(combinator: Combinator) -> Condition {
    match combinator {
        Combinator::All => Condition::all(),
        Combinator::Any => Condition::any(),
    }
}

fn lower_predicate(owner: &str, predicate: &Predicate, backend: DatabaseBackend) -> SimpleExpr {
    let column = Expr::col((Alias::new(owner), Alias::new(predicate.field.as_str())));
    match &predicate.comparison {
        Comparison::Equals(value) => column.eq(Value::from(value.clone())),
        Comparison::In(values) => column.is_in(values.iter().cloned().map(Value::from)),
        Comparison::Contains(needle) => {
            // Postgres refuses LIKE on non-text columns
            let target: SimpleExpr =
                if backend == DatabaseBackend::Postgres && predicate.kind != ColumnKind::Text {
                    Expr::cast_as(column, Alias::new("TEXT"))
                } else {
                    column.into()
                };
            // Both sides fold through the same SQL function so the database
            // decides what case-insensitive means
            let pattern = format!("%{}%", escape_like_wildcards(needle));
            Expr::cust_with_exprs(
                "UPPER($1) LIKE UPPER($2) ESCAPE $3",
                [target, Expr::val(pattern).into(), Expr::val("\\").into()],
            )
        }
    }
}

/// Columns of a relation key, in declaration order.
pub(crate) fn columns(identity: &Identity) -> Vec<DynIden> {
    match identity {
        Identity::Unary(a) => vec![a.clone()],
        Identity::Binary(a, b) => vec![a.clone(), b.clone()],
        Identity::Ternary(a, b, c) => vec![a.clone(), b.clone(), c.clone()],
        Identity::Many(cols) => cols.clone(),
    }
}

/// Plain table name of a relation target.
pub(crate) fn table_iden(table: &TableRef) -> Result<DynIden, DbErr> {
    match table {
        TableRef::Table(name)
        | TableRef::TableAlias(name, _)
        | TableRef::SchemaTable(_, name)
        | TableRef::SchemaTableAlias(_, name, _) => Ok(name.clone()),
        other => Err(DbErr::Custom(format!(
            "Unsupported relation target {other:?}"
        ))),
    }
}
