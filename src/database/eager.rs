//! Eager loading of related records for the includes a transformer declares.
//!
//! Each relation hop costs one query, `SELECT * FROM related WHERE key IN
//! (...)`, regardless of how many parent records there are. Rows are fetched
//! as JSON, matched back to their parents by key and attached under the name
//! of the last scope segment, so `author.profile` ends up as
//! `included["author"]["profile"]`.

use std::collections::HashMap;
use std::str::FromStr;

use indexmap::IndexMap;
use sea_orm::{
    ConnectionTrait, DbErr, EntityTrait, FromQueryResult, Identity, JsonValue, ModelTrait,
    RelationType, Value,
    sea_query::{Asterisk, Expr, Query},
};
use serde_json::Map;

use super::scope::{ScopeGraph, ScopeRelation, table_iden};
use crate::filtering::Scope;

/// Related records loaded for one parent, keyed by top-level include name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Included(Map<String, JsonValue>);

impl Included {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.0.get(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    #[must_use]
    pub fn into_inner(self) -> Map<String, JsonValue> {
        self.0
    }
}

impl From<Map<String, JsonValue>> for Included {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// Every include plus its parent scopes, parents first.
fn load_order(includes: &[Scope]) -> Vec<Scope> {
    let mut order: Vec<Scope> = Vec::new();
    for include in includes {
        for prefix in include.prefixes() {
            if !order.contains(&prefix) {
                order.push(prefix);
            }
        }
    }
    order.sort_by_key(Scope::depth);
    order
}

/// Only single-column keys can be matched back.
fn unary(identity: &Identity, scope: &Scope) -> Result<String, DbErr> {
    match identity {
        Identity::Unary(column) => Ok(column.to_string()),
        _ => Err(DbErr::Custom(format!(
            "Cannot eager load '{scope}': composite relation keys are not supported"
        ))),
    }
}

/// Normalized key used to match rows, so `5` and `"5"` pair up across
/// drivers.
fn json_key(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::TinyInt(Some(v)) => Some(v.to_string()),
        Value::SmallInt(Some(v)) => Some(v.to_string()),
        Value::Int(Some(v)) => Some(v.to_string()),
        Value::BigInt(Some(v)) => Some(v.to_string()),
        Value::TinyUnsigned(Some(v)) => Some(v.to_string()),
        Value::SmallUnsigned(Some(v)) => Some(v.to_string()),
        Value::Unsigned(Some(v)) => Some(v.to_string()),
        Value::BigUnsigned(Some(v)) => Some(v.to_string()),
        Value::String(Some(v)) => Some(v.to_string()),
        Value::Uuid(Some(v)) => Some(v.to_string()),
        _ => None,
    }
}

fn json_to_value(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .map(Value::from)
            .or_else(|| n.as_u64().map(Value::from)),
        JsonValue::String(s) => Some(Value::from(s.clone())),
        _ => None,
    }
}

/// Key values of a set of parents, deduplicated by normalized key.
fn distinct(values: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|value| value_key(value).is_some_and(|key| seen.insert(key)))
        .collect()
}

async fn fetch<C: ConnectionTrait>(
    db: &C,
    relation: &ScopeRelation,
    to_col: &str,
    keys: Vec<Value>,
) -> Result<Vec<Map<String, JsonValue>>, DbErr> {
    if keys.is_empty() {
        return Ok(Vec::new());
    }
    let table = table_iden(&relation.def.to_tbl)?;
    let statement = Query::select()
        .column(Asterisk)
        .from(table.clone())
        .and_where(Expr::col((table, sea_orm::sea_query::Alias::new(to_col))).is_in(keys))
        .to_owned();

    let rows = JsonValue::find_by_statement(db.get_database_backend().build(&statement))
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            JsonValue::Object(map) => Some(map),
            _ => None,
        })
        .collect())
}

/// Children matching `key`, rendered the way the relation renders.
fn related_value(
    key: Option<&str>,
    rel_type: &RelationType,
    to_col: &str,
    children: &[Map<String, JsonValue>],
) -> JsonValue {
    let matches = children.iter().filter(|child| {
        key.is_some() && child.get(to_col).and_then(json_key).as_deref() == key
    });
    match rel_type {
        RelationType::HasMany => JsonValue::Array(matches.cloned().map(JsonValue::Object).collect()),
        RelationType::HasOne => matches
            .cloned()
            .next()
            .map_or(JsonValue::Null, JsonValue::Object),
    }
}

fn attach(
    parent: &mut Map<String, JsonValue>,
    name: &str,
    rel_type: &RelationType,
    from_col: &str,
    to_col: &str,
    children: &[Map<String, JsonValue>],
) {
    let key = parent.get(from_col).and_then(json_key);
    let value = related_value(key.as_deref(), rel_type, to_col, children);
    parent.insert(name.to_string(), value);
}

/// Load `includes` for `models`, returning one [`Included`] per model in the
/// same order.
///
/// # Errors
///
/// Database errors, an include without a registered relation, or a relation
/// with a composite key.
pub async fn load_includes<E, C>(
    db: &C,
    graph: &ScopeGraph,
    includes: &[Scope],
    models: &[E::Model],
) -> Result<Vec<Included>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    if includes.is_empty() || models.is_empty() {
        return Ok(vec![Included::default(); models.len()]);
    }

    let order = load_order(includes);
    let mut loaded: IndexMap<Scope, Vec<Map<String, JsonValue>>> = IndexMap::new();

    // Top-down: every hop needs the keys of the previous one
    for scope in &order {
        let relation = graph
            .relation(scope)
            .ok_or_else(|| DbErr::Custom(format!("No relation registered for include '{scope}'")))?;
        let from_col = unary(&relation.def.from_col, scope)?;
        let to_col = unary(&relation.def.to_col, scope)?;

        let keys = if scope.depth() == 1 {
            let column = E::Column::from_str(&from_col).map_err(|_| {
                DbErr::Custom(format!("Unknown column '{from_col}' for include '{scope}'"))
            })?;
            distinct(models.iter().map(|model| model.get(column)))
        } else {
            let parent = scope.prefix(scope.depth() - 1);
            distinct(
                loaded
                    .get(&parent)
                    .into_iter()
                    .flatten()
                    .filter_map(|row| row.get(&from_col).and_then(json_to_value)),
            )
        };

        let rows = fetch(db, relation, &to_col, keys).await?;
        tracing::debug!(include = %scope, rows = rows.len(), "Loaded include");
        loaded.insert(scope.clone(), rows);
    }

    // Bottom-up: nest deeper scopes into their parent rows
    for scope in order.iter().rev().filter(|s| s.depth() > 1) {
        let Some(relation) = graph.relation(scope) else { continue };
        let from_col = unary(&relation.def.from_col, scope)?;
        let to_col = unary(&relation.def.to_col, scope)?;
        let name = scope.last().unwrap_or_default().to_string();
        let children = loaded.get(scope).cloned().unwrap_or_default();
        let parent = scope.prefix(scope.depth() - 1);
        if let Some(parents) = loaded.get_mut(&parent) {
            for row in parents.iter_mut() {
                attach(row, &name, &relation.def.rel_type, &from_col, &to_col, &children);
            }
        }
    }

    // Finally the top-level includes onto each model
    let mut by_model: Vec<Included> = Vec::with_capacity(models.len());
    let mut columns: HashMap<Scope, (E::Column, String, &RelationType)> = HashMap::new();
    for scope in order.iter().filter(|s| s.depth() == 1) {
        if let Some(relation) = graph.relation(scope) {
            let from_col = unary(&relation.def.from_col, scope)?;
            let to_col = unary(&relation.def.to_col, scope)?;
            if let Ok(column) = E::Column::from_str(&from_col) {
                columns.insert(scope.clone(), (column, to_col, &relation.def.rel_type));
            }
        }
    }

    for model in models {
        let mut included = Map::new();
        for scope in order.iter().filter(|s| s.depth() == 1) {
            let Some((column, to_col, rel_type)) = columns.get(scope) else { continue };
            let key = value_key(&model.get(*column));
            let children = loaded.get(scope).map(Vec::as_slice).unwrap_or_default();
            let value = related_value(key.as_deref(), rel_type, to_col, children);
            included.insert(scope.last().unwrap_or_default().to_string(), value);
        }
        by_model.push(Included(included));
    }

    Ok(by_model)
}
