//! Scope-tagged predicate groups produced by the search and filter composers
//! and lowered to SQL by [`crate::database::scope`].

use sea_orm::{ColumnType, Value};
use uuid::Uuid;

use super::field_path::{FieldPath, Scope};

/// Storage class of a queryable column, resolved once when the resource
/// descriptor is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Uuid,
    Text,
}

impl From<&ColumnType> for ColumnKind {
    fn from(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned => Self::Integer,
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => {
                Self::Float
            }
            ColumnType::Boolean => Self::Boolean,
            ColumnType::Uuid => Self::Uuid,
            _ => Self::Text,
        }
    }
}

impl ColumnKind {
    /// Parse a raw query-string value into a typed value for this column.
    ///
    /// Returns `None` when the text cannot represent a value of this kind.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<FilterValue> {
        let trimmed = raw.trim();
        match self {
            Self::Integer => trimmed.parse().ok().map(FilterValue::Int),
            Self::Float => trimmed.parse().ok().map(FilterValue::Float),
            Self::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "1" | "true" => Some(FilterValue::Bool(true)),
                "0" | "false" => Some(FilterValue::Bool(false)),
                _ => None,
            },
            Self::Uuid => Uuid::parse_str(trimmed).ok().map(FilterValue::Uuid),
            Self::Text => Some(FilterValue::Text(raw.to_string())),
        }
    }
}

/// A validated field path together with the kind of the column it ends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryField {
    pub path: FieldPath,
    pub kind: ColumnKind,
}

impl QueryField {
    #[must_use]
    pub const fn new(path: FieldPath, kind: ColumnKind) -> Self {
        Self { path, kind }
    }
}

/// A typed filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Uuid(Uuid),
    Text(String),
}

impl From<FilterValue> for Value {
    fn from(value: FilterValue) -> Self {
        match value {
            FilterValue::Int(v) => v.into(),
            FilterValue::Float(v) => v.into(),
            FilterValue::Bool(v) => v.into(),
            FilterValue::Uuid(v) => v.into(),
            FilterValue::Text(v) => v.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// `field = value`
    Equals(FilterValue),
    /// `field IN (values)`
    In(Vec<FilterValue>),
    /// `field LIKE '%needle%'`
    Contains(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub kind: ColumnKind,
    pub comparison: Comparison,
}

/// How the members of a group (or the groups of a set) are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    All,
    Any,
}

/// Comparisons on fields of one scope.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateGroup {
    pub scope: Scope,
    pub combinator: Combinator,
    pub predicates: Vec<Predicate>,
}

/// Predicate groups combined under a single top-level operator.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSet {
    pub combinator: Combinator,
    pub groups: Vec<PredicateGroup>,
}

impl PredicateSet {
    #[must_use]
    pub const fn new(combinator: Combinator) -> Self {
        Self {
            combinator,
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|group| group.predicates.is_empty())
    }

    /// Total number of comparisons across all groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.iter().map(|group| group.predicates.len()).sum()
    }

    /// All comparisons with their owning scope, in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&Scope, &Predicate)> {
        self.groups
            .iter()
            .flat_map(|group| group.predicates.iter().map(move |p| (&group.scope, p)))
    }
}
