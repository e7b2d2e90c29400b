//! Dotted field identifiers (`relation.subrelation.field`) split into the scope
//! they live in and the terminal column name.

use indexmap::IndexMap;
use std::fmt;

/// A traversal path from the base entity to a related entity.
///
/// The root scope has no segments and addresses the base entity itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope(Vec<String>);

impl Scope {
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a scope from its dotted form. An empty string is the root scope.
    #[must_use]
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self(dotted.split('.').map(str::to_string).collect())
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// The scope made of the first `len` segments.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Every non-root prefix, shortest first: `a.b.c` yields `a`, `a.b`, `a.b.c`.
    pub fn prefixes(&self) -> impl Iterator<Item = Self> + '_ {
        (1..=self.0.len()).map(|len| self.prefix(len))
    }

    /// Last segment, i.e. the relation name relative to the parent scope.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// SQL alias owned by this scope. Derived from the full path so that two
    /// hops onto the same table never share an alias.
    #[must_use]
    pub fn alias(&self) -> String {
        format!("scope__{}", self.0.join("__"))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A scope plus the terminal field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    scope: Scope,
    field: String,
}

impl FieldPath {
    /// Split on the last dot: `author.profile.name` becomes scope
    /// `author.profile` and field `name`; `title` stays on the root scope.
    ///
    /// The empty string yields an empty field on the root scope, callers are
    /// expected to reject it via [`FieldPath::is_empty`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once('.') {
            Some((scope, field)) => Self {
                scope: Scope::parse(scope),
                field: field.to_string(),
            },
            None => Self {
                scope: Scope::root(),
                field: raw.to_string(),
            },
        }
    }

    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field.is_empty()
    }

    /// Query-string key carrying this field's filter value.
    ///
    /// Form encoders rewrite dots in parameter names to underscores, so
    /// `author.role` is read from `author_role`.
    #[must_use]
    pub fn transport_key(&self) -> String {
        self.to_string().replace('.', "_")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_root() {
            write!(f, "{}", self.field)
        } else {
            write!(f, "{}.{}", self.scope, self.field)
        }
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Group entries by the scope of their field path.
///
/// Scopes keep the order in which they were first seen, and so do the fields
/// inside each scope, so one sub-query is issued per scope.
pub fn group_by_scope<'a, T>(
    entries: impl IntoIterator<Item = (&'a FieldPath, T)>,
) -> IndexMap<&'a Scope, Vec<(&'a str, T)>> {
    let mut groups: IndexMap<&'a Scope, Vec<(&'a str, T)>> = IndexMap::new();
    for (path, value) in entries {
        groups
            .entry(path.scope())
            .or_default()
            .push((path.field(), value));
    }
    groups
}

/// [`group_by_scope`] for bare field lists.
pub fn group_fields<'a>(
    paths: impl IntoIterator<Item = &'a FieldPath>,
) -> IndexMap<&'a Scope, Vec<&'a str>> {
    group_by_scope(paths.into_iter().map(|path| (path, ())))
        .into_iter()
        .map(|(scope, fields)| (scope, fields.into_iter().map(|(field, ())| field).collect()))
        .collect()
}
