//! Per-resource configuration, validated once at startup.
//!
//! ```rust,ignore
//! let posts = ResourceDescriptor::<post::Entity>::builder("posts")
//!     .keys("post", "posts")
//!     .transformer(ModelTransformer::new().with_includes(["author", "author.profile"]))
//!     .relation::<author::Entity>("author", post::Relation::Author.def())
//!     .relation::<profile::Entity>("author.profile", author::Relation::Profile.def())
//!     .searchable(["title", "author.name"])
//!     .filterable(["id", "status", "author.role"])
//!     .default_limit(Limit::Bounded(20))
//!     .maximum_limit(Limit::Bounded(50))
//!     .build()?;
//! ```

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use sea_orm::{ColumnTrait, EntityTrait, IdenStatic, Iterable, RelationDef, Select};
use serde::Serialize;
use thiserror::Error;

use super::transformer::{ModelTransformer, Transformer};
use crate::database::{ScopeGraph, ScopeRelation};
use crate::filtering::{ColumnKind, FieldPath, Limit, PageWindow, QueryField, Scope, calculate_window};
use crate::validation::{AcceptAll, PayloadValidator};

/// Hook applied to every query of a resource before request conditions.
pub type QueryHook<E> = Arc<dyn Fn(Select<E>) -> Select<E> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("empty field path in the {list} list")]
    EmptyFieldPath { list: &'static str },

    #[error("unknown column '{column}' on '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("relation scope must not be empty")]
    EmptyRelationScope,

    #[error("no relation registered for scope '{0}'")]
    UnknownScope(String),

    #[error("unknown column '{column}' in scope '{scope}'")]
    UnknownRelatedColumn { scope: String, column: String },

    #[error("scope '{0}' is not an available include of the transformer")]
    ScopeNotIncluded(String),

    #[error("include '{0}' has no registered relation")]
    IncludeWithoutRelation(String),

    #[error("unknown sortable column '{0}'")]
    UnknownSortColumn(String),
}

/// Storage class of `name` on entity `R`, if `R` has such a column.
#[must_use]
pub fn column_kind_of<R: EntityTrait>(name: &str) -> Option<ColumnKind> {
    R::Column::from_str(name)
        .ok()
        .map(|column| ColumnKind::from(column.def().get_column_type()))
}

/// Everything the controller needs to serve one resource.
pub struct ResourceDescriptor<E: EntityTrait> {
    name: String,
    singular_key: String,
    plural_key: String,
    transformer: Arc<dyn Transformer<Model = E::Model>>,
    includes: Vec<Scope>,
    searchable: Vec<QueryField>,
    filterable: Vec<QueryField>,
    sortable: IndexMap<String, E::Column>,
    graph: ScopeGraph,
    default_limit: Limit,
    maximum_limit: Limit,
    validator: Arc<dyn PayloadValidator>,
    default_query: Option<QueryHook<E>>,
}

impl<E: EntityTrait> ResourceDescriptor<E> {
    pub fn builder(name: impl Into<String>) -> ResourceDescriptorBuilder<E>
    where
        E::Model: Serialize + 'static,
    {
        ResourceDescriptorBuilder {
            name: name.into(),
            singular_key: "data".to_string(),
            plural_key: "data".to_string(),
            transformer: Arc::new(ModelTransformer::<E::Model>::new()),
            searchable: Vec::new(),
            filterable: vec!["id".to_string()],
            sortable: None,
            relations: Vec::new(),
            default_limit: Limit::Unbounded,
            maximum_limit: Limit::Unbounded,
            validator: Arc::new(AcceptAll),
            default_query: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn singular_key(&self) -> &str {
        &self.singular_key
    }

    #[must_use]
    pub fn plural_key(&self) -> &str {
        &self.plural_key
    }

    #[must_use]
    pub fn transformer(&self) -> &dyn Transformer<Model = E::Model> {
        self.transformer.as_ref()
    }

    #[must_use]
    pub fn includes(&self) -> &[Scope] {
        &self.includes
    }

    #[must_use]
    pub fn searchable(&self) -> &[QueryField] {
        &self.searchable
    }

    #[must_use]
    pub fn filterable(&self) -> &[QueryField] {
        &self.filterable
    }

    /// Column allowed for sorting under `name`.
    #[must_use]
    pub fn sort_column(&self, name: &str) -> Option<E::Column> {
        self.sortable.get(name).copied()
    }

    pub fn sortable_names(&self) -> impl Iterator<Item = &str> {
        self.sortable.keys().map(String::as_str)
    }

    #[must_use]
    pub fn graph(&self) -> &ScopeGraph {
        &self.graph
    }

    #[must_use]
    pub fn validator(&self) -> &dyn PayloadValidator {
        self.validator.as_ref()
    }

    #[must_use]
    pub fn window(&self, raw_offset: Option<&str>, raw_limit: Option<&str>) -> PageWindow {
        calculate_window(raw_offset, raw_limit, self.default_limit, self.maximum_limit)
    }

    /// A fresh base query with the default-query hook applied.
    #[must_use]
    pub fn query(&self) -> Select<E> {
        let select = E::find();
        match &self.default_query {
            Some(hook) => hook(select),
            None => select,
        }
    }
}

impl<E: EntityTrait> std::fmt::Debug for ResourceDescriptor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("singular_key", &self.singular_key)
            .field("plural_key", &self.plural_key)
            .field("includes", &self.includes)
            .field("searchable", &self.searchable)
            .field("filterable", &self.filterable)
            .field("default_limit", &self.default_limit)
            .field("maximum_limit", &self.maximum_limit)
            .finish_non_exhaustive()
    }
}

pub struct ResourceDescriptorBuilder<E: EntityTrait> {
    name: String,
    singular_key: String,
    plural_key: String,
    transformer: Arc<dyn Transformer<Model = E::Model>>,
    searchable: Vec<String>,
    filterable: Vec<String>,
    sortable: Option<Vec<String>>,
    relations: Vec<(String, ScopeRelation)>,
    default_limit: Limit,
    maximum_limit: Limit,
    validator: Arc<dyn PayloadValidator>,
    default_query: Option<QueryHook<E>>,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl<E: EntityTrait> ResourceDescriptorBuilder<E> {
    /// Envelope keys for single items and collections.
    #[must_use]
    pub fn keys(mut self, singular: impl Into<String>, plural: impl Into<String>) -> Self {
        self.singular_key = singular.into();
        self.plural_key = plural.into();
        self
    }

    #[must_use]
    pub fn transformer<T>(mut self, transformer: T) -> Self
    where
        T: Transformer<Model = E::Model> + 'static,
    {
        self.transformer = Arc::new(transformer);
        self
    }

    #[must_use]
    pub fn searchable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable = strings(fields);
        self
    }

    #[must_use]
    pub fn filterable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filterable = strings(fields);
        self
    }

    /// Restrict sorting to these base columns. Without this every column of
    /// the entity is sortable.
    #[must_use]
    pub fn sortable<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortable = Some(strings(fields));
        self
    }

    /// Register the relation reached under `scope`. Nested scopes (`a.b`)
    /// take the relation from the entity of `a` to the entity of `b`.
    #[must_use]
    pub fn relation<R: EntityTrait>(mut self, scope: impl Into<String>, def: RelationDef) -> Self {
        self.relations.push((
            scope.into(),
            ScopeRelation {
                def,
                column_kind: column_kind_of::<R>,
            },
        ));
        self
    }

    #[must_use]
    pub fn default_limit(mut self, limit: Limit) -> Self {
        self.default_limit = limit;
        self
    }

    #[must_use]
    pub fn maximum_limit(mut self, limit: Limit) -> Self {
        self.maximum_limit = limit;
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl PayloadValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    #[must_use]
    pub fn default_query(
        mut self,
        hook: impl Fn(Select<E>) -> Select<E> + Send + Sync + 'static,
    ) -> Self {
        self.default_query = Some(Arc::new(hook));
        self
    }

    /// Validate every field path against the entity and its relations.
    ///
    /// # Errors
    ///
    /// A [`DescriptorError`] naming the first field, scope or include that
    /// cannot be resolved.
    pub fn build(self) -> Result<ResourceDescriptor<E>, DescriptorError> {
        let table = E::default().table_name().to_string();

        let mut graph = ScopeGraph::new(table.clone());
        for (raw, relation) in self.relations {
            let scope = Scope::parse(&raw);
            if scope.is_root() || scope.segments().iter().any(String::is_empty) {
                return Err(DescriptorError::EmptyRelationScope);
            }
            graph.insert(scope, relation);
        }

        let includes: Vec<Scope> = self
            .transformer
            .available_includes()
            .iter()
            .map(|raw| Scope::parse(raw))
            .collect();
        let mut reachable = HashSet::new();
        for include in &includes {
            for prefix in include.prefixes() {
                if !graph.contains(&prefix) {
                    return Err(DescriptorError::IncludeWithoutRelation(prefix.to_string()));
                }
                reachable.insert(prefix);
            }
        }

        let resolve = |list: &'static str, raw: &str| -> Result<QueryField, DescriptorError> {
            let path = FieldPath::parse(raw);
            if path.is_empty() {
                return Err(DescriptorError::EmptyFieldPath { list });
            }
            let scope = path.scope();
            let kind = if scope.is_root() {
                column_kind_of::<E>(path.field()).ok_or_else(|| DescriptorError::UnknownColumn {
                    table: table.clone(),
                    column: path.field().to_string(),
                })?
            } else {
                for prefix in scope.prefixes() {
                    if !graph.contains(&prefix) {
                        return Err(DescriptorError::UnknownScope(prefix.to_string()));
                    }
                }
                if !reachable.contains(scope) {
                    return Err(DescriptorError::ScopeNotIncluded(scope.to_string()));
                }
                graph
                    .related_column_kind(scope, path.field())
                    .ok_or_else(|| DescriptorError::UnknownRelatedColumn {
                        scope: scope.to_string(),
                        column: path.field().to_string(),
                    })?
            };
            Ok(QueryField::new(path, kind))
        };

        let searchable = self
            .searchable
            .iter()
            .map(|raw| resolve("searchable", raw))
            .collect::<Result<Vec<_>, _>>()?;
        let filterable = self
            .filterable
            .iter()
            .map(|raw| resolve("filterable", raw))
            .collect::<Result<Vec<_>, _>>()?;

        let sortable = match self.sortable {
            None => E::Column::iter()
                .map(|column| (column.as_str().to_string(), column))
                .collect(),
            Some(names) => names
                .into_iter()
                .map(|name| match E::Column::from_str(&name) {
                    Ok(column) => Ok((name, column)),
                    Err(_) => Err(DescriptorError::UnknownSortColumn(name)),
                })
                .collect::<Result<IndexMap<_, _>, _>>()?,
        };

        tracing::debug!(
            resource = %self.name,
            searchable = ?searchable.iter().map(|f| f.path.to_string()).collect::<Vec<_>>(),
            filterable = ?filterable.iter().map(|f| f.path.to_string()).collect::<Vec<_>>(),
            includes = includes.len(),
            "Resource descriptor built"
        );

        Ok(ResourceDescriptor {
            name: self.name,
            singular_key: self.singular_key,
            plural_key: self.plural_key,
            transformer: self.transformer,
            includes,
            searchable,
            filterable,
            sortable,
            graph,
            default_limit: self.default_limit,
            maximum_limit: self.maximum_limit,
            validator: self.validator,
            default_query: self.default_query,
        })
    }
}
