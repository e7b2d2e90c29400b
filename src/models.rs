use serde::Deserialize;
use serde_with::{NoneAsEmptyString, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Reserved query parameters of a resource endpoint.
///
/// Every other query parameter is read as a filter under the transport key of
/// a filterable field, i.e. the dotted field path with dots replaced by
/// underscores (`author.role` is sent as `author_role`).
///
/// # Search
/// `search` matches every searchable field, direct or related, with
/// `LIKE %text%`:
/// ```text
/// ?search=rust
/// ```
///
/// # Sorting
/// A comma-separated field list; a leading minus sorts that field descending:
/// ```text
/// ?sort=-created_at,title
/// ```
///
/// # Pagination
/// `offset` defaults to `0`, `limit` to the resource default. `limit=0`
/// returns every matching record:
/// ```text
/// ?offset=20&limit=10
/// ```
///
/// Empty values are treated as absent. `offset` and `limit` are kept as text
/// and parsed leniently, so a malformed number falls back to its default
/// instead of rejecting the request.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct QueryOptions {
    /// Free text matched against all searchable fields.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(example = "rust")]
    pub search: Option<String>,
    /// Comma-separated sort fields, `-` prefix for descending.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(example = "-created_at,title")]
    pub sort: Option<String>,
    /// Number of records to skip.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(example = "0")]
    pub offset: Option<String>,
    /// Page size; `0` disables the window.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(example = "20")]
    pub limit: Option<String>,
    /// Column used instead of the primary key when fetching a single record.
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    #[param(example = "slug")]
    pub use_as_id: Option<String>,
}

impl QueryOptions {
    /// Search text, if any was given.
    #[must_use]
    pub fn search_text(&self) -> &str {
        self.search.as_deref().unwrap_or_default()
    }
}
