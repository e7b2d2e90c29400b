//! # Query Composition
//!
//! Turns raw list-request parameters into scope-aware predicates, an ordered
//! sort specification and a page window. Everything in here is pure: nothing
//! touches the database until [`crate::database`] lowers the result.
//!
//! ## Query Parameter Examples
//!
//! ```rust,ignore
//! // Free-text search across every searchable field, direct or related
//! GET /posts?search=rust
//!
//! // Filters are read under the field path with dots as underscores
//! GET /posts?status=published&author_role=admin
//!
//! // Comma-separated values become IN (...)
//! GET /posts?id=1,2,3
//!
//! // Leading minus sorts descending, earlier keys take precedence
//! GET /posts?sort=-created_at,title
//!
//! // Window; limit=0 disables it
//! GET /posts?offset=20&limit=10
//! ```

pub mod conditions;
pub mod field_path;
pub mod pagination;
pub mod predicate;
pub mod search;
pub mod sort;

// Re-export commonly used items
pub use conditions::compose_filters;
pub use field_path::{FieldPath, Scope, group_by_scope, group_fields};
pub use pagination::{Limit, PageWindow, calculate_window};
pub use predicate::{
    ColumnKind, Combinator, Comparison, FilterValue, Predicate, PredicateGroup, PredicateSet,
    QueryField,
};
pub use search::compose_search;
pub use sort::{Direction, SortField, SortSpec, parse_sort};
