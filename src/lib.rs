//! Generic REST resources on top of sea-orm and axum.
//!
//! A [`ResourceDescriptor`] declares what clients may search, filter, sort and
//! include for one entity; an [`ApiController`] serves it as a JSON router with
//! list, show, store, update and destroy.
//!
//! ```rust,ignore
//! let posts = ResourceDescriptor::<post::Entity>::builder("posts")
//!     .keys("post", "posts")
//!     .transformer(ModelTransformer::new().with_includes(["author"]))
//!     .relation::<author::Entity>("author", post::Relation::Author.def())
//!     .searchable(["title", "author.name"])
//!     .filterable(["id", "status", "author.role"])
//!     .default_limit(Limit::Bounded(20))
//!     .maximum_limit(Limit::Bounded(100))
//!     .build()?;
//!
//! let app = Router::new().nest("/posts", ApiController::new(posts, db).router());
//! ```

pub mod core;
pub mod database;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod response;
pub mod validation;

pub use self::core::{ApiController, ModelTransformer, ResourceDescriptor, Transformer};
pub use errors::ApiError;
pub use filtering::Limit;
pub use models::QueryOptions;
pub use response::{ApiResponse, Cursor, Envelope};
pub use serde_with;
pub use validation::{PayloadValidator, ValidationErrors};
