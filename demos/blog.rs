//! Two related resources served by generic controllers.
//!
//! ```bash
//! RUST_LOG=restcrate=debug cargo run --example blog
//! ```
//!
//! Then try:
//! - <http://localhost:3000/posts?search=rust&sort=-id&limit=10>
//! - <http://localhost:3000/posts?author_role=admin&status=1,2>
//! - <http://localhost:3000/authors/1>

use std::env;

use axum::Router;
use restcrate::filtering::Limit;
use restcrate::validation::validators::{validate_length, validate_required};
use restcrate::{ApiController, ModelTransformer, PayloadValidator, ResourceDescriptor, ValidationErrors};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, RelationTrait, Schema};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

mod author {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
    #[sea_orm(table_name = "authors")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        pub role: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::post::Entity")]
        Posts,
    }

    impl Related<super::post::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Posts.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

mod post {
    use sea_orm::entity::prelude::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
    #[sea_orm(table_name = "posts")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub title: String,
        #[sea_orm(unique)]
        pub slug: String,
        pub status: i32,
        pub author_id: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::author::Entity",
            from = "Column::AuthorId",
            to = "super::author::Column::Id"
        )]
        Author,
    }

    impl Related<super::author::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Author.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

struct PostRules;

impl PayloadValidator for PostRules {
    fn rules_for_create(&self, payload: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let title = payload.get("title").and_then(Value::as_str).unwrap_or_default();
        errors.check(validate_required("title", title));
        errors.check(validate_length("title", title, None, Some(200)));
        errors.result()
    }
}

async fn create_schema<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), sea_orm::DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(schema.create_table_from_entity(entity).if_not_exists()))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let db: DatabaseConnection = Database::connect(&database_url).await?;
    create_schema(&db, author::Entity).await?;
    create_schema(&db, post::Entity).await?;

    let posts = ResourceDescriptor::<post::Entity>::builder("posts")
        .keys("post", "posts")
        .transformer(ModelTransformer::new().with_includes(["author"]))
        .relation::<author::Entity>("author", post::Relation::Author.def())
        .searchable(["title", "author.name"])
        .filterable(["id", "status", "author.role"])
        .default_limit(Limit::Bounded(20))
        .maximum_limit(Limit::Bounded(100))
        .validator(PostRules)
        .build()?;

    let authors = ResourceDescriptor::<author::Entity>::builder("authors")
        .keys("author", "authors")
        .transformer(ModelTransformer::new().with_includes(["posts"]))
        .relation::<post::Entity>("posts", author::Relation::Posts.def())
        .searchable(["name", "posts.title"])
        .filterable(["id", "role"])
        .sortable(["id", "name"])
        .build()?;

    let app = Router::new()
        .nest("/posts", ApiController::new(posts, db.clone()).router())
        .nest("/authors", ApiController::new(authors, db).router());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(address = %bind_addr, "Serving /posts and /authors");
    axum::serve(listener, app).await?;
    Ok(())
}
