#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use restcrate::filtering::Limit;
use restcrate::validation::validators::{validate_length, validate_range, validate_required};
use restcrate::{ApiController, ModelTransformer, PayloadValidator, ResourceDescriptor, ValidationErrors};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, RelationTrait, Set};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use tower::ServiceExt;

pub mod author;
pub mod post;
pub mod profile;

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;

    Ok(db)
}

/// Database with three authors, two profiles and five posts.
///
/// | post | title | status | author |
/// |---|---|---|---|
/// | 1 | Rust ownership | 1 | Ada (admin) |
/// | 2 | Async in practice | 0 | Ada (admin) |
/// | 3 | Filesystems 100% done | 1 | Linus (editor) |
/// | 4 | Draft notes | 0 | Linus (editor) |
/// | 5 | Memory models | 2 | Ada (admin) |
///
/// Grace (admin) has neither posts nor a profile.
pub async fn setup_seeded_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_test_db().await?;

    for (name, role) in [("Ada", "admin"), ("Linus", "editor"), ("Grace", "admin")] {
        author::ActiveModel {
            name: Set(name.to_string()),
            role: Set(role.to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
    }

    for (author_id, bio) in [(1, "Writes about engines"), (2, "Kernel hacker")] {
        profile::ActiveModel {
            author_id: Set(author_id),
            bio: Set(bio.to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await?;
    }

    for (title, slug, status, author_id) in [
        ("Rust ownership", "rust-ownership", 1, 1),
        ("Async in practice", "async-in-practice", 0, 1),
        ("Filesystems 100% done", "filesystems", 1, 2),
        ("Draft notes", "draft-notes", 0, 2),
        ("Memory models", "memory-models", 2, 1),
    ] {
        post::ActiveModel {
            title: Set(title.to_string()),
            slug: Set(slug.to_string()),
            status: Set(status),
            author_id: Set(author_id),
            ..Default::default()
        }
        .insert(&db)
        .await?;
    }

    Ok(db)
}

/// Title and slug are required on create; a title sent on update must not
/// be blank either.
pub struct PostRules;

impl PostRules {
    fn check_shape(payload: &Value, errors: &mut ValidationErrors) {
        if let Some(title) = payload.get("title").and_then(Value::as_str) {
            errors.check(validate_length("title", title, None, Some(100)));
        }
        if let Some(status) = payload.get("status").and_then(Value::as_i64) {
            errors.check(validate_range("status", status, Some(0), Some(2)));
        }
    }
}

impl PayloadValidator for PostRules {
    fn rules_for_create(&self, payload: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for field in ["title", "slug"] {
            let value = payload.get(field).and_then(Value::as_str).unwrap_or_default();
            errors.check(validate_required(field, value));
        }
        Self::check_shape(payload, &mut errors);
        errors.result()
    }

    fn rules_for_update(&self, _id: &str, payload: &Value) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(title) = payload.get("title").and_then(Value::as_str) {
            errors.check(validate_required("title", title));
        }
        Self::check_shape(payload, &mut errors);
        errors.result()
    }
}

pub fn posts_descriptor() -> ResourceDescriptor<post::Entity> {
    ResourceDescriptor::builder("posts")
        .keys("post", "posts")
        .transformer(ModelTransformer::new().with_includes(["author", "author.profile"]))
        .relation::<author::Entity>("author", post::Relation::Author.def())
        .relation::<profile::Entity>("author.profile", author::Relation::Profile.def())
        .searchable(["title", "author.name", "author.profile.bio"])
        .filterable(["id", "status", "author_id", "author.role"])
        .sortable(["id", "title", "status", "author_id"])
        .default_limit(Limit::Bounded(20))
        .maximum_limit(Limit::Bounded(50))
        .validator(PostRules)
        .build()
        .expect("posts descriptor is valid")
}

pub fn authors_descriptor() -> ResourceDescriptor<author::Entity> {
    ResourceDescriptor::builder("authors")
        .keys("author", "authors")
        .transformer(ModelTransformer::new().with_includes(["posts", "profile"]))
        .relation::<post::Entity>("posts", author::Relation::Posts.def())
        .relation::<profile::Entity>("profile", author::Relation::Profile.def())
        .searchable(["name", "posts.title"])
        .filterable(["id", "role"])
        .build()
        .expect("authors descriptor is valid")
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let posts = ApiController::new(posts_descriptor(), db.clone());
    let authors = ApiController::new(authors_descriptor(), db);

    Router::new()
        .nest("/api/v1/posts", posts.router())
        .nest("/api/v1/authors", authors.router())
}

/// Send one request and decode the JSON body (`Null` when empty).
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |json| Body::from(json.to_string())))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

/// Titles of a list response, in response order.
pub fn titles(body: &Value) -> Vec<String> {
    body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["title"].as_str().unwrap().to_string())
        .collect()
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateBlogTables)]
    }
}

pub struct CreateBlogTables;

impl MigrationName for CreateBlogTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_blog_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateBlogTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Authors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Authors::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Authors::Name).string().not_null())
                    .col(ColumnDef::new(Authors::Role).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Profiles::AuthorId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Profiles::Bio).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Posts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Posts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Posts::Title).string().not_null())
                    .col(ColumnDef::new(Posts::Slug).string().not_null().unique_key())
                    .col(ColumnDef::new(Posts::Status).integer().not_null().default(0))
                    .col(ColumnDef::new(Posts::AuthorId).integer().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Posts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Authors::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Authors {
    Table,
    Id,
    Name,
    Role,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    AuthorId,
    Bio,
}

#[derive(DeriveIden)]
enum Posts {
    Table,
    Id,
    Title,
    Slug,
    Status,
    AuthorId,
}
