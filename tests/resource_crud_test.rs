use axum::http::StatusCode;
use serde_json::{Value, json};

mod common;
use common::{get, send, setup_seeded_db, setup_test_app};

#[tokio::test]
async fn test_show_wraps_record_under_singular_key() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, body) = get(&app, "/api/v1/posts/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Async in practice");
    assert_eq!(body["post"]["author"]["name"], "Ada");
    assert_eq!(body["post"]["author"]["profile"]["bio"], "Writes about engines");
    // Single items never carry a cursor
    assert!(body.get("meta").is_none());
}

#[tokio::test]
async fn test_show_by_alternative_column() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, body) = get(&app, "/api/v1/posts/rust-ownership?use_as_id=slug").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["id"], 1);

    let (status, _) = get(&app, "/api/v1/posts/no-such-slug?use_as_id=slug").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&app, "/api/v1/posts/1?use_as_id=nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status_code"], 400);
}

#[tokio::test]
async fn test_show_missing_record() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    for uri in ["/api/v1/posts/999", "/api/v1/posts/not-a-number"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(
            body,
            json!({"error": {"messages": "Resource Not Found", "status_code": 404}})
        );
    }
}

#[tokio::test]
async fn test_store_creates_record() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let payload = json!({"post": {
        "title": "Lifetimes",
        "slug": "lifetimes",
        "status": 1,
        "author_id": 3
    }});
    let (status, body) = send(&app, "POST", "/api/v1/posts", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["id"], 6);
    assert_eq!(body["post"]["title"], "Lifetimes");
    assert_eq!(body["post"]["author"]["name"], "Grace");
    assert_eq!(body["post"]["author"]["profile"], Value::Null);

    let (_, body) = get(&app, "/api/v1/posts?search=lifetimes").await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_leaves_unsent_columns_to_database_defaults() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    // Neither the key nor status is sent; status defaults to 0 in the schema
    let payload = json!({"post": {"title": "Borrowing", "slug": "borrowing", "author_id": 2}});
    let (status, body) = send(&app, "POST", "/api/v1/posts", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["id"], 6);
    assert_eq!(body["post"]["status"], 0);
    assert_eq!(body["post"]["author"]["name"], "Linus");

    let (status, body) = get(&app, "/api/v1/posts/borrowing?use_as_id=slug").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Borrowing");
}

#[tokio::test]
async fn test_store_rejects_empty_payloads() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    for payload in [None, Some(json!({})), Some(json!({"post": {}})), Some(json!({"author": {"name": "x"}}))] {
        let (status, body) = send(&app, "POST", "/api/v1/posts", payload.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{payload:?}");
        assert_eq!(body["error"]["messages"], "Empty data");
    }
}

#[tokio::test]
async fn test_store_reports_validation_errors_per_field() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let payload = json!({"post": {"title": "  ", "status": 7, "author_id": 1}});
    let (status, body) = send(&app, "POST", "/api/v1/posts", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["status_code"], 400);

    let messages = &body["error"]["messages"];
    assert_eq!(messages["title"], json!(["This field is required"]));
    assert_eq!(messages["slug"], json!(["This field is required"]));
    assert_eq!(messages["status"], json!(["Must be at most 2"]));

    let (_, body) = get(&app, "/api/v1/posts?limit=0").await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_store_duplicate_is_conflict() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let payload = json!({"post": {
        "title": "Ownership again",
        "slug": "rust-ownership",
        "status": 0,
        "author_id": 1
    }});
    let (status, body) = send(&app, "POST", "/api/v1/posts", Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body,
        json!({"error": {"messages": "Resource already exists", "status_code": 409}})
    );
}

#[tokio::test]
async fn test_update_changes_only_sent_fields() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let payload = json!({"post": {"title": "Ownership, revisited"}});
    let (status, body) = send(&app, "PATCH", "/api/v1/posts/1", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Ownership, revisited");
    assert_eq!(body["post"]["slug"], "rust-ownership");
    assert_eq!(body["post"]["status"], 1);

    let payload = json!({"post": {"status": 2}});
    let (status, body) = send(&app, "PUT", "/api/v1/posts/1", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["post"]["title"], "Ownership, revisited");
    assert_eq!(body["post"]["status"], 2);
}

#[tokio::test]
async fn test_update_missing_record_is_checked_before_validation() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    // The title would fail validation, but the record does not exist
    let payload = json!({"post": {"title": ""}});
    let (status, _) = send(&app, "PUT", "/api/v1/posts/999", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "PUT", "/api/v1/posts/1", Some(payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["messages"]["title"], json!(["This field is required"]));
}

#[tokio::test]
async fn test_update_rejects_empty_payload() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, body) = send(&app, "PUT", "/api/v1/posts/1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["messages"], "Empty data");
}

#[tokio::test]
async fn test_update_into_duplicate_is_conflict() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let payload = json!({"post": {"slug": "draft-notes"}});
    let (status, _) = send(&app, "PATCH", "/api/v1/posts/1", Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_destroy_removes_record() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    let (status, body) = send(&app, "DELETE", "/api/v1/posts/4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "Deleted"}));

    let (status, _) = get(&app, "/api/v1/posts/4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/v1/posts/4", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_form_endpoints_are_not_implemented() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    for uri in ["/api/v1/posts/create", "/api/v1/posts/1/edit"] {
        let (status, body) = get(&app, uri).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED, "{uri}");
        assert_eq!(
            body,
            json!({"error": {"messages": "Not implemented", "status_code": 501}})
        );
    }
}

#[tokio::test]
async fn test_unsupported_methods_answer_with_error_envelope() {
    let db = setup_seeded_db().await.expect("Failed to setup test database");
    let app = setup_test_app(db);

    for (method, uri) in [
        ("DELETE", "/api/v1/posts"),
        ("POST", "/api/v1/posts/1"),
        ("PUT", "/api/v1/posts/create"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        assert_eq!(
            body,
            json!({"error": {"messages": "Method Not Allowed", "status_code": 405}})
        );
    }
}
