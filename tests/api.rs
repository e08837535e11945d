//! End-to-end checks of the catalog API through the assembled router.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use shelf_db::Database;
use shelf_kernel::settings::Settings;
use tower::ServiceExt;

async fn catalog_app() -> Router {
    let db = Database::in_memory().await.unwrap();
    let settings = Settings::default();
    let registry = shelf_app::app::prepare(&db, &settings).await.unwrap();
    shelf_http::build_router(&registry, &settings)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}

async fn create(app: &Router, uri: &str, body: Value) -> Value {
    let (status, created) = send(app, Method::POST, uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_and_docs_are_served() {
    let app = catalog_app().await;

    let (status, body) = send(&app, Method::GET, "/healthz", None).await;
    assert_eq!((status, body), (StatusCode::OK, json!("ok")));

    let (status, _) = send(&app, Method::GET, "/api/v1/books/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, doc) = send(&app, Method::GET, "/docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/books/{id}"].is_object());
    assert!(doc["paths"]["/api/v1/genres/{id}/books"].is_object());
    assert!(doc["components"]["schemas"]["BookPage"].is_object());
}

#[tokio::test]
async fn genre_names_collide_ignoring_case() {
    let app = catalog_app().await;
    create(&app, "/api/v1/genres", json!({ "name": "horror" })).await;

    let (status, body) = send(&app, Method::POST, "/api/v1/genres", Some(json!({ "name": "Horror" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "duplicate");
    assert!(body["error"]["trace_id"].is_string());
}

#[tokio::test]
async fn book_lifecycle() {
    let app = catalog_app().await;
    let horror = create(&app, "/api/v1/genres", json!({ "name": "Horror" })).await;
    let king = create(&app, "/api/v1/contributors", json!({ "full_name": "Stephen King" })).await;

    let book = create(
        &app,
        "/api/v1/books",
        json!({
            "title": "The Shining",
            "rating": 8.7,
            "published_year": 1977,
            "genre_ids": [id_of(&horror)],
            "contributors": [
                { "contributor_id": id_of(&king), "role": "author" },
                { "contributor_id": id_of(&king), "role": "editor" }
            ]
        }),
    )
    .await;
    assert_eq!(book["genres"][0]["name"], "Horror");
    assert_eq!(book["contributors"].as_array().unwrap().len(), 2);
    assert_eq!(book["rating"], 8.7);

    let uri = format!("/api/v1/books/{}", id_of(&book));
    let (status, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, book);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "rating": null, "description": "Overlook Hotel", "genre_ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "The Shining");
    assert_eq!(updated["rating"], Value::Null);
    assert_eq!(updated["description"], "Overlook Hotel");
    assert_eq!(updated["published_year"], 1977);
    assert_eq!(updated["genres"], json!([]));
    assert_eq!(updated["contributors"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!((status, body), (StatusCode::NO_CONTENT, Value::Null));

    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/genres/{}", id_of(&horror)), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn bad_requests_use_the_error_envelope() {
    let app = catalog_app().await;

    let (status, body) = send(&app, Method::GET, "/api/v1/books/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(json!({ "title": "Dune", "rating": 12.0, "published_year": 1200 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 2);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(json!({ "title": "Dune", "contributors": [{ "contributor_id": "0190f1c2-8a3b-7c4d-9e5f-0a1b2c3d4e5f", "role": "narrator" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = send(&app, Method::GET, "/api/v1/books?page=0&page_size=500&sort=author", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn unknown_references_are_listed_together() {
    let app = catalog_app().await;
    let ghost_genre = "0190f1c2-8a3b-7c4d-9e5f-0a1b2c3d4e5f";
    let ghost_person = "0190f1c2-8a3b-7c4d-9e5f-0a1b2c3d4e60";

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(json!({
            "title": "Nowhere",
            "genre_ids": [ghost_genre],
            "contributors": [{ "contributor_id": ghost_person, "role": "author" }]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "reference_not_found");
    assert_eq!(
        body["error"]["details"],
        json!([
            { "entity": "genre", "id": ghost_genre },
            { "entity": "contributor", "id": ghost_person }
        ])
    );

    let (_, page) = send(&app, Method::GET, "/api/v1/books", None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn search_filters_and_pages() {
    let app = catalog_app().await;
    let g1 = id_of(&create(&app, "/api/v1/genres", json!({ "name": "Horror" })).await);
    let g2 = id_of(&create(&app, "/api/v1/genres", json!({ "name": "Thriller" })).await);
    let g3 = id_of(&create(&app, "/api/v1/genres", json!({ "name": "Adventure" })).await);

    create(
        &app,
        "/api/v1/books",
        json!({ "title": "The Terror", "genre_ids": [g1, g2, g3], "published_year": 2007 }),
    )
    .await;
    create(&app, "/api/v1/books", json!({ "title": "It", "genre_ids": [g1], "published_year": 1986 })).await;
    for n in 1..=23 {
        create(&app, "/api/v1/books", json!({ "title": format!("Filler {:02}", n) })).await;
    }

    let uri = format!("/api/v1/books?genre_ids={}&genre_ids%5B%5D={}", g1, g2);
    let (status, page) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["title"], "The Terror");

    let (_, page) = send(&app, Method::GET, "/api/v1/books?page=2&page_size=10", None).await;
    assert_eq!((page["total"].clone(), page["pages"].clone()), (json!(25), json!(3)));
    assert_eq!(page["items"].as_array().unwrap().len(), 10);

    let (_, page) = send(
        &app,
        Method::GET,
        "/api/v1/books?sort=published_year&order=desc&page_size=2",
        None,
    )
    .await;
    assert_eq!(page["items"][0]["title"], "The Terror");
    assert_eq!(page["items"][1]["title"], "It");

    let (status, page) = send(&app, Method::GET, &format!("/api/v1/genres/{}/books", g1), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);

    let (status, _) = send(
        &app,
        Method::GET,
        "/api/v1/genres/0190f1c2-8a3b-7c4d-9e5f-0a1b2c3d4e5f/books",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_titles_are_rejected_on_update() {
    let app = catalog_app().await;
    create(&app, "/api/v1/books", json!({ "title": "Dune", "published_year": 1965 })).await;
    let emma = create(&app, "/api/v1/books", json!({ "title": "Emma" })).await;

    let (status, body) = send(&app, Method::POST, "/api/v1/books", Some(json!({ "title": "dune" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "duplicate");

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/books/{}", id_of(&emma)),
        Some(json!({ "title": "DUNE" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "duplicate");
}
