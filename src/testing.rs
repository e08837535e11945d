//! Fixtures for unit tests.

use std::path::Path;

use shelf_db::Database;
use shelf_kernel::settings::DatabaseSettings;
use uuid::Uuid;

use crate::app;
use crate::modules::books::{BookCatalog, CreateBook};
use crate::modules::contributors::{ContributorCatalog, CreateContributor};
use crate::modules::genres::{CreateGenre, GenreCatalog};

/// Fresh in-memory store with every module's schema applied.
pub(crate) async fn catalog_db() -> Database {
    let db = Database::in_memory().await.expect("in-memory database");
    let registry = app::build_registry(&db);
    app::init_schema(&db, &registry).await.expect("schema");
    db
}

/// File-backed store under `dir`, for tests that need several connections.
pub(crate) async fn file_catalog_db(dir: &Path, max_connections: u32) -> Database {
    let settings = DatabaseSettings {
        url: format!("sqlite://{}", dir.join("shelf.db").display()),
        max_connections,
        acquire_timeout_ms: 10_000,
    };
    let db = Database::connect(&settings).await.expect("file database");
    let registry = app::build_registry(&db);
    app::init_schema(&db, &registry).await.expect("schema");
    db
}

pub(crate) async fn add_genre(db: &Database, name: &str) -> Uuid {
    GenreCatalog::new(db)
        .create(CreateGenre {
            name: name.to_string(),
        })
        .await
        .expect("genre")
        .id
}

pub(crate) async fn add_contributor(db: &Database, full_name: &str) -> Uuid {
    ContributorCatalog::new(db)
        .create(CreateContributor {
            full_name: full_name.to_string(),
        })
        .await
        .expect("contributor")
        .id
}

pub(crate) async fn add_book(db: &Database, title: &str) -> Uuid {
    BookCatalog::new(db)
        .create(CreateBook {
            title: title.to_string(),
            ..Default::default()
        })
        .await
        .expect("book")
        .id
}

/// `(genre links, contributor links)` stored for a book.
pub(crate) async fn link_counts(db: &Database, book_id: Uuid) -> (i64, i64) {
    let genres: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book_genre WHERE book_id = ?")
        .bind(book_id.to_string())
        .fetch_one(db.pool())
        .await
        .expect("count genre links");
    let contributors: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM book_contributor WHERE book_id = ?")
            .bind(book_id.to_string())
            .fetch_one(db.pool())
            .await
            .expect("count contributor links");
    (genres, contributors)
}
