use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use shelf_http::error::AppError;

use super::models::{BookPage, BookResponse, CreateBook, UpdateBook};
use super::query::BookSearch;
use super::service::BookCatalog;
use crate::utils::parse_id;

pub(crate) fn router(catalog: BookCatalog) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/{id}", get(get_book).put(update_book).delete(delete_book))
        .with_state(catalog)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

/// Query pairs are taken raw so `genre_ids` may repeat.
async fn list_books(
    State(catalog): State<BookCatalog>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<BookPage>, AppError> {
    let Query(pairs) = query?;
    let search = BookSearch::from_pairs(&pairs)?;
    Ok(Json(catalog.search(&search).await?))
}

async fn create_book(
    State(catalog): State<BookCatalog>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let Json(input) = payload?;
    let book = catalog.create(input).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(
    State(catalog): State<BookCatalog>,
    Path(id): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(catalog.get(id).await?))
}

async fn update_book(
    State(catalog): State<BookCatalog>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBook>, JsonRejection>,
) -> Result<Json<BookResponse>, AppError> {
    let id = parse_id(&id)?;
    let Json(changes) = payload?;
    Ok(Json(catalog.update(id, changes).await?))
}

async fn delete_book(
    State(catalog): State<BookCatalog>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
