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

use super::models::{CreateGenre, Genre, GenreListParams};
use super::repository::GenreCatalog;
use crate::modules::books::{BookCatalog, BookPage, BookSearch};
use crate::utils::parse_id;

#[derive(Clone)]
pub(crate) struct GenresState {
    pub genres: GenreCatalog,
    pub books: BookCatalog,
}

pub(crate) fn router(state: GenresState) -> Router {
    Router::new()
        .route("/", get(list_genres).post(create_genre))
        .route("/health", get(health_check))
        .route("/{id}", get(get_genre))
        .route("/{id}/books", get(genre_books))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "genres module is healthy"
}

async fn create_genre(
    State(state): State<GenresState>,
    payload: Result<Json<CreateGenre>, JsonRejection>,
) -> Result<(StatusCode, Json<Genre>), AppError> {
    let Json(input) = payload?;
    let genre = state.genres.create(input).await?;
    Ok((StatusCode::CREATED, Json(genre)))
}

async fn list_genres(
    State(state): State<GenresState>,
    params: Result<Query<GenreListParams>, QueryRejection>,
) -> Result<Json<Vec<Genre>>, AppError> {
    let Query(params) = params?;
    Ok(Json(state.genres.list(params.q.as_deref()).await?))
}

async fn get_genre(
    State(state): State<GenresState>,
    Path(id): Path<String>,
) -> Result<Json<Genre>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(state.genres.get(id).await?))
}

/// Books tagged with the genre; accepts the same query string as `GET /books`.
async fn genre_books(
    State(state): State<GenresState>,
    Path(id): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<BookPage>, AppError> {
    let id = parse_id(&id)?;
    let Query(pairs) = query?;

    state.genres.get(id).await?;

    let mut search = BookSearch::from_pairs(&pairs)?;
    search.filters.genre_id = Some(id);
    Ok(Json(state.books.search(&search).await?))
}
