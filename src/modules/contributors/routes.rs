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

use super::models::{Contributor, ContributorListParams, CreateContributor};
use super::repository::ContributorCatalog;
use crate::utils::parse_id;

pub(crate) fn router(catalog: ContributorCatalog) -> Router {
    Router::new()
        .route("/", get(list_contributors).post(create_contributor))
        .route("/health", get(health_check))
        .route("/{id}", get(get_contributor))
        .with_state(catalog)
}

async fn health_check() -> &'static str {
    "contributors module is healthy"
}

async fn create_contributor(
    State(catalog): State<ContributorCatalog>,
    payload: Result<Json<CreateContributor>, JsonRejection>,
) -> Result<(StatusCode, Json<Contributor>), AppError> {
    let Json(input) = payload?;
    let contributor = catalog.create(input).await?;
    Ok((StatusCode::CREATED, Json(contributor)))
}

async fn list_contributors(
    State(catalog): State<ContributorCatalog>,
    params: Result<Query<ContributorListParams>, QueryRejection>,
) -> Result<Json<Vec<Contributor>>, AppError> {
    let Query(params) = params?;
    Ok(Json(catalog.list(params.q.as_deref()).await?))
}

async fn get_contributor(
    State(catalog): State<ContributorCatalog>,
    Path(id): Path<String>,
) -> Result<Json<Contributor>, AppError> {
    let id = parse_id(&id)?;
    Ok(Json(catalog.get(id).await?))
}
