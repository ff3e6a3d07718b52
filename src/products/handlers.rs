use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{dto::ProductForm, repo::Product, services};
use crate::{auth::jwt::AuthUser, error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", patch(update_product).delete(delete_product))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = services::list(state.products.as_ref(), owner_id).await?;
    Ok(Json(products))
}

#[instrument(skip(state, form))]
pub async fn create_product(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, HeaderMap, Json<Product>), AppError> {
    let product = services::create(state.products.as_ref(), owner_id, &form).await?;

    let location = HeaderValue::from_str(&format!("/api/v1/products/{}", product.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(product)))
}

#[instrument(skip(state, form))]
pub async fn update_product(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(form): Json<ProductForm>,
) -> Result<Json<Product>, AppError> {
    let product = services::update(state.products.as_ref(), owner_id, id, &form).await?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete(state.products.as_ref(), owner_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
