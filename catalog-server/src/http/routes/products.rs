//! Product endpoints, mounted under `/api`

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::http::error::ApiError;
use crate::http::extractors::{JsonBody, ValidProductId};
use crate::models::{Product, ProductInput, ProductPatch};
use crate::state::AppState;

/// Confirmation body for update and delete
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// GET /products - list all products
async fn list_products(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.products.list().await?;
    Ok(Json(products))
}

/// GET /products/{id}
async fn get_product(
    State(state): State<Arc<AppState>>,
    ValidProductId(id): ValidProductId,
) -> Result<Json<Product>, ApiError> {
    state
        .products
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::product_not_found(id))
}

/// POST /products - create a product
async fn create_product(
    State(state): State<Arc<AppState>>,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    input.validate()?;
    let product = state.products.create(&input).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /products/{id} - replace every writable field
async fn update_product(
    State(state): State<Arc<AppState>>,
    ValidProductId(id): ValidProductId,
    JsonBody(input): JsonBody<ProductInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    input.validate()?;

    if !state.products.update(id, input).await? {
        return Err(ApiError::product_not_found(id));
    }
    Ok(MessageResponse::new(format!("product {} updated", id)))
}

/// PATCH /products/{id} - change only the fields present
async fn patch_product(
    State(state): State<Arc<AppState>>,
    ValidProductId(id): ValidProductId,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> Result<Json<MessageResponse>, ApiError> {
    patch.validate()?;

    if !state.products.update_partial(id, &patch).await? {
        return Err(ApiError::product_not_found(id));
    }
    Ok(MessageResponse::new(format!("product {} partially updated", id)))
}

/// DELETE /products/{id}
async fn delete_product(
    State(state): State<Arc<AppState>>,
    ValidProductId(id): ValidProductId,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state.products.delete(id).await? {
        return Err(ApiError::product_not_found(id));
    }
    Ok(MessageResponse::new(format!("product {} deleted", id)))
}

/// Product routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product)
                .put(update_product)
                .patch(patch_product)
                .delete(delete_product),
        )
}
