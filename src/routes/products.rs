use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::products::{CreateProductRequest, UpdateProductRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::ProductWithCategoriesDto,
    response::{ApiResponse, PaginatedResult},
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[utoipa::path(get, path = "/api/products", tag = "Products",
    responses((status = 200, description = "Filtered, sorted, paginated products with categories",
               body = ApiResponse<PaginatedResult<ProductWithCategoriesDto>>)))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<ApiResponse<PaginatedResult<ProductWithCategoriesDto>>> {
    product_service::list_products(&state, query).await
}

#[utoipa::path(get, path = "/api/products/{id}", tag = "Products",
    responses((status = 200, body = ApiResponse<ProductWithCategoriesDto>),
              (status = 404, description = "Product not found")))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<ProductWithCategoriesDto>> {
    product_service::get_product(&state, id).await
}

#[utoipa::path(post, path = "/api/products", request_body = CreateProductRequest, tag = "Products",
    responses((status = 201, body = ApiResponse<ProductWithCategoriesDto>),
              (status = 403, description = "Admin only")))]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<ApiResponse<ProductWithCategoriesDto>> {
    product_service::create_product(&state, &user.principal, payload).await
}

#[utoipa::path(put, path = "/api/products/{id}", request_body = UpdateProductRequest, tag = "Products",
    responses((status = 200, body = ApiResponse<ProductWithCategoriesDto>),
              (status = 403, description = "Admin only"), (status = 404, description = "Product not found")))]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<ApiResponse<ProductWithCategoriesDto>> {
    product_service::update_product(&state, &user.principal, id, payload).await
}

#[utoipa::path(delete, path = "/api/products/{id}", tag = "Products",
    responses((status = 200, description = "Deleted"),
              (status = 403, description = "Admin only"), (status = 404, description = "Product not found")))]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    product_service::delete_product(&state, &user.principal, id).await
}
