use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderDto, OrderStatus},
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/my-orders", get(my_orders))
        .route("/{id}", get(get_order).delete(delete_order))
        .route("/{id}/status", patch(update_order_status))
        .route("/customer/{customer_id}", get(orders_by_customer))
        .route("/partner/{partner_id}", get(orders_by_partner))
        .route("/status/{status}", get(orders_by_status))
}

#[utoipa::path(get, path = "/api/orders", tag = "Orders",
    responses((status = 200, description = "All orders for admins, role-scoped otherwise", body = ApiResponse<OrderList>)))]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    order_service::list_orders(&state, &user.principal).await
}

#[utoipa::path(get, path = "/api/orders/my-orders", tag = "Orders",
    responses((status = 200, body = ApiResponse<OrderList>), (status = 403, description = "Role not authorized")))]
pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    order_service::my_orders(&state, &user.principal).await
}

#[utoipa::path(get, path = "/api/orders/{id}", tag = "Orders",
    responses((status = 200, body = ApiResponse<OrderDto>),
              (status = 401, description = "No qualifying relationship to the order"),
              (status = 404, description = "Order not found")))]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<OrderDto>> {
    order_service::get_order(&state, &user.principal, id).await
}

#[utoipa::path(get, path = "/api/orders/customer/{customer_id}", tag = "Orders",
    responses((status = 200, body = ApiResponse<OrderList>), (status = 403, description = "Admin/Manager only")))]
pub async fn orders_by_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<i32>,
) -> AppResult<ApiResponse<OrderList>> {
    order_service::orders_by_customer(&state, &user.principal, customer_id).await
}

#[utoipa::path(get, path = "/api/orders/partner/{partner_id}", tag = "Orders",
    responses((status = 200, body = ApiResponse<OrderList>), (status = 403, description = "Admin/Manager only")))]
pub async fn orders_by_partner(
    State(state): State<AppState>,
    user: AuthUser,
    Path(partner_id): Path<i32>,
) -> AppResult<ApiResponse<OrderList>> {
    order_service::orders_by_partner(&state, &user.principal, partner_id).await
}

#[utoipa::path(get, path = "/api/orders/status/{status}", tag = "Orders",
    responses((status = 200, body = ApiResponse<OrderList>),
              (status = 400, description = "Unknown status"), (status = 403, description = "Admin/Manager only")))]
pub async fn orders_by_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(status): Path<String>,
) -> AppResult<ApiResponse<OrderList>> {
    let status = OrderStatus::parse(&status)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown order status '{status}'")))?;
    order_service::orders_by_status(&state, &user.principal, status).await
}

#[utoipa::path(post, path = "/api/orders", request_body = CreateOrderRequest, tag = "Orders",
    responses((status = 201, body = ApiResponse<OrderDto>),
              (status = 400, description = "Empty order or insufficient stock"),
              (status = 404, description = "Product not found")))]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<ApiResponse<OrderDto>> {
    order_service::create_order(&state, &user.principal, payload).await
}

#[utoipa::path(patch, path = "/api/orders/{id}/status", request_body = UpdateOrderStatusRequest, tag = "Orders",
    responses((status = 200, body = ApiResponse<OrderDto>),
              (status = 403, description = "Admin/Manager only"), (status = 404, description = "Order not found")))]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<ApiResponse<OrderDto>> {
    order_service::update_order_status(&state, &user.principal, id, payload).await
}

#[utoipa::path(delete, path = "/api/orders/{id}", tag = "Orders",
    responses((status = 200, description = "Deleted, stock restored"),
              (status = 400, description = "Order is neither pending nor cancelled"),
              (status = 403, description = "Admin/Manager only"), (status = 404, description = "Order not found")))]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    order_service::delete_order(&state, &user.principal, id).await
}
