use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::users::{UpdateUserRequest, UserList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::UserDto,
    response::ApiResponse,
    services::user_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_current_user).put(update_current_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

#[utoipa::path(get, path = "/api/users", tag = "Users",
    responses((status = 200, body = ApiResponse<UserList>), (status = 403, description = "Admin only")))]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<UserList>> {
    user_service::list_users(&state, &user.principal).await
}

#[utoipa::path(get, path = "/api/users/me", tag = "Users",
    responses((status = 200, body = ApiResponse<UserDto>)))]
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<ApiResponse<UserDto>> {
    user_service::get_current_user(&state, &user.principal).await
}

#[utoipa::path(get, path = "/api/users/{id}", tag = "Users",
    responses((status = 200, description = "Role-scoped projection of the user", body = ApiResponse<UserDto>),
              (status = 404, description = "User not found")))]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<UserDto>> {
    user_service::get_user(&state, &user.principal, id).await
}

#[utoipa::path(put, path = "/api/users/{id}", request_body = UpdateUserRequest, tag = "Users",
    responses((status = 200, body = ApiResponse<UserDto>), (status = 403, description = "Admin or self only")))]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<ApiResponse<UserDto>> {
    user_service::update_user(&state, &user.principal, id, payload).await
}

#[utoipa::path(put, path = "/api/users/me", request_body = UpdateUserRequest, tag = "Users",
    responses((status = 200, body = ApiResponse<UserDto>)))]
pub async fn update_current_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<ApiResponse<UserDto>> {
    // Self-service updates never touch the privileged fields.
    let payload = payload.without_privileged_fields();
    user_service::update_user(&state, &user.principal, user.principal.user_id, payload).await
}

#[utoipa::path(delete, path = "/api/users/{id}", tag = "Users",
    responses((status = 200, description = "Deleted"), (status = 400, description = "Self-deletion forbidden"),
              (status = 403, description = "Admin only"), (status = 404, description = "User not found")))]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    user_service::delete_user(&state, &user.principal, id).await
}
