use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::{
    audit::log_audit,
    authz::Principal,
    dto::users::{UpdateUserRequest, UserList},
    entity::{
        customers::{Column as CustomerCol, Entity as Customers},
        partners::{Column as PartnerCol, Entity as Partners},
        users::{ActiveModel as UserActive, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    filters::filter_user,
    models::{Role, UserDto},
    response::ApiResponse,
    state::AppState,
};

/// Full user listing, Admin only.
pub async fn list_users(
    state: &AppState,
    principal: &Principal,
) -> AppResult<ApiResponse<UserList>> {
    if !principal.is_admin() {
        return Err(AppError::Forbidden);
    }

    let users = Users::find().all(&state.orm).await?;
    let mut items = Vec::with_capacity(users.len());
    for user in users {
        items.push(user_to_dto(&state.orm, user).await?);
    }

    tracing::info!(
        admin_id = principal.user_id,
        count = items.len(),
        "admin retrieved user list"
    );

    Ok(ApiResponse::success(
        "Users retrieved successfully",
        UserList { items },
    ))
}

/// Single-user read. Never denies: under-privileged callers get the
/// role-scoped projection instead of the full record.
pub async fn get_user(
    state: &AppState,
    principal: &Principal,
    id: i32,
) -> AppResult<ApiResponse<UserDto>> {
    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let full = user_to_dto(&state.orm, user).await?;
    let view = filter_user(&full, principal.role, principal.user_id);

    Ok(ApiResponse::success("User retrieved successfully", view))
}

pub async fn get_current_user(
    state: &AppState,
    principal: &Principal,
) -> AppResult<ApiResponse<UserDto>> {
    let user = Users::find_by_id(principal.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let dto = user_to_dto(&state.orm, user).await?;
    Ok(ApiResponse::success("Profile retrieved successfully", dto))
}

/// Update a profile. Admin may touch anyone and any field; other callers
/// only themselves, with the privileged fields stripped.
pub async fn update_user(
    state: &AppState,
    principal: &Principal,
    id: i32,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<UserDto>> {
    if !principal.can_access_user(id) {
        return Err(AppError::Forbidden);
    }

    let payload = if principal.is_admin() {
        payload
    } else {
        payload.without_privileged_fields()
    };

    let user = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut active: UserActive = user.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(Some(first_name));
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(Some(last_name));
    }
    if let Some(phone_number) = payload.phone_number {
        active.phone_number = Set(Some(phone_number));
    }
    if let Some(profile_image_url) = payload.profile_image_url {
        active.profile_image_url = Set(Some(profile_image_url));
    }
    if let Some(role) = payload.role {
        active.role = Set(role.as_str().to_string());
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_email_verified) = payload.is_email_verified {
        active.is_email_verified = Set(is_email_verified);
    }
    active.updated_at = Set(Some(Utc::now().into()));
    let user = active.update(&state.orm).await?;

    tracing::info!(
        requester_id = principal.user_id,
        user_id = id,
        "user profile updated"
    );

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "user_update",
        Some("users"),
        Some(serde_json::json!({ "user_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = user_to_dto(&state.orm, user).await?;
    Ok(ApiResponse::success("User updated successfully", dto))
}

/// Hard delete, Admin only. Admins cannot delete their own account.
pub async fn delete_user(
    state: &AppState,
    principal: &Principal,
    id: i32,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !principal.is_admin() {
        return Err(AppError::Forbidden);
    }
    if principal.user_id == id {
        return Err(AppError::BadRequest(
            "Administrators cannot delete their own account".into(),
        ));
    }

    let result = Users::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(principal.user_id),
        "user_delete",
        Some("users"),
        Some(serde_json::json!({ "user_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "User deleted successfully",
        serde_json::json!({}),
    ))
}

/// Build the full user view, resolving the optional customer and partner
/// profile links.
pub async fn user_to_dto<C: ConnectionTrait>(conn: &C, user: UserModel) -> AppResult<UserDto> {
    let role = Role::parse(&user.role)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown role in store: {}", user.role)))?;

    let customer_id = Customers::find()
        .filter(CustomerCol::UserId.eq(user.user_id))
        .one(conn)
        .await?
        .map(|c| c.customer_id);
    let partner_id = Partners::find()
        .filter(PartnerCol::UserId.eq(user.user_id))
        .one(conn)
        .await?
        .map(|p| p.partner_id);

    Ok(UserDto {
        user_id: user.user_id,
        email: Some(user.email),
        username: Some(user.username),
        first_name: user.first_name,
        last_name: user.last_name,
        phone_number: user.phone_number,
        is_active: user.is_active,
        is_email_verified: Some(user.is_email_verified),
        role,
        profile_image_url: user.profile_image_url,
        created_at: Some(user.created_at.with_timezone(&Utc)),
        updated_at: user.updated_at.map(|t| t.with_timezone(&Utc)),
        last_login_at: user.last_login_at.map(|t| t.with_timezone(&Utc)),
        customer_id,
        partner_id,
    })
}
