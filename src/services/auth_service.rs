use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    models::{Role, UserDto},
    response::ApiResponse,
    services::user_service::user_to_dto,
    state::AppState,
};

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<UserDto>> {
    let exists = Users::find()
        .filter(UserCol::Email.eq(payload.email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Email is already in use".into()));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();

    let username = derive_username(&payload.email);

    let user = UserActive {
        user_id: NotSet,
        email: Set(payload.email),
        username: Set(username),
        password_hash: Set(password_hash),
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        phone_number: Set(payload.phone_number),
        is_active: Set(true),
        is_email_verified: Set(false),
        role: Set(Role::Customer.as_str().to_string()),
        profile_image_url: Set(None),
        created_at: NotSet,
        updated_at: Set(None),
        last_login_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = user_to_dto(&state.orm, user).await?;
    Ok(ApiResponse::success_with_status(
        "User created successfully",
        dto,
        201,
    ))
}

/// Unique username from the email's local part plus a random suffix; the
/// column is unique, so the suffix has to be wide enough that simultaneous
/// registrations of the same local part do not collide.
fn derive_username(email: &str) -> String {
    let local_part = email.split('@').next().unwrap_or("user");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", local_part, &suffix[..8])
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let user = Users::find()
        .filter(UserCol::Username.eq(payload.username.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid username or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

    let argon2 = Argon2::default();
    if argon2
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid username or password".into()));
    }

    if !user.is_active {
        return Err(AppError::BadRequest("User account is inactive".into()));
    }

    let mut active: UserActive = user.clone().into();
    active.last_login_at = Set(Some(Utc::now().into()));
    let user = active.update(&state.orm).await?;

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.user_id.to_string(),
        email: user.email.clone(),
        role: user.role.clone(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let dto = user_to_dto(&state.orm, user).await?;
    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            token_expiration: expiration,
            user: dto,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_keeps_the_local_part_prefix() {
        let name = derive_username("jane.doe@example.com");
        assert!(name.starts_with("jane.doe"));
        assert_eq!(name.len(), "jane.doe".len() + 8);
    }

    #[test]
    fn usernames_for_the_same_email_do_not_collide() {
        let first = derive_username("jane@example.com");
        let second = derive_username("jane@example.com");
        assert_ne!(first, second);
    }

    #[test]
    fn empty_local_part_still_yields_a_suffix() {
        let name = derive_username("@example.com");
        assert_eq!(name.len(), 8);
    }
}
