use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Role, UserDto};

/// Partial update. Role, active and email-verified flags are dropped for
/// non-admin callers before this reaches the service.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image_url: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_email_verified: Option<bool>,
}

impl UpdateUserRequest {
    /// Strip the fields only admins may change.
    pub fn without_privileged_fields(mut self) -> Self {
        self.role = None;
        self.is_active = None;
        self.is_email_verified = None;
        self
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserList {
    pub items: Vec<UserDto>,
}
