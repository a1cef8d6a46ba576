use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{Role, UserEntity},
    dto::validation::validate_non_blank,
};

/// Create or replace a club member profile.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterUserRequest {
    /// Existing identifier to overwrite; a new one is generated when omitted.
    pub id: Option<Uuid>,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"))]
    pub first_name: String,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank"))]
    pub last_name: String,
    pub position: Option<String>,
    #[validate(required)]
    pub role: Option<Role>,
}

/// Body of `POST /users/role`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ResolveRoleRequest {
    #[validate(required)]
    pub id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub id: Uuid,
    pub role: Role,
}

/// Body of `POST /users/batch`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BatchUsersRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "at least one id is required"))]
    pub user_ids: Vec<Uuid>,
}

/// Public projection of a member.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: Option<String>,
    pub role: Role,
}

impl From<UserEntity> for UserSummary {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            position: user.position,
            role: user.role,
        }
    }
}

/// Whether a player is enrolled anywhere and in which events.
#[derive(Debug, Serialize, ToSchema)]
pub struct EnrollmentStatusResponse {
    pub player_id: Uuid,
    pub enrolled: bool,
    pub count: usize,
    pub event_ids: Vec<Uuid>,
}
