use uuid::Uuid;

use crate::dao::models::{Role, UserEntity};

/// Identity of the caller, resolved once per request and handed to services explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub role: Role,
    pub display_name: String,
}

impl From<&UserEntity> for SessionContext {
    fn from(user: &UserEntity) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            display_name: user.display_name(),
        }
    }
}
