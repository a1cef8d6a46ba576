//! Member profiles and role resolution.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        club_store::ClubStore,
        models::{Role, UserEntity},
    },
    dto::users::{EnrollmentStatusResponse, RegisterUserRequest, RoleResponse, UserSummary},
    error::ServiceError,
    state::{SharedState, context::SessionContext},
};

/// Fetch a member or fail with [`ServiceError::NotFound`].
pub(crate) async fn load_user(
    store: &Arc<dyn ClubStore>,
    id: Uuid,
) -> Result<UserEntity, ServiceError> {
    store
        .find_user(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{id}` not found")))
}

/// Fetch a member and check they hold `role`.
pub(crate) async fn load_user_with_role(
    store: &Arc<dyn ClubStore>,
    id: Uuid,
    role: Role,
) -> Result<UserEntity, ServiceError> {
    let user = load_user(store, id).await?;
    if user.role != role {
        return Err(ServiceError::Forbidden(format!(
            "user `{id}` is a {:?}, expected a {role:?}",
            user.role
        )));
    }
    Ok(user)
}

/// Create or replace a member profile.
pub async fn register_user(
    state: &SharedState,
    request: RegisterUserRequest,
) -> Result<UserSummary, ServiceError> {
    let role = request
        .role
        .ok_or_else(|| ServiceError::InvalidInput("missing `role`".into()))?;
    let user = UserEntity {
        id: request.id.unwrap_or_else(Uuid::new_v4),
        first_name: request.first_name.trim().to_owned(),
        last_name: request.last_name.trim().to_owned(),
        position: request
            .position
            .map(|position| position.trim().to_owned())
            .filter(|position| !position.is_empty()),
        role,
    };

    let store = state.require_store().await?;
    store.save_user(user.clone()).await?;
    info!(user_id = %user.id, role = ?user.role, "registered user");
    Ok(user.into())
}

pub async fn resolve_role(state: &SharedState, id: Uuid) -> Result<RoleResponse, ServiceError> {
    let store = state.require_store().await?;
    let user = load_user(&store, id).await?;
    Ok(RoleResponse {
        id: user.id,
        role: user.role,
    })
}

/// Fetch several profiles at once. Unknown ids are skipped.
pub async fn batch_users(
    state: &SharedState,
    ids: Vec<Uuid>,
) -> Result<Vec<UserSummary>, ServiceError> {
    if ids.is_empty() {
        return Err(ServiceError::InvalidInput(
            "at least one id is required".into(),
        ));
    }
    let store = state.require_store().await?;
    let users = store.find_users(ids).await?;
    Ok(users.into_iter().map(UserSummary::from).collect())
}

/// Whether a player holds any enrollment, and where.
pub async fn enrollment_status(
    state: &SharedState,
    player_id: Uuid,
) -> Result<EnrollmentStatusResponse, ServiceError> {
    let store = state.require_store().await?;
    load_user(&store, player_id).await?;
    let event_ids: Vec<Uuid> = store
        .list_player_enrollments(player_id)
        .await?
        .into_iter()
        .filter(|enrollment| enrollment.enrolled)
        .map(|enrollment| enrollment.event_id)
        .collect();

    Ok(EnrollmentStatusResponse {
        player_id,
        enrolled: !event_ids.is_empty(),
        count: event_ids.len(),
        event_ids,
    })
}

/// Resolve the caller identity carried by a request.
///
/// Unknown users are unauthorized; users with another role are forbidden.
pub async fn resolve_context(
    state: &SharedState,
    user_id: Uuid,
    required: Role,
) -> Result<SessionContext, ServiceError> {
    let store = state.require_store().await?;
    match load_user_with_role(&store, user_id, required).await {
        Ok(user) => Ok(SessionContext::from(&user)),
        Err(ServiceError::NotFound(_)) => Err(ServiceError::Unauthorized(format!(
            "unknown user `{user_id}`"
        ))),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::club_store::memory::MemoryClubStore, state::AppState};

    async fn state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_club_store(Arc::new(MemoryClubStore::new()))
            .await;
        state
    }

    fn request(role: Role) -> RegisterUserRequest {
        RegisterUserRequest {
            id: None,
            first_name: " Ana ".into(),
            last_name: "Ruiz".into(),
            position: Some("  ".into()),
            role: Some(role),
        }
    }

    #[tokio::test]
    async fn register_then_resolve_role() {
        let state = state().await;
        let user = register_user(&state, request(Role::Coach)).await.unwrap();
        assert_eq!(user.first_name, "Ana");
        assert_eq!(user.position, None);

        let role = resolve_role(&state, user.id).await.unwrap();
        assert_eq!(role.role, Role::Coach);
        assert!(matches!(
            resolve_role(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn context_requires_known_user_with_role() {
        let state = state().await;
        let player = register_user(&state, request(Role::Player)).await.unwrap();

        assert!(matches!(
            resolve_context(&state, Uuid::new_v4(), Role::Coach).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            resolve_context(&state, player.id, Role::Coach).await,
            Err(ServiceError::Forbidden(_))
        ));
        let ctx = resolve_context(&state, player.id, Role::Player)
            .await
            .unwrap();
        assert_eq!(ctx.display_name, "Ana Ruiz");
    }

    #[tokio::test]
    async fn batch_rejects_empty_list() {
        let state = state().await;
        assert!(matches!(
            batch_users(&state, Vec::new()).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }
}
