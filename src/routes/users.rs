use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        statistics::StatisticSummary,
        users::{
            BatchUsersRequest, EnrollmentStatusResponse, RegisterUserRequest, ResolveRoleRequest,
            RoleResponse, UserSummary,
        },
    },
    error::{AppError, ServiceError},
    services::{statistics_service, user_service},
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/role", post(resolve_role))
        .route("/users/batch", post(batch_users))
        .route("/users/{id}/enrollments", get(enrollment_status))
        .route("/users/{id}/statistics", get(player_statistics))
}

/// Create or replace a member profile.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Profile stored", body = UserSummary),
        (status = 400, description = "Blank names or missing role")
    )
)]
pub async fn register_user(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<RegisterUserRequest>>,
) -> Result<(StatusCode, Json<UserSummary>), AppError> {
    let user = user_service::register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Resolve a user id to its role.
#[utoipa::path(
    post,
    path = "/users/role",
    tag = "users",
    request_body = ResolveRoleRequest,
    responses(
        (status = 200, description = "Role of the user", body = RoleResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn resolve_role(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<ResolveRoleRequest>>,
) -> Result<Json<RoleResponse>, AppError> {
    let id = payload
        .id
        .ok_or_else(|| ServiceError::InvalidInput("missing `id`".into()))?;
    Ok(Json(user_service::resolve_role(&state, id).await?))
}

/// Fetch several profiles at once; unknown ids are skipped.
#[utoipa::path(
    post,
    path = "/users/batch",
    tag = "users",
    request_body = BatchUsersRequest,
    responses(
        (status = 200, description = "Known profiles", body = [UserSummary]),
        (status = 400, description = "Empty id list")
    )
)]
pub async fn batch_users(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<BatchUsersRequest>>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(
        user_service::batch_users(&state, payload.user_ids).await?,
    ))
}

/// Whether a player is enrolled anywhere.
#[utoipa::path(
    get,
    path = "/users/{id}/enrollments",
    tag = "users",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Enrollment status", body = EnrollmentStatusResponse),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn enrollment_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EnrollmentStatusResponse>, AppError> {
    Ok(Json(user_service::enrollment_status(&state, id).await?))
}

/// Statistic rows of a member.
#[utoipa::path(
    get,
    path = "/users/{id}/statistics",
    tag = "users",
    params(("id" = Uuid, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Per-event statistics", body = [StatisticSummary]),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn player_statistics(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<StatisticSummary>>, AppError> {
    Ok(Json(
        statistics_service::player_statistics(&state, id).await?,
    ))
}
