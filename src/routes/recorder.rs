use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::recorder::{AdjustStatRequest, FinishMatchResponse, OpenSessionRequest, SessionView},
    error::AppError,
    routes::auth::require_coach,
    services::recorder_service,
    state::{SharedState, context::SessionContext},
};

/// Recorder session endpoints; every route requires a coach identity.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/recorder/sessions", post(open_session))
        .route(
            "/recorder/sessions/{id}",
            get(session_view).delete(discard_session),
        )
        .route(
            "/recorder/sessions/{id}/players/{index}/presence",
            post(toggle_presence),
        )
        .route("/recorder/sessions/{id}/start", post(start_match))
        .route(
            "/recorder/sessions/{id}/players/{index}/stats",
            put(adjust_stat),
        )
        .route("/recorder/sessions/{id}/finish", post(finish_match))
        .route_layer(middleware::from_fn_with_state(state, require_coach))
}

/// Open a recorder session for an event.
#[utoipa::path(
    post,
    path = "/recorder/sessions",
    tag = "recorder",
    params(("x-user-id" = String, Header, description = "Coach user id")),
    request_body = OpenSessionRequest,
    responses(
        (status = 201, description = "Session opened (locked when already recorded)", body = SessionView),
        (status = 404, description = "Unknown event")
    )
)]
pub async fn open_session(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Valid(Json(payload)): Valid<Json<OpenSessionRequest>>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let view = recorder_service::open_session(&state, &ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Current state of a session.
#[utoipa::path(
    get,
    path = "/recorder/sessions/{id}",
    tag = "recorder",
    params(
        ("x-user-id" = String, Header, description = "Coach user id"),
        ("id" = Uuid, Path, description = "Session identifier")
    ),
    responses(
        (status = 200, description = "Session view", body = SessionView),
        (status = 403, description = "Session belongs to another coach"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn session_view(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(recorder_service::session_view(&state, &ctx, id).await?))
}

/// Flip a roster entry's presence.
#[utoipa::path(
    post,
    path = "/recorder/sessions/{id}/players/{index}/presence",
    tag = "recorder",
    params(
        ("x-user-id" = String, Header, description = "Coach user id"),
        ("id" = Uuid, Path, description = "Session identifier"),
        ("index" = usize, Path, description = "Roster position")
    ),
    responses(
        (status = 200, description = "Updated session", body = SessionView),
        (status = 400, description = "No roster entry at index"),
        (status = 409, description = "Match already started")
    )
)]
pub async fn toggle_presence(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        recorder_service::toggle_presence(&state, &ctx, id, index).await?,
    ))
}

/// Start the match.
#[utoipa::path(
    post,
    path = "/recorder/sessions/{id}/start",
    tag = "recorder",
    params(
        ("x-user-id" = String, Header, description = "Coach user id"),
        ("id" = Uuid, Path, description = "Session identifier")
    ),
    responses(
        (status = 200, description = "Match live", body = SessionView),
        (status = 400, description = "Not enough players present"),
        (status = 409, description = "Session not in roster phase")
    )
)]
pub async fn start_match(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(recorder_service::start_match(&state, &ctx, id).await?))
}

/// Set one counter of an on-court player.
#[utoipa::path(
    put,
    path = "/recorder/sessions/{id}/players/{index}/stats",
    tag = "recorder",
    params(
        ("x-user-id" = String, Header, description = "Coach user id"),
        ("id" = Uuid, Path, description = "Session identifier"),
        ("index" = usize, Path, description = "On-court position")
    ),
    request_body = AdjustStatRequest,
    responses(
        (status = 200, description = "Updated session", body = SessionView),
        (status = 400, description = "No player on court at index"),
        (status = 409, description = "Match not live")
    )
)]
pub async fn adjust_stat(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Path((id, index)): Path<(Uuid, usize)>,
    Valid(Json(payload)): Valid<Json<AdjustStatRequest>>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        recorder_service::adjust_stat(&state, &ctx, id, index, payload).await?,
    ))
}

/// Finish the match and persist the attendance.
#[utoipa::path(
    post,
    path = "/recorder/sessions/{id}/finish",
    tag = "recorder",
    params(
        ("x-user-id" = String, Header, description = "Coach user id"),
        ("id" = Uuid, Path, description = "Session identifier")
    ),
    responses(
        (status = 200, description = "Attendance recorded", body = FinishMatchResponse),
        (status = 409, description = "Recorded elsewhere first; session is now locked"),
        (status = 500, description = "Storage failure; session stays live")
    )
)]
pub async fn finish_match(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinishMatchResponse>, AppError> {
    Ok(Json(recorder_service::finish_match(&state, &ctx, id).await?))
}

/// Drop a session without persisting anything.
#[utoipa::path(
    delete,
    path = "/recorder/sessions/{id}",
    tag = "recorder",
    params(
        ("x-user-id" = String, Header, description = "Coach user id"),
        ("id" = Uuid, Path, description = "Session identifier")
    ),
    responses(
        (status = 204, description = "Session discarded"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn discard_session(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    recorder_service::discard_session(&state, &ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
