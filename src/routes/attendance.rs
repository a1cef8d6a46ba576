use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        attendance::{
            AttendanceCheckResponse, AttendanceEventItem, AttendanceEventsQuery, AttendanceView,
            RecordAttendanceRequest, RecordAttendanceResponse, ViewAttendanceQuery,
        },
        enrollments::EventQuery,
        validation::{parse_id, parse_optional_id},
    },
    error::AppError,
    routes::auth::require_coach,
    services::attendance_service,
    state::{SharedState, context::SessionContext},
};

pub fn router(state: SharedState) -> Router<SharedState> {
    let coach_routes = Router::new()
        .route("/attendance/record", post(record_attendance))
        .route_layer(middleware::from_fn_with_state(state, require_coach));

    Router::new()
        .route("/attendance/verify", get(verify_attendance))
        .route("/attendance/view", get(view_attendance))
        .route("/attendance/events", get(attendance_events))
        .merge(coach_routes)
}

/// Whether attendance was already recorded for an event.
#[utoipa::path(
    get,
    path = "/attendance/verify",
    tag = "attendance",
    params(EventQuery),
    responses(
        (status = 200, description = "Existence and row count", body = AttendanceCheckResponse),
        (status = 400, description = "Missing or malformed event id")
    )
)]
pub async fn verify_attendance(
    State(state): State<SharedState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<AttendanceCheckResponse>, AppError> {
    let event_id = parse_id("event_id", query.event_id.as_deref())?;
    Ok(Json(
        attendance_service::verify_attendance(&state, event_id).await?,
    ))
}

/// Record a finished event in one call.
#[utoipa::path(
    post,
    path = "/attendance/record",
    tag = "attendance",
    params(("x-user-id" = String, Header, description = "Coach user id")),
    request_body = RecordAttendanceRequest,
    responses(
        (status = 201, description = "Attendance stored", body = RecordAttendanceResponse),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or unknown identity"),
        (status = 403, description = "Caller is not a coach"),
        (status = 404, description = "Unknown event"),
        (status = 409, description = "Attendance already recorded")
    )
)]
pub async fn record_attendance(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Valid(Json(payload)): Valid<Json<RecordAttendanceRequest>>,
) -> Result<(StatusCode, Json<RecordAttendanceResponse>), AppError> {
    let response = attendance_service::record_attendance(&state, &ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Aggregated attendance of an event.
#[utoipa::path(
    get,
    path = "/attendance/view",
    tag = "attendance",
    params(ViewAttendanceQuery),
    responses(
        (status = 200, description = "Merged results and aggregates", body = AttendanceView),
        (status = 404, description = "Unknown event")
    )
)]
pub async fn view_attendance(
    State(state): State<SharedState>,
    Query(query): Query<ViewAttendanceQuery>,
) -> Result<Json<AttendanceView>, AppError> {
    let event_id = parse_id("event_id", query.event_id.as_deref())?;
    let viewer_id = parse_optional_id("usuario_id", query.usuario_id.as_deref())?;
    Ok(Json(
        attendance_service::view_attendance(&state, event_id, viewer_id).await?,
    ))
}

/// Upcoming events relevant to a coach or a player.
#[utoipa::path(
    get,
    path = "/attendance/events",
    tag = "attendance",
    params(AttendanceEventsQuery),
    responses(
        (status = 200, description = "Upcoming events with enrollment counts", body = [AttendanceEventItem]),
        (status = 400, description = "Missing id or role"),
        (status = 403, description = "Role does not match the user")
    )
)]
pub async fn attendance_events(
    State(state): State<SharedState>,
    Query(query): Query<AttendanceEventsQuery>,
) -> Result<Json<Vec<AttendanceEventItem>>, AppError> {
    let user_id = parse_id("usuario_id", query.usuario_id.as_deref())?;
    Ok(Json(
        attendance_service::attendance_events(&state, user_id, query.rol.as_deref()).await?,
    ))
}
