use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        enrollments::{CreateEnrollmentRequest, EnrollmentSummary, EventQuery},
        validation::parse_id,
    },
    error::AppError,
    services::enrollment_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/enrollments", post(enroll))
        .route("/enrollments/event", get(list_event_enrollments))
}

/// Enroll a player in an event.
#[utoipa::path(
    post,
    path = "/enrollments",
    tag = "enrollments",
    request_body = CreateEnrollmentRequest,
    responses(
        (status = 201, description = "Player enrolled", body = EnrollmentSummary),
        (status = 403, description = "User is not a player"),
        (status = 404, description = "Unknown user or event"),
        (status = 409, description = "Already enrolled")
    )
)]
pub async fn enroll(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateEnrollmentRequest>>,
) -> Result<(StatusCode, Json<EnrollmentSummary>), AppError> {
    let enrollment = enrollment_service::enroll(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Active enrollments of an event, oldest first.
#[utoipa::path(
    get,
    path = "/enrollments/event",
    tag = "enrollments",
    params(EventQuery),
    responses(
        (status = 200, description = "Enrollments", body = [EnrollmentSummary]),
        (status = 404, description = "Unknown event")
    )
)]
pub async fn list_event_enrollments(
    State(state): State<SharedState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<EnrollmentSummary>>, AppError> {
    let event_id = parse_id("event_id", query.event_id.as_deref())?;
    Ok(Json(
        enrollment_service::list_event_enrollments(&state, event_id).await?,
    ))
}
