use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        events::{CreateEventRequest, EventIdQuery, EventSummary},
        validation::parse_id,
    },
    error::AppError,
    services::event_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route("/events/verify", get(verify_event))
}

/// Schedule a training or a match.
#[utoipa::path(
    post,
    path = "/events",
    tag = "events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventSummary),
        (status = 400, description = "Missing or malformed field"),
        (status = 403, description = "User is not a coach"),
        (status = 404, description = "Unknown coach")
    )
)]
pub async fn create_event(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateEventRequest>>,
) -> Result<(StatusCode, Json<EventSummary>), AppError> {
    let event = event_service::create_event(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Every event by date then time.
#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    responses((status = 200, description = "All events", body = [EventSummary]))
)]
pub async fn list_events(
    State(state): State<SharedState>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    Ok(Json(event_service::list_events(&state).await?))
}

/// Look an event up by id.
#[utoipa::path(
    get,
    path = "/events/verify",
    tag = "events",
    params(EventIdQuery),
    responses(
        (status = 200, description = "Event found", body = EventSummary),
        (status = 400, description = "Missing or malformed id"),
        (status = 404, description = "Unknown event")
    )
)]
pub async fn verify_event(
    State(state): State<SharedState>,
    Query(query): Query<EventIdQuery>,
) -> Result<Json<EventSummary>, AppError> {
    let id = parse_id("id", query.id.as_deref())?;
    Ok(Json(event_service::verify_event(&state, id).await?))
}
