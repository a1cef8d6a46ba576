use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    routing::put,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::statistics::{StatisticSummary, UpsertStatisticRequest},
    error::AppError,
    routes::auth::require_coach,
    services::statistics_service,
    state::{SharedState, context::SessionContext},
};

pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/statistics/{event_id}/{player_id}", put(correct_statistic))
        .route_layer(middleware::from_fn_with_state(state, require_coach))
}

/// Correct a player's statistics for a recorded event.
#[utoipa::path(
    put,
    path = "/statistics/{event_id}/{player_id}",
    tag = "statistics",
    params(
        ("x-user-id" = String, Header, description = "Coach user id"),
        ("event_id" = Uuid, Path, description = "Event identifier"),
        ("player_id" = Uuid, Path, description = "Player identifier")
    ),
    request_body = UpsertStatisticRequest,
    responses(
        (status = 200, description = "Statistic stored", body = StatisticSummary),
        (status = 404, description = "Unknown event or no result for the player"),
        (status = 409, description = "Attendance not recorded yet or the player was absent")
    )
)]
pub async fn correct_statistic(
    State(state): State<SharedState>,
    Extension(ctx): Extension<SessionContext>,
    Path((event_id, player_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<UpsertStatisticRequest>>,
) -> Result<Json<StatisticSummary>, AppError> {
    Ok(Json(
        statistics_service::correct_statistic(&state, &ctx, event_id, player_id, payload).await?,
    ))
}
