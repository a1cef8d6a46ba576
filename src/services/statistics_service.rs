//! Per-player statistics: listing and coach corrections after the fact.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::PlayerStatisticEntity,
    dto::statistics::{StatisticSummary, UpsertStatisticRequest},
    error::ServiceError,
    services::{event_service::load_event, user_service::load_user},
    state::{SharedState, context::SessionContext},
};

/// Statistic rows of a member, most recently updated first.
pub async fn player_statistics(
    state: &SharedState,
    player_id: Uuid,
) -> Result<Vec<StatisticSummary>, ServiceError> {
    let store = state.require_store().await?;
    load_user(&store, player_id).await?;
    let mut statistics = store.list_player_statistics(player_id).await?;
    statistics.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.event_id.cmp(&b.event_id))
    });
    Ok(statistics.into_iter().map(StatisticSummary::from).collect())
}

/// Overwrite a player's statistics for an event whose attendance is recorded.
pub async fn correct_statistic(
    state: &SharedState,
    ctx: &SessionContext,
    event_id: Uuid,
    player_id: Uuid,
    request: UpsertStatisticRequest,
) -> Result<StatisticSummary, ServiceError> {
    let mut kinds = request.shots.iter().map(|shot| shot.kind).collect::<Vec<_>>();
    kinds.sort_by_key(|kind| kind.value());
    kinds.dedup();
    if kinds.len() != request.shots.len() {
        return Err(ServiceError::InvalidInput(
            "each shot kind may appear once".into(),
        ));
    }

    let store = state.require_store().await?;
    load_event(&store, event_id).await?;
    let record = store.find_attendance(event_id).await?.ok_or_else(|| {
        ServiceError::InvalidState(format!("no attendance recorded for event `{event_id}`"))
    })?;
    let result = record
        .results
        .iter()
        .find(|result| result.player_id == player_id)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "player `{player_id}` has no result for event `{event_id}`"
            ))
        })?;
    if !result.present {
        return Err(ServiceError::InvalidState(format!(
            "player `{player_id}` was absent from event `{event_id}`"
        )));
    }

    let statistic = PlayerStatisticEntity {
        player_id,
        event_id,
        points: request.points,
        rebounds: request.rebounds,
        assists: request.assists,
        steals: request.steals,
        blocks: request.blocks,
        shots: request.shots,
        updated_at: SystemTime::now(),
    };
    store.upsert_statistic(statistic.clone()).await?;
    info!(%event_id, %player_id, coach_id = %ctx.user_id, "corrected player statistic");
    Ok(statistic.into())
}
