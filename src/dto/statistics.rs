use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{PlayerStatisticEntity, ShotBreakdownEntity},
    dto::format_system_time,
};

/// Coach correction of a player's statistics for an event.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpsertStatisticRequest {
    /// Explicit total; when omitted the points are derived from `shots`.
    pub points: Option<u32>,
    #[serde(default)]
    pub rebounds: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub steals: u32,
    #[serde(default)]
    pub blocks: u32,
    #[serde(default)]
    #[validate(length(max = 3, message = "one entry per shot kind"))]
    pub shots: Vec<ShotBreakdownEntity>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct StatisticSummary {
    pub player_id: Uuid,
    pub event_id: Uuid,
    /// Explicit total, if one was stored.
    pub points: Option<u32>,
    /// Explicit total or, failing that, the total derived from shots.
    pub effective_points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub shots: Vec<ShotBreakdownEntity>,
    pub updated_at: String,
}

impl From<PlayerStatisticEntity> for StatisticSummary {
    fn from(stat: PlayerStatisticEntity) -> Self {
        let effective_points = stat.points.unwrap_or_else(|| stat.points_from_shots());
        Self {
            player_id: stat.player_id,
            event_id: stat.event_id,
            points: stat.points,
            effective_points,
            rebounds: stat.rebounds,
            assists: stat.assists,
            steals: stat.steals,
            blocks: stat.blocks,
            shots: stat.shots,
            updated_at: format_system_time(stat.updated_at),
        }
    }
}
