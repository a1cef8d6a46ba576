//! DTOs of the attendance routes: the stateless record contract, the existence check and
//! the aggregated view.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{BoxScore, EventKind, Role},
    dto::{
        events::EventSummary,
        validation::{coerce_stat_value, validate_duration},
    },
};

/// `GET /attendance/verify` answer.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceCheckResponse {
    pub event_id: Uuid,
    pub exists: bool,
    /// Result rows stored for the event.
    pub count: usize,
}

/// Counters of one present player, accepted loosely and coerced to non-negative integers.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordedPlayerInput {
    pub player_id: Uuid,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub points: Value,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub rebounds: Value,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub assists: Value,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub steals: Value,
    #[serde(default)]
    #[schema(value_type = Option<u32>)]
    pub blocks: Value,
}

impl RecordedPlayerInput {
    pub fn score(&self) -> BoxScore {
        BoxScore {
            points: coerce_stat_value(&self.points),
            rebounds: coerce_stat_value(&self.rebounds),
            assists: coerce_stat_value(&self.assists),
            steals: coerce_stat_value(&self.steals),
            blocks: coerce_stat_value(&self.blocks),
        }
    }
}

/// Record a finished event in one call: the present players with their counters.
///
/// Enrolled players missing from `players` are stored as absent with zeroed counters.
/// Team totals are recomputed from the present rows; a client-supplied value is ignored.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordAttendanceRequest {
    #[validate(required)]
    pub event_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(min = 1, message = "no players to record"))]
    pub players: Vec<RecordedPlayerInput>,
    /// `MM:SS`; `00:00` when omitted.
    #[validate(custom(function = "validate_duration"))]
    pub duration: Option<String>,
    pub team_totals: Option<BoxScore>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordAttendanceResponse {
    pub message: String,
    pub event_id: Uuid,
    pub present: usize,
    pub absent: usize,
    pub duration: String,
    pub team_totals: BoxScore,
}

/// `GET /attendance/view` query. `viewer_id` is accepted as an alias of `usuario_id`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ViewAttendanceQuery {
    /// Event identifier.
    pub event_id: Option<String>,
    /// Viewer identifier; their own row is echoed back when they played.
    #[serde(alias = "viewer_id")]
    pub usuario_id: Option<String>,
}

/// `GET /attendance/events` query.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceEventsQuery {
    /// Caller identifier.
    pub usuario_id: Option<String>,
    /// Caller role (`player` or `coach`).
    pub rol: Option<String>,
}

/// Upcoming event relevant to the caller, with its enrollment count.
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceEventItem {
    pub event: EventSummary,
    pub enrolled_count: usize,
    pub role: Role,
}

/// Event header of the aggregated view.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct AttendanceEventHeader {
    pub id: Uuid,
    pub kind: EventKind,
    pub date: String,
    pub time: String,
    pub place: String,
    pub description: String,
    pub coach_id: Uuid,
    /// Display name of the owning coach, when their profile still exists.
    pub coach_name: Option<String>,
    /// `MM:SS`, `00:00` when nothing was recorded.
    pub duration: String,
}

/// Merged result of one player for the event.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PlayerLine {
    pub player_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub present: bool,
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub threes: u32,
    pub twos: u32,
    pub free_throws: u32,
    /// `2×points + rebounds + assists + steals + blocks`.
    pub impact: u64,
}

/// Team aggregate over present players.
#[derive(Debug, Serialize, ToSchema, Clone, Default, PartialEq, Eq)]
pub struct TeamTotals {
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    pub threes: u32,
    pub twos: u32,
    pub free_throws: u32,
    pub total_players: usize,
    pub present_players: usize,
    pub absent_players: usize,
    /// Whole percent of enrolled players who attended, capped at 100.
    pub attendance_percentage: u32,
}

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_id: Uuid,
    pub name: String,
    pub value: u32,
}

/// Top present players per counter.
#[derive(Debug, Serialize, ToSchema, Clone, Default, PartialEq, Eq)]
pub struct Leaderboards {
    pub points: Vec<LeaderboardEntry>,
    pub rebounds: Vec<LeaderboardEntry>,
    pub assists: Vec<LeaderboardEntry>,
    pub steals: Vec<LeaderboardEntry>,
    pub blocks: Vec<LeaderboardEntry>,
}

#[derive(Debug, Serialize, ToSchema, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShotTally {
    pub count: u32,
    pub points: u32,
}

/// Team points split by shot kind.
#[derive(Debug, Serialize, ToSchema, Clone, Default, PartialEq, Eq)]
pub struct PointBreakdown {
    pub three: ShotTally,
    pub two: ShotTally,
    pub free_throw: ShotTally,
    pub total_points: u32,
}

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct PositionCount {
    pub position: String,
    pub count: usize,
}

/// Aggregated attendance of one event.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct AttendanceView {
    /// False when no attendance was recorded yet; every list is then empty.
    pub recorded: bool,
    pub event: AttendanceEventHeader,
    /// Present players by points descending.
    pub present: Vec<PlayerLine>,
    pub absent: Vec<PlayerLine>,
    pub team_totals: TeamTotals,
    pub leaderboards: Leaderboards,
    pub point_breakdown: PointBreakdown,
    pub positions: Vec<PositionCount>,
    pub total_impact: u64,
    pub most_impactful: Option<PlayerLine>,
    /// The viewer's own line when they are part of the event.
    pub viewer: Option<PlayerLine>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_request_requires_event_and_players() {
        let empty: RecordAttendanceRequest =
            serde_json::from_value(json!({ "event_id": Uuid::nil() })).unwrap();
        let errors = empty.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("players"));

        let anonymous: RecordAttendanceRequest = serde_json::from_value(json!({
            "players": [{ "player_id": Uuid::nil(), "points": "7" }],
            "duration": "12:30",
        }))
        .unwrap();
        let errors = anonymous.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("event_id"));
        assert_eq!(anonymous.players[0].score().points, 7);
    }
}
