use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{BoxScore, StatField},
    dto::{events::EventSummary, phase::VisibleRecorderPhase},
    state::{
        clock::format_duration,
        session::{RecorderSession, RosterEntry},
    },
};

/// Body of `POST /recorder/sessions`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct OpenSessionRequest {
    #[validate(required)]
    pub event_id: Option<Uuid>,
}

/// Body of `PUT /recorder/sessions/{id}/players/{index}/stats`.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct AdjustStatRequest {
    pub field: StatField,
    /// Coerced to a non-negative integer.
    #[serde(default)]
    #[schema(value_type = u32)]
    pub value: Value,
}

#[derive(Debug, Serialize, ToSchema, Clone, PartialEq, Eq)]
pub struct RosterLine {
    /// Position to use in per-player routes for the current phase.
    pub index: usize,
    pub player_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub present: bool,
    pub score: BoxScore,
}

impl RosterLine {
    fn new(index: usize, entry: &RosterEntry) -> Self {
        Self {
            index,
            player_id: entry.player_id,
            first_name: entry.first_name.clone(),
            last_name: entry.last_name.clone(),
            position: entry.position.clone(),
            present: entry.present,
            score: entry.score,
        }
    }
}

/// Current view of a recorder session.
#[skip_serializing_none]
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionView {
    pub id: Uuid,
    pub event: EventSummary,
    pub phase: VisibleRecorderPhase,
    /// Read-only notice shown when the session is locked.
    pub notice: Option<String>,
    /// Whole enrolled roster; indexed for presence toggles.
    pub roster: Vec<RosterLine>,
    /// Present players once the match started; indexed for statistic edits.
    pub on_court: Vec<RosterLine>,
    /// Enrolled players set aside at kick-off.
    pub bench: Vec<RosterLine>,
    pub present_count: usize,
    pub min_present_players: usize,
    pub team_totals: BoxScore,
    /// Displayed match clock, `MM:SS`.
    pub clock: Option<String>,
}

impl SessionView {
    pub fn new(session: &RecorderSession, min_present_players: usize) -> Self {
        let started = session.clock_secs().is_some();
        Self {
            id: session.id(),
            event: session.event().clone().into(),
            phase: session.phase().into(),
            notice: session.notice().map(str::to_owned),
            roster: session
                .roster()
                .enumerate()
                .map(|(index, entry)| RosterLine::new(index, entry))
                .collect(),
            on_court: session
                .on_court()
                .enumerate()
                .map(|(index, entry)| RosterLine::new(index, entry))
                .collect(),
            bench: if started {
                session
                    .bench()
                    .enumerate()
                    .map(|(index, entry)| RosterLine::new(index, entry))
                    .collect()
            } else {
                Vec::new()
            },
            present_count: session.present_count(),
            min_present_players,
            team_totals: session.team_totals(),
            clock: session
                .clock_secs()
                .map(|secs| format_duration(Duration::from_secs(secs))),
        }
    }
}

/// Outcome of a finished match.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinishMatchResponse {
    pub session_id: Uuid,
    pub event_id: Uuid,
    pub duration: String,
    pub present: usize,
    pub absent: usize,
    pub team_totals: BoxScore,
    /// Statistic rows mirrored; lower than `present` when some upserts failed.
    pub statistics_saved: usize,
}
