use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Role tag attached to every club member.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Enrolls in events and has statistics recorded.
    Player,
    /// Creates events and records attendance.
    Coach,
}

/// Kind of schedulable occurrence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Training,
    Match,
}

impl EventKind {
    /// Parse a kind tag case-insensitively (`"Match"`, `"TRAINING"`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "training" => Some(EventKind::Training),
            "match" => Some(EventKind::Match),
            _ => None,
        }
    }
}

/// Shot type used to break a player's points down.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShotKind {
    Three,
    Two,
    FreeThrow,
}

impl ShotKind {
    /// Points awarded for a single made shot of this kind.
    pub fn value(self) -> u32 {
        match self {
            ShotKind::Three => 3,
            ShotKind::Two => 2,
            ShotKind::FreeThrow => 1,
        }
    }
}

/// One of the five box-score counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    Points,
    Rebounds,
    Assists,
    Steals,
    Blocks,
}

impl StatField {
    /// Every counter in display order.
    pub const ALL: [StatField; 5] = [
        StatField::Points,
        StatField::Rebounds,
        StatField::Assists,
        StatField::Steals,
        StatField::Blocks,
    ];
}

/// The five tracked counters of a player (or a team) for one event.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct BoxScore {
    pub points: u32,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
}

impl BoxScore {
    /// Read a single counter.
    pub fn get(&self, field: StatField) -> u32 {
        match field {
            StatField::Points => self.points,
            StatField::Rebounds => self.rebounds,
            StatField::Assists => self.assists,
            StatField::Steals => self.steals,
            StatField::Blocks => self.blocks,
        }
    }

    /// Overwrite a single counter.
    pub fn set(&mut self, field: StatField, value: u32) {
        let slot = match field {
            StatField::Points => &mut self.points,
            StatField::Rebounds => &mut self.rebounds,
            StatField::Assists => &mut self.assists,
            StatField::Steals => &mut self.steals,
            StatField::Blocks => &mut self.blocks,
        };
        *slot = value;
    }

    /// Add another score into this one, saturating each counter.
    pub fn accumulate(&mut self, other: &BoxScore) {
        for field in StatField::ALL {
            self.set(field, self.get(field).saturating_add(other.get(field)));
        }
    }

    /// Weighted contribution: `2×points + rebounds + assists + steals + blocks`.
    pub fn impact(&self) -> u64 {
        2 * u64::from(self.points)
            + u64::from(self.rebounds)
            + u64::from(self.assists)
            + u64::from(self.steals)
            + u64::from(self.blocks)
    }

    /// Sum a sequence of scores.
    pub fn total<'a>(scores: impl IntoIterator<Item = &'a BoxScore>) -> BoxScore {
        scores.into_iter().fold(BoxScore::default(), |mut acc, score| {
            acc.accumulate(score);
            acc
        })
    }
}

/// Club member profile, restricted to the fields the attendance workflow reads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Court position (e.g. "Base", "Pivot"); free text.
    pub position: Option<String>,
    pub role: Role,
}

impl UserEntity {
    /// First and last name joined for display.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

/// Training session or match scheduled by a coach.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEntity {
    pub id: Uuid,
    pub kind: EventKind,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Start time, `HH:MM`.
    pub time: String,
    pub place: String,
    pub description: String,
    /// Coach who created (and owns) the event.
    pub coach_id: Uuid,
    pub created_at: SystemTime,
}

/// A player's registration to an event. Unique per (player, event).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnrollmentEntity {
    pub player_id: Uuid,
    pub event_id: Uuid,
    pub enrolled: bool,
    pub created_at: SystemTime,
}

/// Final presence and box score of one enrolled player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttendanceResultEntity {
    pub player_id: Uuid,
    pub present: bool,
    pub score: BoxScore,
}

/// Completed attendance of one event, written exactly once.
///
/// The record holds one result per enrolled player plus the team totals and the match
/// duration, stored once instead of being repeated on every row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttendanceRecordEntity {
    pub event_id: Uuid,
    pub coach_id: Uuid,
    /// Elapsed match time formatted as `MM:SS`.
    pub duration: String,
    pub team_totals: BoxScore,
    pub results: Vec<AttendanceResultEntity>,
    pub recorded_at: SystemTime,
}

impl AttendanceRecordEntity {
    /// Number of players marked present.
    pub fn present_count(&self) -> usize {
        self.results.iter().filter(|result| result.present).count()
    }

    /// Number of enrolled players who did not attend.
    pub fn absent_count(&self) -> usize {
        self.results.len() - self.present_count()
    }
}

/// Made shots of a given kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ShotBreakdownEntity {
    pub kind: ShotKind,
    pub count: u32,
}

/// Running per-player statistics for an event, upserted by (player, event).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerStatisticEntity {
    pub player_id: Uuid,
    pub event_id: Uuid,
    /// Explicit point total; when absent the points are derived from `shots`.
    pub points: Option<u32>,
    pub rebounds: u32,
    pub assists: u32,
    pub steals: u32,
    pub blocks: u32,
    #[serde(default)]
    pub shots: Vec<ShotBreakdownEntity>,
    pub updated_at: SystemTime,
}

impl PlayerStatisticEntity {
    /// Mirror a recorded box score, keeping the explicit point total.
    pub fn from_score(player_id: Uuid, event_id: Uuid, score: &BoxScore) -> Self {
        Self {
            player_id,
            event_id,
            points: Some(score.points),
            rebounds: score.rebounds,
            assists: score.assists,
            steals: score.steals,
            blocks: score.blocks,
            shots: Vec::new(),
            updated_at: SystemTime::now(),
        }
    }

    /// Total made shots of `kind`; missing entries count as zero.
    pub fn shot_count(&self, kind: ShotKind) -> u32 {
        self.shots
            .iter()
            .filter(|shot| shot.kind == kind)
            .fold(0u32, |acc, shot| acc.saturating_add(shot.count))
    }

    /// Points derived from the shot breakdown (`3×three + 2×two + 1×free throw`).
    pub fn points_from_shots(&self) -> u32 {
        [ShotKind::Three, ShotKind::Two, ShotKind::FreeThrow]
            .into_iter()
            .fold(0u32, |acc, kind| {
                acc.saturating_add(self.shot_count(kind).saturating_mul(kind.value()))
            })
    }
}
