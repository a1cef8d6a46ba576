use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    AttendanceRecordEntity, AttendanceResultEntity, BoxScore, EnrollmentEntity, EventEntity,
    EventKind, PlayerStatisticEntity, Role, ShotBreakdownEntity, UserEntity,
};

pub const USER_COLLECTION: &str = "users";
pub const EVENT_COLLECTION: &str = "events";
pub const ENROLLMENT_COLLECTION: &str = "enrollments";
pub const ATTENDANCE_COLLECTION: &str = "attendance";
pub const STATISTIC_COLLECTION: &str = "statistics";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    first_name: String,
    last_name: String,
    position: Option<String>,
    role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEventDocument {
    #[serde(rename = "_id")]
    id: String,
    kind: EventKind,
    date: String,
    time: String,
    place: String,
    description: String,
    coach_id: String,
    created_at: DateTime,
}

/// Enrollment keyed by `event:player` so the primary key enforces one row per pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoEnrollmentDocument {
    #[serde(rename = "_id")]
    id: String,
    event_id: String,
    player_id: String,
    enrolled: bool,
    created_at: DateTime,
}

/// Attendance keyed by event id: the first insert wins, later ones hit the duplicate key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoAttendanceDocument {
    #[serde(rename = "_id")]
    event_id: String,
    coach_id: String,
    duration: String,
    team_totals: BoxScore,
    results: Vec<MongoResultDocument>,
    recorded_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoResultDocument {
    player_id: String,
    present: bool,
    score: BoxScore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStatisticDocument {
    #[serde(rename = "_id")]
    id: String,
    event_id: String,
    player_id: String,
    points: Option<u32>,
    rebounds: u32,
    assists: u32,
    steals: u32,
    blocks: u32,
    #[serde(default)]
    shots: Vec<ShotBreakdownEntity>,
    updated_at: DateTime,
}

pub fn pair_key(event_id: Uuid, player_id: Uuid) -> String {
    format!("{event_id}:{player_id}")
}

pub fn doc_id(id: impl ToString) -> Document {
    doc! {"_id": id.to_string()}
}

fn parse_uuid(collection: &'static str, value: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(value).map_err(|err| MongoDaoError::InvalidDocument {
        collection,
        reason: format!("`{value}` is not a UUID: {err}"),
    })
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            first_name: value.first_name,
            last_name: value.last_name,
            position: value.position,
            role: value.role,
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoUserDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_uuid(USER_COLLECTION, &value.id)?,
            first_name: value.first_name,
            last_name: value.last_name,
            position: value.position,
            role: value.role,
        })
    }
}

impl From<EventEntity> for MongoEventDocument {
    fn from(value: EventEntity) -> Self {
        Self {
            id: value.id.to_string(),
            kind: value.kind,
            date: value.date,
            time: value.time,
            place: value.place,
            description: value.description,
            coach_id: value.coach_id.to_string(),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoEventDocument> for EventEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoEventDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_uuid(EVENT_COLLECTION, &value.id)?,
            kind: value.kind,
            date: value.date,
            time: value.time,
            place: value.place,
            description: value.description,
            coach_id: parse_uuid(EVENT_COLLECTION, &value.coach_id)?,
            created_at: value.created_at.to_system_time(),
        })
    }
}

impl From<EnrollmentEntity> for MongoEnrollmentDocument {
    fn from(value: EnrollmentEntity) -> Self {
        Self {
            id: pair_key(value.event_id, value.player_id),
            event_id: value.event_id.to_string(),
            player_id: value.player_id.to_string(),
            enrolled: value.enrolled,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoEnrollmentDocument> for EnrollmentEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoEnrollmentDocument) -> MongoResult<Self> {
        Ok(Self {
            player_id: parse_uuid(ENROLLMENT_COLLECTION, &value.player_id)?,
            event_id: parse_uuid(ENROLLMENT_COLLECTION, &value.event_id)?,
            enrolled: value.enrolled,
            created_at: value.created_at.to_system_time(),
        })
    }
}

impl From<AttendanceRecordEntity> for MongoAttendanceDocument {
    fn from(value: AttendanceRecordEntity) -> Self {
        Self {
            event_id: value.event_id.to_string(),
            coach_id: value.coach_id.to_string(),
            duration: value.duration,
            team_totals: value.team_totals,
            results: value
                .results
                .into_iter()
                .map(|result| MongoResultDocument {
                    player_id: result.player_id.to_string(),
                    present: result.present,
                    score: result.score,
                })
                .collect(),
            recorded_at: DateTime::from_system_time(value.recorded_at),
        }
    }
}

impl TryFrom<MongoAttendanceDocument> for AttendanceRecordEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoAttendanceDocument) -> MongoResult<Self> {
        let results = value
            .results
            .into_iter()
            .map(|result| {
                Ok(AttendanceResultEntity {
                    player_id: parse_uuid(ATTENDANCE_COLLECTION, &result.player_id)?,
                    present: result.present,
                    score: result.score,
                })
            })
            .collect::<MongoResult<Vec<_>>>()?;

        Ok(Self {
            event_id: parse_uuid(ATTENDANCE_COLLECTION, &value.event_id)?,
            coach_id: parse_uuid(ATTENDANCE_COLLECTION, &value.coach_id)?,
            duration: value.duration,
            team_totals: value.team_totals,
            results,
            recorded_at: value.recorded_at.to_system_time(),
        })
    }
}

impl From<PlayerStatisticEntity> for MongoStatisticDocument {
    fn from(value: PlayerStatisticEntity) -> Self {
        Self {
            id: pair_key(value.event_id, value.player_id),
            event_id: value.event_id.to_string(),
            player_id: value.player_id.to_string(),
            points: value.points,
            rebounds: value.rebounds,
            assists: value.assists,
            steals: value.steals,
            blocks: value.blocks,
            shots: value.shots,
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoStatisticDocument> for PlayerStatisticEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoStatisticDocument) -> MongoResult<Self> {
        Ok(Self {
            player_id: parse_uuid(STATISTIC_COLLECTION, &value.player_id)?,
            event_id: parse_uuid(STATISTIC_COLLECTION, &value.event_id)?,
            points: value.points,
            rebounds: value.rebounds,
            assists: value.assists,
            steals: value.steals,
            blocks: value.blocks,
            shots: value.shots,
            updated_at: value.updated_at.to_system_time(),
        })
    }
}
